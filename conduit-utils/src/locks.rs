//! Lock aliases shared across the workspace.
//!
//! Synchronous locks are `parking_lot`; they must never be held across an
//! `.await`.

/// A synchronous mutex.
pub type SyncMutex<T> = parking_lot::Mutex<T>;
