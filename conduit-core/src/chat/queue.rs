//! Per-player ordered delivery of chat outcomes.
//!
//! Each submitted message gets its outcome computed on its own task, so slow
//! event listeners for one message never hold up the work for the next.
//! Delivery is a different matter: a single consumer task awaits the entries
//! strictly in submission order, so the backend sees messages in the order the
//! client sent them no matter which computation finishes first.

use std::future::Future;
use std::sync::Arc;

use conduit_protocol::packets::game::{PreviousMessageAck, SChatAck, ServerboundChatPacket};
use conduit_utils::locks::SyncMutex;
use tokio::{
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

use super::{ChatError, ChatOutcome, ConnectionSink};

/// Acknowledgements are held back until at least this many are pending, the
/// size of the client's last-seen window.
pub const MINIMUM_DELAYED_ACK_COUNT: i32 = 20;

enum EntryOutcome {
    Ready(ChatOutcome),
    Pending(JoinHandle<Result<ChatOutcome, ChatError>>),
}

/// One queued message: its context and its not yet delivered outcome.
struct PendingChatEntry {
    timestamp: Option<i64>,
    previous_messages: Vec<PreviousMessageAck>,
    outcome: EntryOutcome,
}

impl PendingChatEntry {
    fn discard(self) {
        if let EntryOutcome::Pending(handle) = self.outcome {
            handle.abort();
        }
    }
}

/// What the client has acknowledged so far, updated in submission order.
#[derive(Default)]
struct AckTracker {
    last_timestamp: Option<i64>,
    last_seen: Vec<PreviousMessageAck>,
    delayed_ack_count: i32,
}

impl AckTracker {
    fn update_from_message(
        &mut self,
        timestamp: Option<i64>,
        previous_messages: Vec<PreviousMessageAck>,
    ) -> Vec<PreviousMessageAck> {
        if timestamp.is_some() {
            self.last_timestamp = timestamp;
        }
        self.last_seen.clone_from(&previous_messages);
        previous_messages
    }

    /// Adds `count` acknowledgements, returning the total to forward once the
    /// threshold is reached.
    fn accumulate(&mut self, count: i32) -> Option<i32> {
        let pending = self.delayed_ack_count.saturating_add(count);
        if pending >= MINIMUM_DELAYED_ACK_COUNT {
            self.delayed_ack_count = 0;
            Some(pending)
        } else {
            self.delayed_ack_count = pending;
            None
        }
    }

    fn take_delayed(&mut self) -> Option<i32> {
        (self.delayed_ack_count > 0).then(|| std::mem::take(&mut self.delayed_ack_count))
    }
}

struct QueueState {
    acks: AckTracker,
    entries: UnboundedSender<PendingChatEntry>,
}

/// Serializes chat outcomes for one connection.
pub struct ChatQueue {
    state: SyncMutex<QueueState>,
    cancel: CancellationToken,
}

impl ChatQueue {
    /// Creates the queue and starts its delivery task. `owner` names the
    /// connection in log messages.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    #[must_use]
    pub fn new(owner: impl Into<String>, sink: Arc<dyn ConnectionSink>) -> Self {
        let (entries, receiver) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        tokio::spawn(deliver(owner.into(), receiver, sink, cancel.clone()));

        Self {
            state: SyncMutex::new(QueueState {
                acks: AckTracker::default(),
                entries,
            }),
            cancel,
        }
    }

    /// Queues a chat message.
    ///
    /// `compute` is called right away, under the queue lock, with the
    /// acknowledgement window as of this message; the future it returns runs
    /// on its own task. Its outcome is delivered after every outcome submitted
    /// before it. An `Err` is logged and delivered as nothing.
    pub fn submit<F, Fut>(
        &self,
        timestamp: Option<i64>,
        previous_messages: Vec<PreviousMessageAck>,
        compute: F,
    ) where
        F: FnOnce(Vec<PreviousMessageAck>) -> Fut,
        Fut: Future<Output = Result<ChatOutcome, ChatError>> + Send + 'static,
    {
        if self.cancel.is_cancelled() {
            log::debug!("Chat queue is closed, dropping a submitted message");
            return;
        }

        let mut state = self.state.lock();
        if let Some(offset) = state.acks.take_delayed() {
            enqueue(&state.entries, ready_ack(offset));
        }

        let window = state.acks.update_from_message(timestamp, previous_messages);
        let outcome = tokio::spawn(compute(window.clone()));
        enqueue(
            &state.entries,
            PendingChatEntry {
                timestamp,
                previous_messages: window,
                outcome: EntryOutcome::Pending(outcome),
            },
        );
    }

    /// Records `offset` newly seen messages, forwarding an acknowledgement
    /// once enough have piled up.
    pub fn handle_acknowledgement(&self, offset: i32) {
        if self.cancel.is_cancelled() {
            return;
        }

        let mut state = self.state.lock();
        if let Some(offset) = state.acks.accumulate(offset) {
            enqueue(&state.entries, ready_ack(offset));
        }
    }

    /// The last message timestamp and acknowledgement window seen.
    #[must_use]
    pub fn last_seen(&self) -> (Option<i64>, Vec<PreviousMessageAck>) {
        let state = self.state.lock();
        (state.acks.last_timestamp, state.acks.last_seen.clone())
    }

    /// Stops delivery. Entries not yet delivered are discarded and their
    /// tasks aborted.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    /// Whether [`Self::close`] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for ChatQueue {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn ready_ack(offset: i32) -> PendingChatEntry {
    PendingChatEntry {
        timestamp: None,
        previous_messages: Vec::new(),
        outcome: EntryOutcome::Ready(ChatOutcome::Allow(ServerboundChatPacket::ChatAck(
            SChatAck { offset },
        ))),
    }
}

fn enqueue(entries: &UnboundedSender<PendingChatEntry>, entry: PendingChatEntry) {
    if let Err(rejected) = entries.send(entry) {
        rejected.0.discard();
    }
}

async fn deliver(
    owner: String,
    mut entries: UnboundedReceiver<PendingChatEntry>,
    sink: Arc<dyn ConnectionSink>,
    cancel: CancellationToken,
) {
    loop {
        let entry = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            entry = entries.recv() => match entry {
                Some(entry) => entry,
                None => break,
            },
        };

        let PendingChatEntry {
            timestamp,
            previous_messages,
            outcome,
        } = entry;
        let outcome = match outcome {
            EntryOutcome::Ready(outcome) => Ok(outcome),
            EntryOutcome::Pending(mut handle) => tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    handle.abort();
                    break;
                }
                joined = &mut handle => {
                    joined.unwrap_or_else(|e| Err(ChatError::Aborted(e.to_string())))
                }
            },
        };

        if cancel.is_cancelled() {
            break;
        }
        match outcome {
            Ok(ChatOutcome::Allow(packet)) => sink.forward(packet),
            Ok(ChatOutcome::Cancel) => {
                log::trace!("Chat message from {owner} at {timestamp:?} was not forwarded");
            }
            Err(err) => {
                log::error!("Exception while handling player chat for {owner}: {err}");
                log::debug!(
                    "Dropped entry had timestamp {timestamp:?} and {} acknowledgements",
                    previous_messages.len()
                );
            }
        }
    }

    entries.close();
    while let Ok(entry) = entries.try_recv() {
        entry.discard();
    }
    log::debug!("Chat queue for {owner} closed");
}
