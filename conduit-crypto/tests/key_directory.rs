//! Fetching the key directory over HTTP from a local stand-in server.

use base64::{Engine, engine::general_purpose::STANDARD};
use conduit_crypto::{KeyDirectoryError, PublicKeyDirectory};
use rsa::{RsaPrivateKey, traits::PublicKeyParts};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
    sync::oneshot,
};

/// Serves one request with `status` and `body`, reporting the raw request head.
async fn serve_once(status: &'static str, body: String) -> (String, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("accept");
        let mut head = Vec::new();
        let mut buf = [0u8; 1024];
        while !head.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = stream.read(&mut buf).await.expect("read");
            if n == 0 {
                break;
            }
            head.extend_from_slice(&buf[..n]);
        }
        let _ = tx.send(String::from_utf8_lossy(&head).into_owned());

        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(response.as_bytes()).await.expect("write");
        stream.shutdown().await.ok();
    });

    (format!("http://{addr}/publickeys"), rx)
}

fn local_client() -> reqwest::Client {
    PublicKeyDirectory::client_builder("conduit/0.1.0")
        .build()
        .expect("client")
}

fn encoded_key() -> String {
    let key = RsaPrivateKey::new(&mut rand::thread_rng(), 1024)
        .expect("key generation")
        .to_public_key();
    STANDARD.encode(rsa_der::public_key_to_der(
        &key.n().to_bytes_be(),
        &key.e().to_bytes_be(),
    ))
}

#[tokio::test]
async fn fetch_sends_client_identity_and_parses_keys() {
    let key = encoded_key();
    let body = format!(
        r#"{{"profilePropertyKeys":[{{"publicKey":"{key}"}}],"playerCertificateKeys":[{{"publicKey":"{key}"}}]}}"#
    );
    let (url, request) = serve_once("200 OK", body).await;

    let directory = PublicKeyDirectory::fetch_with(&local_client(), &url)
        .await
        .expect("fetch");
    assert_eq!(directory.profile_property_keys().len(), 1);
    assert_eq!(directory.player_certificate_keys().len(), 1);

    let head = request.await.expect("request head").to_ascii_lowercase();
    assert!(head.starts_with("get /publickeys"));
    assert!(head.contains("user-agent: conduit/0.1.0"));
}

#[tokio::test]
async fn fetch_identifies_itself_with_the_given_identity() {
    let body = r#"{"profilePropertyKeys":[],"playerCertificateKeys":[]}"#.to_owned();
    let (url, request) = serve_once("200 OK", body).await;

    let directory = PublicKeyDirectory::fetch(&url, "conduit-test/9.9")
        .await
        .expect("fetch");
    assert!(directory.profile_property_keys().is_empty());
    assert!(directory.player_certificate_keys().is_empty());

    let head = request.await.expect("request head").to_ascii_lowercase();
    assert!(head.starts_with("get /publickeys"));
    assert!(head.contains("\r\nuser-agent: conduit-test/9.9\r\n"));
}

#[tokio::test]
async fn error_status_is_fatal() {
    let (url, _request) = serve_once("503 Service Unavailable", String::new()).await;
    assert!(matches!(
        PublicKeyDirectory::fetch_with(&local_client(), &url).await,
        Err(KeyDirectoryError::Status(status)) if status.as_u16() == 503
    ));
}

#[tokio::test]
async fn garbage_body_is_fatal() {
    let (url, _request) = serve_once("200 OK", "<html>".to_owned()).await;
    assert!(matches!(
        PublicKeyDirectory::fetch_with(&local_client(), &url).await,
        Err(KeyDirectoryError::MalformedJson(_))
    ));
}

#[tokio::test]
async fn unreachable_endpoint_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);

    assert!(matches!(
        PublicKeyDirectory::fetch_with(&local_client(), &format!("http://{addr}/publickeys")).await,
        Err(KeyDirectoryError::Transport(_))
    ));
}
