//! TLS dial path against an in-process TLS endpoint

mod common;

use common::{options, FakeStore, TestPki};
use taskforge_core::application::resolve;
use taskforge_core::domain::{Command, Reply};
use taskforge_core::port::{Dialer, StoreError};
use taskforge_infra_redis::RedisDialer;

async fn tls_store(pki: &TestPki, password: Option<&str>) -> FakeStore {
    FakeStore::start_tls(password, pki.acceptor()).await
}

#[tokio::test]
async fn test_skip_verify_accepts_unknown_ca() {
    let pki = TestPki::generate();
    let store = tls_store(&pki, None).await;
    let address = store.address();

    let resolved = resolve(&options(&[
        ("server", address.as_str()),
        ("process", "w1"),
        ("tls", "true"),
        ("tls_skip_verify", "true"),
    ]))
    .unwrap();
    let dialer = RedisDialer::new(resolved.dial).unwrap();

    let mut conn = dialer.dial().await.unwrap();
    assert_eq!(
        conn.execute(Command::ping()).await.unwrap(),
        Reply::Simple("PONG".into())
    );
}

#[tokio::test]
async fn test_custom_ca_with_server_name() {
    let pki = TestPki::generate();
    let ca = pki.ca_file();
    let store = tls_store(&pki, Some("s3cret")).await;
    let address = store.address();
    let ca_path = ca.path().to_string_lossy().to_string();

    let resolved = resolve(&options(&[
        ("server", address.as_str()),
        ("process", "w1"),
        ("tls", "true"),
        ("tls_ca", ca_path.as_str()),
        ("tls_server_name", "localhost"),
        ("password", "s3cret"),
        ("database", "1"),
    ]))
    .unwrap();
    let dialer = RedisDialer::new(resolved.dial).unwrap();

    let mut conn = dialer.dial().await.unwrap();
    conn.execute(Command::ping()).await.unwrap();
    assert_eq!(store.commands(), vec!["AUTH", "SELECT", "PING"]);
}

#[tokio::test]
async fn test_certificate_name_mismatch_fails() {
    let pki = TestPki::generate();
    let ca = pki.ca_file();
    let store = tls_store(&pki, None).await;
    let address = store.address();
    let ca_path = ca.path().to_string_lossy().to_string();

    // Server name derived from 127.0.0.1; the certificate only covers localhost
    let resolved = resolve(&options(&[
        ("server", address.as_str()),
        ("process", "w1"),
        ("tls", "true"),
        ("tls_ca", ca_path.as_str()),
    ]))
    .unwrap();
    assert_eq!(
        resolved.dial.tls.as_ref().unwrap().server_name.as_deref(),
        Some("127.0.0.1")
    );
    let dialer = RedisDialer::new(resolved.dial).unwrap();

    let err = dialer.dial().await.err().unwrap();
    assert!(matches!(err, StoreError::Tls(_)), "unexpected error: {err}");
    assert!(store.commands().is_empty());
}

#[tokio::test]
async fn test_bundled_roots_reject_test_ca() {
    let pki = TestPki::generate();
    let store = tls_store(&pki, None).await;
    let address = store.address();

    let resolved = resolve(&options(&[
        ("server", address.as_str()),
        ("process", "w1"),
        ("tls", "true"),
        ("tls_server_name", "localhost"),
    ]))
    .unwrap();
    let dialer = RedisDialer::new(resolved.dial).unwrap();

    assert!(matches!(
        dialer.dial().await.err().unwrap(),
        StoreError::Tls(_)
    ));
}

#[tokio::test]
async fn test_server_name_derived_from_host() {
    let pki = TestPki::generate();
    let ca = pki.ca_file();
    let store = tls_store(&pki, None).await;
    let address = store.address().replace("127.0.0.1", "localhost");
    let ca_path = ca.path().to_string_lossy().to_string();

    let resolved = resolve(&options(&[
        ("server", address.as_str()),
        ("process", "w1"),
        ("tls", "true"),
        ("tls_ca", ca_path.as_str()),
    ]))
    .unwrap();
    let dialer = RedisDialer::new(resolved.dial).unwrap();

    let mut conn = dialer.dial().await.unwrap();
    assert_eq!(
        conn.execute(Command::ping()).await.unwrap(),
        Reply::Simple("PONG".into())
    );
}

#[tokio::test]
async fn test_client_certificate_handshake() {
    let pki = TestPki::generate();
    let ca = pki.ca_file();
    let (cert, key) = pki.client_files();
    let store = FakeStore::start_tls(Some("s3cret"), pki.mutual_acceptor()).await;
    let address = store.address();
    let ca_path = ca.path().to_string_lossy().to_string();
    let cert_path = cert.path().to_string_lossy().to_string();
    let key_path = key.path().to_string_lossy().to_string();

    let resolved = resolve(&options(&[
        ("server", address.as_str()),
        ("process", "w1"),
        ("tls", "true"),
        ("tls_ca", ca_path.as_str()),
        ("tls_server_name", "localhost"),
        ("tls_cert", cert_path.as_str()),
        ("tls_key", key_path.as_str()),
        ("password", "s3cret"),
    ]))
    .unwrap();
    let dialer = RedisDialer::new(resolved.dial).unwrap();

    let mut conn = dialer.dial().await.unwrap();
    conn.execute(Command::ping()).await.unwrap();
    assert_eq!(store.commands(), vec!["AUTH", "PING"]);
}

#[tokio::test]
async fn test_missing_client_certificate_is_refused() {
    let pki = TestPki::generate();
    let ca = pki.ca_file();
    let store = FakeStore::start_tls(None, pki.mutual_acceptor()).await;
    let address = store.address();
    let ca_path = ca.path().to_string_lossy().to_string();

    let resolved = resolve(&options(&[
        ("server", address.as_str()),
        ("process", "w1"),
        ("tls", "true"),
        ("tls_ca", ca_path.as_str()),
        ("tls_server_name", "localhost"),
    ]))
    .unwrap();
    let dialer = RedisDialer::new(resolved.dial).unwrap();

    // With TLS 1.3 the refusal may only surface on the first read
    let result = match dialer.dial().await {
        Ok(mut conn) => conn.execute(Command::ping()).await.map(|_| ()),
        Err(e) => Err(e),
    };
    assert!(result.unwrap_err().is_connection_fatal());
    assert!(store.commands().is_empty());
}
