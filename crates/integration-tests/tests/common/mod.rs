//! Shared test fixtures: an in-process RESP store and TLS material

#![allow(dead_code)]

use bytes::BytesMut;
use parking_lot::Mutex;
use rcgen::{BasicConstraints, CertificateParams, ExtendedKeyUsagePurpose, IsCa, KeyPair};
use std::collections::HashMap;
use std::io::Write;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use taskforge_core::domain::Reply;
use taskforge_infra_redis::{decode_reply, encode_reply};
use tempfile::NamedTempFile;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_rustls::rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use tokio_rustls::rustls::server::WebPkiClientVerifier;
use tokio_rustls::rustls::{RootCertStore, ServerConfig};
use tokio_rustls::TlsAcceptor;

const DATABASES: u32 = 16;

/// How long `SLOW` takes to answer
pub const SLOW_REPLY_DELAY: Duration = Duration::from_millis(200);

#[derive(Default)]
struct StoreState {
    connections: AtomicUsize,
    commands: Mutex<Vec<String>>,
}

/// Minimal RESP server: AUTH, SELECT, PING, ECHO and a delayed SLOW; anything
/// else answers OK.
pub struct FakeStore {
    addr: SocketAddr,
    password: Option<String>,
    state: Arc<StoreState>,
    kill: broadcast::Sender<()>,
    handle: JoinHandle<()>,
}

impl FakeStore {
    pub async fn start(password: Option<&str>) -> Self {
        Self::spawn(password, None).await
    }

    pub async fn start_tls(password: Option<&str>, acceptor: TlsAcceptor) -> Self {
        Self::spawn(password, Some(acceptor)).await
    }

    async fn spawn(password: Option<&str>, acceptor: Option<TlsAcceptor>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(StoreState::default());
        let (kill, _) = broadcast::channel(4);
        let password = password.map(str::to_string);

        let handle = {
            let state = state.clone();
            let kill = kill.clone();
            let password = password.clone();
            tokio::spawn(async move {
                loop {
                    let Ok((socket, _)) = listener.accept().await else {
                        return;
                    };
                    state.connections.fetch_add(1, Ordering::SeqCst);
                    let state = state.clone();
                    let kill_rx = kill.subscribe();
                    let password = password.clone();
                    let acceptor = acceptor.clone();
                    tokio::spawn(async move {
                        match acceptor {
                            Some(acceptor) => {
                                // Failed handshakes just drop the socket
                                if let Ok(stream) = acceptor.accept(socket).await {
                                    serve(stream, password, state, kill_rx).await;
                                }
                            }
                            None => serve(socket, password, state, kill_rx).await,
                        }
                    });
                }
            })
        };

        Self {
            addr,
            password,
            state,
            kill,
            handle,
        }
    }

    pub fn address(&self) -> String {
        self.addr.to_string()
    }

    /// Number of accepted TCP connections so far
    pub fn connections(&self) -> usize {
        self.state.connections.load(Ordering::SeqCst)
    }

    /// Names of every command received, in arrival order
    pub fn commands(&self) -> Vec<String> {
        self.state.commands.lock().clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.commands().iter().filter(|c| c.as_str() == name).count()
    }

    /// Drop every open connection (the listener keeps accepting)
    pub fn kill_connections(&self) {
        let _ = self.kill.send(());
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }
}

impl Drop for FakeStore {
    fn drop(&mut self) {
        self.kill_connections();
        self.handle.abort();
    }
}

async fn serve<S>(
    mut stream: S,
    password: Option<String>,
    state: Arc<StoreState>,
    mut kill: broadcast::Receiver<()>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut authenticated = password.is_none();
    let mut buf = BytesMut::new();
    loop {
        while let Ok(Some(request)) = decode_reply(&mut buf) {
            let (name, args) = split_request(request);
            state.commands.lock().push(name.clone());
            if name == "SLOW" {
                tokio::time::sleep(SLOW_REPLY_DELAY).await;
            }
            let reply = respond(&name, &args, password.as_deref(), &mut authenticated);
            let mut out = BytesMut::new();
            encode_reply(&reply, &mut out);
            if stream.write_all(&out).await.is_err() {
                return;
            }
        }

        tokio::select! {
            _ = kill.recv() => return,
            read = stream.read_buf(&mut buf) => match read {
                Ok(0) | Err(_) => return,
                Ok(_) => {}
            },
        }
    }
}

fn split_request(request: Reply) -> (String, Vec<String>) {
    let Reply::Array(items) = request else {
        return (String::new(), Vec::new());
    };
    let mut words = items
        .iter()
        .map(|item| item.as_str().unwrap_or_default().to_string());
    let name = words.next().unwrap_or_default().to_uppercase();
    (name, words.collect())
}

fn respond(
    name: &str,
    args: &[String],
    password: Option<&str>,
    authenticated: &mut bool,
) -> Reply {
    match name {
        "AUTH" => {
            if password.is_some() && args.first().map(String::as_str) == password {
                *authenticated = true;
                Reply::ok()
            } else {
                Reply::Error("WRONGPASS invalid username-password pair".into())
            }
        }
        _ if !*authenticated => Reply::Error("NOAUTH Authentication required.".into()),
        "PING" => Reply::Simple("PONG".into()),
        "ECHO" => Reply::Bulk(args.first().cloned().unwrap_or_default().into_bytes()),
        "SLOW" => Reply::Bulk(b"slow-value".to_vec()),
        "SELECT" => match args.first().and_then(|db| db.parse::<u32>().ok()) {
            Some(db) if db < DATABASES => Reply::ok(),
            _ => Reply::Error("ERR DB index is out of range".into()),
        },
        _ => Reply::ok(),
    }
}

/// CA plus a `localhost` server certificate and a client certificate issued by it
pub struct TestPki {
    pub ca_pem: String,
    ca_cert: CertificateDer<'static>,
    server_cert: CertificateDer<'static>,
    server_key: Vec<u8>,
    client_cert_pem: String,
    client_key_pem: String,
}

impl TestPki {
    pub fn generate() -> Self {
        let ca_key = KeyPair::generate().unwrap();
        let mut ca_params = CertificateParams::new(Vec::<String>::new()).unwrap();
        ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        let ca_cert = ca_params.self_signed(&ca_key).unwrap();

        let server_key = KeyPair::generate().unwrap();
        let server_params = CertificateParams::new(vec!["localhost".to_string()]).unwrap();
        let server_cert = server_params
            .signed_by(&server_key, &ca_cert, &ca_key)
            .unwrap();

        let client_key = KeyPair::generate().unwrap();
        let mut client_params = CertificateParams::new(vec!["worker".to_string()]).unwrap();
        client_params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ClientAuth];
        let client_cert = client_params
            .signed_by(&client_key, &ca_cert, &ca_key)
            .unwrap();

        Self {
            ca_pem: ca_cert.pem(),
            ca_cert: ca_cert.der().clone(),
            server_cert: server_cert.der().clone(),
            server_key: server_key.serialize_der(),
            client_cert_pem: client_cert.pem(),
            client_key_pem: client_key.serialize_pem(),
        }
    }

    pub fn acceptor(&self) -> TlsAcceptor {
        let provider = Arc::new(tokio_rustls::rustls::crypto::ring::default_provider());
        let config = ServerConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .unwrap()
            .with_no_client_auth()
            .with_single_cert(vec![self.server_cert.clone()], self.server_key())
            .unwrap();
        TlsAcceptor::from(Arc::new(config))
    }

    /// Acceptor that rejects clients without a certificate issued by the CA
    pub fn mutual_acceptor(&self) -> TlsAcceptor {
        let provider = Arc::new(tokio_rustls::rustls::crypto::ring::default_provider());
        let mut roots = RootCertStore::empty();
        roots.add(self.ca_cert.clone()).unwrap();
        let verifier = WebPkiClientVerifier::builder_with_provider(Arc::new(roots), provider.clone())
            .build()
            .unwrap();
        let config = ServerConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .unwrap()
            .with_client_cert_verifier(verifier)
            .with_single_cert(vec![self.server_cert.clone()], self.server_key())
            .unwrap();
        TlsAcceptor::from(Arc::new(config))
    }

    fn server_key(&self) -> PrivateKeyDer<'static> {
        PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(self.server_key.clone()))
    }

    /// Client certificate and key as temporary PEM files
    pub fn client_files(&self) -> (NamedTempFile, NamedTempFile) {
        (pem_file(&self.client_cert_pem), pem_file(&self.client_key_pem))
    }

    /// Write the CA certificate to a temporary PEM file
    pub fn ca_file(&self) -> NamedTempFile {
        pem_file(&self.ca_pem)
    }
}

fn pem_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

pub fn options(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
