//! TLS policy materialisation
//!
//! Turns a `TlsPolicy` into a rustls client configuration once, at bootstrap.
//! Every failure here is a `ConfigurationError`: unreadable CA bundles or a
//! broken client certificate must stop the process before the pool exists.

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use taskforge_core::application::configure::split_host_port;
use taskforge_core::domain::{ClientCertificatePaths, ConfigurationError, TlsPolicy, TlsVersion};
use taskforge_core::port::StoreError;
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;
use tracing::{debug, warn};

/// Ready-to-use TLS client side of the dial path
#[derive(Clone)]
pub struct TlsTransport {
    connector: TlsConnector,
    server_name: Option<ServerName<'static>>,
}

impl std::fmt::Debug for TlsTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsTransport")
            .field("server_name", &self.server_name)
            .finish()
    }
}

impl TlsTransport {
    /// Load all TLS material named by the policy.
    pub fn from_policy(policy: &TlsPolicy) -> Result<Self, ConfigurationError> {
        let server_name = policy
            .server_name
            .as_deref()
            .map(|name| {
                ServerName::try_from(name.to_string()).map_err(|e| {
                    ConfigurationError::Tls(format!("invalid server name {:?}: {}", name, e))
                })
            })
            .transpose()?;

        let config = client_config(policy)?;
        Ok(Self {
            connector: TlsConnector::from(config),
            server_name,
        })
    }

    /// Name sent for SNI and used for certificate validation.
    ///
    /// Falls back to the host of `address` when the policy has none, which is
    /// the case when verification is skipped.
    fn server_name_for(&self, address: &str) -> Result<ServerName<'static>, StoreError> {
        if let Some(name) = &self.server_name {
            return Ok(name.clone());
        }
        let host = split_host_port(address)
            .map(|(host, _)| host)
            .filter(|host| !host.is_empty())
            .ok_or_else(|| {
                StoreError::Tls(format!("cannot derive server name from {:?}", address))
            })?;
        ServerName::try_from(host.to_string())
            .map_err(|e| StoreError::Tls(format!("invalid server name {:?}: {}", host, e)))
    }

    /// Run the client handshake over an established TCP stream
    pub async fn handshake(
        &self,
        address: &str,
        tcp: TcpStream,
    ) -> Result<TlsStream<TcpStream>, StoreError> {
        let server_name = self.server_name_for(address)?;
        debug!(address, server_name = ?server_name, "Starting TLS handshake");
        self.connector
            .connect(server_name, tcp)
            .await
            .map_err(|e| StoreError::Tls(e.to_string()))
    }
}

/// Build the rustls client configuration for a policy
pub fn client_config(policy: &TlsPolicy) -> Result<Arc<ClientConfig>, ConfigurationError> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());

    let versions = match policy.min_version {
        TlsVersion::Tls12 => [&rustls::version::TLS13, &rustls::version::TLS12],
    };

    // The CA bundle is validated even when verification is skipped
    let roots = root_store(policy.ca_bundle.as_deref())?;

    let builder = ClientConfig::builder_with_provider(provider.clone())
        .with_protocol_versions(&versions)
        .map_err(|e| ConfigurationError::Tls(e.to_string()))?;

    let builder = if policy.skip_verify {
        warn!("TLS certificate verification is disabled");
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(SkipServerVerification(provider)))
    } else {
        builder.with_root_certificates(roots)
    };

    let config = match &policy.client_certificate {
        Some(paths) => {
            let (certs, key) = load_client_certificate(paths)?;
            builder
                .with_client_auth_cert(certs, key)
                .map_err(|e| client_certificate_error(paths, e.to_string()))?
        }
        None => builder.with_no_client_auth(),
    };

    Ok(Arc::new(config))
}

fn root_store(ca_bundle: Option<&Path>) -> Result<RootCertStore, ConfigurationError> {
    let mut roots = RootCertStore::empty();
    let Some(path) = ca_bundle else {
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        return Ok(roots);
    };

    let pem = fs::read(path).map_err(|source| ConfigurationError::CaBundleRead {
        path: path.to_path_buf(),
        source,
    })?;
    let certs: Vec<CertificateDer<'static>> = rustls_pemfile::certs(&mut pem.as_slice())
        .filter_map(|cert| cert.ok())
        .collect();

    let (added, ignored) = roots.add_parsable_certificates(certs);
    if added == 0 {
        return Err(ConfigurationError::CaBundleEmpty(path.to_path_buf()));
    }
    debug!(path = ?path, added, ignored, "Loaded CA bundle");
    Ok(roots)
}

fn client_certificate_error(paths: &ClientCertificatePaths, reason: String) -> ConfigurationError {
    ConfigurationError::ClientCertificate {
        cert: paths.cert.clone(),
        key: paths.key.clone(),
        reason,
    }
}

fn load_client_certificate(
    paths: &ClientCertificatePaths,
) -> Result<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>), ConfigurationError> {
    let fail = |reason: String| client_certificate_error(paths, reason);

    let cert_pem =
        fs::read(&paths.cert).map_err(|e| fail(format!("reading certificate: {}", e)))?;
    let certs = rustls_pemfile::certs(&mut cert_pem.as_slice())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| fail(format!("parsing certificate: {}", e)))?;
    if certs.is_empty() {
        return Err(fail("no certificate found".to_string()));
    }

    let key_pem = fs::read(&paths.key).map_err(|e| fail(format!("reading key: {}", e)))?;
    let key = rustls_pemfile::private_key(&mut key_pem.as_slice())
        .map_err(|e| fail(format!("parsing key: {}", e)))?
        .ok_or_else(|| fail("no private key found".to_string()))?;

    Ok((certs, key))
}

/// Accepts any server certificate; signatures are still checked so the
/// handshake itself stays well-formed.
#[derive(Debug)]
struct SkipServerVerification(Arc<CryptoProvider>);

impl ServerCertVerifier for SkipServerVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}
