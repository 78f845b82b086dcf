// Dial path: TCP connect, optional TLS, AUTH, SELECT

use crate::connection::RespConnection;
use crate::tls::TlsTransport;
use async_trait::async_trait;
use taskforge_core::domain::{Command, ConfigurationError, DialSpec};
use taskforge_core::port::{Dialer, StoreConnection, StoreError};
use tokio::net::TcpStream;
use tracing::debug;

/// `Dialer` producing RESP connections from a fixed `DialSpec`.
///
/// TLS material is loaded once here so that a broken certificate or CA bundle
/// surfaces at startup rather than on the first dial.
#[derive(Debug, Clone)]
pub struct RedisDialer {
    spec: DialSpec,
    tls: Option<TlsTransport>,
}

impl RedisDialer {
    pub fn new(spec: DialSpec) -> Result<Self, ConfigurationError> {
        let tls = spec
            .tls
            .as_ref()
            .map(TlsTransport::from_policy)
            .transpose()?;
        Ok(Self { spec, tls })
    }

    pub fn spec(&self) -> &DialSpec {
        &self.spec
    }
}

#[async_trait]
impl Dialer for RedisDialer {
    async fn dial(&self) -> Result<Box<dyn StoreConnection>, StoreError> {
        dial(&self.spec, self.tls.as_ref()).await
    }
}

/// Open one connection and prepare it for use
pub async fn dial(
    spec: &DialSpec,
    tls: Option<&TlsTransport>,
) -> Result<Box<dyn StoreConnection>, StoreError> {
    let tcp = TcpStream::connect(&spec.address).await?;
    tcp.set_nodelay(true)?;

    let conn: Box<dyn StoreConnection> = match tls {
        Some(tls) => {
            let stream = tls.handshake(&spec.address, tcp).await?;
            Box::new(prepare(RespConnection::new(stream), spec).await?)
        }
        None => Box::new(prepare(RespConnection::new(tcp), spec).await?),
    };

    debug!(
        address = %spec.address,
        tls = tls.is_some(),
        database = ?spec.database,
        "Store connection established"
    );
    Ok(conn)
}

/// Authenticate and select the database on a fresh connection.
///
/// The connection is closed before any error is returned.
pub async fn prepare<C: StoreConnection>(mut conn: C, spec: &DialSpec) -> Result<C, StoreError> {
    if let Some(password) = &spec.password {
        if let Err(e) = conn.execute(Command::auth(password)).await {
            conn.close().await;
            return Err(match e {
                StoreError::Server(message) => StoreError::Auth(message),
                other => other,
            });
        }
    }

    if let Some(database) = &spec.database {
        if let Err(e) = conn.execute(Command::select(database)).await {
            conn.close().await;
            return Err(match e {
                StoreError::Server(message) => StoreError::SelectDatabase(message),
                other => other,
            });
        }
    }

    Ok(conn)
}
