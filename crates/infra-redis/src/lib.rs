// Taskforge Infrastructure - RESP Store Adapter
// Implements: Dialer, StoreConnection (TCP, optional TLS, AUTH, SELECT)

pub mod connection;
pub mod dialer;
pub mod resp;
pub mod tls;

pub use connection::RespConnection;
pub use dialer::{dial, prepare, RedisDialer};
pub use resp::{decode_reply, encode_command, encode_reply};
pub use tls::TlsTransport;
