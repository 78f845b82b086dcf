// Stream-backed RESP connection

use crate::resp::{decode_reply, encode_command};
use async_trait::async_trait;
use bytes::BytesMut;
use taskforge_core::domain::{Command, Reply};
use taskforge_core::port::{StoreConnection, StoreError};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

const READ_CHUNK: usize = 4096;

/// One request/response connection over any byte stream (TCP, TLS, in-memory)
pub struct RespConnection<S> {
    stream: S,
    read_buf: BytesMut,
    write_buf: BytesMut,
}

impl<S> RespConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            read_buf: BytesMut::with_capacity(READ_CHUNK),
            write_buf: BytesMut::with_capacity(READ_CHUNK),
        }
    }

    async fn send(&mut self, command: &Command) -> Result<(), StoreError> {
        self.write_buf.clear();
        encode_command(command, &mut self.write_buf);
        self.stream.write_all(&self.write_buf).await?;
        self.stream.flush().await?;
        Ok(())
    }

    async fn read_reply(&mut self) -> Result<Reply, StoreError> {
        loop {
            if let Some(reply) = decode_reply(&mut self.read_buf)? {
                return Ok(reply);
            }
            self.read_buf.reserve(READ_CHUNK);
            if self.stream.read_buf(&mut self.read_buf).await? == 0 {
                return Err(StoreError::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "connection closed by store",
                )));
            }
        }
    }
}

#[async_trait]
impl<S> StoreConnection for RespConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn execute(&mut self, command: Command) -> Result<Reply, StoreError> {
        self.send(&command).await?;
        match self.read_reply().await? {
            Reply::Error(message) => Err(StoreError::Server(message)),
            reply => Ok(reply),
        }
    }

    async fn close(&mut self) {
        let _ = self.stream.shutdown().await;
    }
}
