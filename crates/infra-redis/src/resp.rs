//! RESP wire codec
//!
//! Commands go out as arrays of bulk strings. Replies are decoded
//! incrementally: an incomplete buffer yields `Ok(None)` and is left untouched.

use bytes::{Buf, BufMut, BytesMut};
use taskforge_core::domain::{Command, Reply};
use taskforge_core::port::StoreError;

/// Largest bulk string accepted from the store (512 MiB, the server's own cap)
pub const MAX_BULK_LEN: i64 = 512 * 1024 * 1024;

/// Deepest array nesting accepted in a reply
pub const MAX_NESTING: usize = 32;

const CRLF: &[u8] = b"\r\n";

/// Encode a command as a RESP array of bulk strings
pub fn encode_command(command: &Command, buf: &mut BytesMut) {
    put_header(buf, b'*', (command.args().len() + 1) as i64);
    put_bulk(buf, command.name().as_bytes());
    for arg in command.args() {
        put_bulk(buf, arg);
    }
}

/// Encode a reply (server side; used by test servers)
pub fn encode_reply(reply: &Reply, buf: &mut BytesMut) {
    match reply {
        Reply::Simple(s) => put_line(buf, b'+', s.as_bytes()),
        Reply::Error(e) => put_line(buf, b'-', e.as_bytes()),
        Reply::Integer(n) => put_header(buf, b':', *n),
        Reply::Bulk(b) => put_bulk(buf, b),
        Reply::Nil => put_header(buf, b'$', -1),
        Reply::Array(items) => {
            put_header(buf, b'*', items.len() as i64);
            for item in items {
                encode_reply(item, buf);
            }
        }
    }
}

/// Decode one reply from the front of `buf`, consuming it on success
pub fn decode_reply(buf: &mut BytesMut) -> Result<Option<Reply>, StoreError> {
    match parse(&buf[..], 0, 0)? {
        Some((reply, consumed)) => {
            buf.advance(consumed);
            Ok(Some(reply))
        }
        None => Ok(None),
    }
}

fn put_line(buf: &mut BytesMut, prefix: u8, line: &[u8]) {
    buf.put_u8(prefix);
    buf.put_slice(line);
    buf.put_slice(CRLF);
}

fn put_header(buf: &mut BytesMut, prefix: u8, n: i64) {
    put_line(buf, prefix, n.to_string().as_bytes());
}

fn put_bulk(buf: &mut BytesMut, data: &[u8]) {
    put_header(buf, b'$', data.len() as i64);
    buf.put_slice(data);
    buf.put_slice(CRLF);
}

fn protocol(msg: impl Into<String>) -> StoreError {
    StoreError::Protocol(msg.into())
}

/// Parse one value starting at `pos`; returns the value and the offset past it
fn parse(buf: &[u8], pos: usize, depth: usize) -> Result<Option<(Reply, usize)>, StoreError> {
    let Some(&prefix) = buf.get(pos) else {
        return Ok(None);
    };
    let Some((line, next)) = read_line(buf, pos + 1) else {
        return Ok(None);
    };

    match prefix {
        b'+' => Ok(Some((Reply::Simple(utf8(line)?), next))),
        b'-' => Ok(Some((Reply::Error(utf8(line)?), next))),
        b':' => Ok(Some((Reply::Integer(parse_int(line)?), next))),
        b'$' => {
            let len = parse_int(line)?;
            if len < 0 {
                return Ok(Some((Reply::Nil, next)));
            }
            if len > MAX_BULK_LEN {
                return Err(protocol(format!("bulk string too long: {}", len)));
            }
            let end = next + len as usize;
            if buf.len() < end + CRLF.len() {
                return Ok(None);
            }
            if &buf[end..end + CRLF.len()] != CRLF {
                return Err(protocol("bulk string not terminated by CRLF"));
            }
            Ok(Some((Reply::Bulk(buf[next..end].to_vec()), end + CRLF.len())))
        }
        b'*' => {
            let count = parse_int(line)?;
            if count < 0 {
                return Ok(Some((Reply::Nil, next)));
            }
            if depth >= MAX_NESTING {
                return Err(protocol(format!("reply nested deeper than {}", MAX_NESTING)));
            }
            let mut items = Vec::with_capacity(count.min(64) as usize);
            let mut cursor = next;
            for _ in 0..count {
                match parse(buf, cursor, depth + 1)? {
                    Some((item, after)) => {
                        items.push(item);
                        cursor = after;
                    }
                    None => return Ok(None),
                }
            }
            Ok(Some((Reply::Array(items), cursor)))
        }
        other => Err(protocol(format!(
            "unexpected reply prefix {:?}",
            other as char
        ))),
    }
}

fn read_line(buf: &[u8], start: usize) -> Option<(&[u8], usize)> {
    let rest = buf.get(start..)?;
    let idx = rest.windows(CRLF.len()).position(|w| w == CRLF)?;
    Some((&rest[..idx], start + idx + CRLF.len()))
}

fn utf8(line: &[u8]) -> Result<String, StoreError> {
    String::from_utf8(line.to_vec()).map_err(|_| protocol("reply line is not valid UTF-8"))
}

fn parse_int(line: &[u8]) -> Result<i64, StoreError> {
    std::str::from_utf8(line)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| protocol(format!("invalid integer: {:?}", String::from_utf8_lossy(line))))
}
