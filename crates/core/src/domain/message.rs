// Job Message Domain Model

use serde_json::Value;

/// A raw job payload pulled off a queue.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    raw: String,
    body: Value,
}

impl Message {
    /// Parse a JSON job payload
    pub fn parse(raw: impl Into<String>) -> Result<Self, serde_json::Error> {
        let raw = raw.into();
        let body = serde_json::from_str(&raw)?;
        Ok(Self { raw, body })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    /// Job identifier (`jid`), if the payload carries one
    pub fn jid(&self) -> Option<&str> {
        self.body.get("jid").and_then(Value::as_str)
    }
}
