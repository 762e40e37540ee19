//! Owned reply values returned by arbitrary commands.

use fred::types::Value;
use serde::Serialize;

/// A command reply, detached from the client library's value type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Reply {
    Nil,
    Text(String),
    Integer(i64),
    Double(f64),
    Boolean(bool),
    Bytes(Vec<u8>),
    Array(Vec<Reply>),
}

impl Reply {
    /// Borrow the reply as text when it is a string or UTF-8 bytes.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Reply::Text(s) => Some(s),
            Reply::Bytes(b) => std::str::from_utf8(b).ok(),
            _ => None,
        }
    }

    fn write_indented(&self, f: &mut std::fmt::Formatter<'_>, depth: usize) -> std::fmt::Result {
        match self {
            Reply::Array(items) if items.is_empty() => write!(f, "(empty array)"),
            Reply::Array(items) => {
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        writeln!(f)?;
                        write!(f, "{:width$}", "", width = depth * 3)?;
                    }
                    write!(f, "{}) ", idx + 1)?;
                    item.write_indented(f, depth + 1)?;
                }
                Ok(())
            }
            Reply::Nil => write!(f, "(nil)"),
            Reply::Text(s) => write!(f, "{}", s),
            Reply::Integer(i) => write!(f, "(integer) {}", i),
            Reply::Double(d) => write!(f, "(double) {}", d),
            Reply::Boolean(b) => write!(f, "(boolean) {}", b),
            Reply::Bytes(b) => write!(f, "{}", String::from_utf8_lossy(b)),
        }
    }
}

impl std::fmt::Display for Reply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.write_indented(f, 0)
    }
}

impl From<Value> for Reply {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Reply::Nil,
            Value::String(s) => Reply::Text(s.to_string()),
            Value::Integer(i) => Reply::Integer(i),
            Value::Double(d) => Reply::Double(d),
            Value::Boolean(b) => Reply::Boolean(b),
            Value::Bytes(b) => Reply::Bytes(b.to_vec()),
            Value::Array(items) => Reply::Array(items.into_iter().map(Reply::from).collect()),
            other => Reply::Text(format!("{:?}", other)),
        }
    }
}

impl From<&str> for Reply {
    fn from(s: &str) -> Self {
        Reply::Text(s.to_string())
    }
}
