//! 属性值（Attribute Value）
//!
//! CloudEvents 类型系统中的标量取值：布尔、32 位整数、字符串、字节序列、
//! URI、URI-reference 与时间戳。每种取值都有规范字符串形式，
//! 二进制模式的传输（如请求头）只能携带字符串，因此比较也以规范字符串为准。
//!
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt;

use crate::error::{EventError, EventResult};

/// 属性/扩展属性取值
#[derive(Debug, Clone)]
pub enum AttributeValue {
    Bool(bool),
    Integer(i32),
    String(String),
    Binary(Bytes),
    Uri(String),
    UriRef(String),
    Timestamp(DateTime<Utc>),
}

impl AttributeValue {
    /// 类型名称（用于错误信息）
    pub fn type_name(&self) -> &'static str {
        match self {
            AttributeValue::Bool(_) => "Boolean",
            AttributeValue::Integer(_) => "Integer",
            AttributeValue::String(_) => "String",
            AttributeValue::Binary(_) => "Binary",
            AttributeValue::Uri(_) => "URI",
            AttributeValue::UriRef(_) => "URI-reference",
            AttributeValue::Timestamp(_) => "Timestamp",
        }
    }

    /// 规范字符串形式
    pub fn to_canonical_string(&self) -> String {
        match self {
            AttributeValue::Bool(b) => b.to_string(),
            AttributeValue::Integer(i) => i.to_string(),
            AttributeValue::String(s) | AttributeValue::Uri(s) | AttributeValue::UriRef(s) => {
                s.clone()
            }
            AttributeValue::Binary(b) => STANDARD.encode(b),
            AttributeValue::Timestamp(t) => format_timestamp(t),
        }
    }

    /// 字符串类取值的借用视图
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) | AttributeValue::Uri(s) | AttributeValue::UriRef(s) => {
                Some(s)
            }
            _ => None,
        }
    }

    /// 解释为时间戳：时间戳原样返回，字符串按 RFC 3339 解析
    pub fn to_timestamp(&self) -> EventResult<DateTime<Utc>> {
        match self {
            AttributeValue::Timestamp(t) => Ok(*t),
            AttributeValue::String(s) => parse_timestamp(s),
            other => Err(EventError::Parse {
                reason: format!("cannot convert {} to Timestamp", other.type_name()),
            }),
        }
    }

    /// 从 JSON 值构造扩展属性取值；不支持的类型在设置时即被拒绝
    pub fn from_json(name: &str, value: &serde_json::Value) -> EventResult<Self> {
        use serde_json::Value;

        match value {
            Value::Bool(b) => Ok(AttributeValue::Bool(*b)),
            Value::String(s) => Ok(AttributeValue::String(s.clone())),
            Value::Number(n) => n
                .as_i64()
                .and_then(|i| i32::try_from(i).ok())
                .map(AttributeValue::Integer)
                .ok_or_else(|| EventError::UnsupportedExtensionType {
                    name: name.to_string(),
                    found: format!("number {n}"),
                }),
            Value::Null => Err(unsupported(name, "null")),
            Value::Array(_) => Err(unsupported(name, "array")),
            Value::Object(_) => Err(unsupported(name, "object")),
        }
    }

    /// JSON 表示：布尔与整数保持原生类型，其余使用规范字符串
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            AttributeValue::Bool(b) => serde_json::Value::Bool(*b),
            AttributeValue::Integer(i) => serde_json::Value::from(*i),
            other => serde_json::Value::String(other.to_canonical_string()),
        }
    }
}

fn unsupported(name: &str, found: &str) -> EventError {
    EventError::UnsupportedExtensionType {
        name: name.to_string(),
        found: found.to_string(),
    }
}

impl PartialEq for AttributeValue {
    fn eq(&self, other: &Self) -> bool {
        self.to_canonical_string() == other.to_canonical_string()
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_canonical_string())
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        AttributeValue::Integer(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(value)
    }
}

impl From<Bytes> for AttributeValue {
    fn from(value: Bytes) -> Self {
        AttributeValue::Binary(value)
    }
}

impl From<Vec<u8>> for AttributeValue {
    fn from(value: Vec<u8>) -> Self {
        AttributeValue::Binary(Bytes::from(value))
    }
}

impl From<DateTime<Utc>> for AttributeValue {
    fn from(value: DateTime<Utc>) -> Self {
        AttributeValue::Timestamp(value)
    }
}

/// RFC 3339 时间戳（UTC，`Z` 结尾，保留亚秒精度）
pub fn format_timestamp(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

pub fn parse_timestamp(s: &str) -> EventResult<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc))
}

/// 绝对 URI：`scheme ":" ...`，scheme 以字母开头，整体不含空白
pub fn is_absolute_uri(s: &str) -> bool {
    if s.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((scheme, _)) = s.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}
