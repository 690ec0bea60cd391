//! 载荷编解码（Data Codec）
//!
//! 载荷的解释由 `datacontenttype` 决定；按内容类型选择编解码器，
//! 将 JSON 值与载荷字节互相转换。
//!
use bytes::Bytes;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::error::{EventError, EventResult};

pub const APPLICATION_JSON: &str = "application/json";
pub const TEXT_PLAIN: &str = "text/plain";

/// 去掉参数并转小写的媒体类型（`Application/JSON; charset=utf-8` → `application/json`）
pub fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// JSON 兼容的内容类型：`application/json`、`text/json` 与 `*+json`
pub fn is_json(content_type: &str) -> bool {
    let essence = media_type(content_type);
    essence == APPLICATION_JSON || essence == "text/json" || essence.ends_with("+json")
}

/// 文本内容类型：`text/*`
pub fn is_text(content_type: &str) -> bool {
    media_type(content_type).starts_with("text/")
}

/// 按内容类型编解码载荷
pub trait DataCodec: Send + Sync {
    fn accepts(&self, content_type: &str) -> bool;

    fn encode(&self, value: &Value) -> EventResult<Bytes>;

    fn decode(&self, data: &[u8]) -> EventResult<Value>;
}

pub struct JsonCodec;

impl DataCodec for JsonCodec {
    fn accepts(&self, content_type: &str) -> bool {
        is_json(content_type)
    }

    fn encode(&self, value: &Value) -> EventResult<Bytes> {
        Ok(Bytes::from(serde_json::to_vec(value)?))
    }

    fn decode(&self, data: &[u8]) -> EventResult<Value> {
        Ok(serde_json::from_slice(data)?)
    }
}

/// `text/*`：仅接受字符串值
pub struct TextCodec;

impl DataCodec for TextCodec {
    fn accepts(&self, content_type: &str) -> bool {
        is_text(content_type)
    }

    fn encode(&self, value: &Value) -> EventResult<Bytes> {
        match value {
            Value::String(s) => Ok(Bytes::from(s.clone())),
            other => Err(EventError::Codec {
                content_type: TEXT_PLAIN.to_string(),
                reason: format!("expected a string, found {other}"),
            }),
        }
    }

    fn decode(&self, data: &[u8]) -> EventResult<Value> {
        let text = std::str::from_utf8(data).map_err(|e| EventError::Codec {
            content_type: TEXT_PLAIN.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Value::String(text.to_string()))
    }
}

/// 编解码器集合，后注册者优先匹配内容类型
#[derive(Clone)]
pub struct DataCodecs {
    codecs: Vec<Arc<dyn DataCodec>>,
}

impl fmt::Debug for DataCodecs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataCodecs")
            .field("codecs", &self.codecs.len())
            .finish()
    }
}

impl Default for DataCodecs {
    fn default() -> Self {
        Self {
            codecs: vec![Arc::new(JsonCodec), Arc::new(TextCodec)],
        }
    }
}

impl DataCodecs {
    pub fn with_codec(mut self, codec: Arc<dyn DataCodec>) -> Self {
        self.codecs.insert(0, codec);
        self
    }

    pub fn lookup(&self, content_type: &str) -> EventResult<&Arc<dyn DataCodec>> {
        self.codecs
            .iter()
            .find(|c| c.accepts(content_type))
            .ok_or_else(|| EventError::Codec {
                content_type: content_type.to_string(),
                reason: "no codec registered".to_string(),
            })
    }

    pub fn encode(&self, content_type: &str, value: &Value) -> EventResult<Bytes> {
        self.lookup(content_type)?.encode(value)
    }

    pub fn decode(&self, content_type: &str, data: &[u8]) -> EventResult<Value> {
        self.lookup(content_type)?.decode(data)
    }
}
