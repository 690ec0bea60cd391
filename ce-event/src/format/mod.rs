//! 结构化格式（Structured Format）
//!
//! 结构化模式下整个事件（属性 + 载荷）是一个自描述的字节块，由媒体类型标识
//! （如 `application/cloudevents+json`）。`Formats` 按媒体类型查找对应的编解码实现，
//! 绑定层在假定 JSON 之前先查询这里。
//!
mod json;

pub use json::{JSON_MEDIA_TYPE, JsonFormat};

use bytes::Bytes;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::codec::media_type;
use crate::error::{EventError, EventResult};
use crate::event::Event;
use crate::spec::Versions;

/// 结构化事件格式
pub trait Format: Send + Sync + fmt::Debug {
    /// 媒体类型（小写，不含参数）
    fn media_type(&self) -> &str;

    /// 编码为结构化字节块
    fn marshal(&self, event: &Event) -> EventResult<Bytes>;

    /// 从结构化字节块解码；必填属性允许为空，由最终落地方校验
    fn unmarshal(&self, bytes: &[u8]) -> EventResult<Event>;
}

/// 媒体类型 → 结构化格式 注册表
#[derive(Clone, Debug)]
pub struct Formats {
    by_media_type: HashMap<String, Arc<dyn Format>>,
    default_format: Arc<dyn Format>,
}

impl Formats {
    /// 仅含 JSON 格式的注册表
    pub fn new(versions: Arc<Versions>) -> Self {
        let json: Arc<dyn Format> = Arc::new(JsonFormat::new(versions));
        Self {
            by_media_type: HashMap::from([(json.media_type().to_string(), json.clone())]),
            default_format: json,
        }
    }

    pub fn with_format(mut self, format: Arc<dyn Format>) -> Self {
        self.by_media_type
            .insert(format.media_type().to_ascii_lowercase(), format);
        self
    }

    /// 按内容类型查找格式，忽略参数与大小写
    pub fn lookup(&self, content_type: &str) -> Option<Arc<dyn Format>> {
        self.by_media_type.get(&media_type(content_type)).cloned()
    }

    pub fn require(&self, content_type: &str) -> EventResult<Arc<dyn Format>> {
        self.lookup(content_type)
            .ok_or_else(|| EventError::UnknownFormat {
                media_type: content_type.to_string(),
            })
    }

    /// 内容类型是否声明了结构化模式
    pub fn is_structured(&self, content_type: &str) -> bool {
        self.lookup(content_type).is_some()
    }

    /// 未指定格式时使用的格式（JSON）
    pub fn default_format(&self) -> Arc<dyn Format> {
        self.default_format.clone()
    }
}
