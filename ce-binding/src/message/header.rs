//! 请求头 + 消息体 形态的消息（HTTP 一类传输的原生形态）
//!
//! - 二进制模式：上下文属性与扩展属性以 `ce-` 前缀的请求头承载，
//!   `datacontenttype` 使用 `content-type`，载荷为消息体；
//! - 结构化模式：`content-type` 为已注册的结构化格式，消息体为完整事件。
//!
use async_trait::async_trait;
use bytes::Bytes;
use ce_event::error::EventError;
use ce_event::format::Format;
use ce_event::{Attribute, AttributeKind, AttributeValue, Registry, SpecVersion};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::{Message, ensure_active};
use crate::encoder::{BinaryEncoder, Encoder, StructuredEncoder};
use crate::encoding::Encoding;
use crate::error::{BindingError, BindingResult};

pub const HEADER_PREFIX: &str = "ce-";
pub const CONTENT_TYPE: &str = "content-type";

fn header_name(name: &str) -> String {
    format!("{HEADER_PREFIX}{}", name.to_ascii_lowercase())
}

fn ce_header<'a>(headers: &'a BTreeMap<String, String>, name: &str) -> Option<&'a str> {
    headers.get(&header_name(name)).map(String::as_str)
}

/// 收到的请求头 + 消息体；只能读取一次
#[derive(Debug)]
pub struct HeaderMessage {
    registry: Arc<Registry>,
    headers: BTreeMap<String, String>,
    body: Option<Bytes>,
    encoding: Encoding,
}

impl HeaderMessage {
    /// 请求头名称统一转为小写
    pub fn new<I, K, V>(registry: Arc<Registry>, headers: I, body: impl Into<Bytes>) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let headers: BTreeMap<String, String> = headers
            .into_iter()
            .map(|(k, v)| (k.as_ref().trim().to_ascii_lowercase(), v.into()))
            .collect();
        let encoding = Self::detect_encoding(&registry, &headers);

        Self {
            registry,
            headers,
            body: Some(body.into()),
            encoding,
        }
    }

    fn detect_encoding(registry: &Registry, headers: &BTreeMap<String, String>) -> Encoding {
        if headers
            .get(CONTENT_TYPE)
            .is_some_and(|ct| registry.formats().is_structured(ct))
        {
            return Encoding::Structured;
        }
        if registry
            .versions()
            .detect(|name| ce_header(headers, name))
            .is_ok()
        {
            return Encoding::Binary;
        }
        Encoding::Unknown
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }
}

#[async_trait]
impl Message for HeaderMessage {
    fn encoding(&self) -> Encoding {
        self.encoding
    }

    async fn structured(
        &mut self,
        ctx: &CancellationToken,
        encoder: &mut dyn StructuredEncoder,
    ) -> BindingResult<()> {
        if self.encoding != Encoding::Structured {
            return Err(BindingError::NotStructured);
        }
        ensure_active(ctx)?;
        let content_type = self.headers.get(CONTENT_TYPE).map(String::as_str).unwrap_or_default();
        let format = self.registry.formats().require(content_type)?;
        let body = self.body.take().ok_or(BindingError::AlreadyConsumed)?;
        encoder.set_structured_event(format, body)
    }

    async fn binary(
        &mut self,
        ctx: &CancellationToken,
        encoder: &mut dyn BinaryEncoder,
    ) -> BindingResult<()> {
        if self.encoding != Encoding::Binary {
            return Err(BindingError::NotBinary);
        }
        ensure_active(ctx)?;
        let body = self.body.take().ok_or(BindingError::AlreadyConsumed)?;
        let version = self
            .registry
            .versions()
            .detect(|name| ce_header(&self.headers, name))?;

        if let Some(attr) = version.attribute_from_kind(AttributeKind::SpecVersion) {
            encoder.set_attribute(attr, AttributeValue::String(version.as_str().to_string()))?;
        }

        for (name, value) in &self.headers {
            let Some(name) = name.strip_prefix(HEADER_PREFIX) else {
                continue;
            };
            match version.attribute(name) {
                Some(attr)
                    if matches!(
                        attr.kind(),
                        AttributeKind::SpecVersion | AttributeKind::DataContentType
                    ) => {}
                // 必填属性为空时不写出，由最终落地方校验
                Some(attr) if value.is_empty() && attr.kind().is_required() => {}
                Some(attr) => encoder.set_attribute(attr, AttributeValue::String(value.clone()))?,
                None => encoder.set_extension(name, AttributeValue::String(value.clone()))?,
            }
        }

        if let Some(content_type) = self.headers.get(CONTENT_TYPE)
            && let Some(attr) = version.attribute_from_kind(AttributeKind::DataContentType)
        {
            encoder.set_attribute(attr, AttributeValue::String(content_type.clone()))?;
        }
        if !body.is_empty() {
            encoder.set_data(body)?;
        }
        encoder.end()
    }
}

/// 写出请求头 + 消息体的目标编码器
#[derive(Debug)]
pub struct HeaderEncoder {
    registry: Arc<Registry>,
    structured_only: bool,
    headers: BTreeMap<String, String>,
    body: Bytes,
    version: Option<SpecVersion>,
}

impl HeaderEncoder {
    /// 同时接受结构化与二进制写入，沿用消息的原生模式
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            structured_only: false,
            headers: BTreeMap::new(),
            body: Bytes::new(),
            version: None,
        }
    }

    /// 只接受结构化写入；非结构化消息经事件路径以默认格式编码
    pub fn structured(registry: Arc<Registry>) -> Self {
        Self {
            structured_only: true,
            ..Self::new(registry)
        }
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn into_parts(self) -> (BTreeMap<String, String>, Bytes) {
        (self.headers, self.body)
    }

    /// 把写出的请求头与消息体作为收到的消息重新读取
    pub fn into_message(self) -> HeaderMessage {
        HeaderMessage::new(self.registry, self.headers, self.body)
    }
}

impl StructuredEncoder for HeaderEncoder {
    fn set_structured_event(&mut self, format: Arc<dyn Format>, event: Bytes) -> BindingResult<()> {
        self.headers
            .insert(CONTENT_TYPE.to_string(), format.media_type().to_string());
        self.body = event;
        Ok(())
    }
}

impl BinaryEncoder for HeaderEncoder {
    fn set_attribute(&mut self, attribute: Attribute, value: AttributeValue) -> BindingResult<()> {
        let name = match attribute.kind() {
            AttributeKind::DataContentType => CONTENT_TYPE.to_string(),
            AttributeKind::SpecVersion => {
                self.version = Some(attribute.version());
                header_name(attribute.name())
            }
            _ => header_name(attribute.name()),
        };
        self.headers.insert(name, value.to_canonical_string());
        Ok(())
    }

    fn set_extension(&mut self, name: &str, value: AttributeValue) -> BindingResult<()> {
        self.headers
            .insert(header_name(name), value.to_canonical_string());
        Ok(())
    }

    fn set_data(&mut self, data: Bytes) -> BindingResult<()> {
        self.body = data;
        Ok(())
    }

    fn end(&mut self) -> BindingResult<()> {
        let version = self.version.ok_or_else(|| EventError::missing("specversion"))?;
        for kind in [AttributeKind::Id, AttributeKind::Source, AttributeKind::Type] {
            let Some(attr) = version.attribute(kind) else {
                continue;
            };
            if ce_header(&self.headers, attr.name()).is_none_or(str::is_empty) {
                return Err(EventError::missing(attr.name()).into());
            }
        }
        Ok(())
    }
}

impl Encoder for HeaderEncoder {
    fn as_structured(&mut self) -> Option<&mut dyn StructuredEncoder> {
        Some(self)
    }

    fn as_binary(&mut self) -> Option<&mut dyn BinaryEncoder> {
        if self.structured_only {
            return None;
        }
        Some(self)
    }

    fn preferred_format(&self) -> Option<Arc<dyn Format>> {
        Some(self.registry.formats().default_format())
    }
}
