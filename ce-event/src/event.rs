//! 事件（Event）
//!
//! 带版本标记的通用事件表示：必填属性 `id/source/type`、可选属性、
//! 有序的扩展属性集合，以及按 `datacontenttype` 解释的不透明载荷。
//!
//! 传输途中的事件允许必填属性暂为空（例如等待转换器补齐 `id`），
//! 在最终落地前通过 [`Event::validate`] 校验。
//!
use bon::bon;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::codec::{APPLICATION_JSON, DataCodecs};
use crate::error::{EventError, EventResult};
use crate::spec::{AttributeKind, SUBJECT_EXTENSION, SpecVersion};
use crate::value::{AttributeValue, is_absolute_uri};

/// 与版本无关的事件表示
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub(crate) specversion: SpecVersion,
    pub(crate) id: String,
    pub(crate) source: String,
    pub(crate) ty: String,
    pub(crate) time: Option<DateTime<Utc>>,
    pub(crate) subject: Option<String>,
    pub(crate) dataschema: Option<String>,
    pub(crate) datacontenttype: Option<String>,
    pub(crate) extensions: BTreeMap<String, AttributeValue>,
    pub(crate) data: Option<Bytes>,
}

/// 任何版本下都不能用作扩展属性的名称
const RESERVED_NAMES: &[&str] = &["data", "data_base64", "datacontentencoding", "extensions"];

#[bon]
impl Event {
    /// 构建事件；`subject` 仅在 0.3 及之后的版本可用
    #[builder]
    pub fn new(
        #[builder(default = SpecVersion::V10)] specversion: SpecVersion,
        #[builder(into)] id: String,
        #[builder(into)] source: String,
        #[builder(into)] ty: String,
        time: Option<DateTime<Utc>>,
        #[builder(into)] subject: Option<String>,
        #[builder(into)] dataschema: Option<String>,
        #[builder(into)] datacontenttype: Option<String>,
        #[builder(into)] data: Option<Bytes>,
    ) -> EventResult<Self> {
        if subject.is_some() && !specversion.has(AttributeKind::Subject) {
            return Err(EventError::AttributeNotInVersion {
                kind: AttributeKind::Subject,
                version: specversion,
            });
        }
        if let Some(schema) = &dataschema
            && !is_absolute_uri(schema)
        {
            return Err(EventError::invalid(
                "dataschema",
                format!("not an absolute URI: {schema:?}"),
            ));
        }

        Ok(Self {
            specversion,
            id,
            source,
            ty,
            time,
            subject,
            dataschema,
            datacontenttype,
            extensions: BTreeMap::new(),
            data,
        })
    }
}

impl Event {
    /// 空事件：必填属性为空，需在校验前补齐
    pub fn empty(specversion: SpecVersion) -> Self {
        Self {
            specversion,
            id: String::new(),
            source: String::new(),
            ty: String::new(),
            time: None,
            subject: None,
            dataschema: None,
            datacontenttype: None,
            extensions: BTreeMap::new(),
            data: None,
        }
    }

    pub fn specversion(&self) -> SpecVersion {
        self.specversion
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn ty(&self) -> &str {
        &self.ty
    }

    pub fn time(&self) -> Option<DateTime<Utc>> {
        self.time
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    pub fn dataschema(&self) -> Option<&str> {
        self.dataschema.as_deref()
    }

    pub fn datacontenttype(&self) -> Option<&str> {
        self.datacontenttype.as_deref()
    }

    pub fn data(&self) -> Option<&Bytes> {
        self.data.as_ref()
    }

    pub fn extensions(&self) -> &BTreeMap<String, AttributeValue> {
        &self.extensions
    }

    /// 按名称读取扩展属性（名称不区分大小写）
    pub fn extension(&self, name: &str) -> Option<&AttributeValue> {
        self.extensions.get(&name.to_ascii_lowercase())
    }

    pub fn set_id(&mut self, id: impl Into<String>) -> EventResult<()> {
        self.set_kind(AttributeKind::Id, AttributeValue::String(id.into()))
    }

    pub fn set_source(&mut self, source: impl Into<String>) -> EventResult<()> {
        self.set_kind(AttributeKind::Source, AttributeValue::UriRef(source.into()))
    }

    pub fn set_type(&mut self, ty: impl Into<String>) -> EventResult<()> {
        self.set_kind(AttributeKind::Type, AttributeValue::String(ty.into()))
    }

    pub fn set_time(&mut self, time: DateTime<Utc>) -> EventResult<()> {
        self.set_kind(AttributeKind::Time, AttributeValue::Timestamp(time))
    }

    pub fn set_subject(&mut self, subject: impl Into<String>) -> EventResult<()> {
        self.set_kind(AttributeKind::Subject, AttributeValue::String(subject.into()))
    }

    fn set_kind(&mut self, kind: AttributeKind, value: AttributeValue) -> EventResult<()> {
        let attribute =
            self.specversion
                .attribute(kind)
                .ok_or(EventError::AttributeNotInVersion {
                    kind,
                    version: self.specversion,
                })?;
        attribute.set(self, value)
    }

    /// 设置扩展属性：名称统一转为小写，仅允许 ASCII 字母与数字，
    /// 且不得与任一版本的上下文属性重名（转换版本后仍不会遮蔽属性）。
    /// 唯一例外是不支持 `subject` 的版本中降级而来的 `subject` 扩展。
    pub fn set_extension(
        &mut self,
        name: &str,
        value: impl Into<AttributeValue>,
    ) -> EventResult<()> {
        let name = self.extension_name(name)?;
        self.extensions.insert(name, value.into());
        Ok(())
    }

    /// 以 JSON 值设置扩展属性；浮点、数组、对象与 null 在此处即被拒绝
    pub fn set_extension_json(&mut self, name: &str, value: &serde_json::Value) -> EventResult<()> {
        let value = AttributeValue::from_json(name, value)?;
        self.set_extension(name, value)
    }

    pub fn remove_extension(&mut self, name: &str) -> Option<AttributeValue> {
        self.extensions.remove(&name.to_ascii_lowercase())
    }

    fn extension_name(&self, name: &str) -> EventResult<String> {
        let normalized = name.to_ascii_lowercase();
        let demoted_subject =
            normalized == SUBJECT_EXTENSION && !self.specversion.has(AttributeKind::Subject);
        let reserved = RESERVED_NAMES.contains(&normalized.as_str())
            || (!demoted_subject && SpecVersion::is_context_attribute(&normalized));

        if normalized.is_empty()
            || reserved
            || !normalized.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(EventError::InvalidExtensionName {
                name: name.to_string(),
            });
        }
        Ok(normalized)
    }

    /// 设置载荷与其内容类型
    pub fn set_data(&mut self, datacontenttype: Option<&str>, data: impl Into<Bytes>) {
        if let Some(ct) = datacontenttype {
            self.datacontenttype = Some(ct.to_string());
        }
        self.data = Some(data.into());
    }

    pub fn take_data(&mut self) -> Option<Bytes> {
        self.data.take()
    }

    /// 以 JSON 值设置载荷，按内容类型从 `codecs` 选取编解码器（缺省为 `application/json`）
    pub fn set_data_json(
        &mut self,
        codecs: &DataCodecs,
        datacontenttype: Option<&str>,
        value: &serde_json::Value,
    ) -> EventResult<()> {
        let content_type = datacontenttype
            .or(self.datacontenttype.as_deref())
            .unwrap_or(APPLICATION_JSON)
            .to_string();
        let bytes = codecs.encode(&content_type, value)?;
        self.datacontenttype = Some(content_type);
        self.data = Some(bytes);
        Ok(())
    }

    /// 按内容类型把载荷解码为 JSON 值；无载荷时返回 `None`
    pub fn data_json(&self, codecs: &DataCodecs) -> EventResult<Option<serde_json::Value>> {
        let Some(data) = &self.data else {
            return Ok(None);
        };
        let content_type = self.datacontenttype.as_deref().unwrap_or(APPLICATION_JSON);
        codecs.decode(content_type, data).map(Some)
    }

    /// 校验必填属性：`id`、`source`、`type` 不可为空
    pub fn validate(&self) -> EventResult<()> {
        for kind in [AttributeKind::Id, AttributeKind::Source, AttributeKind::Type] {
            if let Some(attribute) = self.specversion.attribute(kind)
                && attribute.get(self).is_none()
            {
                return Err(EventError::missing(attribute.name()));
            }
        }
        Ok(())
    }
}
