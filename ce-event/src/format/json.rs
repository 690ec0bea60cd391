use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use serde_json::value::RawValue;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::Format;
use crate::codec::{is_json, is_text};
use crate::error::{EventError, EventResult};
use crate::event::Event;
use crate::spec::{AttributeKind, SpecVersion, Versions};
use crate::value::AttributeValue;

pub const JSON_MEDIA_TYPE: &str = "application/cloudevents+json";

const DATA: &str = "data";
const DATA_BASE64: &str = "data_base64";
const DATA_CONTENT_ENCODING: &str = "datacontentencoding";
const EXTENSIONS: &str = "extensions";
const BASE64: &str = "base64";

/// `application/cloudevents+json`
///
/// - 0.1：扩展属性嵌套在 `extensions` 对象中；
/// - 0.2 / 0.3 / 1.0：扩展属性位于顶层；
/// - JSON 载荷原样嵌入 `data`，文本载荷为字符串；
/// - 二进制载荷：1.0 用 `data_base64`，0.3 用 `datacontentencoding: base64`，
///   更早的版本没有标记，内容类型既非 JSON 也非文本时 `data` 一律为 base64 字符串。
#[derive(Debug, Clone)]
pub struct JsonFormat {
    versions: Arc<Versions>,
}

impl JsonFormat {
    pub fn new(versions: Arc<Versions>) -> Self {
        Self { versions }
    }
}

enum DataField {
    Raw(Box<RawValue>),
    Text(String),
    Base64(String),
}

struct JsonEvent {
    attributes: Vec<(String, Value)>,
    nested_extensions: Option<BTreeMap<String, Value>>,
    data: Option<(&'static str, DataField)>,
}

impl Serialize for JsonEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (name, value) in &self.attributes {
            map.serialize_entry(name, value)?;
        }
        if let Some(extensions) = &self.nested_extensions {
            map.serialize_entry(EXTENSIONS, extensions)?;
        }
        if let Some((key, data)) = &self.data {
            match data {
                DataField::Raw(raw) => map.serialize_entry(key, raw)?,
                DataField::Text(text) | DataField::Base64(text) => map.serialize_entry(key, text)?,
            }
        }
        map.end()
    }
}

impl JsonFormat {
    /// 0.1 / 0.2 中以 base64 字符串承载的载荷
    fn legacy_binary(event: &Event) -> bool {
        matches!(event.specversion(), SpecVersion::V01 | SpecVersion::V02)
            && event
                .datacontenttype()
                .is_some_and(|ct| !is_json(ct) && !is_text(ct))
    }

    fn data_field(event: &Event) -> Option<(&'static str, DataField, bool)> {
        let data = event.data()?;
        let json_payload = event.datacontenttype().is_none_or(is_json);

        if !Self::legacy_binary(event)
            && let Ok(text) = std::str::from_utf8(data)
        {
            if json_payload && let Ok(raw) = RawValue::from_string(text.to_string()) {
                return Some((DATA, DataField::Raw(raw), false));
            }
            if !json_payload {
                return Some((DATA, DataField::Text(text.to_string()), false));
            }
        }

        let encoded = STANDARD.encode(data);
        match event.specversion() {
            SpecVersion::V10 => Some((DATA_BASE64, DataField::Base64(encoded), false)),
            SpecVersion::V03 => Some((DATA, DataField::Base64(encoded), true)),
            SpecVersion::V01 | SpecVersion::V02 => Some((DATA, DataField::Base64(encoded), false)),
        }
    }

    fn decode_data(
        event: &mut Event,
        map: &BTreeMap<String, Box<RawValue>>,
        base64_encoded: bool,
    ) -> EventResult<()> {
        if let Some(raw) = map.get(DATA_BASE64) {
            let encoded: String = serde_json::from_str(raw.get())?;
            event.data = Some(Bytes::from(STANDARD.decode(encoded)?));
            return Ok(());
        }

        let Some(raw) = map.get(DATA) else {
            return Ok(());
        };
        if base64_encoded {
            let encoded: String = serde_json::from_str(raw.get())?;
            event.data = Some(Bytes::from(STANDARD.decode(encoded)?));
            return Ok(());
        }

        let json_payload = event.datacontenttype().is_none_or(is_json);
        let bytes = match serde_json::from_str::<Value>(raw.get())? {
            Value::String(encoded) if Self::legacy_binary(event) => {
                Bytes::from(STANDARD.decode(encoded)?)
            }
            Value::String(text) if !json_payload => Bytes::from(text),
            _ => Bytes::copy_from_slice(raw.get().as_bytes()),
        };
        event.data = Some(bytes);
        Ok(())
    }
}

impl Format for JsonFormat {
    fn media_type(&self) -> &str {
        JSON_MEDIA_TYPE
    }

    fn marshal(&self, event: &Event) -> EventResult<Bytes> {
        let version = event.specversion();

        let mut attributes: Vec<(String, Value)> = version
            .attributes()
            .iter()
            .filter_map(|attr| attr.get(event).map(|v| (attr.name().to_string(), v.to_json())))
            .collect();

        let extensions = event
            .extensions()
            .iter()
            .map(|(name, value)| (name.clone(), value.to_json()));
        let nested_extensions = if version == SpecVersion::V01 {
            let nested: BTreeMap<String, Value> = extensions.collect();
            (!nested.is_empty()).then_some(nested)
        } else {
            attributes.extend(extensions);
            None
        };

        let data = Self::data_field(event).map(|(key, field, base64_encoded)| {
            if base64_encoded {
                attributes.push((
                    DATA_CONTENT_ENCODING.to_string(),
                    Value::String(BASE64.to_string()),
                ));
            }
            (key, field)
        });

        let json = JsonEvent {
            attributes,
            nested_extensions,
            data,
        };
        Ok(Bytes::from(serde_json::to_vec(&json)?))
    }

    fn unmarshal(&self, bytes: &[u8]) -> EventResult<Event> {
        let map: BTreeMap<String, Box<RawValue>> = serde_json::from_slice(bytes)?;

        let mut spec_version = None;
        for name in self.versions.spec_version_names() {
            if let Some(raw) = map.get(name) {
                spec_version = Some(serde_json::from_str::<String>(raw.get())?);
                break;
            }
        }
        let spec_version = spec_version.ok_or_else(|| EventError::missing("specversion"))?;
        let version = self.versions.version(&spec_version)?;

        let mut event = version.new_event();
        let mut base64_encoded = false;

        for (key, raw) in &map {
            match key.as_str() {
                DATA | DATA_BASE64 => continue,
                DATA_CONTENT_ENCODING if version.spec() == SpecVersion::V03 => {
                    let encoding: String = serde_json::from_str(raw.get())?;
                    base64_encoded = encoding.eq_ignore_ascii_case(BASE64);
                    continue;
                }
                EXTENSIONS if version.spec() == SpecVersion::V01 => {
                    let nested: BTreeMap<String, Value> = serde_json::from_str(raw.get())?;
                    for (name, value) in &nested {
                        event.set_extension_json(name, value)?;
                    }
                    continue;
                }
                _ => {}
            }

            let value: Value = serde_json::from_str(raw.get())?;
            match version.attribute(key) {
                Some(attr) if attr.kind() == AttributeKind::SpecVersion => {}
                Some(attr) => {
                    let Value::String(s) = value else {
                        return Err(EventError::invalid(key, "expected a string"));
                    };
                    // 必填属性为空时保留空值，由最终落地方校验
                    if !s.is_empty() {
                        attr.set(&mut event, AttributeValue::String(s))?;
                    }
                }
                None => event.set_extension_json(key, &value)?,
            }
        }

        Self::decode_data(&mut event, &map, base64_encoded)?;
        Ok(event)
    }
}
