use serde::{Deserialize, Serialize};

use super::version::SpecVersion;
use crate::error::{EventError, EventResult};
use crate::event::Event;
use crate::value::{AttributeValue, is_absolute_uri};

/// 与版本无关的逻辑属性类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AttributeKind {
    SpecVersion,
    Id,
    Source,
    Type,
    Time,
    Subject,
    DataContentType,
    DataSchema,
}

impl AttributeKind {
    /// 必填属性：specversion / id / source / type
    pub fn is_required(&self) -> bool {
        matches!(
            self,
            AttributeKind::SpecVersion | AttributeKind::Id | AttributeKind::Source | AttributeKind::Type
        )
    }
}

/// 绑定到某一规范版本的属性
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Attribute {
    version: SpecVersion,
    kind: AttributeKind,
    name: &'static str,
}

impl Attribute {
    pub(crate) const fn new(version: SpecVersion, kind: AttributeKind, name: &'static str) -> Self {
        Self {
            version,
            kind,
            name,
        }
    }

    pub fn version(&self) -> SpecVersion {
        self.version
    }

    pub fn kind(&self) -> AttributeKind {
        self.kind
    }

    /// 线上名称（按该版本的大小写）
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 读取属性；未设置（或必填属性为空串）时返回 `None`
    pub fn get(&self, event: &Event) -> Option<AttributeValue> {
        let non_empty = |s: &str| (!s.is_empty()).then(|| AttributeValue::String(s.to_string()));

        match self.kind {
            AttributeKind::SpecVersion => {
                Some(AttributeValue::String(event.specversion.as_str().to_string()))
            }
            AttributeKind::Id => non_empty(&event.id),
            AttributeKind::Source => {
                (!event.source.is_empty()).then(|| AttributeValue::UriRef(event.source.clone()))
            }
            AttributeKind::Type => non_empty(&event.ty),
            AttributeKind::Time => event.time.map(AttributeValue::Timestamp),
            AttributeKind::Subject => event.subject.clone().map(AttributeValue::String),
            AttributeKind::DataContentType => {
                event.datacontenttype.clone().map(AttributeValue::String)
            }
            AttributeKind::DataSchema => event.dataschema.clone().map(AttributeValue::Uri),
        }
    }

    /// 写入属性，取值在写入时即完成校验
    pub fn set(&self, event: &mut Event, value: AttributeValue) -> EventResult<()> {
        if event.specversion != self.version {
            return Err(EventError::VersionMismatch {
                expected: event.specversion,
                found: self.version,
            });
        }

        match self.kind {
            AttributeKind::SpecVersion => {
                let found: SpecVersion = value.to_canonical_string().parse()?;
                if found != self.version {
                    return Err(EventError::VersionMismatch {
                        expected: self.version,
                        found,
                    });
                }
            }
            AttributeKind::Id => event.id = self.non_empty(value)?,
            AttributeKind::Source => event.source = self.non_empty(value)?,
            AttributeKind::Type => event.ty = self.non_empty(value)?,
            AttributeKind::Time => {
                let time = value
                    .to_timestamp()
                    .map_err(|e| EventError::invalid(self.name, e.to_string()))?;
                event.time = Some(time);
            }
            AttributeKind::Subject => event.subject = Some(self.non_empty(value)?),
            AttributeKind::DataContentType => event.datacontenttype = Some(self.non_empty(value)?),
            AttributeKind::DataSchema => event.dataschema = Some(self.absolute_uri(value)?),
        }
        Ok(())
    }

    /// 删除可选属性；必填属性不可删除
    pub fn delete(&self, event: &mut Event) -> EventResult<()> {
        match self.kind {
            AttributeKind::SpecVersion
            | AttributeKind::Id
            | AttributeKind::Source
            | AttributeKind::Type => Err(EventError::invalid(
                self.name,
                "required attribute cannot be deleted",
            )),
            AttributeKind::Time => {
                event.time = None;
                Ok(())
            }
            AttributeKind::Subject => {
                event.subject = None;
                Ok(())
            }
            AttributeKind::DataContentType => {
                event.datacontenttype = None;
                Ok(())
            }
            AttributeKind::DataSchema => {
                event.dataschema = None;
                Ok(())
            }
        }
    }

    fn non_empty(&self, value: AttributeValue) -> EventResult<String> {
        let s = value.to_canonical_string();
        if s.is_empty() {
            return Err(EventError::invalid(self.name, "must not be empty"));
        }
        Ok(s)
    }

    fn absolute_uri(&self, value: AttributeValue) -> EventResult<String> {
        let s = value.to_canonical_string();
        if !is_absolute_uri(&s) {
            return Err(EventError::invalid(self.name, format!("not an absolute URI: {s:?}")));
        }
        Ok(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn event(version: SpecVersion) -> Event {
        Event::builder()
            .specversion(version)
            .id("1")
            .source("/src")
            .ty("t")
            .build()
            .unwrap()
    }

    #[test]
    fn get_set_delete_roundtrip() {
        let mut e = event(SpecVersion::V10);
        let time = SpecVersion::V10.attribute(AttributeKind::Time).unwrap();
        assert!(time.get(&e).is_none());

        let t = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap();
        time.set(&mut e, AttributeValue::from("2021-01-01T00:00:00Z")).unwrap();
        assert_eq!(e.time(), Some(t));

        time.delete(&mut e).unwrap();
        assert!(e.time().is_none());
    }

    #[test]
    fn required_attributes_are_checked() {
        let mut e = event(SpecVersion::V03);
        let id = SpecVersion::V03.attribute(AttributeKind::Id).unwrap();
        assert!(id.set(&mut e, AttributeValue::from("")).is_err());
        assert!(id.delete(&mut e).is_err());
        assert_eq!(e.id(), "1");
    }

    #[test]
    fn attribute_of_other_version_is_rejected() {
        let mut e = event(SpecVersion::V02);
        let subject = SpecVersion::V10.attribute(AttributeKind::Subject).unwrap();
        let err = subject.set(&mut e, AttributeValue::from("s")).unwrap_err();
        assert!(matches!(err, EventError::VersionMismatch { .. }));
    }

    #[test]
    fn invalid_time_is_rejected_at_set_time() {
        let mut e = event(SpecVersion::V10);
        let time = SpecVersion::V10.attribute(AttributeKind::Time).unwrap();
        let err = time.set(&mut e, AttributeValue::from("yesterday")).unwrap_err();
        assert!(matches!(err, EventError::InvalidAttribute { .. }));
    }

    #[test]
    fn malformed_schema_uri_is_rejected_at_set_time() {
        for version in SpecVersion::ALL {
            let mut e = event(version);
            let schema = version.attribute(AttributeKind::DataSchema).unwrap();
            let err = schema
                .set(&mut e, AttributeValue::from("not a uri at all"))
                .unwrap_err();
            assert!(matches!(err, EventError::InvalidAttribute { .. }), "{version}");
            assert!(e.dataschema().is_none());

            schema
                .set(&mut e, AttributeValue::from("urn:example:schema"))
                .unwrap();
            assert_eq!(e.dataschema(), Some("urn:example:schema"));
        }
    }
}
