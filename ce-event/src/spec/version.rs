use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::attribute::{Attribute, AttributeKind};
use crate::error::EventError;

/// CloudEvents 规范版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SpecVersion {
    #[serde(rename = "0.1")]
    V01,
    #[serde(rename = "0.2")]
    V02,
    #[serde(rename = "0.3")]
    V03,
    #[serde(rename = "1.0")]
    V10,
}

const V01_ATTRIBUTES: &[Attribute] = &[
    Attribute::new(SpecVersion::V01, AttributeKind::SpecVersion, "cloudEventsVersion"),
    Attribute::new(SpecVersion::V01, AttributeKind::Id, "eventID"),
    Attribute::new(SpecVersion::V01, AttributeKind::Type, "eventType"),
    Attribute::new(SpecVersion::V01, AttributeKind::Source, "source"),
    Attribute::new(SpecVersion::V01, AttributeKind::Time, "eventTime"),
    Attribute::new(SpecVersion::V01, AttributeKind::DataSchema, "schemaURL"),
    Attribute::new(SpecVersion::V01, AttributeKind::DataContentType, "contentType"),
];

const V02_ATTRIBUTES: &[Attribute] = &[
    Attribute::new(SpecVersion::V02, AttributeKind::SpecVersion, "specversion"),
    Attribute::new(SpecVersion::V02, AttributeKind::Id, "id"),
    Attribute::new(SpecVersion::V02, AttributeKind::Type, "type"),
    Attribute::new(SpecVersion::V02, AttributeKind::Source, "source"),
    Attribute::new(SpecVersion::V02, AttributeKind::Time, "time"),
    Attribute::new(SpecVersion::V02, AttributeKind::DataSchema, "schemaurl"),
    Attribute::new(SpecVersion::V02, AttributeKind::DataContentType, "contenttype"),
];

const V03_ATTRIBUTES: &[Attribute] = &[
    Attribute::new(SpecVersion::V03, AttributeKind::SpecVersion, "specversion"),
    Attribute::new(SpecVersion::V03, AttributeKind::Id, "id"),
    Attribute::new(SpecVersion::V03, AttributeKind::Type, "type"),
    Attribute::new(SpecVersion::V03, AttributeKind::Source, "source"),
    Attribute::new(SpecVersion::V03, AttributeKind::Subject, "subject"),
    Attribute::new(SpecVersion::V03, AttributeKind::Time, "time"),
    Attribute::new(SpecVersion::V03, AttributeKind::DataSchema, "schemaurl"),
    Attribute::new(SpecVersion::V03, AttributeKind::DataContentType, "datacontenttype"),
];

const V10_ATTRIBUTES: &[Attribute] = &[
    Attribute::new(SpecVersion::V10, AttributeKind::SpecVersion, "specversion"),
    Attribute::new(SpecVersion::V10, AttributeKind::Id, "id"),
    Attribute::new(SpecVersion::V10, AttributeKind::Type, "type"),
    Attribute::new(SpecVersion::V10, AttributeKind::Source, "source"),
    Attribute::new(SpecVersion::V10, AttributeKind::Subject, "subject"),
    Attribute::new(SpecVersion::V10, AttributeKind::Time, "time"),
    Attribute::new(SpecVersion::V10, AttributeKind::DataSchema, "dataschema"),
    Attribute::new(SpecVersion::V10, AttributeKind::DataContentType, "datacontenttype"),
];

impl SpecVersion {
    pub const ALL: [SpecVersion; 4] = [
        SpecVersion::V01,
        SpecVersion::V02,
        SpecVersion::V03,
        SpecVersion::V10,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            SpecVersion::V01 => "0.1",
            SpecVersion::V02 => "0.2",
            SpecVersion::V03 => "0.3",
            SpecVersion::V10 => "1.0",
        }
    }

    /// 该版本的全部上下文属性（固定顺序）
    pub const fn attributes(&self) -> &'static [Attribute] {
        match self {
            SpecVersion::V01 => V01_ATTRIBUTES,
            SpecVersion::V02 => V02_ATTRIBUTES,
            SpecVersion::V03 => V03_ATTRIBUTES,
            SpecVersion::V10 => V10_ATTRIBUTES,
        }
    }

    /// 按逻辑类别取属性；该版本不存在此属性时返回 `None`
    pub fn attribute(&self, kind: AttributeKind) -> Option<Attribute> {
        self.attributes().iter().copied().find(|a| a.kind() == kind)
    }

    pub fn has(&self, kind: AttributeKind) -> bool {
        self.attribute(kind).is_some()
    }

    /// 名称是否为任一版本的上下文属性（不区分大小写）
    pub fn is_context_attribute(name: &str) -> bool {
        SpecVersion::ALL
            .iter()
            .flat_map(|v| v.attributes())
            .any(|a| a.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for SpecVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpecVersion {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SpecVersion::ALL
            .into_iter()
            .find(|v| v.as_str() == s.trim())
            .ok_or_else(|| EventError::UnknownVersion {
                version: s.to_string(),
            })
    }
}
