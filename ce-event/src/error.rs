//! 事件模型统一错误定义
//!
//! 聚焦版本解析、属性校验、扩展属性、结构化格式与载荷编解码等最小必要集合，
//! 便于在绑定层统一转换为上层错误类型。
//!
use thiserror::Error;

use crate::spec::{AttributeKind, SpecVersion};

/// 统一错误类型（事件模型最小必要集）
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum EventError {
    // --- 规范版本/属性 ---
    #[error("unknown spec version: {version}")]
    UnknownVersion { version: String },
    #[error("missing required attribute: {name}")]
    MissingAttribute { name: String },
    #[error("invalid attribute: name={name}, reason={reason}")]
    InvalidAttribute { name: String, reason: String },
    #[error("attribute {kind:?} does not exist in spec version {version}")]
    AttributeNotInVersion {
        kind: AttributeKind,
        version: SpecVersion,
    },
    #[error("version mismatch: expected={expected}, found={found}")]
    VersionMismatch {
        expected: SpecVersion,
        found: SpecVersion,
    },

    // --- 扩展属性 ---
    #[error("invalid extension name: {name}")]
    InvalidExtensionName { name: String },
    #[error("unsupported extension type: name={name}, found={found}")]
    UnsupportedExtensionType { name: String, found: String },

    // --- 格式/编解码 ---
    #[error("unknown structured format: {media_type}")]
    UnknownFormat { media_type: String },
    #[error("data codec error: content_type={content_type}, reason={reason}")]
    Codec {
        content_type: String,
        reason: String,
    },
    #[error("serialization error: {source}")]
    Serde {
        #[from]
        source: serde_json::Error,
    },
    #[error("parse error: {reason}")]
    Parse { reason: String },
}

/// 统一 Result 类型别名
pub type EventResult<T> = Result<T, EventError>;

impl EventError {
    pub fn missing(name: impl Into<String>) -> Self {
        EventError::MissingAttribute { name: name.into() }
    }

    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        EventError::InvalidAttribute {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

impl From<chrono::ParseError> for EventError {
    fn from(err: chrono::ParseError) -> Self {
        EventError::Parse {
            reason: err.to_string(),
        }
    }
}

impl From<base64::DecodeError> for EventError {
    fn from(err: base64::DecodeError) -> Self {
        EventError::Parse {
            reason: err.to_string(),
        }
    }
}

impl From<std::num::ParseIntError> for EventError {
    fn from(err: std::num::ParseIntError) -> Self {
        EventError::Parse {
            reason: err.to_string(),
        }
    }
}

impl From<std::str::ParseBoolError> for EventError {
    fn from(err: std::str::ParseBoolError) -> Self {
        EventError::Parse {
            reason: err.to_string(),
        }
    }
}
