//! 绑定层统一错误定义
//!
//! 模式拒绝信号（`NotStructured`/`NotBinary`）只在转码引擎内部用于路由，
//! 不会出现在 `write`/`to_event`/`copy_message` 的返回值中。
//!
use ce_event::error::EventError;

#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum BindingError {
    // --- 模式拒绝（路由信号） ---
    #[error("message is not in structured mode")]
    NotStructured,
    #[error("message is not in binary mode")]
    NotBinary,

    // --- 事件模型/校验 ---
    #[error("event: {0}")]
    Event(#[from] EventError),

    // --- 消息生命周期 ---
    #[error("message already consumed")]
    AlreadyConsumed,
    #[error("no encoding: message could not be read in any mode")]
    NoEncoding,
    #[error("unsupported encoder: {reason}")]
    UnsupportedEncoder { reason: String },

    // --- 传输 ---
    #[error("transport: {reason}")]
    Transport { reason: String },
    #[error("operation cancelled")]
    Cancelled,
    #[error("end of stream")]
    EndOfStream,
    #[error("channel closed")]
    Closed,

    // --- 投递 ---
    #[error("negative acknowledgment: {reason}")]
    Nack { reason: String },
    #[error("handler failed: handler={handler}, reason={reason}")]
    Handler { handler: String, reason: String },
}

pub type BindingResult<T> = Result<T, BindingError>;

impl BindingError {
    /// 模式拒绝：转码引擎据此尝试下一种模式
    pub fn is_decline(&self) -> bool {
        matches!(self, BindingError::NotStructured | BindingError::NotBinary)
    }

    pub fn transport(reason: impl Into<String>) -> Self {
        BindingError::Transport {
            reason: reason.into(),
        }
    }

    pub fn unsupported_encoder(reason: impl Into<String>) -> Self {
        BindingError::UnsupportedEncoder {
            reason: reason.into(),
        }
    }

    pub fn nack(reason: impl Into<String>) -> Self {
        BindingError::Nack {
            reason: reason.into(),
        }
    }
}
