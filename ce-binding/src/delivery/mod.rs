//! 可靠投递（Reliable Delivery）
//!
//! 与具体传输的确认机制无关的 `finish`/`received`/`settle` 协议：
//! - QoS 0：发送方可以不调用 `finish`，丢失不报告；
//! - QoS 1：收到传输层确认之前不得 `finish(None)`，失败时 `finish(Some(err))`；
//! - QoS 2：在 QoS 1 之上，转发方收到接收确认后调用 `received(settle)`，
//!   接收方在确认的确认到达后 `settle`。传输不支持 QoS 2 时可直接 `finish`。
//!
mod settle;
mod wrappers;

pub use settle::Settle;
pub use wrappers::{WithFinish, WithSettlement};

use serde::{Deserialize, Serialize};
use std::fmt;

/// 投递保证级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum QoS {
    AtMostOnce,
    #[default]
    AtLeastOnce,
    ExactlyOnce,
}

impl QoS {
    /// 是否需要对端确认
    pub fn requires_ack(&self) -> bool {
        !matches!(self, QoS::AtMostOnce)
    }
}

impl fmt::Display for QoS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self {
            QoS::AtMostOnce => 0,
            QoS::AtLeastOnce => 1,
            QoS::ExactlyOnce => 2,
        };
        write!(f, "qos{level}")
    }
}
