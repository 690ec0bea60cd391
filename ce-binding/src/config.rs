//! 绑定层配置
//!
use bon::Builder;
use std::time::Duration;

use crate::delivery::QoS;

/// 传输接收循环配置
#[derive(Clone, Copy, Debug, Builder)]
pub struct TransportConfig {
    /// 同时处理的消息数
    #[builder(default = 8)]
    pub handler_concurrency: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// 进程内通道协议配置
#[derive(Clone, Copy, Debug, Builder)]
pub struct ChannelConfig {
    /// 通道缓冲容量（0 按 1 处理）
    #[builder(default = 64)]
    pub capacity: usize,
    #[builder(default)]
    pub qos: QoS,
    /// 等待对端确认的时长
    #[builder(default = Duration::from_secs(30))]
    pub ack_timeout: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}
