//! 协议角色（Protocol Roles）
//!
//! 具体传输绑定需要提供的最小形态：
//! - `Sender`：发送一条消息；
//! - `Receiver`：逐条接收消息，来源耗尽时返回 `EndOfStream`；
//! - `Requester`：带响应关联的发送，返回读取响应的 `Receiver`；
//! - `Transport`：组合发送与接收，并提供接收循环的生命周期。
//!
//! 另提供两个进程内协议：`chan`（直接传递消息）与 `frame`（传递请求头 + 消息体帧）。
//!
pub mod chan;
pub mod frame;
mod transport;

pub use transport::{BindingTransport, ReceiverHandle, Transport};

use async_trait::async_trait;
use futures_core::stream::BoxStream;
use futures_util::stream;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::error::{BindingError, BindingResult};
use crate::message::Message;

#[async_trait]
pub trait Sender: Send + Sync {
    /// 发送消息；无论成功与否，消息都会被 `finish`
    async fn send(&self, ctx: &CancellationToken, message: Box<dyn Message>) -> BindingResult<()>;
}

#[async_trait]
pub trait Receiver: Send + Sync {
    /// 等待下一条消息；调用方负责对返回的消息调用 `finish`
    async fn receive(&self, ctx: &CancellationToken) -> BindingResult<Box<dyn Message>>;
}

#[async_trait]
pub trait Requester: Sender {
    /// 发送请求并返回读取响应的接收端
    async fn request(
        &self,
        ctx: &CancellationToken,
        message: Box<dyn Message>,
    ) -> BindingResult<Box<dyn Receiver>>;
}

/// 消息处理器：由传输的接收循环调用
#[async_trait]
pub trait MessageHandler: Send + Sync {
    fn handler_name(&self) -> &str;

    async fn handle(&self, message: &mut dyn Message) -> anyhow::Result<()>;
}

/// 把 `Receiver` 适配为 `'static` 消息流；遇到 `EndOfStream`、`Cancelled` 或 `Closed` 时结束
pub fn receiver_stream(
    receiver: Arc<dyn Receiver>,
    ctx: CancellationToken,
) -> BoxStream<'static, BindingResult<Box<dyn Message>>> {
    Box::pin(stream::unfold(
        (receiver, ctx),
        |(receiver, ctx)| async move {
            match receiver.receive(&ctx).await {
                Err(
                    BindingError::EndOfStream | BindingError::Cancelled | BindingError::Closed,
                ) => None,
                item => Some((item, (receiver, ctx))),
            }
        },
    ))
}
