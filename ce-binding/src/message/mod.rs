//! 消息（Message）
//!
//! 传输途中的事件句柄，不强制完整解码：
//! - `structured`：原生为单个自描述字节块时整块转交，否则返回 `NotStructured`；
//! - `binary`：属性与载荷可分离时逐个转交，否则返回 `NotBinary`；
//! - `event`：通用回退，完整解码为 `Event`；
//! - `finish`：持有者不再使用消息时调用，释放缓冲、锁或投递状态。
//!
//! 多数实现只能被消费一次（读取即耗尽底层来源），需要多次读取时使用 `buffering`。
//!
mod builder;
mod event;
mod header;
mod structured;

pub use builder::EventBuilder;
pub use event::EventMessage;
pub use header::{CONTENT_TYPE, HEADER_PREFIX, HeaderEncoder, HeaderMessage};
pub use structured::StructuredMessage;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::delivery::Settle;
use crate::encoder::{BinaryEncoder, EventEncoder, StructuredEncoder};
use crate::encoding::Encoding;
use crate::error::{BindingError, BindingResult};

#[async_trait]
pub trait Message: Send {
    /// 原生编码，构造时确定
    fn encoding(&self) -> Encoding;

    async fn structured(
        &mut self,
        ctx: &CancellationToken,
        encoder: &mut dyn StructuredEncoder,
    ) -> BindingResult<()>;

    async fn binary(
        &mut self,
        ctx: &CancellationToken,
        encoder: &mut dyn BinaryEncoder,
    ) -> BindingResult<()>;

    /// 完整解码后交给 `encoder`；默认依次尝试结构化与二进制读取
    async fn event(
        &mut self,
        ctx: &CancellationToken,
        encoder: &mut dyn EventEncoder,
    ) -> BindingResult<()> {
        let mut builder = EventBuilder::new();
        match self.structured(ctx, &mut builder).await {
            Ok(()) => {}
            Err(err) if err.is_decline() => match self.binary(ctx, &mut builder).await {
                Ok(()) => {}
                Err(err) if err.is_decline() => return Err(BindingError::NoEncoding),
                Err(err) => return Err(err),
            },
            Err(err) => return Err(err),
        }
        encoder.encode(builder.into_event()?)
    }

    /// 释放消息；`err` 表示下游处理失败。返回错误表示对端未接受该消息
    fn finish(&mut self, _err: Option<&BindingError>) -> BindingResult<()> {
        Ok(())
    }

    /// 支持 QoS 2 的消息返回自身
    fn as_exactly_once(&mut self) -> Option<&mut dyn ExactlyOnceMessage> {
        None
    }
}

/// QoS 2：转发方收到下游的接收确认后调用 `received`；
/// 接收方在确认的确认到达后调用 `settle`。之后仍需调用 `finish`。
pub trait ExactlyOnceMessage: Message {
    fn received(&mut self, settle: Settle);
}

pub(crate) fn ensure_active(ctx: &CancellationToken) -> BindingResult<()> {
    if ctx.is_cancelled() {
        return Err(BindingError::Cancelled);
    }
    Ok(())
}
