use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::Settle;
use crate::encoder::{BinaryEncoder, EventEncoder, StructuredEncoder};
use crate::encoding::Encoding;
use crate::error::{BindingError, BindingResult};
use crate::message::{ExactlyOnceMessage, Message};

type FinishFn = Box<dyn FnOnce(Option<&BindingError>) + Send>;
type ReceivedFn = Box<dyn FnOnce(Settle) + Send>;

/// 在消息 `finish` 时回调一次；未 `finish` 即被丢弃时记录告警
pub struct WithFinish {
    inner: Box<dyn Message>,
    on_finish: Option<FinishFn>,
}

impl WithFinish {
    pub fn new<F>(inner: Box<dyn Message>, on_finish: F) -> Self
    where
        F: FnOnce(Option<&BindingError>) + Send + 'static,
    {
        Self {
            inner,
            on_finish: Some(Box::new(on_finish)),
        }
    }

    /// 被包装的消息
    pub fn inner(&self) -> &dyn Message {
        self.inner.as_ref()
    }

    pub fn inner_mut(&mut self) -> &mut dyn Message {
        self.inner.as_mut()
    }
}

#[async_trait]
impl Message for WithFinish {
    fn encoding(&self) -> Encoding {
        self.inner.encoding()
    }

    async fn structured(
        &mut self,
        ctx: &CancellationToken,
        encoder: &mut dyn StructuredEncoder,
    ) -> BindingResult<()> {
        self.inner.structured(ctx, encoder).await
    }

    async fn binary(
        &mut self,
        ctx: &CancellationToken,
        encoder: &mut dyn BinaryEncoder,
    ) -> BindingResult<()> {
        self.inner.binary(ctx, encoder).await
    }

    async fn event(
        &mut self,
        ctx: &CancellationToken,
        encoder: &mut dyn EventEncoder,
    ) -> BindingResult<()> {
        self.inner.event(ctx, encoder).await
    }

    fn finish(&mut self, err: Option<&BindingError>) -> BindingResult<()> {
        let result = self.inner.finish(err);
        if let Some(on_finish) = self.on_finish.take() {
            on_finish(err);
        }
        result
    }

    fn as_exactly_once(&mut self) -> Option<&mut dyn ExactlyOnceMessage> {
        self.inner.as_exactly_once()
    }
}

impl Drop for WithFinish {
    fn drop(&mut self) {
        if self.on_finish.is_some() {
            tracing::warn!(encoding = %self.inner.encoding(), "message dropped without finish");
        }
    }
}

/// 为任意消息加上 QoS 2 的 `received`：转发方的结算句柄交给 `on_received`，
/// 由调用方在确认的确认到达时 `settle`
pub struct WithSettlement {
    inner: Box<dyn Message>,
    on_received: Option<ReceivedFn>,
}

impl WithSettlement {
    pub fn new<F>(inner: Box<dyn Message>, on_received: F) -> Self
    where
        F: FnOnce(Settle) + Send + 'static,
    {
        Self {
            inner,
            on_received: Some(Box::new(on_received)),
        }
    }

    /// 被包装的消息
    pub fn inner(&self) -> &dyn Message {
        self.inner.as_ref()
    }

    pub fn inner_mut(&mut self) -> &mut dyn Message {
        self.inner.as_mut()
    }
}

#[async_trait]
impl Message for WithSettlement {
    fn encoding(&self) -> Encoding {
        self.inner.encoding()
    }

    async fn structured(
        &mut self,
        ctx: &CancellationToken,
        encoder: &mut dyn StructuredEncoder,
    ) -> BindingResult<()> {
        self.inner.structured(ctx, encoder).await
    }

    async fn binary(
        &mut self,
        ctx: &CancellationToken,
        encoder: &mut dyn BinaryEncoder,
    ) -> BindingResult<()> {
        self.inner.binary(ctx, encoder).await
    }

    async fn event(
        &mut self,
        ctx: &CancellationToken,
        encoder: &mut dyn EventEncoder,
    ) -> BindingResult<()> {
        self.inner.event(ctx, encoder).await
    }

    fn finish(&mut self, err: Option<&BindingError>) -> BindingResult<()> {
        self.inner.finish(err)
    }

    fn as_exactly_once(&mut self) -> Option<&mut dyn ExactlyOnceMessage> {
        Some(self)
    }
}

impl ExactlyOnceMessage for WithSettlement {
    fn received(&mut self, settle: Settle) {
        match self.on_received.take() {
            Some(on_received) => on_received(settle),
            None => tracing::warn!("received called more than once, ignoring"),
        }
    }
}
