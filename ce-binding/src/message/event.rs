use async_trait::async_trait;
use ce_event::Event;
use tokio_util::sync::CancellationToken;

use super::{Message, ensure_active};
use crate::encoder::{BinaryEncoder, EventEncoder, StructuredEncoder, write_binary};
use crate::encoding::Encoding;
use crate::error::{BindingError, BindingResult};

/// 包装内存中的 `Event`：可重复读取，以二进制模式逐个写出属性
#[derive(Debug, Clone)]
pub struct EventMessage {
    event: Event,
}

impl EventMessage {
    pub fn new(event: Event) -> Self {
        Self { event }
    }

    pub fn as_event(&self) -> &Event {
        &self.event
    }

    pub fn into_event(self) -> Event {
        self.event
    }
}

impl From<Event> for EventMessage {
    fn from(event: Event) -> Self {
        Self::new(event)
    }
}

#[async_trait]
impl Message for EventMessage {
    fn encoding(&self) -> Encoding {
        Encoding::Event
    }

    async fn structured(
        &mut self,
        _ctx: &CancellationToken,
        _encoder: &mut dyn StructuredEncoder,
    ) -> BindingResult<()> {
        Err(BindingError::NotStructured)
    }

    async fn binary(
        &mut self,
        ctx: &CancellationToken,
        encoder: &mut dyn BinaryEncoder,
    ) -> BindingResult<()> {
        ensure_active(ctx)?;
        write_binary(&self.event, encoder)
    }

    async fn event(
        &mut self,
        ctx: &CancellationToken,
        encoder: &mut dyn EventEncoder,
    ) -> BindingResult<()> {
        ensure_active(ctx)?;
        encoder.encode(self.event.clone())
    }
}
