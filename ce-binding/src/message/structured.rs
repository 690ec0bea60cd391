use async_trait::async_trait;
use bytes::Bytes;
use ce_event::format::Format;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::{Message, ensure_active};
use crate::encoder::{BinaryEncoder, StructuredEncoder};
use crate::encoding::Encoding;
use crate::error::{BindingError, BindingResult};

/// 结构化字节块 + 格式；只能读取一次
#[derive(Debug)]
pub struct StructuredMessage {
    format: Arc<dyn Format>,
    body: Option<Bytes>,
}

impl StructuredMessage {
    pub fn new(format: Arc<dyn Format>, body: impl Into<Bytes>) -> Self {
        Self {
            format,
            body: Some(body.into()),
        }
    }
}

#[async_trait]
impl Message for StructuredMessage {
    fn encoding(&self) -> Encoding {
        Encoding::Structured
    }

    async fn structured(
        &mut self,
        ctx: &CancellationToken,
        encoder: &mut dyn StructuredEncoder,
    ) -> BindingResult<()> {
        ensure_active(ctx)?;
        let body = self.body.take().ok_or(BindingError::AlreadyConsumed)?;
        encoder.set_structured_event(self.format.clone(), body)
    }

    async fn binary(
        &mut self,
        _ctx: &CancellationToken,
        _encoder: &mut dyn BinaryEncoder,
    ) -> BindingResult<()> {
        Err(BindingError::NotBinary)
    }
}
