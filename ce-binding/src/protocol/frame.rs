//! 进程内帧协议
//!
//! 模拟真实的线路绑定：发送方经转码引擎把消息写成 请求头 + 消息体 帧，
//! 接收方以 `HeaderMessage` 读取。确认经 oneshot 通道回传：
//! - QoS 0：不等待确认；
//! - QoS 1：等待接收方 `finish`，失败结果以 `Nack` 返回给发送方；
//! - QoS 2：接收方 `received(settle)` 时把结算句柄回传，发送方转交给源消息的
//!   `received`，源消息不支持 QoS 2 时直接结算。
//!
use async_trait::async_trait;
use bytes::Bytes;
use ce_event::Registry;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use super::chan::{recv, reserve};
use super::{Receiver, Sender};
use crate::config::ChannelConfig;
use crate::delivery::{QoS, Settle};
use crate::encoder::{BinaryEncoder, EventEncoder, StructuredEncoder};
use crate::encoding::Encoding;
use crate::error::{BindingError, BindingResult};
use crate::message::{ExactlyOnceMessage, HeaderEncoder, HeaderMessage, Message};
use crate::transcode::write;
use crate::transformer::TransformerFactories;

enum Ack {
    Accepted,
    Rejected { reason: String },
    Received(Settle),
}

struct Frame {
    headers: BTreeMap<String, String>,
    body: Bytes,
    qos: QoS,
    ack: Option<oneshot::Sender<Ack>>,
}

/// 创建帧通道；容量 0 按 1 处理
pub fn channel(registry: Arc<Registry>, config: ChannelConfig) -> (FrameSender, FrameReceiver) {
    let (tx, rx) = mpsc::channel(config.capacity.max(1));
    (
        FrameSender {
            registry: registry.clone(),
            config,
            tx,
            transformers: TransformerFactories::new(),
        },
        FrameReceiver {
            registry,
            rx: Mutex::new(rx),
        },
    )
}

#[derive(Clone)]
pub struct FrameSender {
    registry: Arc<Registry>,
    config: ChannelConfig,
    tx: mpsc::Sender<Frame>,
    transformers: TransformerFactories,
}

impl FrameSender {
    pub fn with_transformers(mut self, transformers: TransformerFactories) -> Self {
        self.transformers = transformers;
        self
    }

    async fn deliver(
        &self,
        ctx: &CancellationToken,
        message: &mut dyn Message,
    ) -> BindingResult<()> {
        let mut encoder = HeaderEncoder::new(self.registry.clone());
        let path = write(ctx, message, &mut encoder, &self.transformers).await?;
        let (headers, body) = encoder.into_parts();

        let qos = self.config.qos;
        let (ack_tx, ack_rx) = if qos.requires_ack() {
            let (tx, rx) = oneshot::channel();
            (Some(tx), Some(rx))
        } else {
            (None, None)
        };

        let permit = reserve(ctx, &self.tx).await?;
        permit.send(Frame {
            headers,
            body,
            qos,
            ack: ack_tx,
        });
        tracing::debug!(%qos, %path, "frame sent");

        let Some(ack_rx) = ack_rx else {
            return Ok(());
        };
        let ack = tokio::select! {
            _ = ctx.cancelled() => return Err(BindingError::Cancelled),
            ack = tokio::time::timeout(self.config.ack_timeout, ack_rx) => ack,
        };

        match ack {
            Err(_) => Err(BindingError::transport(format!(
                "no acknowledgment within {:?}",
                self.config.ack_timeout
            ))),
            Ok(Err(_)) => Err(BindingError::nack("frame dropped by receiver")),
            Ok(Ok(Ack::Accepted)) => Ok(()),
            Ok(Ok(Ack::Rejected { reason })) => Err(BindingError::nack(reason)),
            Ok(Ok(Ack::Received(settle))) => {
                match message.as_exactly_once() {
                    Some(source) => source.received(settle),
                    None => settle.settle(Ok(())),
                }
                Ok(())
            }
        }
    }
}

#[async_trait]
impl Sender for FrameSender {
    async fn send(
        &self,
        ctx: &CancellationToken,
        mut message: Box<dyn Message>,
    ) -> BindingResult<()> {
        let result = self.deliver(ctx, message.as_mut()).await;
        let finished = message.finish(result.as_ref().err());
        result.and(finished)
    }
}

pub struct FrameReceiver {
    registry: Arc<Registry>,
    rx: Mutex<mpsc::Receiver<Frame>>,
}

#[async_trait]
impl Receiver for FrameReceiver {
    async fn receive(&self, ctx: &CancellationToken) -> BindingResult<Box<dyn Message>> {
        let frame = recv(ctx, &self.rx).await?;
        Ok(Box::new(FrameMessage {
            inner: HeaderMessage::new(self.registry.clone(), frame.headers, frame.body),
            qos: frame.qos,
            ack: frame.ack,
        }))
    }
}

/// 收到的帧；`finish` 或 `received` 时向发送方回传确认
struct FrameMessage {
    inner: HeaderMessage,
    qos: QoS,
    ack: Option<oneshot::Sender<Ack>>,
}

#[async_trait]
impl Message for FrameMessage {
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
        if let Some(ack) = self.ack.take() {
            let outcome = match err {
                None => Ack::Accepted,
                Some(err) => Ack::Rejected {
                    reason: err.to_string(),
                },
            };
            if ack.send(outcome).is_err() {
                tracing::debug!("sender stopped waiting for acknowledgment");
            }
        }
        Ok(())
    }

    fn as_exactly_once(&mut self) -> Option<&mut dyn ExactlyOnceMessage> {
        if self.qos == QoS::ExactlyOnce {
            Some(self)
        } else {
            None
        }
    }
}

impl ExactlyOnceMessage for FrameMessage {
    fn received(&mut self, settle: Settle) {
        let Some(ack) = self.ack.take() else {
            tracing::warn!("frame already acknowledged, ignoring received");
            return;
        };
        if let Err(Ack::Received(settle)) = ack.send(Ack::Received(settle)) {
            settle.settle(Err(BindingError::Closed));
        }
    }
}

impl Drop for FrameMessage {
    fn drop(&mut self) {
        if self.ack.is_some() {
            tracing::warn!(qos = %self.qos, "frame dropped without finish");
        }
    }
}
