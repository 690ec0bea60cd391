//! 进程内通道协议
//!
//! 消息对象本身经 `tokio::sync::mpsc` 传递，不做任何编码；所有权随消息一起转移，
//! 由接收方负责 `finish`。配置了转换器时，发送方先复制并转换消息，再结束原消息。
//!
use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use super::{Receiver, Requester, Sender};
use crate::buffering::copy_message;
use crate::error::{BindingError, BindingResult};
use crate::message::{Message, ensure_active};
use crate::transformer::TransformerFactories;

/// 创建容量为 `capacity` 的消息通道（0 按 1 处理）
pub fn channel(capacity: usize) -> (ChanSender, ChanReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        ChanSender {
            tx,
            transformers: TransformerFactories::new(),
        },
        ChanReceiver { rx: Mutex::new(rx) },
    )
}

/// 创建请求/响应通道（容量 0 按 1 处理）
pub fn request_channel(capacity: usize) -> (ChanRequester, ChanResponder) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (ChanRequester { tx }, ChanResponder { rx: Mutex::new(rx) })
}

pub(super) async fn reserve<'a, T>(
    ctx: &CancellationToken,
    tx: &'a mpsc::Sender<T>,
) -> BindingResult<mpsc::Permit<'a, T>> {
    ensure_active(ctx)?;
    tokio::select! {
        _ = ctx.cancelled() => Err(BindingError::Cancelled),
        permit = tx.reserve() => permit.map_err(|_| BindingError::Closed),
    }
}

pub(super) async fn recv<T>(
    ctx: &CancellationToken,
    rx: &Mutex<mpsc::Receiver<T>>,
) -> BindingResult<T> {
    ensure_active(ctx)?;
    let mut rx = tokio::select! {
        _ = ctx.cancelled() => return Err(BindingError::Cancelled),
        guard = rx.lock() => guard,
    };
    tokio::select! {
        _ = ctx.cancelled() => Err(BindingError::Cancelled),
        item = rx.recv() => item.ok_or(BindingError::EndOfStream),
    }
}

/// 以 `err` 结束未能交出的消息，并返回该错误
fn abandon(mut message: Box<dyn Message>, err: BindingError) -> BindingError {
    if let Err(finish_err) = message.finish(Some(&err)) {
        tracing::warn!(error = %finish_err, "failed to finish undelivered message");
    }
    err
}

#[derive(Clone)]
pub struct ChanSender {
    tx: mpsc::Sender<Box<dyn Message>>,
    transformers: TransformerFactories,
}

impl ChanSender {
    /// 发送前对每条消息应用的转换器
    pub fn with_transformers(mut self, transformers: TransformerFactories) -> Self {
        self.transformers = transformers;
        self
    }

    async fn prepare(
        &self,
        ctx: &CancellationToken,
        mut message: Box<dyn Message>,
    ) -> BindingResult<Box<dyn Message>> {
        if self.transformers.is_empty() {
            return Ok(message);
        }
        let copied = copy_message(ctx, message.as_mut(), &self.transformers).await;
        let finished = message.finish(copied.as_ref().err());
        let copied = copied?;
        finished?;
        Ok(Box::new(copied))
    }
}

#[async_trait]
impl Sender for ChanSender {
    async fn send(&self, ctx: &CancellationToken, message: Box<dyn Message>) -> BindingResult<()> {
        let message = self.prepare(ctx, message).await?;
        match reserve(ctx, &self.tx).await {
            Ok(permit) => {
                permit.send(message);
                Ok(())
            }
            Err(err) => Err(abandon(message, err)),
        }
    }
}

pub struct ChanReceiver {
    rx: Mutex<mpsc::Receiver<Box<dyn Message>>>,
}

#[async_trait]
impl Receiver for ChanReceiver {
    async fn receive(&self, ctx: &CancellationToken) -> BindingResult<Box<dyn Message>> {
        recv(ctx, &self.rx).await
    }
}

/// 一次请求：请求消息与回复句柄
pub struct Exchange {
    pub request: Box<dyn Message>,
    pub reply: Reply,
}

/// 回复句柄；丢弃时请求方收到 `EndOfStream`
pub struct Reply {
    tx: oneshot::Sender<Box<dyn Message>>,
}

impl Reply {
    /// 回复响应消息；请求方已离开时以 `Closed` 结束该响应
    pub fn send(self, response: Box<dyn Message>) -> BindingResult<()> {
        self.tx
            .send(response)
            .map_err(|response| abandon(response, BindingError::Closed))
    }
}

#[derive(Clone)]
pub struct ChanRequester {
    tx: mpsc::Sender<Exchange>,
}

impl ChanRequester {
    async fn submit(
        &self,
        ctx: &CancellationToken,
        request: Box<dyn Message>,
    ) -> BindingResult<oneshot::Receiver<Box<dyn Message>>> {
        let permit = match reserve(ctx, &self.tx).await {
            Ok(permit) => permit,
            Err(err) => return Err(abandon(request, err)),
        };
        let (tx, rx) = oneshot::channel();
        permit.send(Exchange {
            request,
            reply: Reply { tx },
        });
        Ok(rx)
    }
}

#[async_trait]
impl Sender for ChanRequester {
    /// 单向发送：不等待回复
    async fn send(&self, ctx: &CancellationToken, message: Box<dyn Message>) -> BindingResult<()> {
        self.submit(ctx, message).await.map(drop)
    }
}

#[async_trait]
impl Requester for ChanRequester {
    async fn request(
        &self,
        ctx: &CancellationToken,
        message: Box<dyn Message>,
    ) -> BindingResult<Box<dyn Receiver>> {
        let rx = self.submit(ctx, message).await?;
        Ok(Box::new(ReplyReceiver {
            rx: Mutex::new(Some(rx)),
        }))
    }
}

/// 读取单个回复的接收端：回复之后返回 `EndOfStream`
struct ReplyReceiver {
    rx: Mutex<Option<oneshot::Receiver<Box<dyn Message>>>>,
}

#[async_trait]
impl Receiver for ReplyReceiver {
    async fn receive(&self, ctx: &CancellationToken) -> BindingResult<Box<dyn Message>> {
        ensure_active(ctx)?;
        let mut slot = self.rx.lock().await;
        let Some(rx) = slot.as_mut() else {
            return Err(BindingError::EndOfStream);
        };
        let reply = tokio::select! {
            _ = ctx.cancelled() => return Err(BindingError::Cancelled),
            reply = rx => reply,
        };
        slot.take();
        reply.map_err(|_| BindingError::EndOfStream)
    }
}

pub struct ChanResponder {
    rx: Mutex<mpsc::Receiver<Exchange>>,
}

impl ChanResponder {
    /// 等待下一次请求；所有请求方离开后返回 `EndOfStream`
    pub async fn receive(&self, ctx: &CancellationToken) -> BindingResult<Exchange> {
        recv(ctx, &self.rx).await
    }
}
