//! 传输（Transport）
//!
//! 组合任意 `Sender` 与 `Receiver`，并负责接收循环的生命周期：
//! - `set_receiver`：设置消息处理器；
//! - `start_receiver`：在后台启动接收循环，并发处理消息；
//! - `stop_receiver`：取消接收并等待在途消息处理完毕。
//!
//! 每条消息交给处理器后都会以处理结果 `finish`。
//!
use async_trait::async_trait;
use bon::Builder;
use futures_util::StreamExt;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{MessageHandler, Receiver, Sender, receiver_stream};
use crate::config::TransportConfig;
use crate::error::{BindingError, BindingResult};
use crate::message::Message;

#[async_trait]
pub trait Transport: Sender {
    fn set_receiver(&self, handler: Arc<dyn MessageHandler>);

    /// 启动接收循环；`ctx` 取消时循环随之结束
    fn start_receiver(&self, ctx: &CancellationToken) -> BindingResult<()>;

    /// 停止接收循环并等待其结束；未启动时直接返回
    async fn stop_receiver(&self) -> BindingResult<()>;
}

#[derive(Default)]
struct TransportState {
    handler: Option<Arc<dyn MessageHandler>>,
    running: Option<ReceiverHandle>,
}

#[derive(Builder)]
pub struct BindingTransport {
    sender: Arc<dyn Sender>,
    receiver: Arc<dyn Receiver>,
    #[builder(default)]
    config: TransportConfig,
    #[builder(skip)]
    state: Mutex<TransportState>,
}

impl BindingTransport {
    fn state(&self) -> std::sync::MutexGuard<'_, TransportState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_receiving(&self) -> bool {
        self.state()
            .running
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    async fn receive_loop(
        receiver: Arc<dyn Receiver>,
        handler: Arc<dyn MessageHandler>,
        token: CancellationToken,
        concurrency: usize,
    ) {
        receiver_stream(receiver, token)
            .for_each_concurrent(Some(concurrency), |item| {
                let handler = handler.clone();
                async move {
                    match item {
                        Ok(message) => Self::dispatch(handler.as_ref(), message).await,
                        Err(err) => tracing::warn!(error = %err, "receive failed"),
                    }
                }
            })
            .await;
    }

    async fn dispatch(handler: &dyn MessageHandler, mut message: Box<dyn Message>) {
        let outcome = handler
            .handle(message.as_mut())
            .await
            .map_err(|err| BindingError::Handler {
                handler: handler.handler_name().to_string(),
                reason: err.to_string(),
            });
        if let Err(err) = &outcome {
            tracing::warn!(error = %err, "message handler failed");
        }
        if let Err(err) = message.finish(outcome.as_ref().err()) {
            tracing::warn!(error = %err, "failed to finish received message");
        }
    }
}

#[async_trait]
impl Sender for BindingTransport {
    async fn send(&self, ctx: &CancellationToken, message: Box<dyn Message>) -> BindingResult<()> {
        self.sender.send(ctx, message).await
    }
}

#[async_trait]
impl Transport for BindingTransport {
    fn set_receiver(&self, handler: Arc<dyn MessageHandler>) {
        self.state().handler = Some(handler);
    }

    fn start_receiver(&self, ctx: &CancellationToken) -> BindingResult<()> {
        let mut state = self.state();
        // 父级 ctx 取消后循环自行结束，此时允许重新启动
        if state.running.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return Err(BindingError::transport("receiver already started"));
        }
        let handler = state
            .handler
            .clone()
            .ok_or_else(|| BindingError::transport("no message handler set"))?;

        let token = ctx.child_token();
        let task = tokio::spawn(Self::receive_loop(
            self.receiver.clone(),
            handler.clone(),
            token.clone(),
            self.config.handler_concurrency,
        ));
        state.running = Some(ReceiverHandle {
            token,
            task: Some(task),
        });

        tracing::info!(
            handler = handler.handler_name(),
            concurrency = self.config.handler_concurrency,
            "receiver started"
        );
        Ok(())
    }

    async fn stop_receiver(&self) -> BindingResult<()> {
        let running = self.state().running.take();
        if let Some(handle) = running {
            handle.shutdown();
            handle.join().await?;
            tracing::info!("receiver stopped");
        }
        Ok(())
    }
}

/// 接收循环句柄：用于关闭与等待循环结束；丢弃时取消循环
pub struct ReceiverHandle {
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ReceiverHandle {
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    pub async fn join(mut self) -> BindingResult<()> {
        let Some(task) = self.task.take() else {
            return Ok(());
        };
        task.await
            .map_err(|err| BindingError::transport(format!("receive loop aborted: {err}")))
    }
}

impl Drop for ReceiverHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
