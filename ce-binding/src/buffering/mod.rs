//! 消息缓冲（Buffering）
//!
//! 把只能读取一次的消息完整复制到内存，得到可以任意次读取的副本，
//! 用于重试、扇出与测试。复制时按转码引擎的优先级读取源消息并应用转换器，
//! 源消息仍需由调用方以复制结果 `finish`。
//!
mod buffer;

pub use buffer::BufferedMessage;

use tokio_util::sync::CancellationToken;

use crate::error::BindingResult;
use crate::message::Message;
use crate::transcode::write;
use crate::transformer::TransformerFactories;
use buffer::MessageBuffer;

/// 读取一次源消息，返回可重复读取的内存副本
pub async fn copy_message(
    ctx: &CancellationToken,
    message: &mut dyn Message,
    transformers: &TransformerFactories,
) -> BindingResult<BufferedMessage> {
    let mut buffer = MessageBuffer::default();
    let path = write(ctx, message, &mut buffer, transformers).await?;
    tracing::debug!(%path, "message buffered");
    buffer.into_message()
}
