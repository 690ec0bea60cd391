//! CloudEvents 绑定与转码（ce-binding）
//!
//! 在任意传输之间搬运事件，同时尽量保留最高效的线上表示：
//! - 消息（`message`）：传输途中的事件句柄，按需以结构化、二进制或事件形态读取
//! - 编码器（`encoder`）：消息写入的目标角色
//! - 转码引擎（`transcode`）：`write` 选择最省工作的路径，`to_event` 还原事件
//! - 转换器（`transformer`）：在转码途中改写属性、扩展属性与规范版本
//! - 缓冲（`buffering`）：把一次性消息复制为可重复读取的副本
//! - 可靠投递（`delivery`）：`finish`/`received`/`settle` 协议与 QoS
//! - 协议角色（`protocol`）：`Sender`/`Receiver`/`Requester`/`Transport` 以及进程内协议
//!
pub mod buffering;
pub mod config;
pub mod delivery;
pub mod encoder;
pub mod encoding;
pub mod error;
pub mod message;
pub mod protocol;
pub mod transcode;
pub mod transformer;

pub use buffering::{BufferedMessage, copy_message};
pub use config::{ChannelConfig, TransportConfig};
pub use delivery::{QoS, Settle, WithFinish, WithSettlement};
pub use encoder::{BinaryEncoder, Encoder, EventEncoder, StructuredEncoder};
pub use encoding::Encoding;
pub use error::{BindingError, BindingResult};
pub use message::{ExactlyOnceMessage, Message};
pub use protocol::{
    BindingTransport, MessageHandler, Receiver, Requester, Sender, Transport, receiver_stream,
};
pub use transcode::{to_event, write};
pub use transformer::{TransformerFactories, TransformerFactory};
