//! CloudEvents 事件模型（ce-event）
//!
//! 提供与传输无关的事件表示与版本规则：
//! - 规范版本与属性表（`spec`）：0.1 / 0.2 / 0.3 / 1.0 的属性名称与跨版本转换
//! - 事件（`event`）与属性取值（`value`）
//! - 结构化格式（`format`）：`application/cloudevents+json` 及按媒体类型的查找
//! - 载荷编解码（`codec`）：按 `datacontenttype` 解释载荷
//! - 注册表（`registry`）：版本与格式的只读集合
//!
//! 消息、编码器、转换器与传输等绑定层概念位于 `ce-binding`。
//!
pub mod codec;
pub mod error;
pub mod event;
pub mod format;
pub mod registry;
pub mod spec;
pub mod value;

pub use error::{EventError, EventResult};
pub use event::Event;
pub use registry::Registry;
pub use spec::{Attribute, AttributeKind, SUBJECT_EXTENSION, SpecVersion, Version, Versions};
pub use value::AttributeValue;
