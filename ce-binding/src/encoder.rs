//! 编码器（Encoder）
//!
//! 消息把自己写入的目标角色。具体的传输绑定只需实现与其原生形态相符的子集：
//! - `StructuredEncoder`：整块写入（格式 + 字节）；
//! - `BinaryEncoder`：逐个写入属性、扩展属性与载荷，最后 `end`；
//! - `EventEncoder`：直接接收解码后的 `Event`。
//!
//! `Encoder` 通过能力探测暴露目标支持的角色，转码引擎据此选择路径。
//!
use bytes::Bytes;
use ce_event::format::Format;
use ce_event::{Attribute, AttributeValue, Event};
use std::sync::Arc;

use crate::error::BindingResult;

pub trait StructuredEncoder: Send {
    /// 写入结构化事件；返回前必须消费完字节
    fn set_structured_event(&mut self, format: Arc<dyn Format>, event: Bytes) -> BindingResult<()>;
}

pub trait BinaryEncoder: Send {
    fn set_attribute(&mut self, attribute: Attribute, value: AttributeValue) -> BindingResult<()>;

    fn set_extension(&mut self, name: &str, value: AttributeValue) -> BindingResult<()>;

    fn set_data(&mut self, data: Bytes) -> BindingResult<()>;

    /// 全部属性与载荷写入完毕
    fn end(&mut self) -> BindingResult<()>;
}

pub trait EventEncoder: Send {
    fn encode(&mut self, event: Event) -> BindingResult<()>;
}

/// 目标编码器：按能力探测其支持的角色
pub trait Encoder: Send {
    fn as_structured(&mut self) -> Option<&mut dyn StructuredEncoder> {
        None
    }

    fn as_binary(&mut self) -> Option<&mut dyn BinaryEncoder> {
        None
    }

    fn as_event(&mut self) -> Option<&mut dyn EventEncoder> {
        None
    }

    /// 事件路径落地为结构化时使用的格式
    fn preferred_format(&self) -> Option<Arc<dyn Format>> {
        None
    }
}

impl<T> StructuredEncoder for &mut T
where
    T: StructuredEncoder + ?Sized,
{
    fn set_structured_event(&mut self, format: Arc<dyn Format>, event: Bytes) -> BindingResult<()> {
        (**self).set_structured_event(format, event)
    }
}

impl<T> BinaryEncoder for &mut T
where
    T: BinaryEncoder + ?Sized,
{
    fn set_attribute(&mut self, attribute: Attribute, value: AttributeValue) -> BindingResult<()> {
        (**self).set_attribute(attribute, value)
    }

    fn set_extension(&mut self, name: &str, value: AttributeValue) -> BindingResult<()> {
        (**self).set_extension(name, value)
    }

    fn set_data(&mut self, data: Bytes) -> BindingResult<()> {
        (**self).set_data(data)
    }

    fn end(&mut self) -> BindingResult<()> {
        (**self).end()
    }
}

impl<T> EventEncoder for &mut T
where
    T: EventEncoder + ?Sized,
{
    fn encode(&mut self, event: Event) -> BindingResult<()> {
        (**self).encode(event)
    }
}

/// 以二进制模式逐个写出事件的属性、扩展属性与载荷；`specversion` 总是最先写出
pub fn write_binary(event: &Event, encoder: &mut dyn BinaryEncoder) -> BindingResult<()> {
    for attribute in event.specversion().attributes() {
        if let Some(value) = attribute.get(event) {
            encoder.set_attribute(*attribute, value)?;
        }
    }
    for (name, value) in event.extensions() {
        encoder.set_extension(name, value.clone())?;
    }
    if let Some(data) = event.data() {
        encoder.set_data(data.clone())?;
    }
    encoder.end()
}
