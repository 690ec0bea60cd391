//! 转换器（Transformer）
//!
//! `TransformerFactory` 是无状态的蓝图，每次转码按需生成三种互相独立的变换：
//! - 包装结构化编码器（仅当变换无需解码字节块时才可用，通常不支持）；
//! - 包装二进制编码器，在 `set_attribute`/`end` 途中改写属性；
//! - 直接作用于已解码的 `Event`。
//!
//! `TransformerFactories` 按声明顺序应用：无论实际走哪条路径，
//! 先声明的工厂总是先看到属性，输出与路径无关。
//!
mod attribute;
mod extension;
mod metadata;
mod version;

pub use attribute::{AttributeUpdater, add_attribute, delete_attribute, update_attribute};
pub use extension::{add_extension, delete_extension, update_extension};
pub use metadata::{add_time_now, add_uuid};
pub use version::version;

use ce_event::error::EventError;
use ce_event::{Attribute, AttributeKind, Event, SpecVersion};
use std::sync::Arc;

use crate::encoder::{BinaryEncoder, StructuredEncoder};
use crate::error::BindingResult;

fn attribute_of(version: SpecVersion, kind: AttributeKind) -> BindingResult<Attribute> {
    version
        .attribute(kind)
        .ok_or_else(|| EventError::AttributeNotInVersion { kind, version }.into())
}

pub trait TransformerFactory: Send + Sync {
    /// 包装结构化编码器；返回 `None` 时整条链放弃结构化快速路径
    fn structured_transformer<'a>(
        &self,
        _inner: Box<dyn StructuredEncoder + 'a>,
    ) -> Option<Box<dyn StructuredEncoder + 'a>> {
        None
    }

    fn binary_transformer<'a>(
        &self,
        inner: Box<dyn BinaryEncoder + 'a>,
    ) -> Box<dyn BinaryEncoder + 'a>;

    fn transform_event(&self, event: &mut Event) -> BindingResult<()>;
}

impl<T> TransformerFactory for Arc<T>
where
    T: TransformerFactory + ?Sized,
{
    fn structured_transformer<'a>(
        &self,
        inner: Box<dyn StructuredEncoder + 'a>,
    ) -> Option<Box<dyn StructuredEncoder + 'a>> {
        (**self).structured_transformer(inner)
    }

    fn binary_transformer<'a>(
        &self,
        inner: Box<dyn BinaryEncoder + 'a>,
    ) -> Box<dyn BinaryEncoder + 'a> {
        (**self).binary_transformer(inner)
    }

    fn transform_event(&self, event: &mut Event) -> BindingResult<()> {
        (**self).transform_event(event)
    }
}

/// 有序的转换器工厂列表
#[derive(Clone, Default)]
pub struct TransformerFactories {
    factories: Vec<Arc<dyn TransformerFactory>>,
}

impl TransformerFactories {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, factory: Arc<dyn TransformerFactory>) -> Self {
        self.factories.push(factory);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// 构建结构化转码链；任一工厂不支持时返回 `None`
    pub fn structured<'a>(
        &self,
        encoder: Box<dyn StructuredEncoder + 'a>,
    ) -> Option<Box<dyn StructuredEncoder + 'a>> {
        self.factories
            .iter()
            .rev()
            .try_fold(encoder, |inner, factory| factory.structured_transformer(inner))
    }

    /// 构建二进制转码链：先声明的工厂位于最外层（最靠近消息）
    pub fn binary<'a>(&self, encoder: Box<dyn BinaryEncoder + 'a>) -> Box<dyn BinaryEncoder + 'a> {
        self.factories
            .iter()
            .rev()
            .fold(encoder, |inner, factory| factory.binary_transformer(inner))
    }

    /// 按声明顺序变换已解码的事件
    pub fn transform_event(&self, event: &mut Event) -> BindingResult<()> {
        self.factories
            .iter()
            .try_for_each(|factory| factory.transform_event(event))
    }
}

impl FromIterator<Arc<dyn TransformerFactory>> for TransformerFactories {
    fn from_iter<I: IntoIterator<Item = Arc<dyn TransformerFactory>>>(iter: I) -> Self {
        Self {
            factories: iter.into_iter().collect(),
        }
    }
}

impl Extend<Arc<dyn TransformerFactory>> for TransformerFactories {
    fn extend<I: IntoIterator<Item = Arc<dyn TransformerFactory>>>(&mut self, iter: I) {
        self.factories.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::write_binary;
    use crate::message::EventBuilder;
    use ce_event::AttributeValue;

    fn event() -> Event {
        Event::builder()
            .id("1")
            .source("/s")
            .ty("t")
            .build()
            .unwrap()
    }

    fn chain() -> TransformerFactories {
        // 两个工厂改写同一属性：后声明者的结果生效
        [
            update_attribute(AttributeKind::Type, |_| Some(AttributeValue::from("first"))),
            update_attribute(AttributeKind::Type, |v| {
                Some(AttributeValue::from(format!("{v}+second")))
            }),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn order_is_the_same_on_binary_and_event_paths() {
        let transformers = chain();

        let mut builder = EventBuilder::new();
        {
            let mut encoder = transformers.binary(Box::new(&mut builder));
            write_binary(&event(), encoder.as_mut()).unwrap();
        }
        let via_binary = builder.into_event().unwrap();

        let mut via_event = event();
        transformers.transform_event(&mut via_event).unwrap();

        assert_eq!(via_binary.ty(), "first+second");
        assert_eq!(via_binary, via_event);
    }

    #[test]
    fn structured_chain_requires_every_factory() {
        let mut builder = EventBuilder::new();
        assert!(
            TransformerFactories::new()
                .structured(Box::new(&mut builder))
                .is_some()
        );
        assert!(chain().structured(Box::new(&mut builder)).is_none());
    }
}
