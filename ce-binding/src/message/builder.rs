use bytes::Bytes;
use ce_event::error::EventError;
use ce_event::format::Format;
use ce_event::{Attribute, AttributeValue, Event};
use std::sync::Arc;

use crate::encoder::{BinaryEncoder, Encoder, EventEncoder, StructuredEncoder};
use crate::error::{BindingError, BindingResult};

/// 把任意模式的写入还原为 `Event`（不做必填校验）
///
/// 二进制写入顺序不限：版本确定之前到达的扩展属性与载荷先暂存，
/// 待首个属性写入（或 `into_event`）时再落到事件上。
#[derive(Debug, Default)]
pub struct EventBuilder {
    event: Option<Event>,
    pending_extensions: Vec<(String, AttributeValue)>,
    pending_data: Option<Bytes>,
}

impl EventBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 取出构建的事件；尚未写入任何属性时返回 `NoEncoding`
    pub fn into_event(mut self) -> BindingResult<Event> {
        let mut event = self.event.take().ok_or(BindingError::NoEncoding)?;
        self.flush(&mut event)?;
        Ok(event)
    }

    fn flush(&mut self, event: &mut Event) -> BindingResult<()> {
        for (name, value) in self.pending_extensions.drain(..) {
            event.set_extension(&name, value)?;
        }
        if let Some(data) = self.pending_data.take() {
            event.set_data(None, data);
        }
        Ok(())
    }
}

impl StructuredEncoder for EventBuilder {
    fn set_structured_event(&mut self, format: Arc<dyn Format>, event: Bytes) -> BindingResult<()> {
        self.event = Some(format.unmarshal(&event)?);
        Ok(())
    }
}

impl BinaryEncoder for EventBuilder {
    fn set_attribute(&mut self, attribute: Attribute, value: AttributeValue) -> BindingResult<()> {
        let mut event = self
            .event
            .take()
            .unwrap_or_else(|| Event::empty(attribute.version()));
        if event.specversion() != attribute.version() {
            let err = EventError::VersionMismatch {
                expected: event.specversion(),
                found: attribute.version(),
            };
            self.event = Some(event);
            return Err(err.into());
        }
        let result = self
            .flush(&mut event)
            .and_then(|()| Ok(attribute.set(&mut event, value)?));
        self.event = Some(event);
        result
    }

    fn set_extension(&mut self, name: &str, value: AttributeValue) -> BindingResult<()> {
        match self.event.as_mut() {
            Some(event) => event.set_extension(name, value)?,
            None => self.pending_extensions.push((name.to_string(), value)),
        }
        Ok(())
    }

    fn set_data(&mut self, data: Bytes) -> BindingResult<()> {
        match self.event.as_mut() {
            Some(event) => event.set_data(None, data),
            None => self.pending_data = Some(data),
        }
        Ok(())
    }

    fn end(&mut self) -> BindingResult<()> {
        Ok(())
    }
}

impl EventEncoder for EventBuilder {
    fn encode(&mut self, event: Event) -> BindingResult<()> {
        self.event = Some(event);
        Ok(())
    }
}

impl Encoder for EventBuilder {
    fn as_structured(&mut self) -> Option<&mut dyn StructuredEncoder> {
        Some(self)
    }

    fn as_binary(&mut self) -> Option<&mut dyn BinaryEncoder> {
        Some(self)
    }

    fn as_event(&mut self) -> Option<&mut dyn EventEncoder> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ce_event::{AttributeKind, SpecVersion};

    #[test]
    fn binary_writes_build_an_event() {
        let mut builder = EventBuilder::new();
        let v03 = SpecVersion::V03;
        let attr = |kind| v03.attribute(kind).unwrap();

        builder
            .set_attribute(attr(AttributeKind::SpecVersion), "0.3".into())
            .unwrap();
        builder.set_attribute(attr(AttributeKind::Id), "1".into()).unwrap();
        builder
            .set_attribute(attr(AttributeKind::Time), "2020-01-01T00:00:00Z".into())
            .unwrap();
        builder.set_extension("Trace", "abc".into()).unwrap();
        builder.set_data(Bytes::from_static(b"{}")).unwrap();
        builder.end().unwrap();

        let event = builder.into_event().unwrap();
        assert_eq!(event.specversion(), SpecVersion::V03);
        assert_eq!(event.id(), "1");
        assert!(event.time().is_some());
        assert_eq!(event.extension("trace"), Some(&AttributeValue::from("abc")));
        // 缺少 source/type：构建器不校验
        assert!(event.validate().is_err());
    }

    #[test]
    fn mixed_versions_are_rejected() {
        let mut builder = EventBuilder::new();
        builder
            .set_attribute(
                SpecVersion::V10.attribute(AttributeKind::Id).unwrap(),
                "1".into(),
            )
            .unwrap();
        let err = builder
            .set_attribute(
                SpecVersion::V02.attribute(AttributeKind::Type).unwrap(),
                "t".into(),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            BindingError::Event(EventError::VersionMismatch { .. })
        ));
    }

    #[test]
    fn extensions_and_data_may_precede_the_version() {
        let mut builder = EventBuilder::new();
        let v10 = SpecVersion::V10;
        let attr = |kind| v10.attribute(kind).unwrap();

        builder.set_extension("Trace", "abc".into()).unwrap();
        builder.set_data(Bytes::from_static(b"{}")).unwrap();
        builder
            .set_attribute(attr(AttributeKind::SpecVersion), "1.0".into())
            .unwrap();
        builder.set_attribute(attr(AttributeKind::Id), "1".into()).unwrap();
        builder.set_extension("late", 2.into()).unwrap();
        builder.end().unwrap();

        let event = builder.into_event().unwrap();
        assert_eq!(event.extension("trace"), Some(&AttributeValue::from("abc")));
        assert_eq!(event.extension("late"), Some(&AttributeValue::from(2)));
        assert_eq!(event.data(), Some(&Bytes::from_static(b"{}")));
    }

    #[test]
    fn buffered_extension_names_are_still_checked() {
        let mut builder = EventBuilder::new();
        builder.set_extension("type", "spoofed".into()).unwrap();
        let err = builder
            .set_attribute(
                SpecVersion::V10.attribute(AttributeKind::Id).unwrap(),
                "1".into(),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            BindingError::Event(EventError::InvalidExtensionName { .. })
        ));
    }

    #[test]
    fn extensions_alone_do_not_make_an_event() {
        let mut builder = EventBuilder::new();
        builder.set_extension("trace", "abc".into()).unwrap();
        assert!(matches!(builder.into_event(), Err(BindingError::NoEncoding)));
    }

    #[test]
    fn empty_builder_has_no_event() {
        assert!(matches!(
            EventBuilder::new().into_event(),
            Err(BindingError::NoEncoding)
        ));
    }
}
