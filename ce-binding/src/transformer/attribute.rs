use bytes::Bytes;
use ce_event::error::EventError;
use ce_event::{Attribute, AttributeKind, AttributeValue, Event, SpecVersion};
use std::sync::Arc;

use super::{TransformerFactory, attribute_of};
use crate::encoder::BinaryEncoder;
use crate::error::BindingResult;

/// 返回 `None` 表示删除该属性
pub type AttributeUpdater = Arc<dyn Fn(AttributeValue) -> Option<AttributeValue> + Send + Sync>;

type ValueFn = Arc<dyn Fn() -> AttributeValue + Send + Sync>;

/// 属性缺失（或必填属性为空）时补上 `value`，已存在则不变
pub fn add_attribute(
    kind: AttributeKind,
    value: impl Into<AttributeValue>,
) -> Arc<dyn TransformerFactory> {
    let value = value.into();
    Arc::new(AddAttribute::new(kind, Arc::new(move || value.clone())))
}

/// 属性存在时用 `updater` 改写
pub fn update_attribute<F>(kind: AttributeKind, updater: F) -> Arc<dyn TransformerFactory>
where
    F: Fn(AttributeValue) -> Option<AttributeValue> + Send + Sync + 'static,
{
    Arc::new(UpdateAttribute {
        kind,
        updater: Arc::new(updater),
    })
}

/// 删除可选属性；必填属性存在时报错
pub fn delete_attribute(kind: AttributeKind) -> Arc<dyn TransformerFactory> {
    update_attribute(kind, |_| None)
}

pub(super) struct AddAttribute {
    kind: AttributeKind,
    value: ValueFn,
}

impl AddAttribute {
    pub(super) fn new(kind: AttributeKind, value: ValueFn) -> Self {
        Self { kind, value }
    }
}

impl TransformerFactory for AddAttribute {
    fn binary_transformer<'a>(
        &self,
        inner: Box<dyn BinaryEncoder + 'a>,
    ) -> Box<dyn BinaryEncoder + 'a> {
        Box::new(AddAttributeEncoder {
            inner,
            kind: self.kind,
            value: self.value.clone(),
            version: None,
            found: false,
        })
    }

    fn transform_event(&self, event: &mut Event) -> BindingResult<()> {
        let attribute = attribute_of(event.specversion(), self.kind)?;
        if attribute.get(event).is_none() {
            attribute.set(event, (self.value)())?;
        }
        Ok(())
    }
}

struct AddAttributeEncoder<'a> {
    inner: Box<dyn BinaryEncoder + 'a>,
    kind: AttributeKind,
    value: ValueFn,
    version: Option<SpecVersion>,
    found: bool,
}

impl BinaryEncoder for AddAttributeEncoder<'_> {
    fn set_attribute(&mut self, attribute: Attribute, value: AttributeValue) -> BindingResult<()> {
        if attribute.kind() == self.kind {
            self.found = true;
        }
        self.version = Some(attribute.version());
        self.inner.set_attribute(attribute, value)
    }

    fn set_extension(&mut self, name: &str, value: AttributeValue) -> BindingResult<()> {
        self.inner.set_extension(name, value)
    }

    fn set_data(&mut self, data: Bytes) -> BindingResult<()> {
        self.inner.set_data(data)
    }

    fn end(&mut self) -> BindingResult<()> {
        if !self.found
            && let Some(version) = self.version
        {
            let attribute = attribute_of(version, self.kind)?;
            self.inner.set_attribute(attribute, (self.value)())?;
        }
        self.inner.end()
    }
}

struct UpdateAttribute {
    kind: AttributeKind,
    updater: AttributeUpdater,
}

impl TransformerFactory for UpdateAttribute {
    fn binary_transformer<'a>(
        &self,
        inner: Box<dyn BinaryEncoder + 'a>,
    ) -> Box<dyn BinaryEncoder + 'a> {
        Box::new(UpdateAttributeEncoder {
            inner,
            kind: self.kind,
            updater: self.updater.clone(),
        })
    }

    fn transform_event(&self, event: &mut Event) -> BindingResult<()> {
        let Some(attribute) = event.specversion().attribute(self.kind) else {
            return Ok(());
        };
        if let Some(value) = attribute.get(event) {
            match (self.updater)(value) {
                Some(value) => attribute.set(event, value)?,
                None => attribute.delete(event)?,
            }
        }
        Ok(())
    }
}

struct UpdateAttributeEncoder<'a> {
    inner: Box<dyn BinaryEncoder + 'a>,
    kind: AttributeKind,
    updater: AttributeUpdater,
}

impl BinaryEncoder for UpdateAttributeEncoder<'_> {
    fn set_attribute(&mut self, attribute: Attribute, value: AttributeValue) -> BindingResult<()> {
        if attribute.kind() != self.kind {
            return self.inner.set_attribute(attribute, value);
        }
        match (self.updater)(value) {
            Some(value) => self.inner.set_attribute(attribute, value),
            None if self.kind.is_required() => Err(EventError::invalid(
                attribute.name(),
                "required attribute cannot be deleted",
            )
            .into()),
            None => Ok(()),
        }
    }

    fn set_extension(&mut self, name: &str, value: AttributeValue) -> BindingResult<()> {
        self.inner.set_extension(name, value)
    }

    fn set_data(&mut self, data: Bytes) -> BindingResult<()> {
        self.inner.set_data(data)
    }

    fn end(&mut self) -> BindingResult<()> {
        self.inner.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::write_binary;
    use crate::error::BindingError;
    use crate::message::EventBuilder;
    use crate::transformer::TransformerFactories;

    fn event(id: &str) -> Event {
        Event::builder()
            .specversion(SpecVersion::V03)
            .id(id)
            .source("http://x")
            .ty("com.example.test")
            .subject("s")
            .build()
            .unwrap()
    }

    fn via_binary(transformers: &TransformerFactories, event: &Event) -> BindingResult<Event> {
        let mut builder = EventBuilder::new();
        {
            let mut encoder = transformers.binary(Box::new(&mut builder));
            write_binary(event, encoder.as_mut())?;
        }
        builder.into_event()
    }

    fn via_event(transformers: &TransformerFactories, event: &Event) -> BindingResult<Event> {
        let mut event = event.clone();
        transformers.transform_event(&mut event)?;
        Ok(event)
    }

    #[test]
    fn add_fills_only_missing_attribute() {
        let transformers: TransformerFactories =
            [add_attribute(AttributeKind::Id, "x")].into_iter().collect();

        for path in [via_binary, via_event] {
            assert_eq!(path(&transformers, &event("")).unwrap().id(), "x");
            assert_eq!(path(&transformers, &event("kept")).unwrap().id(), "kept");
        }
    }

    #[test]
    fn update_and_delete_optional_attribute() {
        let transformers: TransformerFactories = [
            update_attribute(AttributeKind::Type, |v| {
                Some(AttributeValue::from(format!("{v}.v2")))
            }),
            delete_attribute(AttributeKind::Subject),
        ]
        .into_iter()
        .collect();

        let a = via_binary(&transformers, &event("1")).unwrap();
        let b = via_event(&transformers, &event("1")).unwrap();
        assert_eq!(a.ty(), "com.example.test.v2");
        assert!(a.subject().is_none());
        assert_eq!(a, b);
    }

    #[test]
    fn deleting_required_attribute_fails_on_every_path() {
        let transformers: TransformerFactories =
            [delete_attribute(AttributeKind::Source)].into_iter().collect();

        assert!(matches!(
            via_binary(&transformers, &event("1")),
            Err(BindingError::Event(EventError::InvalidAttribute { .. }))
        ));
        assert!(matches!(
            via_event(&transformers, &event("1")),
            Err(BindingError::Event(EventError::InvalidAttribute { .. }))
        ));
    }

    #[test]
    fn adding_attribute_missing_from_version_fails() {
        let transformers: TransformerFactories =
            [add_attribute(AttributeKind::Subject, "s")].into_iter().collect();
        let v02 = Event::builder()
            .specversion(SpecVersion::V02)
            .id("1")
            .source("/s")
            .ty("t")
            .build()
            .unwrap();
        assert!(via_binary(&transformers, &v02).is_err());
        assert!(via_event(&transformers, &v02).is_err());
    }
}
