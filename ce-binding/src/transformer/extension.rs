use bytes::Bytes;
use ce_event::{Attribute, AttributeValue, Event};
use std::sync::Arc;

use super::{AttributeUpdater, TransformerFactory};
use crate::encoder::BinaryEncoder;
use crate::error::BindingResult;

/// 扩展属性缺失时补上 `value`
pub fn add_extension(name: &str, value: impl Into<AttributeValue>) -> Arc<dyn TransformerFactory> {
    Arc::new(AddExtension {
        name: name.to_ascii_lowercase(),
        value: value.into(),
    })
}

/// 扩展属性存在时用 `updater` 改写，返回 `None` 则删除
pub fn update_extension<F>(name: &str, updater: F) -> Arc<dyn TransformerFactory>
where
    F: Fn(AttributeValue) -> Option<AttributeValue> + Send + Sync + 'static,
{
    Arc::new(UpdateExtension {
        name: name.to_ascii_lowercase(),
        updater: Arc::new(updater),
    })
}

pub fn delete_extension(name: &str) -> Arc<dyn TransformerFactory> {
    update_extension(name, |_| None)
}

struct AddExtension {
    name: String,
    value: AttributeValue,
}

impl TransformerFactory for AddExtension {
    fn binary_transformer<'a>(
        &self,
        inner: Box<dyn BinaryEncoder + 'a>,
    ) -> Box<dyn BinaryEncoder + 'a> {
        Box::new(AddExtensionEncoder {
            inner,
            name: self.name.clone(),
            value: self.value.clone(),
            found: false,
        })
    }

    fn transform_event(&self, event: &mut Event) -> BindingResult<()> {
        if event.extension(&self.name).is_none() {
            event.set_extension(&self.name, self.value.clone())?;
        }
        Ok(())
    }
}

struct AddExtensionEncoder<'a> {
    inner: Box<dyn BinaryEncoder + 'a>,
    name: String,
    value: AttributeValue,
    found: bool,
}

impl BinaryEncoder for AddExtensionEncoder<'_> {
    fn set_attribute(&mut self, attribute: Attribute, value: AttributeValue) -> BindingResult<()> {
        self.inner.set_attribute(attribute, value)
    }

    fn set_extension(&mut self, name: &str, value: AttributeValue) -> BindingResult<()> {
        if name.eq_ignore_ascii_case(&self.name) {
            self.found = true;
        }
        self.inner.set_extension(name, value)
    }

    fn set_data(&mut self, data: Bytes) -> BindingResult<()> {
        self.inner.set_data(data)
    }

    fn end(&mut self) -> BindingResult<()> {
        if !self.found {
            self.inner.set_extension(&self.name, self.value.clone())?;
        }
        self.inner.end()
    }
}

struct UpdateExtension {
    name: String,
    updater: AttributeUpdater,
}

impl TransformerFactory for UpdateExtension {
    fn binary_transformer<'a>(
        &self,
        inner: Box<dyn BinaryEncoder + 'a>,
    ) -> Box<dyn BinaryEncoder + 'a> {
        Box::new(UpdateExtensionEncoder {
            inner,
            name: self.name.clone(),
            updater: self.updater.clone(),
        })
    }

    fn transform_event(&self, event: &mut Event) -> BindingResult<()> {
        if let Some(value) = event.extension(&self.name).cloned() {
            match (self.updater)(value) {
                Some(value) => event.set_extension(&self.name, value)?,
                None => {
                    event.remove_extension(&self.name);
                }
            }
        }
        Ok(())
    }
}

struct UpdateExtensionEncoder<'a> {
    inner: Box<dyn BinaryEncoder + 'a>,
    name: String,
    updater: AttributeUpdater,
}

impl BinaryEncoder for UpdateExtensionEncoder<'_> {
    fn set_attribute(&mut self, attribute: Attribute, value: AttributeValue) -> BindingResult<()> {
        self.inner.set_attribute(attribute, value)
    }

    fn set_extension(&mut self, name: &str, value: AttributeValue) -> BindingResult<()> {
        if !name.eq_ignore_ascii_case(&self.name) {
            return self.inner.set_extension(name, value);
        }
        match (self.updater)(value) {
            Some(value) => self.inner.set_extension(name, value),
            None => Ok(()),
        }
    }

    fn set_data(&mut self, data: Bytes) -> BindingResult<()> {
        self.inner.set_data(data)
    }

    fn end(&mut self) -> BindingResult<()> {
        self.inner.end()
    }
}
