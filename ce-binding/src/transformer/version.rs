use bytes::Bytes;
use ce_event::{
    Attribute, AttributeKind, AttributeValue, Event, SUBJECT_EXTENSION, SpecVersion, Versions,
};
use std::sync::Arc;

use super::TransformerFactory;
use crate::encoder::BinaryEncoder;
use crate::error::BindingResult;

/// 把事件转换为 `target` 版本：属性按类别重新映射（如 `schemaurl` → `dataschema`），
/// 扩展属性原样保留
pub fn version(versions: Arc<Versions>, target: SpecVersion) -> Arc<dyn TransformerFactory> {
    Arc::new(VersionTransformer { versions, target })
}

struct VersionTransformer {
    versions: Arc<Versions>,
    target: SpecVersion,
}

impl TransformerFactory for VersionTransformer {
    fn binary_transformer<'a>(
        &self,
        inner: Box<dyn BinaryEncoder + 'a>,
    ) -> Box<dyn BinaryEncoder + 'a> {
        Box::new(VersionEncoder {
            inner,
            target: self.target,
        })
    }

    fn transform_event(&self, event: &mut Event) -> BindingResult<()> {
        let source = std::mem::replace(event, Event::empty(self.target));
        *event = self.versions.get(self.target).convert(source);
        Ok(())
    }
}

struct VersionEncoder<'a> {
    inner: Box<dyn BinaryEncoder + 'a>,
    target: SpecVersion,
}

impl BinaryEncoder for VersionEncoder<'_> {
    fn set_attribute(&mut self, attribute: Attribute, value: AttributeValue) -> BindingResult<()> {
        if attribute.version() == self.target {
            return self.inner.set_attribute(attribute, value);
        }
        match self.target.attribute(attribute.kind()) {
            Some(mapped) if attribute.kind() == AttributeKind::SpecVersion => self
                .inner
                .set_attribute(mapped, AttributeValue::String(self.target.as_str().to_string())),
            Some(mapped) => self.inner.set_attribute(mapped, value),
            // 目标版本没有该属性（只有 subject），降级为扩展属性
            None => self.inner.set_extension(SUBJECT_EXTENSION, value),
        }
    }

    fn set_extension(&mut self, name: &str, value: AttributeValue) -> BindingResult<()> {
        if name.eq_ignore_ascii_case(SUBJECT_EXTENSION)
            && let Some(subject) = self.target.attribute(AttributeKind::Subject)
        {
            return self.inner.set_attribute(subject, value);
        }
        self.inner.set_extension(name, value)
    }

    fn set_data(&mut self, data: Bytes) -> BindingResult<()> {
        self.inner.set_data(data)
    }

    fn end(&mut self) -> BindingResult<()> {
        self.inner.end()
    }
}
