use std::collections::HashMap;

use super::attribute::{Attribute, AttributeKind};
use super::version::SpecVersion;
use crate::error::{EventError, EventResult};
use crate::event::Event;
use crate::value::AttributeValue;

/// 单个规范版本的属性视图，附带按名称的索引
#[derive(Debug)]
pub struct Version {
    spec: SpecVersion,
    by_kind: HashMap<AttributeKind, Attribute>,
    by_name: HashMap<String, Attribute>,
}

impl Version {
    fn new(spec: SpecVersion) -> Self {
        let attributes = spec.attributes();
        Self {
            spec,
            by_kind: attributes.iter().map(|a| (a.kind(), *a)).collect(),
            by_name: attributes
                .iter()
                .map(|a| (a.name().to_ascii_lowercase(), *a))
                .collect(),
        }
    }

    pub fn spec(&self) -> SpecVersion {
        self.spec
    }

    pub fn as_str(&self) -> &'static str {
        self.spec.as_str()
    }

    pub fn attribute_from_kind(&self, kind: AttributeKind) -> Option<Attribute> {
        self.by_kind.get(&kind).copied()
    }

    /// 按线上名称查找属性（不区分大小写）
    pub fn attribute(&self, name: &str) -> Option<Attribute> {
        self.by_name.get(&name.to_ascii_lowercase()).copied()
    }

    pub fn attributes(&self) -> &'static [Attribute] {
        self.spec.attributes()
    }

    /// 该版本下的空事件（必填属性待填充）
    pub fn new_event(&self) -> Event {
        Event::empty(self.spec)
    }

    /// 转换为本版本的语义等价事件：
    /// - 保留全部扩展属性与载荷；
    /// - 目标版本不支持 `subject` 时，降级为同名扩展属性；
    /// - 目标版本支持 `subject` 且存在同名扩展时，提升为属性。
    ///
    /// 扩展属性名在设置时已排除任一版本的上下文属性名，转换后不会遮蔽属性。
    /// 目标版本与源版本相同时原样返回。
    pub fn convert(&self, mut event: Event) -> Event {
        if event.specversion == self.spec {
            return event;
        }

        if self.spec.has(AttributeKind::Subject) {
            if event.subject.is_none()
                && let Some(subject) = event.extensions.remove(SUBJECT_EXTENSION)
            {
                event.subject = Some(subject.to_canonical_string());
            }
        } else if let Some(subject) = event.subject.take() {
            event
                .extensions
                .insert(SUBJECT_EXTENSION.to_string(), AttributeValue::String(subject));
        }

        tracing::trace!(from = %event.specversion, to = %self.spec, id = %event.id, "convert event");
        event.specversion = self.spec;
        event
    }
}

/// `subject` 在 0.3 之前不存在，降级时以此名称保存为扩展属性
pub const SUBJECT_EXTENSION: &str = "subject";

/// 规范版本注册表：进程启动时构建一次，之后只读
#[derive(Debug)]
pub struct Versions {
    versions: Vec<Version>,
}

impl Default for Versions {
    fn default() -> Self {
        Self::new()
    }
}

impl Versions {
    pub fn new() -> Self {
        Self {
            versions: SpecVersion::ALL.into_iter().map(Version::new).collect(),
        }
    }

    /// 按版本字符串解析（如 "1.0"）
    pub fn version(&self, name: &str) -> EventResult<&Version> {
        let spec: SpecVersion = name.parse()?;
        Ok(self.get(spec))
    }

    pub fn get(&self, spec: SpecVersion) -> &Version {
        // 注册顺序与 SpecVersion::ALL 一致
        &self.versions[spec as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Version> {
        self.versions.iter()
    }

    /// 各版本 specversion 属性的线上名称（去重），解码器据此识别版本
    pub fn spec_version_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = Vec::new();
        for version in &self.versions {
            if let Some(attr) = version.attribute_from_kind(AttributeKind::SpecVersion)
                && !names.contains(&attr.name())
            {
                names.push(attr.name());
            }
        }
        names
    }

    /// 根据取值函数（按名称取值）识别消息的规范版本
    pub fn detect<'a, F>(&self, mut lookup: F) -> EventResult<&Version>
    where
        F: FnMut(&str) -> Option<&'a str>,
    {
        for name in self.spec_version_names() {
            if let Some(value) = lookup(name) {
                return self.version(value);
            }
        }
        Err(EventError::missing("specversion"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample(version: SpecVersion) -> Event {
        let builder = Event::builder()
            .specversion(version)
            .id("id-1")
            .source("http://x")
            .ty("com.example.test")
            .dataschema("http://schema/1")
            .maybe_subject(version.has(AttributeKind::Subject).then_some("subj"));
        let mut e = builder.build().unwrap();
        e.set_extension("traceparent", "00-abc").unwrap();
        e
    }

    #[test]
    fn lookup_by_name_and_kind() {
        let versions = Versions::new();
        let v01 = versions.version("0.1").unwrap();
        assert_eq!(v01.attribute("EVENTID").unwrap().kind(), AttributeKind::Id);
        assert!(v01.attribute_from_kind(AttributeKind::Subject).is_none());

        let v1 = versions.get(SpecVersion::V10);
        assert_eq!(
            v1.attribute_from_kind(AttributeKind::DataSchema).unwrap().name(),
            "dataschema"
        );
        assert!(versions.version("9.9").is_err());
    }

    #[test]
    fn schemaurl_becomes_dataschema() {
        let versions = Versions::new();
        let e = sample(SpecVersion::V02);
        let v1 = versions.get(SpecVersion::V10).convert(e);

        let dataschema = v1.specversion().attribute(AttributeKind::DataSchema).unwrap();
        assert_eq!(dataschema.name(), "dataschema");
        assert_eq!(
            dataschema.get(&v1),
            Some(AttributeValue::Uri("http://schema/1".into()))
        );
        assert!(v1.extension("schemaurl").is_none());
    }

    #[test]
    fn subject_demoted_and_promoted() {
        let versions = Versions::new();
        let e = sample(SpecVersion::V10);

        let v02 = versions.get(SpecVersion::V02).convert(e.clone());
        assert!(v02.subject().is_none());
        assert_eq!(v02.extension("subject"), Some(&AttributeValue::from("subj")));

        let back = versions.get(SpecVersion::V10).convert(v02);
        assert_eq!(back, e);
    }

    #[test]
    fn detect_version() {
        let versions = Versions::new();
        let v = versions
            .detect(|name| (name == "cloudEventsVersion").then_some("0.1"))
            .unwrap();
        assert_eq!(v.spec(), SpecVersion::V01);
        assert!(versions.detect(|_| None).is_err());
    }

    fn any_version() -> impl Strategy<Value = SpecVersion> {
        prop::sample::select(SpecVersion::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn convert_is_idempotent(from in any_version(), to in any_version(), ext in "[a-z0-9]{1,8}") {
            let versions = Versions::new();
            let mut e = sample(from);
            let _ = e.set_extension(&ext, "v");
            let target = versions.get(to);
            let once = target.convert(e);
            let twice = target.convert(once.clone());
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn convert_preserves_extensions(from in any_version(), to in any_version()) {
            let versions = Versions::new();
            let e = sample(from);
            let converted = versions.get(to).convert(e);
            prop_assert_eq!(converted.extension("traceparent"), Some(&AttributeValue::from("00-abc")));
            prop_assert_eq!(converted.specversion(), to);
        }
    }
}
