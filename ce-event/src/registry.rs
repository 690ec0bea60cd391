//! 注册表（Registry）
//!
//! 版本、结构化格式与载荷编解码器的只读集合，进程启动时构建一次，
//! 之后以 `Arc` 共享给消息、编码器与转换器。
//!
use std::sync::Arc;

use crate::codec::{DataCodec, DataCodecs};
use crate::format::{Format, Formats};
use crate::spec::{SpecVersion, Version, Versions};

#[derive(Clone, Debug)]
pub struct Registry {
    versions: Arc<Versions>,
    formats: Formats,
    codecs: DataCodecs,
}

impl Default for Registry {
    fn default() -> Self {
        let versions = Arc::new(Versions::new());
        let formats = Formats::new(versions.clone());
        Self {
            versions,
            formats,
            codecs: DataCodecs::default(),
        }
    }
}

impl Registry {
    /// 追加结构化格式（同一媒体类型后注册者覆盖先注册者）
    pub fn with_format(mut self, format: Arc<dyn Format>) -> Self {
        self.formats = self.formats.with_format(format);
        self
    }

    /// 追加载荷编解码器（优先于已注册的同类编解码器）
    pub fn with_codec(mut self, codec: Arc<dyn DataCodec>) -> Self {
        self.codecs = self.codecs.with_codec(codec);
        self
    }

    pub fn versions(&self) -> &Arc<Versions> {
        &self.versions
    }

    pub fn version(&self, spec: SpecVersion) -> &Version {
        self.versions.get(spec)
    }

    pub fn formats(&self) -> &Formats {
        &self.formats
    }

    pub fn codecs(&self) -> &DataCodecs {
        &self.codecs
    }
}
