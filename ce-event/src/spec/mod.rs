//! 规范版本与属性注册表（spec）
//!
//! 将与版本无关的逻辑属性（`AttributeKind`）映射为各规范版本下的线上名称，
//! 并提供基于属性的读写访问与版本间转换：
//! - `SpecVersion`：0.1 / 0.2 / 0.3 / 1.0 四个版本及其固定的属性表；
//! - `Attribute`：绑定到具体版本的属性，带 `get/set/delete` 访问器；
//! - `Versions`/`Version`：进程启动时构建一次的不可变注册表，负责按名称解析与转换。
//!
//! 所有 Kind → Name 的映射都是静态数据而非计算结果，便于逐版本审计。

mod attribute;
mod version;
mod versions;

pub use attribute::{Attribute, AttributeKind};
pub use version::SpecVersion;
pub use versions::{SUBJECT_EXTENSION, Version, Versions};
