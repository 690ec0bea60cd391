use std::fmt;

/// 消息的原生编码，在构造时确定且之后不变
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    /// 单个自描述字节块
    Structured,
    /// 属性与载荷可分离
    Binary,
    /// 内存中的 `Event`
    Event,
    Unknown,
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Encoding::Structured => "structured",
            Encoding::Binary => "binary",
            Encoding::Event => "event",
            Encoding::Unknown => "unknown",
        };
        f.write_str(s)
    }
}
