use ce_event::{AttributeKind, AttributeValue};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use super::TransformerFactory;
use super::attribute::AddAttribute;

/// `id` 缺失或为空时填入新的 UUID（v4）
pub fn add_uuid() -> Arc<dyn TransformerFactory> {
    Arc::new(AddAttribute::new(
        AttributeKind::Id,
        Arc::new(|| AttributeValue::String(Uuid::new_v4().to_string())),
    ))
}

/// `time` 缺失时填入当前时间
pub fn add_time_now() -> Arc<dyn TransformerFactory> {
    Arc::new(AddAttribute::new(
        AttributeKind::Time,
        Arc::new(|| AttributeValue::Timestamp(Utc::now())),
    ))
}
