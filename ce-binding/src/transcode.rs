//! 转码引擎（Transcoding）
//!
//! 以最少的工作把消息写入目标编码器，按优先级依次尝试：
//! 1. 结构化直通：目标支持结构化且每个转换器都支持结构化包装（或没有转换器）；
//! 2. 二进制直通：逐个属性复制，途中经过转换器链；
//! 3. 事件路径：完整解码为 `Event`，应用事件转换、校验后交给目标。
//!
//! 模式拒绝（`NotStructured`/`NotBinary`）只用于选择下一条路径；
//! 任何其他错误立即中止，消息处于不确定状态，调用方须以该错误 `finish` 消息。
//!
use ce_event::Event;
use tokio_util::sync::CancellationToken;

use crate::encoder::{Encoder, write_binary};
use crate::encoding::Encoding;
use crate::error::{BindingError, BindingResult};
use crate::message::{EventBuilder, Message, ensure_active};
use crate::transformer::TransformerFactories;

/// 把消息写入目标编码器，返回实际使用的路径
pub async fn write(
    ctx: &CancellationToken,
    message: &mut dyn Message,
    encoder: &mut dyn Encoder,
    transformers: &TransformerFactories,
) -> BindingResult<Encoding> {
    ensure_active(ctx)?;
    let source = message.encoding();

    if let Some(structured) = encoder.as_structured()
        && let Some(mut chain) = transformers.structured(Box::new(structured))
    {
        match message.structured(ctx, chain.as_mut()).await {
            Ok(()) => {
                tracing::debug!(%source, "transcoded via structured path");
                return Ok(Encoding::Structured);
            }
            Err(err) if err.is_decline() => {}
            Err(err) => return Err(err),
        }
    }

    if let Some(binary) = encoder.as_binary() {
        let mut chain = transformers.binary(Box::new(binary));
        match message.binary(ctx, chain.as_mut()).await {
            Ok(()) => {
                tracing::debug!(%source, transformers = transformers.len(), "transcoded via binary path");
                return Ok(Encoding::Binary);
            }
            Err(err) if err.is_decline() => {}
            Err(err) => return Err(err),
        }
    }

    let mut builder = EventBuilder::new();
    message.event(ctx, &mut builder).await?;
    let mut event = builder.into_event()?;
    transformers.transform_event(&mut event)?;
    event.validate()?;
    deliver_event(event, encoder)?;

    tracing::debug!(%source, transformers = transformers.len(), "transcoded via event path");
    Ok(Encoding::Event)
}

/// 把已解码的事件交给目标：优先事件，其次二进制，最后以首选格式结构化
fn deliver_event(event: Event, encoder: &mut dyn Encoder) -> BindingResult<()> {
    if let Some(target) = encoder.as_event() {
        return target.encode(event);
    }
    if let Some(target) = encoder.as_binary() {
        return write_binary(&event, target);
    }

    let format = encoder.preferred_format();
    let Some(target) = encoder.as_structured() else {
        return Err(BindingError::unsupported_encoder(
            "encoder accepts no encoding",
        ));
    };
    let format = format.ok_or_else(|| {
        BindingError::unsupported_encoder("structured encoder declares no preferred format")
    })?;
    let bytes = format.marshal(&event)?;
    target.set_structured_event(format, bytes)
}

/// 把任意消息还原为经过校验的 `Event`，并返回读取时使用的路径
pub async fn to_event(
    ctx: &CancellationToken,
    message: &mut dyn Message,
    transformers: &TransformerFactories,
) -> BindingResult<(Event, Encoding)> {
    let mut builder = EventBuilder::new();
    let encoding = write(ctx, message, &mut builder, transformers).await?;
    let event = builder.into_event()?;
    event.validate()?;
    Ok((event, encoding))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::StructuredEncoder;
    use crate::message::{EventMessage, HeaderEncoder, StructuredMessage};
    use crate::transformer::add_attribute;
    use ce_event::format::Format;
    use ce_event::{AttributeKind, Registry, SpecVersion};
    use std::sync::Arc;

    fn event() -> Event {
        Event::builder()
            .id("1")
            .source("/s")
            .ty("com.example.test")
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn structured_message_passes_through_untouched() {
        let registry = Arc::new(Registry::default());
        let format = registry.formats().default_format();
        let body = format.marshal(&event()).unwrap();
        let mut message = StructuredMessage::new(format, body.clone());

        let mut encoder = HeaderEncoder::new(registry);
        let path = write(
            &CancellationToken::new(),
            &mut message,
            &mut encoder,
            &TransformerFactories::new(),
        )
        .await
        .unwrap();

        assert_eq!(path, Encoding::Structured);
        assert_eq!(encoder.body(), &body);
    }

    #[tokio::test]
    async fn transformers_disable_the_structured_fast_path() {
        let registry = Registry::default();
        let mut message = StructuredMessage::new(
            registry.formats().default_format(),
            r#"{"specversion":"1.0","id":"","source":"/s","type":"com.example.test"}"#,
        );

        let transformers: TransformerFactories =
            [add_attribute(AttributeKind::Id, "x")].into_iter().collect();
        let (event, path) = to_event(&CancellationToken::new(), &mut message, &transformers)
            .await
            .unwrap();

        assert_eq!(path, Encoding::Event);
        assert_eq!(event.id(), "x");
    }

    #[tokio::test]
    async fn structured_only_target_receives_default_format() {
        let registry = Arc::new(Registry::default());
        let mut message = EventMessage::new(event());
        let mut encoder = HeaderEncoder::structured(registry.clone());

        let path = write(
            &CancellationToken::new(),
            &mut message,
            &mut encoder,
            &TransformerFactories::new(),
        )
        .await
        .unwrap();

        assert_eq!(path, Encoding::Event);
        assert_eq!(
            encoder.headers().get("content-type").map(String::as_str),
            Some("application/cloudevents+json")
        );
        let decoded = registry
            .formats()
            .default_format()
            .unmarshal(encoder.body())
            .unwrap();
        assert_eq!(decoded, event());
    }

    #[tokio::test]
    async fn invalid_event_is_not_delivered() {
        let mut incomplete = Event::empty(SpecVersion::V10);
        incomplete.set_source("/s").unwrap();
        let mut message = EventMessage::new(incomplete);

        let result = to_event(
            &CancellationToken::new(),
            &mut message,
            &TransformerFactories::new(),
        )
        .await;
        assert!(matches!(result, Err(BindingError::Event(_))));
    }

    #[tokio::test]
    async fn cancelled_context_aborts_before_reading() {
        let ctx = CancellationToken::new();
        ctx.cancel();
        let mut message = EventMessage::new(event());
        let result = to_event(&ctx, &mut message, &TransformerFactories::new()).await;
        assert!(matches!(result, Err(BindingError::Cancelled)));
    }

    struct NoRoles;

    impl Encoder for NoRoles {}

    #[tokio::test]
    async fn encoder_without_roles_is_reported() {
        let mut message = EventMessage::new(event());
        let result = write(
            &CancellationToken::new(),
            &mut message,
            &mut NoRoles,
            &TransformerFactories::new(),
        )
        .await;
        assert!(matches!(
            result,
            Err(BindingError::UnsupportedEncoder { .. })
        ));
    }

    struct StructuredOnly {
        received: Option<(String, usize)>,
    }

    impl StructuredEncoder for StructuredOnly {
        fn set_structured_event(
            &mut self,
            format: Arc<dyn Format>,
            event: bytes::Bytes,
        ) -> BindingResult<()> {
            self.received = Some((format.media_type().to_string(), event.len()));
            Ok(())
        }
    }

    impl Encoder for StructuredOnly {
        fn as_structured(&mut self) -> Option<&mut dyn StructuredEncoder> {
            Some(self)
        }
    }

    #[tokio::test]
    async fn structured_target_without_format_is_reported() {
        let mut message = EventMessage::new(event());
        let mut encoder = StructuredOnly { received: None };
        let result = write(
            &CancellationToken::new(),
            &mut message,
            &mut encoder,
            &TransformerFactories::new(),
        )
        .await;
        assert!(matches!(
            result,
            Err(BindingError::UnsupportedEncoder { .. })
        ));
        assert!(encoder.received.is_none());
    }
}
