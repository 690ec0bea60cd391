use anyhow::Result as AnyResult;
use async_trait::async_trait;
use bytes::Bytes;
use ce_binding::message::{EventMessage, HeaderEncoder, HeaderMessage, StructuredMessage};
use ce_binding::transformer::{add_attribute, add_time_now, add_uuid, version};
use ce_binding::{
    BinaryEncoder, BindingError, BindingResult, Encoding, Message, StructuredEncoder,
    TransformerFactories, copy_message, to_event, write,
};
use ce_event::{AttributeKind, AttributeValue, Event, Registry, SpecVersion};
use chrono::{TimeZone, Utc};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn registry() -> Arc<Registry> {
    Arc::new(Registry::default())
}

fn samples() -> AnyResult<Vec<Event>> {
    let mut events = Vec::new();
    for spec in SpecVersion::ALL {
        let mut event = Event::builder()
            .specversion(spec)
            .id(ulid::Ulid::new().to_string())
            .source("https://example.com/orders")
            .ty("com.example.order.created")
            .time(Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap())
            .dataschema("https://example.com/schemas/order.json")
            .datacontenttype("application/json")
            .data(r#"{"order":42}"#)
            .build()?;
        event.set_extension("tenant", "acme")?;
        event.set_extension("priority", 3)?;
        events.push(event);

        let bare = Event::builder()
            .specversion(spec)
            .id("bare")
            .source("/s")
            .ty("t")
            .build()?;
        events.push(bare);

        let octets = Event::builder()
            .specversion(spec)
            .id("octets")
            .source("/s")
            .ty("t")
            .datacontenttype("application/octet-stream")
            .data(Bytes::from_static(&[0, 159, 146, 150]))
            .build()?;
        events.push(octets);

        let text = Event::builder()
            .specversion(spec)
            .id("text")
            .source("/s")
            .ty("t")
            .datacontenttype("text/plain; charset=utf-8")
            .data("plain words")
            .build()?;
        events.push(text);
    }
    Ok(events)
}

/// 以各种消息形态承载同一个事件
async fn carriers(event: &Event) -> AnyResult<Vec<(&'static str, Box<dyn Message>)>> {
    let ctx = CancellationToken::new();
    let registry = registry();
    let none = TransformerFactories::new();
    let json = registry.formats().default_format();

    let mut binary = HeaderEncoder::new(registry.clone());
    write(&ctx, &mut EventMessage::new(event.clone()), &mut binary, &none).await?;

    let mut structured = HeaderEncoder::structured(registry.clone());
    write(&ctx, &mut EventMessage::new(event.clone()), &mut structured, &none).await?;

    let structured_body = json.marshal(event)?;
    Ok(vec![
        ("event", boxed(EventMessage::new(event.clone()))),
        ("structured", boxed(StructuredMessage::new(json, structured_body))),
        ("header binary", boxed(binary.into_message())),
        ("header structured", boxed(structured.into_message())),
    ])
}

fn boxed(message: impl Message + 'static) -> Box<dyn Message> {
    Box::new(message)
}

#[tokio::test]
async fn every_carrier_round_trips() -> AnyResult<()> {
    let ctx = CancellationToken::new();
    for event in samples()? {
        for (name, mut message) in carriers(&event).await? {
            let (decoded, _) = to_event(&ctx, message.as_mut(), &TransformerFactories::new()).await?;
            assert_eq!(decoded, event, "{name} / {}", event.specversion());
        }
    }
    Ok(())
}

#[tokio::test]
async fn native_encoding_is_preserved_without_transformers() -> AnyResult<()> {
    let ctx = CancellationToken::new();
    let registry = registry();
    let event = samples()?.remove(0);

    for (name, mut message) in carriers(&event).await? {
        let native = message.encoding();
        let mut target = HeaderEncoder::new(registry.clone());
        let path = write(&ctx, message.as_mut(), &mut target, &TransformerFactories::new()).await?;
        let expected = match native {
            Encoding::Event => Encoding::Binary,
            other => other,
        };
        assert_eq!(path, expected, "{name}");
    }
    Ok(())
}

#[tokio::test]
async fn add_attribute_is_path_independent() -> AnyResult<()> {
    let ctx = CancellationToken::new();
    let registry = registry();
    let transformers: TransformerFactories =
        [add_attribute(AttributeKind::Id, "x")].into_iter().collect();
    let body = r#"{"specversion":"1.0","id":"","source":"/s","type":"t"}"#;

    let mut structured = StructuredMessage::new(registry.formats().default_format(), body);
    let mut binary = HeaderMessage::new(
        registry.clone(),
        [("ce-specversion", "1.0"), ("ce-id", ""), ("ce-source", "/s"), ("ce-type", "t")],
        "",
    );
    let mut in_memory = Event::empty(SpecVersion::V10);
    in_memory.set_source("/s")?;
    in_memory.set_type("t")?;
    let mut event = EventMessage::new(in_memory);

    let (a, _) = to_event(&ctx, &mut structured, &transformers).await?;
    let (b, path) = to_event(&ctx, &mut binary, &transformers).await?;
    assert_eq!(path, Encoding::Binary);
    let (c, _) = to_event(&ctx, &mut event, &transformers).await?;

    assert_eq!(a.id(), "x");
    assert_eq!(a, b);
    assert_eq!(b, c);
    Ok(())
}

#[tokio::test]
async fn second_read_is_detected() -> AnyResult<()> {
    let ctx = CancellationToken::new();
    let event = samples()?.remove(0);

    for (name, mut message) in carriers(&event).await? {
        if message.encoding() == Encoding::Event {
            continue;
        }
        to_event(&ctx, message.as_mut(), &TransformerFactories::new()).await?;
        let again = to_event(&ctx, message.as_mut(), &TransformerFactories::new()).await;
        assert!(
            matches!(again, Err(BindingError::AlreadyConsumed)),
            "{name}: {again:?}"
        );
    }
    Ok(())
}

#[tokio::test]
async fn buffered_copies_replay() -> AnyResult<()> {
    let ctx = CancellationToken::new();
    let none = TransformerFactories::new();
    for event in samples()? {
        for (name, mut message) in carriers(&event).await? {
            let mut copy = copy_message(&ctx, message.as_mut(), &none).await?;
            message.finish(None)?;

            let (first, _) = to_event(&ctx, &mut copy, &none).await?;
            let (second, _) = to_event(&ctx, &mut copy, &none).await?;
            assert_eq!(first, second, "{name}");
            assert_eq!(first, event, "{name}");
        }
    }
    Ok(())
}

#[tokio::test]
async fn default_metadata_fills_missing_id_and_time() -> AnyResult<()> {
    let ctx = CancellationToken::new();
    let registry = registry();
    let transformers: TransformerFactories = [add_uuid(), add_time_now()].into_iter().collect();
    let body = r#"{"specversion":"0.3","id":"","type":"com.example.test","source":"http://x"}"#;

    let mut message = StructuredMessage::new(registry.formats().default_format(), body);
    let mut target = HeaderEncoder::new(registry.clone());
    write(&ctx, &mut message, &mut target, &transformers).await?;

    let (event, _) = to_event(&ctx, &mut target.into_message(), &TransformerFactories::new()).await?;
    assert_eq!(event.specversion(), SpecVersion::V03);
    assert!(uuid::Uuid::parse_str(event.id()).is_ok());
    assert!(event.time().is_some_and(|t| t.timestamp() > 0));
    assert_eq!(event.ty(), "com.example.test");
    assert_eq!(event.source(), "http://x");
    Ok(())
}

#[tokio::test]
async fn version_upgrade_renames_schemaurl() -> AnyResult<()> {
    let ctx = CancellationToken::new();
    let registry = registry();
    let transformers: TransformerFactories =
        [version(registry.versions().clone(), SpecVersion::V10)]
            .into_iter()
            .collect();

    let mut source = HeaderEncoder::new(registry.clone());
    let v02 = Event::builder()
        .specversion(SpecVersion::V02)
        .id("1")
        .source("/s")
        .ty("t")
        .dataschema("http://example.com/schema")
        .build()?;
    write(&ctx, &mut EventMessage::new(v02), &mut source, &TransformerFactories::new()).await?;
    assert_eq!(
        source.headers().get("ce-schemaurl").map(String::as_str),
        Some("http://example.com/schema")
    );

    let mut target = HeaderEncoder::new(registry.clone());
    let path = write(&ctx, &mut source.into_message(), &mut target, &transformers).await?;
    assert_eq!(path, Encoding::Binary);

    let headers = target.headers();
    assert_eq!(headers.get("ce-specversion").map(String::as_str), Some("1.0"));
    assert_eq!(
        headers.get("ce-dataschema").map(String::as_str),
        Some("http://example.com/schema")
    );
    assert!(!headers.contains_key("ce-schemaurl"));
    Ok(())
}

/// 先写扩展属性与载荷、最后才写版本属性的消息
struct ExtensionFirst;

#[async_trait]
impl Message for ExtensionFirst {
    fn encoding(&self) -> Encoding {
        Encoding::Binary
    }

    async fn structured(
        &mut self,
        _ctx: &CancellationToken,
        _encoder: &mut dyn StructuredEncoder,
    ) -> BindingResult<()> {
        Err(BindingError::NotStructured)
    }

    async fn binary(
        &mut self,
        _ctx: &CancellationToken,
        encoder: &mut dyn BinaryEncoder,
    ) -> BindingResult<()> {
        encoder.set_extension("tenant", "acme".into())?;
        encoder.set_data(Bytes::from_static(br#"{"order":42}"#))?;
        for (kind, value) in [
            (AttributeKind::SpecVersion, "1.0"),
            (AttributeKind::Id, "1"),
            (AttributeKind::Source, "/s"),
            (AttributeKind::Type, "t"),
        ] {
            let attribute = SpecVersion::V10
                .attribute(kind)
                .ok_or(BindingError::NoEncoding)?;
            encoder.set_attribute(attribute, value.into())?;
        }
        encoder.end()
    }
}

#[tokio::test]
async fn binary_writes_may_arrive_in_any_order() -> AnyResult<()> {
    let ctx = CancellationToken::new();

    let (event, path) = to_event(&ctx, &mut ExtensionFirst, &TransformerFactories::new()).await?;
    assert_eq!(path, Encoding::Binary);
    assert_eq!(event.id(), "1");
    assert_eq!(event.extension("tenant"), Some(&AttributeValue::from("acme")));
    assert_eq!(event.data(), Some(&Bytes::from_static(br#"{"order":42}"#)));

    let registry = registry();
    let downgrade: TransformerFactories = [version(registry.versions().clone(), SpecVersion::V03)]
        .into_iter()
        .collect();
    let (event, _) = to_event(&ctx, &mut ExtensionFirst, &downgrade).await?;
    assert_eq!(event.specversion(), SpecVersion::V03);
    assert_eq!(event.extension("tenant"), Some(&AttributeValue::from("acme")));
    Ok(())
}
