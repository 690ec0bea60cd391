use async_trait::async_trait;
use bytes::Bytes;
use ce_event::format::Format;
use ce_event::{Attribute, AttributeValue, Event};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::encoder::{BinaryEncoder, Encoder, EventEncoder, StructuredEncoder, write_binary};
use crate::encoding::Encoding;
use crate::error::{BindingError, BindingResult};
use crate::message::{Message, ensure_active};

/// 内存中的消息副本，克隆后互不影响
#[derive(Debug, Clone)]
pub enum BufferedMessage {
    Structured {
        format: Arc<dyn Format>,
        body: Bytes,
    },
    Binary {
        attributes: Vec<(Attribute, AttributeValue)>,
        extensions: Vec<(String, AttributeValue)>,
        data: Option<Bytes>,
    },
    Event(Event),
}

#[async_trait]
impl Message for BufferedMessage {
    fn encoding(&self) -> Encoding {
        match self {
            BufferedMessage::Structured { .. } => Encoding::Structured,
            BufferedMessage::Binary { .. } => Encoding::Binary,
            BufferedMessage::Event(_) => Encoding::Event,
        }
    }

    async fn structured(
        &mut self,
        ctx: &CancellationToken,
        encoder: &mut dyn StructuredEncoder,
    ) -> BindingResult<()> {
        let BufferedMessage::Structured { format, body } = self else {
            return Err(BindingError::NotStructured);
        };
        ensure_active(ctx)?;
        encoder.set_structured_event(format.clone(), body.clone())
    }

    async fn binary(
        &mut self,
        ctx: &CancellationToken,
        encoder: &mut dyn BinaryEncoder,
    ) -> BindingResult<()> {
        match self {
            BufferedMessage::Structured { .. } => Err(BindingError::NotBinary),
            BufferedMessage::Binary {
                attributes,
                extensions,
                data,
            } => {
                ensure_active(ctx)?;
                for (attribute, value) in attributes.iter() {
                    encoder.set_attribute(*attribute, value.clone())?;
                }
                for (name, value) in extensions.iter() {
                    encoder.set_extension(name, value.clone())?;
                }
                if let Some(data) = data {
                    encoder.set_data(data.clone())?;
                }
                encoder.end()
            }
            BufferedMessage::Event(event) => {
                ensure_active(ctx)?;
                write_binary(event, encoder)
            }
        }
    }
}

/// 复制目标：记录源消息以何种模式写入
#[derive(Debug, Default)]
pub(super) struct MessageBuffer {
    structured: Option<(Arc<dyn Format>, Bytes)>,
    attributes: Vec<(Attribute, AttributeValue)>,
    extensions: Vec<(String, AttributeValue)>,
    data: Option<Bytes>,
    ended: bool,
    event: Option<Event>,
}

impl MessageBuffer {
    pub(super) fn into_message(self) -> BindingResult<BufferedMessage> {
        if let Some((format, body)) = self.structured {
            return Ok(BufferedMessage::Structured { format, body });
        }
        if let Some(event) = self.event {
            return Ok(BufferedMessage::Event(event));
        }
        if self.ended {
            return Ok(BufferedMessage::Binary {
                attributes: self.attributes,
                extensions: self.extensions,
                data: self.data,
            });
        }
        Err(BindingError::NoEncoding)
    }
}

impl StructuredEncoder for MessageBuffer {
    fn set_structured_event(&mut self, format: Arc<dyn Format>, event: Bytes) -> BindingResult<()> {
        self.structured = Some((format, event));
        Ok(())
    }
}

impl BinaryEncoder for MessageBuffer {
    fn set_attribute(&mut self, attribute: Attribute, value: AttributeValue) -> BindingResult<()> {
        self.attributes.push((attribute, value));
        Ok(())
    }

    fn set_extension(&mut self, name: &str, value: AttributeValue) -> BindingResult<()> {
        self.extensions.push((name.to_ascii_lowercase(), value));
        Ok(())
    }

    fn set_data(&mut self, data: Bytes) -> BindingResult<()> {
        self.data = Some(data);
        Ok(())
    }

    fn end(&mut self) -> BindingResult<()> {
        self.ended = true;
        Ok(())
    }
}

impl EventEncoder for MessageBuffer {
    fn encode(&mut self, event: Event) -> BindingResult<()> {
        self.event = Some(event);
        Ok(())
    }
}

impl Encoder for MessageBuffer {
    fn as_structured(&mut self) -> Option<&mut dyn StructuredEncoder> {
        Some(self)
    }

    fn as_binary(&mut self) -> Option<&mut dyn BinaryEncoder> {
        Some(self)
    }

    fn as_event(&mut self) -> Option<&mut dyn EventEncoder> {
        Some(self)
    }
}
