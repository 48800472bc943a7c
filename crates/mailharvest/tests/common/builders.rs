//! Builders for provider payloads and test configuration.

#![allow(dead_code)]

use std::path::Path;

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;

use mailharvest::config::{Config, PacingConfig};
use mailharvest::provider::{Message, MessagePart, MessagePartBody};

/// Config writing into `output`, with no pacing so tests run fast.
pub fn test_config(output: &Path) -> Config {
    let mut config = Config::default();
    config.output_directory = output.to_path_buf();
    config.fetch.pacing = PacingConfig::None;
    config.persist.pacing = PacingConfig::None;
    config
}

/// Encodes bytes the way the provider returns attachment data.
pub fn url_safe(bytes: &[u8]) -> String {
    URL_SAFE.encode(bytes)
}

/// A leaf part carrying an attachment id.
pub fn attachment_part(filename: &str, attachment_id: &str) -> MessagePart {
    MessagePart {
        mime_type: "application/octet-stream".to_string(),
        filename: filename.to_string(),
        body: Some(MessagePartBody {
            attachment_id: Some(attachment_id.to_string()),
            size: 1,
            data: None,
        }),
        ..MessagePart::default()
    }
}

/// An inline text part without an attachment id.
pub fn text_part(filename: &str) -> MessagePart {
    MessagePart {
        mime_type: "text/plain".to_string(),
        filename: filename.to_string(),
        body: Some(MessagePartBody::default()),
        ..MessagePart::default()
    }
}

pub fn multipart(mime_type: &str, parts: Vec<MessagePart>) -> MessagePart {
    MessagePart {
        mime_type: mime_type.to_string(),
        parts,
        ..MessagePart::default()
    }
}

pub fn message(id: &str, payload: MessagePart) -> Message {
    Message {
        id: id.to_string(),
        payload: Some(payload),
        ..Message::default()
    }
}
