//! Attachment extraction from fetched messages.
//!
//! Two payload layouts are recognised:
//!
//! * **flat**: the top-level parts are the candidates.
//! * **signed**: a `multipart/signed` root whose `multipart/mixed` children
//!   hold the candidates.
//!
//! Any other nesting (e.g. attachments under `multipart/alternative`) is not
//! walked. A candidate yields a descriptor only when its body carries an
//! attachment id.

use serde::Serialize;
use tracing::debug;

use crate::provider::{Message, MessagePart};

const MULTIPART_SIGNED: &str = "multipart/signed";
const MULTIPART_MIXED: &str = "multipart/mixed";

/// One downloadable attachment blob within one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttachmentDescriptor {
    pub mail_id: String,
    pub name: String,
    pub attachment_id: String,
}

/// Recognised layouts of a message payload.
#[derive(Debug, Clone, Copy)]
pub enum PayloadShape<'a> {
    /// No top-level parts; contributes nothing.
    Empty,
    /// Top-level parts are the candidates.
    Flat(&'a [MessagePart]),
    /// `multipart/signed` root; candidates sit in its `multipart/mixed` children.
    Signed(&'a [MessagePart]),
}

impl<'a> PayloadShape<'a> {
    pub fn of(message: &'a Message) -> Self {
        match &message.payload {
            Some(root) if !root.parts.is_empty() => {
                if root.mime_type.eq_ignore_ascii_case(MULTIPART_SIGNED) {
                    PayloadShape::Signed(&root.parts)
                } else {
                    PayloadShape::Flat(&root.parts)
                }
            }
            _ => PayloadShape::Empty,
        }
    }

    /// Parts that may carry an attachment, in document order.
    pub fn candidates(self) -> Box<dyn Iterator<Item = &'a MessagePart> + 'a> {
        match self {
            PayloadShape::Empty => Box::new(std::iter::empty()),
            PayloadShape::Flat(parts) => Box::new(parts.iter()),
            PayloadShape::Signed(parts) => Box::new(
                parts
                    .iter()
                    .filter(|p| p.mime_type.eq_ignore_ascii_case(MULTIPART_MIXED))
                    .flat_map(|p| p.parts.iter()),
            ),
        }
    }
}

/// Descriptors for one message, in part order.
pub fn extract_message(message: &Message) -> Vec<AttachmentDescriptor> {
    PayloadShape::of(message)
        .candidates()
        .filter_map(|part| {
            part.attachment_id().map(|attachment_id| AttachmentDescriptor {
                mail_id: message.id.clone(),
                name: part.filename.clone(),
                attachment_id: attachment_id.to_string(),
            })
        })
        .collect()
}

/// Flattens descriptors across messages. Missing (failed) messages are skipped.
pub fn extract<'a, I>(messages: I) -> Vec<AttachmentDescriptor>
where
    I: IntoIterator<Item = &'a Option<Message>>,
{
    let descriptors: Vec<AttachmentDescriptor> = messages
        .into_iter()
        .flatten()
        .flat_map(extract_message)
        .collect();
    debug!("Extracted {} attachment descriptors", descriptors.len());
    descriptors
}
