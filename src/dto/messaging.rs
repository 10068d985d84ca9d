//! Messaging request bodies.

use serde::{Deserialize, Serialize};

use super::rules::Rule;
use super::schema::{FieldSpec, Schema};
use super::Dto;

/// Marks a conversation read, optionally only up to one message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub up_to_message_id: Option<String>,
}

static MARK_READ: Schema = Schema {
    fields: &[FieldSpec {
        name: "upToMessageId",
        rules: &[Rule::Optional, Rule::IsString],
    }],
};

impl Dto for MarkReadDto {
    const NAME: &'static str = "mark_read";

    fn schema() -> &'static Schema {
        &MARK_READ
    }
}
