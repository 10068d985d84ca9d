//! Review listing query.

use serde::{Deserialize, Serialize};

use super::rules::Rule;
use super::schema::{FieldSpec, Schema};
use super::Dto;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewQueryDto {
    /// Provider whose reviews to list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
}

static REVIEW_QUERY: Schema = Schema {
    fields: &[FieldSpec {
        name: "providerId",
        rules: &[Rule::Optional, Rule::ObjectId],
    }],
};

impl Dto for ReviewQueryDto {
    const NAME: &'static str = "review_query";

    fn schema() -> &'static Schema {
        &REVIEW_QUERY
    }
}
