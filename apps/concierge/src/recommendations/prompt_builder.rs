//! Prompt Builder: turns a `PromptRequest` into the single instruction sent upstream.
//!
//! Pure and deterministic: the same request always yields the same text.

use serde::Serialize;

use crate::llm_client::prompts::GROUNDING_INSTRUCTION;
use crate::location::LocationContext;
use crate::recommendations::pagination::LOAD_MORE_BATCH;
use crate::recommendations::prompts::{
    CATEGORY_RESTRICTION_TEMPLATE, FIRST_PAGE_TEMPLATE, GEOGRAPHY_RULE, IMAGE_HOST_ALLOWLIST,
    IMAGE_RULE_TEMPLATE, INTRO_FIELD_SCHEMA, ITEM_SCHEMA, LOAD_MORE_TEMPLATE,
    LOCATION_SECTION_TEMPLATE,
};

/// Phrases that lift the single-category restriction.
const MIXED_CONTENT_PHRASES: &[&str] = &[
    "roteiro completo",
    "itinerário completo",
    "itinerario completo",
    "complete itinerary",
    "dicas gerais",
    "general tips",
];

const HOTEL_TERMS: &[&str] = &[
    "hotel", "hotéis", "hoteis", "hospedagem", "pousada", "hostel", "resort",
];
const FLIGHT_TERMS: &[&str] = &["voo", "vôo", "passage", "aéreo", "aereo", "flight"];
const RESTAURANT_TERMS: &[&str] = &["restaurante", "restaurant", "onde comer", "jantar", "almoço"];

/// A product category a query can single out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestedCategory {
    Hotel,
    Flight,
    Restaurant,
}

impl RequestedCategory {
    fn label(self) -> &'static str {
        match self {
            RequestedCategory::Hotel => "hotels",
            RequestedCategory::Flight => "flights",
            RequestedCategory::Restaurant => "restaurants",
        }
    }

    /// Value of the item `category` field; restaurants are `general` items.
    fn schema_value(self) -> &'static str {
        match self {
            RequestedCategory::Hotel => "hotel",
            RequestedCategory::Flight => "flight",
            RequestedCategory::Restaurant => "general",
        }
    }
}

/// Detects a query that names exactly one product category.
///
/// Returns `None` when no category or several are named, or when the query
/// asks for a complete itinerary or general tips.
pub fn detect_requested_category(query: &str) -> Option<RequestedCategory> {
    let lowered = query.to_lowercase();
    if MIXED_CONTENT_PHRASES.iter().any(|p| lowered.contains(p)) {
        return None;
    }

    let mentions = |terms: &[&str]| terms.iter().any(|t| lowered.contains(t));
    let found: Vec<RequestedCategory> = [
        (RequestedCategory::Hotel, mentions(HOTEL_TERMS)),
        (RequestedCategory::Flight, mentions(FLIGHT_TERMS)),
        (RequestedCategory::Restaurant, mentions(RESTAURANT_TERMS)),
    ]
    .into_iter()
    .filter_map(|(category, hit)| hit.then_some(category))
    .collect();

    match found.as_slice() {
        [single] => Some(*single),
        _ => None,
    }
}

/// Everything the builder needs for one upstream call. Built fresh per call.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptRequest {
    pub persona_title: String,
    pub persona_role: String,
    pub section_context: String,
    pub query_text: String,
    pub location_context: Option<LocationContext>,
    pub is_load_more: bool,
    pub previous_query_text: Option<String>,
    /// Names already shown to the user; only used for load-more.
    pub already_listed: Vec<String>,
}

/// Builds the instruction payload for `request`.
pub fn build_prompt(request: &PromptRequest) -> String {
    let template = if request.is_load_more {
        LOAD_MORE_TEMPLATE
    } else {
        FIRST_PAGE_TEMPLATE
    };

    // The category filter follows the original request on load-more.
    let scope_query = match (request.is_load_more, request.previous_query_text.as_deref()) {
        (true, Some(previous)) => previous,
        _ => request.query_text.as_str(),
    };

    let category_restriction = detect_requested_category(scope_query)
        .map(|c| {
            render(
                CATEGORY_RESTRICTION_TEMPLATE,
                &[("label", c.label()), ("category", c.schema_value())],
            )
        })
        .unwrap_or_default();

    let already_listed = if request.already_listed.is_empty() {
        "(none)".to_string()
    } else {
        request
            .already_listed
            .iter()
            .map(|name| format!("- {name}"))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let schema = response_schema(!request.is_load_more);
    let image_rule = image_rule();
    let batch_size = LOAD_MORE_BATCH.to_string();
    let location_section = location_section(request.location_context.as_ref());
    let previous_query = request
        .previous_query_text
        .as_deref()
        .unwrap_or(&request.query_text);

    // One pass: substituted values are never scanned again, so user text, model
    // names and geocoder labels cannot expand a placeholder.
    render(
        template,
        &[
            ("schema", schema.as_str()),
            ("geography_rule", GEOGRAPHY_RULE),
            ("image_rule", image_rule.as_str()),
            ("grounding_instruction", GROUNDING_INSTRUCTION),
            ("batch_size", batch_size.as_str()),
            ("category_restriction", category_restriction.as_str()),
            ("location_section", location_section.as_str()),
            ("persona_title", request.persona_title.as_str()),
            ("persona_role", request.persona_role.as_str()),
            ("section_context", request.section_context.as_str()),
            ("already_listed", already_listed.as_str()),
            ("previous_query", previous_query),
            ("query", request.query_text.as_str()),
        ],
    )
}

/// Replaces every `{name}` in `template` with its value. Unknown braces are
/// copied through untouched.
fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 1..];
        let hit = vars.iter().find_map(|&(name, value)| {
            let after = tail.strip_prefix(name)?.strip_prefix('}')?;
            Some((value, after))
        });
        match hit {
            Some((value, after)) => {
                out.push_str(value);
                rest = after;
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}

/// The literal output structure the model must follow.
fn response_schema(with_intro: bool) -> String {
    let mut schema = String::from("{\n");
    if with_intro {
        schema.push_str(INTRO_FIELD_SCHEMA);
        schema.push('\n');
    }
    schema.push_str("  \"recommendations\": [\n");
    schema.push_str(ITEM_SCHEMA);
    schema.push_str("\n  ]\n}");
    schema
}

fn image_rule() -> String {
    render(
        IMAGE_RULE_TEMPLATE,
        &[("image_hosts", IMAGE_HOST_ALLOWLIST.join(", ").as_str())],
    )
}

/// Omitted entirely unless a place name is known.
fn location_section(context: Option<&LocationContext>) -> String {
    context
        .and_then(LocationContext::label)
        .map(|label| render(LOCATION_SECTION_TEMPLATE, &[("location", label.as_str())]))
        .unwrap_or_default()
}
