//! Response Parser: recovers the JSON document from free upstream text and
//! classifies it. Total over all inputs: every string yields an outcome.

use serde_json::Value;
use tracing::debug;

use crate::models::recommendation::Recommendation;
use crate::recommendations::validation::{validate_items, ValidationReport, Violation};

/// Intro used when a first page arrives without one.
pub const FALLBACK_INTRO: &str = "Aqui está o que encontrei:";

/// Which page a response answers. Load-more pages carry no intro.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    First,
    LoadMore,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    /// A JSON object was recovered. `intro` is always `Some` for first pages
    /// and always `None` for load-more pages.
    Structured {
        intro: Option<String>,
        recommendations: Vec<Recommendation>,
        report: ValidationReport,
    },
    /// No usable JSON object; the raw text is the whole answer.
    Unstructured { text: String },
}

/// Slice from the first `{` to the last `}` inclusive.
///
/// Deliberately permissive: the model may wrap the object in prose or code fences.
pub fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

pub fn parse_response(raw: &str, page: Page) -> ParseOutcome {
    let unstructured = || ParseOutcome::Unstructured {
        text: raw.to_string(),
    };

    let Some(candidate) = extract_json_object(raw) else {
        debug!("No JSON object in upstream text ({} chars)", raw.len());
        return unstructured();
    };

    let document = match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(document)) => document,
        Ok(_) => return unstructured(),
        Err(e) => {
            debug!("Upstream JSON did not parse: {e}");
            return unstructured();
        }
    };

    let mut doc_violations = Vec::new();

    let raw_items: &[Value] = match document.get("recommendations") {
        None | Some(Value::Null) => &[],
        Some(Value::Array(items)) => items,
        Some(_) => {
            doc_violations.push(Violation::RecommendationsNotAList);
            &[]
        }
    };

    let intro = match page {
        Page::LoadMore => None,
        Page::First => Some(
            match document
                .get("intro")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
            {
                Some(intro) => intro.to_string(),
                None => {
                    doc_violations.push(Violation::MissingIntro);
                    FALLBACK_INTRO.to_string()
                }
            },
        ),
    };

    let (recommendations, mut report) = validate_items(raw_items);
    doc_violations.append(&mut report.violations);
    report.violations = doc_violations;

    ParseOutcome::Structured {
        intro,
        recommendations,
        report,
    }
}
