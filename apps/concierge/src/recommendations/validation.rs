//! Schema validation for upstream recommendations.
//!
//! One pass over the raw items, driven by the `FIELD_RULES` table, collecting
//! every violation. Violations are reported, never used to drop an item. The
//! one correction applied is removing `openHours` from geographic subjects.

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::models::lenient::leading_number;
use crate::models::recommendation::{Category, Recommendation, ReservationStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Number,
    TextList,
}

struct FieldRule {
    field: &'static str,
    kind: FieldKind,
    /// Category value the field belongs to; `None` means universal.
    only_for: Option<&'static str>,
}

const fn universal(field: &'static str, kind: FieldKind) -> FieldRule {
    FieldRule {
        field,
        kind,
        only_for: None,
    }
}

const fn scoped(field: &'static str, kind: FieldKind, category: &'static str) -> FieldRule {
    FieldRule {
        field,
        kind,
        only_for: Some(category),
    }
}

const FIELD_RULES: &[FieldRule] = &[
    universal("category", FieldKind::Text),
    universal("icon", FieldKind::Text),
    universal("name", FieldKind::Text),
    universal("description", FieldKind::Text),
    universal("link", FieldKind::Text),
    universal("estimatedCost", FieldKind::Text),
    universal("reason", FieldKind::Text),
    universal("visitDuration", FieldKind::Text),
    universal("bestVisitTime", FieldKind::Text),
    universal("reservationStatus", FieldKind::Text),
    universal("tags", FieldKind::TextList),
    universal("highlights", FieldKind::TextList),
    scoped("airline", FieldKind::Text, "flight"),
    scoped("flightNumber", FieldKind::Text, "flight"),
    scoped("departureTime", FieldKind::Text, "flight"),
    scoped("arrivalTime", FieldKind::Text, "flight"),
    scoped("departureAirport", FieldKind::Text, "flight"),
    scoped("arrivalAirport", FieldKind::Text, "flight"),
    scoped("duration", FieldKind::Text, "flight"),
    scoped("stops", FieldKind::Number, "flight"),
    scoped("stars", FieldKind::Number, "hotel"),
    scoped("amenities", FieldKind::TextList, "hotel"),
    scoped("images", FieldKind::TextList, "hotel"),
    scoped("address", FieldKind::Text, "hotel"),
    scoped("rating", FieldKind::Number, "hotel"),
    scoped("reviewCount", FieldKind::Number, "hotel"),
    scoped("googleRating", FieldKind::Number, "general"),
    scoped("establishmentType", FieldKind::Text, "general"),
    scoped("openHours", FieldKind::Text, "general"),
    scoped("menuLink", FieldKind::Text, "general"),
    scoped("parking", FieldKind::Text, "general"),
];

/// Fields every item must carry regardless of category.
const REQUIRED_FIELDS: &[&str] = &["category", "name", "description"];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    /// The document had no `intro` on a first-page request; a fallback was used.
    MissingIntro,
    /// `recommendations` was present but not a list; treated as empty.
    RecommendationsNotAList,
    NotAnObject {
        index: usize,
    },
    MissingField {
        index: usize,
        field: &'static str,
    },
    WrongType {
        index: usize,
        field: &'static str,
        expected: FieldKind,
    },
    FieldOutsideCategory {
        index: usize,
        field: &'static str,
        category: String,
    },
    UnknownCategory {
        index: usize,
        value: String,
    },
    UnknownReservationStatus {
        index: usize,
        value: String,
    },
    /// `openHours` was set on a city/country/region/island/beach and removed.
    OpenHoursOnGeographicSubject {
        index: usize,
    },
    GeographicFieldMissing {
        index: usize,
        field: &'static str,
    },
}

/// Outcome of validating one result page.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub violations: Vec<Violation>,
    /// Known categories present in the page, sorted.
    pub categories: Vec<String>,
    /// Schema-valid but more than one known category is present.
    pub category_mixed: bool,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty() && !self.category_mixed
    }
}

/// Decodes and validates raw recommendation items.
///
/// Every object item is returned, in order. Non-object items cannot be
/// represented and are dropped with a `NotAnObject` violation.
pub fn validate_items(raw_items: &[Value]) -> (Vec<Recommendation>, ValidationReport) {
    let mut report = ValidationReport::default();
    let mut items = Vec::with_capacity(raw_items.len());
    let mut categories = BTreeSet::new();

    for (index, raw) in raw_items.iter().enumerate() {
        let Some(object) = raw.as_object() else {
            report.violations.push(Violation::NotAnObject { index });
            continue;
        };

        let mut item: Recommendation = match serde_json::from_value(raw.clone()) {
            Ok(item) => item,
            Err(e) => {
                // Lenient decoders make this unreachable for objects; keep the item anyway.
                warn!("Recommendation {index} failed to decode: {e}");
                Recommendation::default()
            }
        };

        check_fields(index, object, &item, &mut report.violations);
        check_enums(index, &item, &mut report.violations);
        enforce_geography(index, &mut item, &mut report.violations);

        if item.category.is_known() {
            categories.insert(item.category.as_str().to_string());
        }
        items.push(item);
    }

    report.category_mixed = categories.len() > 1;
    report.categories = categories.into_iter().collect();

    if !report.is_clean() {
        warn!(
            "Upstream recommendations carry {} schema violation(s), category_mixed={}",
            report.violations.len(),
            report.category_mixed
        );
    }

    (items, report)
}

fn check_fields(
    index: usize,
    object: &Map<String, Value>,
    item: &Recommendation,
    violations: &mut Vec<Violation>,
) {
    for &field in REQUIRED_FIELDS {
        if object.get(field).map_or(true, is_blank) {
            violations.push(Violation::MissingField { index, field });
        }
    }

    for rule in FIELD_RULES {
        let Some(value) = object.get(rule.field).filter(|v| !v.is_null()) else {
            continue;
        };

        if !kind_accepts(rule.kind, value) {
            violations.push(Violation::WrongType {
                index,
                field: rule.field,
                expected: rule.kind,
            });
        }

        if let Some(owner) = rule.only_for {
            if item.category.is_known() && item.category.as_str() != owner {
                violations.push(Violation::FieldOutsideCategory {
                    index,
                    field: rule.field,
                    category: item.category.as_str().to_string(),
                });
            }
        }
    }
}

fn check_enums(index: usize, item: &Recommendation, violations: &mut Vec<Violation>) {
    if let Category::Unrecognized(value) = &item.category {
        if !value.is_empty() {
            violations.push(Violation::UnknownCategory {
                index,
                value: value.clone(),
            });
        }
    }

    if let Some(ReservationStatus::Unrecognized(value)) = &item.reservation_status {
        violations.push(Violation::UnknownReservationStatus {
            index,
            value: value.clone(),
        });
    }
}

fn enforce_geography(index: usize, item: &mut Recommendation, violations: &mut Vec<Violation>) {
    if !item.is_geographic() {
        return;
    }

    if item.venue.open_hours.take().is_some() {
        violations.push(Violation::OpenHoursOnGeographicSubject { index });
    }
    if item.visit_duration.is_none() {
        violations.push(Violation::GeographicFieldMissing {
            index,
            field: "visitDuration",
        });
    }
    if item.best_visit_time.is_none() {
        violations.push(Violation::GeographicFieldMissing {
            index,
            field: "bestVisitTime",
        });
    }
}

/// Mirrors what the lenient decoders accept.
fn kind_accepts(kind: FieldKind, value: &Value) -> bool {
    match kind {
        FieldKind::Text => matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_)),
        FieldKind::Number => match value {
            Value::Number(_) => true,
            Value::String(s) => leading_number(s).is_some(),
            _ => false,
        },
        FieldKind::TextList => matches!(value, Value::Array(_) | Value::String(_)),
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}
