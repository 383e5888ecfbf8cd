use serde::{Deserialize, Serialize};

/// A canned prompt offered by a persona.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub text: String,
    pub description: Option<String>,
    pub keywords: Option<Vec<String>>,
    /// Opens the category picker instead of querying.
    pub is_special: bool,
}

impl Suggestion {
    /// Query text sent upstream: the suggestion text, then its description and keywords.
    pub fn query_text(&self) -> String {
        let mut query = self.text.trim().to_string();
        if let Some(description) = self.description.as_deref().filter(|d| !d.trim().is_empty()) {
            query.push_str(". ");
            query.push_str(description.trim());
        }
        if let Some(keywords) = self.keywords.as_ref().filter(|k| !k.is_empty()) {
            query.push_str(" (");
            query.push_str(&keywords.join(", "));
            query.push(')');
        }
        query
    }
}

/// The "expert" identity bound to an app section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Persona {
    pub section_id: String,
    pub title: String,
    pub role: String,
    pub greeting: String,
    pub suggestions: Vec<Suggestion>,
}

/// An entry of the category picker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryOption {
    pub id: String,
    pub label: String,
    pub description: String,
    pub icon: String,
}

impl CategoryOption {
    /// Query synthesized when the category is picked, scoped to `place` when known.
    pub fn query_text(&self, place: Option<&str>) -> String {
        match place {
            Some(place) => format!("{}: {} perto de {}", self.label, self.description, place),
            None => format!("{}: {}", self.label, self.description),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suggestion(description: Option<&str>, keywords: Option<Vec<&str>>) -> Suggestion {
        Suggestion {
            text: "Melhores praias do Nordeste".to_string(),
            description: description.map(str::to_string),
            keywords: keywords.map(|k| k.into_iter().map(str::to_string).collect()),
            is_special: false,
        }
    }

    #[test]
    fn test_query_text_plain() {
        assert_eq!(suggestion(None, None).query_text(), "Melhores praias do Nordeste");
    }

    #[test]
    fn test_query_text_with_description_and_keywords() {
        let s = suggestion(Some("águas calmas"), Some(vec!["família", "crianças"]));
        assert_eq!(
            s.query_text(),
            "Melhores praias do Nordeste. águas calmas (família, crianças)"
        );
    }

    #[test]
    fn test_query_text_ignores_empty_extras() {
        let s = suggestion(Some("  "), Some(vec![]));
        assert_eq!(s.query_text(), "Melhores praias do Nordeste");
    }

    #[test]
    fn test_category_query_with_and_without_place() {
        let c = CategoryOption {
            id: "museums".to_string(),
            label: "Museus".to_string(),
            description: "arte e história".to_string(),
            icon: "🏛️".to_string(),
        };
        assert_eq!(c.query_text(None), "Museus: arte e história");
        assert_eq!(c.query_text(Some("Lisboa")), "Museus: arte e história perto de Lisboa");
    }
}
