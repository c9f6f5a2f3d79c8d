//! Field extraction: approval classification, short description and
//! category-specific ticket fields.

pub mod category;
pub mod classify;
pub mod description;
pub mod rules;

use crate::config::ExtractionConfig;
use crate::model::message::TicketFields;

use category::{Category, CategoryExtractor};
use description::ShortDescriptionRule;

/// What extraction found in one body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub short_description: String,
    /// Empty unless the short description names a recognized category.
    pub extra_fields: TicketFields,
}

/// Stateless extractor configured with the sentinel token and gate answer.
#[derive(Debug, Clone)]
pub struct FieldExtractor {
    description: ShortDescriptionRule,
    categories: CategoryExtractor,
}

impl FieldExtractor {
    /// Build an extractor from explicit values.
    pub fn new(sentinel_token: &str, gate_answer: &str) -> Self {
        Self {
            description: ShortDescriptionRule::new(sentinel_token),
            categories: CategoryExtractor::new(gate_answer),
        }
    }

    /// Build an extractor from the `[extraction]` config section.
    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self::new(&config.sentinel_token, &config.gate_answer)
    }

    /// Extract the short description and, for recognized categories, ticket fields.
    pub fn extract(&self, body: &str) -> Extraction {
        let short_description = self.description.extract(body);
        let extra_fields = match Category::detect(&short_description) {
            Some(category) => self.categories.extract(category, body),
            None => TicketFields::new(),
        };
        Extraction {
            short_description,
            extra_fields,
        }
    }
}

impl Default for FieldExtractor {
    fn default() -> Self {
        Self::from_config(&ExtractionConfig::default())
    }
}
