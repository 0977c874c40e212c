//! Keyword-based input conversion for print orders.
//!
//! `KeywordInputConverter` stands in for a generative conversion service. It
//! picks a quantity, a product noun and a rush keyword out of each scenario
//! sentence. Fields it cannot find are left out of the structured input, which
//! is what a missing-value test case relies on.

use async_trait::async_trait;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

use quoteforge_contracts::error::{QuoteforgeError, QuoteforgeResult};
use quoteforge_core::traits::InputConverter;

pub struct KeywordInputConverter {
    quantity: Regex,
    product: Regex,
    rush: Regex,
}

impl KeywordInputConverter {
    pub fn new() -> QuoteforgeResult<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| QuoteforgeError::ConfigError {
                reason: format!("invalid converter pattern: {e}"),
            })
        };
        Ok(Self {
            quantity: compile(r"-?\d+")?,
            product: compile(r"(?i)\b(business\s+cards?|flyers?|posters?|banners?|stickers?)\b")?,
            rush: compile(r"(?i)\b(rush|express|urgent)\b")?,
        })
    }

    /// Convert one sentence into a print-order object.
    pub fn convert_one(&self, sentence: &str) -> Value {
        let mut order = Map::new();

        if let Some(product) = self.product.find(sentence) {
            order.insert("product".to_string(), Value::from(canonical_product(product.as_str())));
        }
        let quantity = self
            .quantity
            .find(sentence)
            .and_then(|m| m.as_str().parse::<i64>().ok());
        if let Some(quantity) = quantity {
            order.insert("quantity".to_string(), Value::from(quantity));
        }
        order.insert("rush".to_string(), Value::Bool(self.rush.is_match(sentence)));

        Value::Object(order)
    }
}

/// "Business Cards" → "business_cards", "poster" → "posters".
fn canonical_product(noun: &str) -> String {
    let mut name = noun
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_");
    if !name.ends_with('s') {
        name.push('s');
    }
    name
}

#[async_trait]
impl InputConverter for KeywordInputConverter {
    async fn convert(&self, cases: &[String], schema: &str) -> QuoteforgeResult<Vec<Value>> {
        if schema.trim().is_empty() {
            return Err(QuoteforgeError::ConversionUnavailable {
                reason: "no schema to convert against".to_string(),
            });
        }
        debug!(cases = cases.len(), "converting scenarios by keyword");
        Ok(cases.iter().map(|c| self.convert_one(c)).collect())
    }
}
