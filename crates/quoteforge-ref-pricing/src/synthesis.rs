//! Canned code synthesis.
//!
//! `CannedSynthesizer` stands in for a generative text service: it returns
//! fixed schema and function text regardless of the description, so the
//! reference scenarios are deterministic and need no network.

use async_trait::async_trait;
use tracing::debug;

use quoteforge_contracts::error::{QuoteforgeError, QuoteforgeResult};
use quoteforge_core::traits::CodeSynthesizer;

use crate::catalog::{FAULTY_FUNCTION, PRINT_SHOP_FUNCTION, PRINT_SHOP_SCHEMA};

#[derive(Debug, Clone)]
pub struct CannedSynthesizer {
    schema: String,
    function: String,
    available: bool,
}

impl CannedSynthesizer {
    pub fn new(schema: impl Into<String>, function: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            function: function.into(),
            available: true,
        }
    }

    /// The correct print-shop schema and function.
    pub fn print_shop() -> Self {
        Self::new(PRINT_SHOP_SCHEMA, PRINT_SHOP_FUNCTION)
    }

    /// The print-shop schema with a function that throws or never returns
    /// for some products.
    pub fn faulty() -> Self {
        Self::new(PRINT_SHOP_SCHEMA, FAULTY_FUNCTION)
    }

    /// A synthesizer whose service is down.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new("", "")
        }
    }

    fn ensure_available(&self) -> QuoteforgeResult<()> {
        if self.available {
            Ok(())
        } else {
            Err(QuoteforgeError::SynthesisUnavailable {
                reason: "canned synthesizer is switched off".to_string(),
            })
        }
    }
}

#[async_trait]
impl CodeSynthesizer for CannedSynthesizer {
    async fn synthesize_schema(
        &self,
        description: &str,
        feedback: Option<&str>,
        _previous_schema: Option<&str>,
    ) -> QuoteforgeResult<String> {
        self.ensure_available()?;
        debug!(
            description_len = description.len(),
            has_feedback = feedback.is_some(),
            "returning canned schema"
        );
        Ok(self.schema.clone())
    }

    async fn synthesize_function(
        &self,
        description: &str,
        _schema: &str,
        feedback: Option<&str>,
        _previous_function: Option<&str>,
    ) -> QuoteforgeResult<String> {
        self.ensure_available()?;
        debug!(
            description_len = description.len(),
            has_feedback = feedback.is_some(),
            "returning canned function"
        );
        Ok(self.function.clone())
    }
}
