//! Simulated print-shop pricing for the QUOTEFORGE reference runtime.
//!
//! All prices are hardcoded and fictional. The module holds three views of
//! the same price list: the human input messages an operator would type, the
//! schema and function a synthesis service would return for them, and a
//! host-side reference implementation used to compute expected totals for
//! the test dataset.

use quoteforge_contracts::dataset::{ErrorCategory, HappyCaseInput, UnhappyCaseInput};

// ── Price list ────────────────────────────────────────────────────────────────

/// Unit prices in cents.
///
/// - business_cards → 8
/// - flyers         → 12
/// - posters        → 150
pub const UNIT_PRICES: [(&str, i64); 3] = [("business_cards", 8), ("flyers", 12), ("posters", 150)];

/// Flat rush surcharge in cents.
pub const RUSH_FEE_CENTS: i64 = 1_500;

/// Orders of at least this many units get 10% off the base price.
pub const VOLUME_THRESHOLD: i64 = 500;

/// Largest poster order that may be rushed.
pub const RUSH_POSTER_LIMIT: i64 = 100;

/// The rules as an operator would type them, one message each.
pub const PRICING_MESSAGES: [&str; 5] = [
    "We print business cards at 8 cents each, flyers at 12 cents each and posters at $1.50 each.",
    "Orders of 500 units or more get 10% off the printing cost.",
    "Rush orders add a flat $15 fee.",
    "We cannot rush more than 100 posters at a time.",
    "We do not print anything else.",
];

// ── Host-side reference ───────────────────────────────────────────────────────

/// Price an order the way the generated function should.
///
/// Integer cents throughout; the total is converted to currency units only at
/// the end so it compares exactly with the sandboxed result.
pub fn reference_quote(product: &str, quantity: i64, rush: bool) -> Result<f64, ErrorCategory> {
    let unit = UNIT_PRICES
        .iter()
        .find(|(name, _)| *name == product)
        .map(|(_, cents)| *cents)
        .ok_or(ErrorCategory::UnsupportedRequest)?;
    if quantity <= 0 {
        return Err(ErrorCategory::IncorrectInputValue);
    }
    if rush && product == "posters" && quantity > RUSH_POSTER_LIMIT {
        return Err(ErrorCategory::QuotationRuleViolation);
    }

    let mut cents = unit * quantity;
    if quantity >= VOLUME_THRESHOLD {
        cents -= cents / 10;
    }
    if rush {
        cents += RUSH_FEE_CENTS;
    }
    Ok(cents as f64 / 100.0)
}

// ── Generated artifacts ───────────────────────────────────────────────────────

/// The input contract for print orders.
pub const PRINT_SHOP_SCHEMA: &str = r#"{
  "$schema": "https://json-schema.org/draft/2020-12/schema",
  "title": "PrintOrder",
  "type": "object",
  "properties": {
    "product": {
      "type": "string",
      "description": "What to print",
      "enum": ["business_cards", "flyers", "posters"]
    },
    "quantity": { "type": "integer", "description": "Number of units" },
    "rush": { "type": "boolean", "description": "Rush delivery", "default": false }
  },
  "required": ["product", "quantity"]
}"#;

/// The pricing function for `PRINT_SHOP_SCHEMA`.
pub const PRINT_SHOP_FUNCTION: &str = r#"
fn reject(code, message) {
    #{ errors: [#{ code: code, message: message }], pricingCalculationBacktrace: [] }
}

fn calculate_quote(input) {
    let prices = #{ business_cards: 8, flyers: 12, posters: 150 };

    let product = input.product;
    let quantity = input.quantity;
    if type_of(product) == "()" || type_of(quantity) == "()" {
        return reject("MISSING_INPUT_VALUE", "product and quantity are required");
    }
    if !(product in prices) {
        return reject("UNSUPPORTED_REQUEST", `we do not print ${product}`);
    }
    if type_of(quantity) != "i64" || quantity <= 0 {
        return reject("INCORRECT_INPUT_VALUE", "quantity must be a positive whole number");
    }
    let rush = input.rush == true;
    if rush && product == "posters" && quantity > 100 {
        return reject("QUOTATION_RULE_VIOLATION", "rush orders are limited to 100 posters");
    }

    let unit = prices[product];
    let cents = unit * quantity;
    let steps = [#{ operation: "base price", description: `${quantity} x ${unit} cents`, subTasks: [] }];

    if quantity >= 500 {
        let discount = cents / 10;
        cents -= discount;
        steps.push(#{ operation: "volume discount", description: `-${discount} cents`, subTasks: [] });
    }
    if rush {
        cents += 1500;
        steps.push(#{ operation: "rush fee", description: "+1500 cents", subTasks: [] });
    }

    #{
        total: cents / 100.0,
        pricingCalculationBacktrace: [#{ operation: "quote", description: product, subTasks: steps }],
        errors: []
    }
}
"#;

/// A function that throws for posters, never finishes for flyers and prices
/// business cards correctly.
pub const FAULTY_FUNCTION: &str = r#"
fn calculate_quote(input) {
    if input.product == "posters" {
        throw "poster price list not loaded";
    }
    if input.product == "flyers" {
        loop { }
    }
    #{ total: input.quantity * 8 / 100.0 }
}
"#;

// ── Test dataset ──────────────────────────────────────────────────────────────

/// Happy-path scenarios: (sentence, product, quantity, rush, expected total).
pub const HAPPY_ORDERS: [(&str, &str, i64, bool, f64); 4] = [
    ("250 business cards", "business_cards", 250, false, 20.0),
    ("100 flyers, rush please", "flyers", 100, true, 27.0),
    ("600 flyers for the spring fair", "flyers", 600, false, 64.8),
    ("20 posters with express delivery", "posters", 20, true, 45.0),
];

/// Unhappy-path scenarios: (sentence, expected category, reasoning).
pub const UNHAPPY_ORDERS: [(&str, ErrorCategory, &str); 4] = [
    ("-5 posters", ErrorCategory::IncorrectInputValue, "quantity is negative"),
    ("some flyers please", ErrorCategory::MissingInputValue, "no quantity given"),
    ("150 posters, rush", ErrorCategory::QuotationRuleViolation, "rush posters are capped at 100"),
    ("300 banners", ErrorCategory::UnsupportedRequest, "banners are not on the price list"),
];

pub fn happy_cases() -> Vec<HappyCaseInput> {
    HAPPY_ORDERS
        .iter()
        .map(|(sentence, product, quantity, rush, total)| HappyCaseInput {
            description: sentence.to_string(),
            expected_total: *total,
            expected_total_reasoning: format!(
                "{quantity} {product}{} from the price list",
                if *rush { " with rush fee" } else { "" }
            ),
        })
        .collect()
}

pub fn unhappy_cases() -> Vec<UnhappyCaseInput> {
    UNHAPPY_ORDERS
        .iter()
        .map(|(sentence, category, reasoning)| UnhappyCaseInput {
            description: sentence.to_string(),
            expected_error: *category,
            reasoning: reasoning.to_string(),
        })
        .collect()
}
