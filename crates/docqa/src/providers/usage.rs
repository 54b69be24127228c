//! Token usage accounting and cost estimates

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign};

/// USD per million tokens: (model prefix, input, output)
const PRICES_PER_MILLION: &[(&str, f64, f64)] = &[
    ("gpt-4o-mini", 0.15, 0.60),
    ("gpt-4o", 2.50, 10.00),
    ("gpt-4.1-mini", 0.40, 1.60),
    ("gpt-4.1", 2.00, 8.00),
    ("text-embedding-3-large", 0.13, 0.0),
    ("text-embedding-3-small", 0.02, 0.0),
    ("text-embedding-ada-002", 0.10, 0.0),
];

/// Tokens consumed by one or more API calls
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens sent to the model
    pub prompt_tokens: u64,
    /// Tokens generated by the model
    pub completion_tokens: u64,
    /// Sum of prompt and completion tokens
    pub total_tokens: u64,
}

impl TokenUsage {
    /// Create usage from prompt and completion counts
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }

    /// Estimated cost in USD; unknown models cost nothing
    pub fn estimated_cost_usd(&self, model: &str) -> f64 {
        // Longest matching prefix so "gpt-4o-mini" is not priced as "gpt-4o"
        let price = PRICES_PER_MILLION
            .iter()
            .filter(|(prefix, _, _)| model.starts_with(prefix))
            .max_by_key(|(prefix, _, _)| prefix.len());

        match price {
            Some((_, input, output)) => {
                (self.prompt_tokens as f64 * input + self.completion_tokens as f64 * output)
                    / 1_000_000.0
            }
            None => 0.0,
        }
    }
}

impl Add for TokenUsage {
    type Output = TokenUsage;

    fn add(self, other: TokenUsage) -> TokenUsage {
        TokenUsage {
            prompt_tokens: self.prompt_tokens + other.prompt_tokens,
            completion_tokens: self.completion_tokens + other.completion_tokens,
            total_tokens: self.total_tokens + other.total_tokens,
        }
    }
}

impl AddAssign for TokenUsage {
    fn add_assign(&mut self, other: TokenUsage) {
        *self = *self + other;
    }
}

/// Round a USD amount to six decimals for logging
pub fn round_usd(amount: f64) -> f64 {
    (amount * 1_000_000.0).round() / 1_000_000.0
}
