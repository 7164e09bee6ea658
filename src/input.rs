//! Numeric coercion at the input boundary.
//!
//! Quantities, rates and the tax rate reach the store as finite `f64`s only.
//! Text that does not start with a number becomes `0.0`, the same forgiving
//! rule a browser number field applies, so a half-typed value never blocks
//! the user.

use std::sync::LazyLock;

use regex::Regex;

static NUMERIC_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?").expect("numeric prefix pattern")
});

/// Parse the leading number in `text`, ignoring anything after it.
///
/// `"12.5kg"` is `12.5`, `"abc"` is `0.0`, and overflow to infinity is `0.0`.
pub fn coerce_number(text: &str) -> f64 {
    let trimmed = text.trim_start();
    NUMERIC_PREFIX
        .find(trimmed)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .map(finite_or_zero)
        .unwrap_or(0.0)
}

pub fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}
