use serde::Serialize;

use crate::model::LineItem;

/// Money values derived from the line items and the tax rate.
///
/// Always recomputed from scratch; nothing here is stored on the invoice.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Totals {
    pub subtotal: f64,
    pub tax: f64,
    pub total: f64,
}

impl Totals {
    /// `tax_rate` is a percentage.
    pub fn compute(items: &[LineItem], tax_rate: f64) -> Self {
        let subtotal: f64 = items.iter().map(LineItem::amount).sum();
        let tax = subtotal * (tax_rate / 100.0);
        Self {
            subtotal,
            tax,
            total: subtotal + tax,
        }
    }
}

/// Two decimals regardless of currency. Only used when displaying.
pub fn format_money(currency: &str, value: f64) -> String {
    // -0.0 would print as "-0.00"
    let value = if value == 0.0 { 0.0 } else { value };
    format!("{}{:.2}", currency, value)
}

/// Caption for the tax row, e.g. `VAT (20%):`.
pub fn tax_caption(label: &str, rate: f64) -> String {
    format!("{} ({}%):", label, rate)
}
