use std::fmt;
use std::sync::Arc;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::config::InvoiceDefaults;

/// Identity of a line item. Minted by the store, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Paid,
    #[default]
    Unpaid,
    Refunded,
}

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 3] = [Self::Paid, Self::Unpaid, Self::Refunded];

    /// Badge text, lowercase like the on-screen badge.
    pub fn badge(&self) -> &'static str {
        match self {
            Self::Paid => "paid",
            Self::Unpaid => "unpaid",
            Self::Refunded => "refunded",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Paid => write!(f, "Paid"),
            Self::Unpaid => write!(f, "Unpaid"),
            Self::Refunded => write!(f, "Refunded"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundStyle {
    #[default]
    Plain,
    Geometric,
    Abstract,
}

impl BackgroundStyle {
    pub const ALL: [BackgroundStyle; 3] = [Self::Plain, Self::Geometric, Self::Abstract];

    /// Key the template switches on.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::Geometric => "geometric",
            Self::Abstract => "abstract",
        }
    }
}

impl fmt::Display for BackgroundStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain => write!(f, "Clean White"),
            Self::Geometric => write!(f, "Geometric Dots"),
            Self::Abstract => write!(f, "Modern Abstract"),
        }
    }
}

/// An embedded image. Holds the bytes, never a path.
#[derive(Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub format: image::ImageFormat,
    pub bytes: Arc<[u8]>,
}

impl ImagePayload {
    pub fn new(format: image::ImageFormat, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self { format, bytes: bytes.into() }
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.to_mime_type()
    }
}

impl fmt::Debug for ImagePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImagePayload")
            .field("format", &self.format)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Which header slot an uploaded image lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSlot {
    Logo,
    Signature,
}

impl fmt::Display for ImageSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Logo => write!(f, "logo"),
            Self::Signature => write!(f, "signature"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceHeader {
    pub invoice_number: String,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub status: PaymentStatus,
    pub sender_name: String,
    pub sender_details: String,
    pub recipient_name: String,
    pub recipient_details: String,
    pub currency: String,
    pub tax_label: String,
    /// Percentage, e.g. `10.0` for 10%.
    pub tax_rate: f64,
    pub notes: String,
    pub brand_color: String,
    pub background: BackgroundStyle,
    pub logo: Option<ImagePayload>,
    pub signature: Option<ImagePayload>,
}

pub const DEFAULT_INVOICE_NUMBER: &str = "#INV-001";
pub const DEFAULT_DUE_DAYS: u64 = 7;

impl InvoiceHeader {
    /// Startup header: issued `today`, due a week later, no recipient yet.
    pub fn new(defaults: &InvoiceDefaults, today: NaiveDate) -> Self {
        Self {
            invoice_number: DEFAULT_INVOICE_NUMBER.to_string(),
            issue_date: today,
            due_date: today
                .checked_add_days(Days::new(DEFAULT_DUE_DAYS))
                .unwrap_or(today),
            status: PaymentStatus::Unpaid,
            sender_name: defaults.sender_name.clone(),
            sender_details: defaults.sender_details.clone(),
            recipient_name: String::new(),
            recipient_details: String::new(),
            currency: defaults.currency.clone(),
            tax_label: defaults.tax_label.clone(),
            tax_rate: crate::input::finite_or_zero(defaults.tax_rate),
            notes: defaults.notes.clone(),
            brand_color: defaults.brand_color.clone(),
            background: BackgroundStyle::Plain,
            logo: None,
            signature: None,
        }
    }

    pub fn image(&self, slot: ImageSlot) -> Option<&ImagePayload> {
        match slot {
            ImageSlot::Logo => self.logo.as_ref(),
            ImageSlot::Signature => self.signature.as_ref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineItem {
    pub id: ItemId,
    pub description: String,
    pub quantity: f64,
    pub rate: f64,
}

impl LineItem {
    pub fn amount(&self) -> f64 {
        self.quantity * self.rate
    }
}

/// Contents of a freshly appended row, before the store assigns an id.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemDraft {
    pub description: String,
    pub quantity: f64,
    pub rate: f64,
}

impl ItemDraft {
    /// The row seeded into every new invoice.
    pub fn sample() -> Self {
        Self {
            description: "Web Development".to_string(),
            quantity: 1.0,
            rate: 500.0,
        }
    }

    /// The row appended by "Add Item".
    pub fn blank() -> Self {
        Self {
            description: String::new(),
            quantity: 1.0,
            rate: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_defaults_due_a_week_after_issue() {
        let today = NaiveDate::from_ymd_opt(2025, 12, 28).unwrap();
        let header = InvoiceHeader::new(&InvoiceDefaults::default(), today);

        assert_eq!(header.issue_date, today);
        assert_eq!(header.due_date, NaiveDate::from_ymd_opt(2026, 1, 4).unwrap());
        assert_eq!(header.status, PaymentStatus::Unpaid);
        assert_eq!(header.background, BackgroundStyle::Plain);
        assert_eq!(header.invoice_number, "#INV-001");
        assert!(header.recipient_name.is_empty());
        assert!(header.logo.is_none() && header.signature.is_none());
    }

    #[test]
    fn amount_is_quantity_times_rate() {
        let item = LineItem {
            id: ItemId(1),
            description: "Design".into(),
            quantity: 2.5,
            rate: 40.0,
        };
        assert_eq!(item.amount(), 100.0);
    }

    #[test]
    fn status_badge_is_lowercase() {
        let badges: Vec<_> = PaymentStatus::ALL.iter().map(|s| s.badge()).collect();
        assert_eq!(badges, ["paid", "unpaid", "refunded"]);
    }
}
