//! Versioned, immutable invoice state.
//!
//! Every effective change produces a fresh [`Snapshot`] with a higher
//! version. Older snapshots stay valid and unchanged, so a renderer can hold
//! one and later compare versions (or `Arc` pointers) to see whether anything
//! moved.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::config::InvoiceDefaults;
use crate::input::finite_or_zero;
use crate::model::{
    BackgroundStyle, ImagePayload, ImageSlot, InvoiceHeader, ItemDraft, ItemId, LineItem,
    PaymentStatus,
};
use crate::totals::Totals;

#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    version: u64,
    header: Arc<InvoiceHeader>,
    items: Arc<[LineItem]>,
}

impl Snapshot {
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn header(&self) -> &InvoiceHeader {
        &self.header
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn item(&self, id: ItemId) -> Option<&LineItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn totals(&self) -> Totals {
        Totals::compute(&self.items, self.header.tax_rate)
    }

    /// True when both snapshots share the same header allocation.
    pub fn same_header(&self, other: &Snapshot) -> bool {
        Arc::ptr_eq(&self.header, &other.header)
    }

    /// True when both snapshots share the same item list allocation.
    pub fn same_items(&self, other: &Snapshot) -> bool {
        Arc::ptr_eq(&self.items, &other.items)
    }
}

/// One header field and its new value.
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderUpdate {
    InvoiceNumber(String),
    IssueDate(NaiveDate),
    DueDate(NaiveDate),
    Status(PaymentStatus),
    SenderName(String),
    SenderDetails(String),
    RecipientName(String),
    RecipientDetails(String),
    Currency(String),
    TaxLabel(String),
    TaxRate(f64),
    Notes(String),
    BrandColor(String),
    Background(BackgroundStyle),
    Image(ImageSlot, Option<ImagePayload>),
}

impl HeaderUpdate {
    fn apply(self, header: &mut InvoiceHeader) {
        match self {
            Self::InvoiceNumber(v) => header.invoice_number = v,
            Self::IssueDate(v) => header.issue_date = v,
            Self::DueDate(v) => header.due_date = v,
            Self::Status(v) => header.status = v,
            Self::SenderName(v) => header.sender_name = v,
            Self::SenderDetails(v) => header.sender_details = v,
            Self::RecipientName(v) => header.recipient_name = v,
            Self::RecipientDetails(v) => header.recipient_details = v,
            Self::Currency(v) => header.currency = v,
            Self::TaxLabel(v) => header.tax_label = v,
            Self::TaxRate(v) => header.tax_rate = finite_or_zero(v),
            Self::Notes(v) => header.notes = v,
            Self::BrandColor(v) => header.brand_color = v,
            Self::Background(v) => header.background = v,
            Self::Image(ImageSlot::Logo, v) => header.logo = v,
            Self::Image(ImageSlot::Signature, v) => header.signature = v,
        }
    }
}

/// One line-item field and its new value.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemUpdate {
    Description(String),
    Quantity(f64),
    Rate(f64),
}

impl ItemUpdate {
    fn apply(self, item: &mut LineItem) {
        match self {
            Self::Description(v) => item.description = v,
            Self::Quantity(v) => item.quantity = finite_or_zero(v),
            Self::Rate(v) => item.rate = finite_or_zero(v),
        }
    }
}

#[derive(Debug)]
pub struct InvoiceStore {
    current: Arc<Snapshot>,
    next_id: u64,
}

impl InvoiceStore {
    pub fn new(header: InvoiceHeader, drafts: impl IntoIterator<Item = ItemDraft>) -> Self {
        let mut next_id = 1;
        let items: Vec<LineItem> = drafts
            .into_iter()
            .map(|draft| {
                let id = ItemId(next_id);
                next_id += 1;
                mint(id, draft)
            })
            .collect();

        Self {
            current: Arc::new(Snapshot {
                version: 0,
                header: Arc::new(header),
                items: items.into(),
            }),
            next_id,
        }
    }

    /// Startup state: default header and the sample row.
    pub fn with_defaults(defaults: &InvoiceDefaults, today: NaiveDate) -> Self {
        Self::new(InvoiceHeader::new(defaults, today), [ItemDraft::sample()])
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.current)
    }

    pub fn update_header(&mut self, update: HeaderUpdate) -> Arc<Snapshot> {
        let mut header = InvoiceHeader::clone(&self.current.header);
        update.apply(&mut header);
        self.commit(Arc::new(header), Arc::clone(&self.current.items))
    }

    /// Edits the item with `id` in place; order and other rows are kept.
    pub fn update_item(&mut self, id: ItemId, update: ItemUpdate) -> Arc<Snapshot> {
        let Some(index) = self.position(id) else {
            tracing::debug!(%id, "update for unknown line item ignored");
            return self.snapshot();
        };

        let mut items = self.current.items.to_vec();
        update.apply(&mut items[index]);
        self.commit(Arc::clone(&self.current.header), items.into())
    }

    pub fn add_item(&mut self) -> (ItemId, Arc<Snapshot>) {
        self.push_item(ItemDraft::blank())
    }

    pub fn push_item(&mut self, draft: ItemDraft) -> (ItemId, Arc<Snapshot>) {
        let id = ItemId(self.next_id);
        self.next_id += 1;

        let mut items = self.current.items.to_vec();
        items.push(mint(id, draft));
        (id, self.commit(Arc::clone(&self.current.header), items.into()))
    }

    pub fn remove_item(&mut self, id: ItemId) -> Arc<Snapshot> {
        if self.position(id).is_none() {
            tracing::debug!(%id, "removal of unknown line item ignored");
            return self.snapshot();
        }

        let items: Vec<LineItem> = self
            .current
            .items
            .iter()
            .filter(|item| item.id != id)
            .cloned()
            .collect();
        self.commit(Arc::clone(&self.current.header), items.into())
    }

    fn position(&self, id: ItemId) -> Option<usize> {
        self.current.items.iter().position(|item| item.id == id)
    }

    fn commit(&mut self, header: Arc<InvoiceHeader>, items: Arc<[LineItem]>) -> Arc<Snapshot> {
        self.current = Arc::new(Snapshot {
            version: self.current.version + 1,
            header,
            items,
        });
        self.snapshot()
    }
}

fn mint(id: ItemId, draft: ItemDraft) -> LineItem {
    LineItem {
        id,
        description: draft.description,
        quantity: finite_or_zero(draft.quantity),
        rate: finite_or_zero(draft.rate),
    }
}
