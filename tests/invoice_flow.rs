//! End-to-end flow through the public API: edit, derive, preview, export.

use std::cell::Cell;
use std::path::PathBuf;

use chrono::NaiveDate;
use invoice_builder::images::read_image;
use invoice_builder::input::coerce_number;
use invoice_builder::totals::format_money;
use invoice_builder::{
    DocumentExporter, Error, ExportBoundary, ExportError, ExportOptions, HeaderUpdate,
    ImageSlot, InvoiceDefaults, InvoiceStore, ItemUpdate, PaymentStatus, PreviewSurface, Renderer,
    Snapshot, SurfaceStyle,
};

struct CountingExporter {
    calls: Cell<u32>,
    last_recipient: std::cell::RefCell<String>,
}

impl CountingExporter {
    fn new() -> Self {
        Self {
            calls: Cell::new(0),
            last_recipient: Default::default(),
        }
    }
}

impl DocumentExporter for CountingExporter {
    fn export(
        &self,
        snapshot: &Snapshot,
        style: &SurfaceStyle,
        options: &ExportOptions,
    ) -> Result<PathBuf, ExportError> {
        self.calls.set(self.calls.get() + 1);
        *self.last_recipient.borrow_mut() = snapshot.header().recipient_name.clone();
        assert_eq!(*style, SurfaceStyle::neutral());
        assert_eq!(options.file_name, format!("{}.pdf", snapshot.header().invoice_number));
        Ok(PathBuf::from("out").join(&options.file_name))
    }
}

fn fresh_store() -> InvoiceStore {
    InvoiceStore::with_defaults(
        &InvoiceDefaults::default(),
        NaiveDate::from_ymd_opt(2025, 11, 3).unwrap(),
    )
}

#[test]
fn editing_session_produces_expected_totals() {
    let mut store = fresh_store();
    let seeded = store.snapshot().items()[0].id;

    store.update_item(seeded, ItemUpdate::Description("Design".into()));
    store.update_item(seeded, ItemUpdate::Quantity(coerce_number("2")));
    store.update_item(seeded, ItemUpdate::Rate(coerce_number("150")));

    let (extra, _) = store.add_item();
    store.update_item(extra, ItemUpdate::Description("Hosting".into()));
    store.update_item(extra, ItemUpdate::Rate(coerce_number("50")));
    store.update_header(HeaderUpdate::TaxRate(coerce_number("10")));
    let snap = store.update_header(HeaderUpdate::Status(PaymentStatus::Paid));

    let totals = snap.totals();
    let currency = &snap.header().currency;
    assert_eq!(format_money(currency, totals.subtotal), "$350.00");
    assert_eq!(format_money(currency, totals.tax), "$35.00");
    assert_eq!(format_money(currency, totals.total), "$385.00");
}

#[test]
fn garbage_numbers_zero_the_row() {
    let mut store = fresh_store();
    let id = store.snapshot().items()[0].id;

    let snap = store.update_item(id, ItemUpdate::Rate(coerce_number("five hundred")));
    assert_eq!(snap.items()[0].rate, 0.0);
    assert_eq!(snap.totals().total, 0.0);
}

#[test]
fn removing_every_row_zeroes_totals() {
    let mut store = fresh_store();
    store.update_header(HeaderUpdate::TaxRate(15.0));
    let id = store.snapshot().items()[0].id;

    let snap = store.remove_item(id);
    assert!(snap.items().is_empty());
    assert_eq!(format_money("$", snap.totals().subtotal), "$0.00");
    assert_eq!(format_money("$", snap.totals().tax), "$0.00");
    assert_eq!(format_money("$", snap.totals().total), "$0.00");
}

#[test]
fn export_round_trip_restores_the_preview() {
    let renderer = Renderer::builtin().unwrap();
    let mut store = fresh_store();
    let mut surface = PreviewSurface::new();
    let boundary = ExportBoundary::new(CountingExporter::new());

    // nothing mounted yet
    assert!(boundary.export(None).unwrap().is_none());
    assert_eq!(boundary.exporter().calls.get(), 0);

    let snap = store.update_header(HeaderUpdate::InvoiceNumber("#INV-777".into()));
    surface.show(snap, &renderer).unwrap();

    let saved = boundary.export(Some(&mut surface)).unwrap();
    assert_eq!(saved, Some(PathBuf::from("out/#INV-777.pdf")));
    assert_eq!(boundary.exporter().calls.get(), 1);
    assert_eq!(*surface.style(), SurfaceStyle::screen());
}

#[test]
fn blank_invoice_number_exports_as_invoice_pdf() {
    let mut store = fresh_store();
    let snap = store.update_header(HeaderUpdate::InvoiceNumber(String::new()));
    assert_eq!(ExportOptions::for_invoice(snap.header()).file_name, "invoice.pdf");
}

#[test]
fn corrupt_logo_upload_leaves_later_edits_exportable() {
    let dir = tempfile::tempdir().unwrap();
    let logo = dir.path().join("logo.png");
    let mut bytes = b"\x89PNG\r\n\x1a\n".to_vec();
    bytes.extend_from_slice(b"garbage, not an image body");
    std::fs::write(&logo, bytes).unwrap();

    let renderer = Renderer::builtin().unwrap();
    let mut store = fresh_store();
    let mut surface = PreviewSurface::with_live_file(dir.path().join("preview.typ"));
    let boundary = ExportBoundary::new(CountingExporter::new());
    surface.show(store.snapshot(), &renderer).unwrap();

    // the upload is refused, so the store never holds an unrenderable image
    assert!(matches!(read_image(&logo), Err(Error::Image(_))));
    assert!(store.snapshot().header().image(ImageSlot::Logo).is_none());

    let snap = store.update_header(HeaderUpdate::RecipientName("Acme Corp".into()));
    assert!(surface.show(snap, &renderer).unwrap());
    boundary.export(Some(&mut surface)).unwrap();

    assert_eq!(*boundary.exporter().last_recipient.borrow(), "Acme Corp");
}
