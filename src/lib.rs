//! Terminal invoice builder: versioned invoice state, derived totals, a live
//! Typst preview and PDF export.

pub mod config;
pub mod editor;
pub mod error;
pub mod export;
pub mod images;
pub mod input;
pub mod model;
pub mod preview;
pub mod render;
pub mod store;
pub mod totals;

pub use config::{InvoiceDefaults, Settings};
pub use error::Error;
pub use export::{DocumentExporter, ExportBoundary, ExportError, ExportOptions, TypstExporter};
pub use model::{BackgroundStyle, ImagePayload, ImageSlot, InvoiceHeader, ItemId, LineItem, PaymentStatus};
pub use preview::{PreviewSurface, SurfaceStyle};
pub use render::Renderer;
pub use store::{HeaderUpdate, InvoiceStore, ItemUpdate, Snapshot};
pub use totals::Totals;
