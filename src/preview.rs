//! The preview surface: what the user is looking at, plus the presentation
//! properties the export step has to neutralize.

use std::path::PathBuf;
use std::sync::Arc;

use crate::error::Error;
use crate::render::{ImageEncoding, PageSetup, Renderer};
use crate::store::Snapshot;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shadow {
    None,
    Soft,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MinHeight {
    /// Natural height of the content.
    Auto,
    /// Grows with the content but never below this.
    Mm(f64),
}

/// The three properties that make the on-screen sheet look like paper.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceStyle {
    pub shadow: Shadow,
    pub min_height: MinHeight,
    pub margin_bottom_mm: f64,
}

impl SurfaceStyle {
    /// A4-sized sheet with a drop shadow and breathing room underneath.
    pub fn screen() -> Self {
        Self {
            shadow: Shadow::Soft,
            min_height: MinHeight::Mm(297.0),
            margin_bottom_mm: 20.0,
        }
    }

    /// Nothing that would stretch or pad a printed page.
    pub fn neutral() -> Self {
        Self {
            shadow: Shadow::None,
            min_height: MinHeight::Auto,
            margin_bottom_mm: 0.0,
        }
    }
}

impl Default for SurfaceStyle {
    fn default() -> Self {
        Self::screen()
    }
}

/// A mounted preview. Holds the snapshot it currently shows.
///
/// When `live_path` is set, every newer snapshot is written there as Typst
/// source so `typst watch` can redraw it.
#[derive(Debug)]
pub struct PreviewSurface {
    style: SurfaceStyle,
    content: Option<Arc<Snapshot>>,
    live_path: Option<PathBuf>,
}

impl PreviewSurface {
    pub fn new() -> Self {
        Self {
            style: SurfaceStyle::screen(),
            content: None,
            live_path: None,
        }
    }

    pub fn with_live_file(path: PathBuf) -> Self {
        Self {
            live_path: Some(path),
            ..Self::new()
        }
    }

    pub fn style(&self) -> &SurfaceStyle {
        &self.style
    }

    pub fn set_style(&mut self, style: SurfaceStyle) {
        self.style = style;
    }

    pub fn content(&self) -> Option<&Arc<Snapshot>> {
        self.content.as_ref()
    }

    pub fn live_path(&self) -> Option<&PathBuf> {
        self.live_path.as_ref()
    }

    /// Shows `snapshot`. Returns `false` when it is the version already shown.
    pub fn show(&mut self, snapshot: Arc<Snapshot>, renderer: &Renderer) -> Result<bool, Error> {
        if let Some(current) = &self.content {
            if current.version() == snapshot.version() {
                tracing::debug!(version = snapshot.version(), "preview already current");
                return Ok(false);
            }
        }

        if let Some(path) = &self.live_path {
            renderer.stage(
                path,
                &snapshot,
                &self.style,
                &PageSetup::screen(),
                &ImageEncoding::preview(),
            )?;
            tracing::debug!(version = snapshot.version(), path = %path.display(), "live preview written");
        }
        self.content = Some(snapshot);
        Ok(true)
    }
}

impl Default for PreviewSurface {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InvoiceDefaults;
    use crate::store::{HeaderUpdate, InvoiceStore};
    use chrono::NaiveDate;

    fn store() -> InvoiceStore {
        InvoiceStore::with_defaults(
            &InvoiceDefaults::default(),
            NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
        )
    }

    #[test]
    fn starts_unmounted_with_screen_style() {
        let surface = PreviewSurface::new();
        assert!(surface.content().is_none());
        assert_eq!(*surface.style(), SurfaceStyle::screen());
    }

    #[test]
    fn redraws_only_on_new_versions() {
        let renderer = Renderer::builtin().unwrap();
        let mut store = store();
        let mut surface = PreviewSurface::new();

        assert!(surface.show(store.snapshot(), &renderer).unwrap());
        assert!(!surface.show(store.snapshot(), &renderer).unwrap());

        let next = store.update_header(HeaderUpdate::Notes("Net 14".into()));
        assert!(surface.show(next, &renderer).unwrap());
        assert_eq!(surface.content().unwrap().header().notes, "Net 14");
    }

    #[test]
    fn live_file_follows_the_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preview").join("preview.typ");
        let renderer = Renderer::builtin().unwrap();
        let mut store = store();
        let mut surface = PreviewSurface::with_live_file(path.clone());

        surface.show(store.snapshot(), &renderer).unwrap();
        let first = std::fs::read_to_string(&path).unwrap();
        assert!(first.contains("Client Name"));

        let next = store.update_header(HeaderUpdate::RecipientName("Globex".into()));
        surface.show(next, &renderer).unwrap();
        let second = std::fs::read_to_string(&path).unwrap();
        assert!(second.contains("Globex"));
    }

    #[test]
    fn failed_redraw_reports_and_keeps_the_shown_version() {
        use crate::model::{ImagePayload, ImageSlot};

        let dir = tempfile::tempdir().unwrap();
        let renderer = Renderer::builtin().unwrap();
        let mut store = store();
        let mut surface = PreviewSurface::with_live_file(dir.path().join("preview.typ"));
        surface.show(store.snapshot(), &renderer).unwrap();
        let shown = surface.content().unwrap().version();

        let mut broken = b"\x89PNG\r\n\x1a\n".to_vec();
        broken.extend_from_slice(b"garbage");
        let payload = ImagePayload::new(image::ImageFormat::Png, broken);
        let next = store.update_header(HeaderUpdate::Image(ImageSlot::Logo, Some(payload)));

        assert!(surface.show(next, &renderer).is_err());
        assert_eq!(surface.content().unwrap().version(), shown);
    }
}
