//! Exporting the preview to a PDF.
//!
//! The preview sheet carries a shadow, an A4 minimum height and a bottom
//! margin. Left in place they stretch or pad the printed page, so they are
//! swapped for neutral values while the exporter runs and put back when the
//! guard drops, whether the export succeeded, failed or panicked.

use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};

use slug::slugify;
use thiserror::Error;

use crate::error::Error;
use crate::model::InvoiceHeader;
use crate::preview::{PreviewSurface, SurfaceStyle};
use crate::render::{ImageEncoding, PageSetup, Renderer};
use crate::store::Snapshot;

pub const DEFAULT_FILE_STEM: &str = "invoice";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("An export is already running")]
    InProgress,

    #[error("'{0}' is not installed. Please install it (brew install typst).")]
    CompilerMissing(String),

    #[error("Compilation failed: {0}")]
    CompileFailed(String),

    #[error("Failed to stage document: {0}")]
    Staging(#[source] Box<Error>),
}

impl From<Error> for ExportError {
    fn from(err: Error) -> Self {
        Self::Staging(Box::new(err))
    }
}

impl From<std::io::Error> for ExportError {
    fn from(err: std::io::Error) -> Self {
        Self::Staging(Box::new(Error::Io(err)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Paper {
    A4,
}

impl Paper {
    /// Portrait width and height in millimetres.
    pub fn size_mm(&self) -> (f64, f64) {
        match self {
            Paper::A4 => (210.0, 297.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Portrait,
    Landscape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
}

/// Output parameters handed to the exporter.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOptions {
    pub file_name: String,
    /// Pixel density relative to 96 dpi.
    pub scale: f64,
    pub paper: Paper,
    pub orientation: Orientation,
    pub margin_mm: f64,
    pub image_format: ImageFormat,
    /// 0.0..=1.0
    pub image_quality: f64,
}

impl ExportOptions {
    /// Single A4 portrait page, no margin, 2× density, JPEG at 98%.
    pub fn for_invoice(header: &InvoiceHeader) -> Self {
        Self {
            file_name: file_name_for(&header.invoice_number),
            scale: 2.0,
            paper: Paper::A4,
            orientation: Orientation::Portrait,
            margin_mm: 0.0,
            image_format: ImageFormat::Jpeg,
            image_quality: 0.98,
        }
    }

    pub fn page_setup(&self) -> PageSetup {
        let (w, h) = self.paper.size_mm();
        let (width, height) = match self.orientation {
            Orientation::Portrait => (w, h),
            Orientation::Landscape => (h, w),
        };
        PageSetup {
            width: format!("{}mm", width),
            height: format!("{}mm", height),
            margin: format!("{}mm", self.margin_mm),
            fill: "white".to_string(),
        }
    }

    pub fn image_encoding(&self) -> ImageEncoding {
        ImageEncoding {
            scale: self.scale,
            quality: (self.image_quality * 100.0).round().clamp(1.0, 100.0) as u8,
        }
    }
}

/// `<invoice number>.pdf`, or `invoice.pdf` when the number is blank.
/// Path separators are replaced so the name stays a single file.
pub fn file_name_for(invoice_number: &str) -> String {
    let stem = invoice_number.trim();
    let stem = if stem.is_empty() { DEFAULT_FILE_STEM } else { stem };
    let stem: String = stem
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | '\0') { '-' } else { c })
        .collect();
    format!("{}.pdf", stem)
}

/// The document-export capability.
pub trait DocumentExporter {
    /// Produces the document and returns where it was saved.
    fn export(
        &self,
        snapshot: &Snapshot,
        style: &SurfaceStyle,
        options: &ExportOptions,
    ) -> Result<PathBuf, ExportError>;
}

/// A surface whose presentation properties are neutralized until drop.
pub struct NeutralizedSurface<'a> {
    surface: &'a mut PreviewSurface,
    saved: SurfaceStyle,
}

impl<'a> NeutralizedSurface<'a> {
    pub fn apply(surface: &'a mut PreviewSurface) -> Self {
        let saved = *surface.style();
        surface.set_style(SurfaceStyle::neutral());
        Self { surface, saved }
    }

    pub fn saved(&self) -> &SurfaceStyle {
        &self.saved
    }
}

impl Deref for NeutralizedSurface<'_> {
    type Target = PreviewSurface;

    fn deref(&self) -> &PreviewSurface {
        self.surface
    }
}

impl Drop for NeutralizedSurface<'_> {
    fn drop(&mut self) {
        self.surface.set_style(self.saved);
    }
}

/// Lets one export through at a time. Overlapping requests are rejected.
#[derive(Debug, Default)]
pub struct ExportGate {
    busy: AtomicBool,
}

struct GatePass<'a>(&'a AtomicBool);

impl Drop for GatePass<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ExportGate {
    fn enter(&self) -> Result<GatePass<'_>, ExportError> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ExportError::InProgress)?;
        Ok(GatePass(&self.busy))
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Pairs an exporter with its gate.
pub struct ExportBoundary<E> {
    exporter: E,
    gate: ExportGate,
}

impl<E: DocumentExporter> ExportBoundary<E> {
    pub fn new(exporter: E) -> Self {
        Self {
            exporter,
            gate: ExportGate::default(),
        }
    }

    pub fn exporter(&self) -> &E {
        &self.exporter
    }

    /// Exports what `surface` shows.
    ///
    /// Returns `Ok(None)` without touching anything when no surface is
    /// mounted or it has nothing on it yet.
    pub fn export(&self, surface: Option<&mut PreviewSurface>) -> Result<Option<PathBuf>, ExportError> {
        let Some(surface) = surface else {
            tracing::debug!("export requested without a preview surface");
            return Ok(None);
        };
        let Some(snapshot) = surface.content().cloned() else {
            tracing::debug!("export requested before anything was rendered");
            return Ok(None);
        };

        let _pass = self.gate.enter()?;
        let options = ExportOptions::for_invoice(snapshot.header());
        tracing::info!(file = %options.file_name, version = snapshot.version(), "exporting invoice");

        let neutral = NeutralizedSurface::apply(surface);
        let saved = self.exporter.export(&snapshot, neutral.style(), &options)?;
        drop(neutral);

        tracing::info!(path = %saved.display(), "invoice exported");
        Ok(Some(saved))
    }
}

/// Renders through the template and compiles with the `typst` CLI.
pub struct TypstExporter {
    renderer: Renderer,
    build_dir: PathBuf,
    output_dir: PathBuf,
    compiler: String,
}

impl TypstExporter {
    pub fn new(renderer: Renderer, build_dir: PathBuf, output_dir: PathBuf) -> Self {
        Self {
            renderer,
            build_dir,
            output_dir,
            compiler: "typst".to_string(),
        }
    }

    pub fn with_compiler(mut self, compiler: impl Into<String>) -> Self {
        self.compiler = compiler.into();
        self
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    /// Writes the Typst source and image sidecars; returns the source path.
    pub fn stage(
        &self,
        snapshot: &Snapshot,
        style: &SurfaceStyle,
        options: &ExportOptions,
    ) -> Result<PathBuf, ExportError> {
        let work_dir = self.build_dir.join(work_dir_name(&options.file_name));
        let source_path = work_dir.join("invoice.typ");
        Ok(self.renderer.stage(
            &source_path,
            snapshot,
            style,
            &options.page_setup(),
            &options.image_encoding(),
        )?)
    }

    fn compile(&self, source_path: &Path, pdf_path: &Path) -> Result<(), ExportError> {
        let root = source_path.parent().unwrap_or(Path::new("."));
        let output = Command::new(&self.compiler)
            .arg("compile")
            .arg("--root")
            .arg(root)
            .arg(source_path)
            .arg(pdf_path)
            .output()?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            Err(ExportError::CompileFailed(if stderr.is_empty() {
                output.status.to_string()
            } else {
                stderr
            }))
        }
    }
}

fn work_dir_name(file_name: &str) -> String {
    let stem = file_name.strip_suffix(".pdf").unwrap_or(file_name);
    let slug = slugify(stem);
    if slug.is_empty() {
        DEFAULT_FILE_STEM.to_string()
    } else {
        slug
    }
}

impl DocumentExporter for TypstExporter {
    fn export(
        &self,
        snapshot: &Snapshot,
        style: &SurfaceStyle,
        options: &ExportOptions,
    ) -> Result<PathBuf, ExportError> {
        if Command::new(&self.compiler).arg("--version").output().is_err() {
            return Err(ExportError::CompilerMissing(self.compiler.clone()));
        }

        let source_path = self.stage(snapshot, style, options)?;
        std::fs::create_dir_all(&self.output_dir)?;
        let pdf_path = self.output_dir.join(&options.file_name);

        println!("🔨 Compiling PDF...");
        self.compile(&source_path, &pdf_path)?;
        Ok(pdf_path)
    }
}
