//! Rendering the invoice: Typst source through `tera` for the document, and
//! a `comfy-table` summary for the terminal.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use comfy_table::{Attribute, Cell, CellAlignment, Color, Table};
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tera::{Context, Tera};

use crate::error::Error;
use crate::images;
use crate::model::{ImageSlot, InvoiceHeader, PaymentStatus};
use crate::preview::{MinHeight, Shadow, SurfaceStyle};
use crate::store::Snapshot;
use crate::totals::{format_money, tax_caption};

pub const TEMPLATE_NAME: &str = "invoice.typ.tera";
pub const RECIPIENT_PLACEHOLDER: &str = "Client Name";
pub const FALLBACK_BRAND_COLOR: &str = "#2563eb";

// Embedded so a fresh data directory always has a template to start from
const DEFAULT_TEMPLATE: &str = include_str!("../templates/invoice.typ.tera");

static HEX_COLOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#([0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").expect("hex color pattern")
});

// Printed widths the template gives the images
const LOGO_WIDTH_MM: f64 = 45.0;
const SIGNATURE_WIDTH_MM: f64 = 40.0;
const CSS_PX_PER_MM: f64 = 96.0 / 25.4;

/// Page geometry written into the `#set page(...)` rule, as Typst lengths.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageSetup {
    pub width: String,
    pub height: String,
    pub margin: String,
    pub fill: String,
}

impl PageSetup {
    /// Grey desk behind a sheet that grows with its content.
    pub fn screen() -> Self {
        Self {
            width: "234mm".to_string(),
            height: "auto".to_string(),
            margin: "12mm".to_string(),
            fill: "luma(235)".to_string(),
        }
    }
}

/// How embedded images are prepared for a render.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageEncoding {
    /// Pixel density relative to 96 dpi.
    pub scale: f64,
    /// JPEG quality, 1..=100.
    pub quality: u8,
}

impl ImageEncoding {
    pub fn preview() -> Self {
        Self { scale: 1.0, quality: 90 }
    }

    fn max_width_px(&self, printed_mm: f64) -> u32 {
        (printed_mm * CSS_PX_PER_MM * self.scale).round().max(1.0) as u32
    }
}

#[derive(Debug, Serialize)]
struct InvoiceContext<'a> {
    invoice_number: &'a str,
    issue_date: String,
    due_date: String,
    status: StatusContext,
    sender: PartyContext<'a>,
    recipient: PartyContext<'a>,
    brand_color: &'a str,
    background: &'static str,
    logo: Option<String>,
    signature: Option<String>,
    items: Vec<ItemRow>,
    totals: TotalsContext,
    notes: &'a str,
    page: &'a PageSetup,
    surface: SurfaceContext,
}

#[derive(Debug, Serialize)]
struct StatusContext {
    label: &'static str,
    fill: &'static str,
    ink: &'static str,
}

#[derive(Debug, Serialize)]
struct PartyContext<'a> {
    name: &'a str,
    details: &'a str,
}

#[derive(Debug, Serialize)]
struct ItemRow {
    description: String,
    quantity: String,
    rate: String,
    amount: String,
}

#[derive(Debug, Serialize)]
struct TotalsContext {
    subtotal: String,
    tax_caption: String,
    tax: String,
    total: String,
}

#[derive(Debug, Serialize)]
struct SurfaceContext {
    shadow: bool,
    min_height: Option<String>,
    margin_bottom: Option<String>,
}

impl From<&SurfaceStyle> for SurfaceContext {
    fn from(style: &SurfaceStyle) -> Self {
        Self {
            shadow: style.shadow == Shadow::Soft,
            min_height: match style.min_height {
                MinHeight::Auto => None,
                MinHeight::Mm(mm) => Some(format!("{}mm", mm)),
            },
            margin_bottom: (style.margin_bottom_mm > 0.0)
                .then(|| format!("{}mm", style.margin_bottom_mm)),
        }
    }
}

fn status_palette(status: PaymentStatus) -> StatusContext {
    let (fill, ink) = match status {
        PaymentStatus::Paid => ("#dcfce7", "#166534"),
        PaymentStatus::Unpaid => ("#fef3c7", "#92400e"),
        PaymentStatus::Refunded => ("#fee2e2", "#991b1b"),
    };
    StatusContext {
        label: status.badge(),
        fill,
        ink,
    }
}

/// The brand color if it is a hex color Typst understands, else the default.
pub fn brand_color(header: &InvoiceHeader) -> &str {
    let color = header.brand_color.trim();
    if HEX_COLOR.is_match(color) {
        color
    } else {
        FALLBACK_BRAND_COLOR
    }
}

pub fn parse_hex_color(color: &str) -> Option<(u8, u8, u8)> {
    let caps = HEX_COLOR.captures(color.trim())?;
    let digits = caps.get(1)?.as_str();
    let expanded: String = if digits.len() == 3 {
        digits.chars().flat_map(|c| [c, c]).collect()
    } else {
        digits.to_string()
    };
    let channel = |i: usize| u8::from_str_radix(&expanded[i..i + 2], 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

/// Wraps `text` in a Typst string literal.
pub fn quote_typst(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => {}
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

fn typst_str(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let text = match value {
        Value::String(s) => quote_typst(s),
        Value::Null => quote_typst(""),
        other => quote_typst(&other.to_string()),
    };
    Ok(Value::String(text))
}

#[derive(Clone)]
pub struct Renderer {
    tera: Tera,
}

impl Renderer {
    /// Uses the template compiled into the binary.
    pub fn builtin() -> Result<Self, Error> {
        let mut tera = Tera::default();
        tera.add_raw_template(TEMPLATE_NAME, DEFAULT_TEMPLATE)?;
        tera.register_filter("typst_str", typst_str);
        Ok(Self { tera })
    }

    /// Loads `*.tera` from `template_dir`, writing the default template
    /// there first if it is missing.
    pub fn from_dir(template_dir: &Path) -> Result<Self, Error> {
        fs::create_dir_all(template_dir)?;
        let template_path = template_dir.join(TEMPLATE_NAME);
        if !template_path.exists() {
            println!("✨ Initializing default template...");
            fs::write(&template_path, DEFAULT_TEMPLATE)?;
        }

        let glob = template_dir.join("*.tera");
        let mut tera = Tera::new(&glob.to_string_lossy())?;
        tera.register_filter("typst_str", typst_str);
        Ok(Self { tera })
    }

    /// Renders Typst source. `assets` maps image slots to paths relative to
    /// the source file.
    pub fn render(
        &self,
        snapshot: &Snapshot,
        style: &SurfaceStyle,
        page: &PageSetup,
        assets: &HashMap<&'static str, String>,
    ) -> Result<String, Error> {
        let header = snapshot.header();
        let currency = header.currency.as_str();
        let totals = snapshot.totals();

        let recipient_name = if header.recipient_name.is_empty() {
            RECIPIENT_PLACEHOLDER
        } else {
            header.recipient_name.as_str()
        };

        let context_data = InvoiceContext {
            invoice_number: &header.invoice_number,
            issue_date: header.issue_date.format("%Y-%m-%d").to_string(),
            due_date: header.due_date.format("%Y-%m-%d").to_string(),
            status: status_palette(header.status),
            sender: PartyContext {
                name: &header.sender_name,
                details: &header.sender_details,
            },
            recipient: PartyContext {
                name: recipient_name,
                details: &header.recipient_details,
            },
            brand_color: brand_color(header),
            background: header.background.key(),
            logo: assets.get("logo").cloned(),
            signature: assets.get("signature").cloned(),
            items: snapshot
                .items()
                .iter()
                .map(|item| ItemRow {
                    description: item.description.clone(),
                    quantity: item.quantity.to_string(),
                    rate: format!("{}{}", currency, item.rate),
                    amount: format_money(currency, item.amount()),
                })
                .collect(),
            totals: TotalsContext {
                subtotal: format_money(currency, totals.subtotal),
                tax_caption: tax_caption(&header.tax_label, header.tax_rate),
                tax: format_money(currency, totals.tax),
                total: format_money(currency, totals.total),
            },
            notes: &header.notes,
            page,
            surface: style.into(),
        };

        let context = Context::from_serialize(&context_data)?;
        Ok(self.tera.render(TEMPLATE_NAME, &context)?)
    }

    /// Writes the Typst source to `source_path` with the images as JPEG
    /// files beside it.
    pub fn stage(
        &self,
        source_path: &Path,
        snapshot: &Snapshot,
        style: &SurfaceStyle,
        page: &PageSetup,
        encoding: &ImageEncoding,
    ) -> Result<PathBuf, Error> {
        let dir = source_path.parent().unwrap_or(Path::new("."));
        fs::create_dir_all(dir)?;

        let mut assets = HashMap::new();
        for (slot, printed_mm) in [
            (ImageSlot::Logo, LOGO_WIDTH_MM),
            (ImageSlot::Signature, SIGNATURE_WIDTH_MM),
        ] {
            let key = match slot {
                ImageSlot::Logo => "logo",
                ImageSlot::Signature => "signature",
            };
            let file_name = format!("{}.{}", key, images::jpeg_extension());
            match snapshot.header().image(slot) {
                Some(payload) => {
                    let jpeg = images::to_jpeg(
                        payload,
                        encoding.max_width_px(printed_mm),
                        encoding.quality,
                    )?;
                    fs::write(dir.join(&file_name), jpeg)?;
                    assets.insert(key, file_name);
                }
                None => {
                    // left over from an earlier render
                    let stale = dir.join(&file_name);
                    if stale.exists() {
                        fs::remove_file(stale)?;
                    }
                }
            }
        }

        let source = self.render(snapshot, style, page, &assets)?;
        fs::write(source_path, source)?;
        Ok(source_path.to_path_buf())
    }
}

fn brand_cell_color(header: &InvoiceHeader) -> Color {
    let (r, g, b) = parse_hex_color(brand_color(header)).unwrap_or((37, 99, 235));
    Color::Rgb { r, g, b }
}

/// Plain-text preview for the terminal.
pub fn terminal_preview(snapshot: &Snapshot) -> String {
    let header = snapshot.header();
    let currency = header.currency.as_str();
    let brand = brand_cell_color(header);
    let totals = snapshot.totals();

    let mut parties = Table::new();
    parties.set_header(vec![
        Cell::new("Billed To").fg(brand).add_attribute(Attribute::Bold),
        Cell::new("Billed From").fg(brand).add_attribute(Attribute::Bold),
    ]);
    let recipient_name = if header.recipient_name.is_empty() {
        RECIPIENT_PLACEHOLDER
    } else {
        header.recipient_name.as_str()
    };
    parties.add_row(vec![
        Cell::new(format!("{}\n{}", recipient_name, header.recipient_details).trim_end()),
        Cell::new(format!("{}\n{}", header.sender_name, header.sender_details).trim_end())
            .set_alignment(CellAlignment::Right),
    ]);

    let mut meta = Table::new();
    meta.set_header(vec!["Invoice No", "Date", "Due Date", "Status"]);
    meta.add_row(vec![
        Cell::new(&header.invoice_number),
        Cell::new(header.issue_date.format("%Y-%m-%d")),
        Cell::new(header.due_date.format("%Y-%m-%d")),
        Cell::new(header.status.badge().to_uppercase()).add_attribute(Attribute::Bold),
    ]);

    let mut lines = Table::new();
    lines.set_header(
        ["Description", "Qty", "Rate", "Amount"]
            .into_iter()
            .map(|h| Cell::new(h).fg(brand).add_attribute(Attribute::Bold))
            .collect::<Vec<_>>(),
    );
    for item in snapshot.items() {
        lines.add_row(vec![
            Cell::new(&item.description),
            Cell::new(item.quantity).set_alignment(CellAlignment::Right),
            Cell::new(format!("{}{}", currency, item.rate)).set_alignment(CellAlignment::Right),
            Cell::new(format_money(currency, item.amount())).set_alignment(CellAlignment::Right),
        ]);
    }

    let mut summary = Table::new();
    summary.add_row(vec![
        Cell::new("Subtotal:"),
        Cell::new(format_money(currency, totals.subtotal)).set_alignment(CellAlignment::Right),
    ]);
    summary.add_row(vec![
        Cell::new(tax_caption(&header.tax_label, header.tax_rate)),
        Cell::new(format_money(currency, totals.tax)).set_alignment(CellAlignment::Right),
    ]);
    summary.add_row(vec![
        Cell::new("Total:").fg(brand).add_attribute(Attribute::Bold),
        Cell::new(format_money(currency, totals.total))
            .fg(brand)
            .add_attribute(Attribute::Bold)
            .set_alignment(CellAlignment::Right),
    ]);

    let describe = |slot: ImageSlot| match header.image(slot) {
        Some(payload) => format!("{} ({} KB)", payload.mime_type(), payload.bytes.len().div_ceil(1024)),
        None => "none".to_string(),
    };

    format!(
        "INVOICE · {} background\n{parties}\n{meta}\n{lines}\n{summary}\nNotes: {}\nLogo: {} · Signature: {}",
        header.background,
        header.notes,
        describe(ImageSlot::Logo),
        describe(ImageSlot::Signature),
    )
}
