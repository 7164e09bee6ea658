//! The interactive form. One menu entry per section of the invoice; every
//! answer becomes a store update, and the preview is redrawn afterwards.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::Local;
use inquire::{Confirm, DateSelect, InquireError, Select, Text};

use crate::config::{Settings, expand_home_dir};
use crate::error::Error;
use crate::export::{ExportBoundary, TypstExporter};
use crate::images::{self, ACCEPTED_EXTENSIONS};
use crate::input::coerce_number;
use crate::model::{BackgroundStyle, ImageSlot, ItemId, PaymentStatus};
use crate::preview::PreviewSurface;
use crate::render::{Renderer, terminal_preview};
use crate::store::{HeaderUpdate, InvoiceStore, ItemUpdate};
use crate::totals::format_money;

const CURRENCY_PRESETS: &[(&str, &str)] = &[
    ("$", "USD"),
    ("৳", "BDT"),
    ("€", "EUR"),
    ("£", "GBP"),
    ("₹", "INR"),
];
const OTHER_CURRENCY: &str = "✏️  Other...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Design,
    Info,
    From,
    To,
    Items,
    Tax,
    Notes,
    Preview,
    Download,
    Quit,
}

impl Section {
    const ALL: [Section; 10] = [
        Self::Design,
        Self::Info,
        Self::From,
        Self::To,
        Self::Items,
        Self::Tax,
        Self::Notes,
        Self::Preview,
        Self::Download,
        Self::Quit,
    ];
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Design => "🎨 Design & Branding",
            Self::Info => "🧾 Invoice Info",
            Self::From => "🏢 From (Company)",
            Self::To => "👤 To (Client)",
            Self::Items => "📋 Items",
            Self::Tax => "🧮 Tax",
            Self::Notes => "🖊  Notes & Signature",
            Self::Preview => "👀 Preview",
            Self::Download => "📥 Download PDF",
            Self::Quit => "🚪 Quit",
        };
        f.write_str(label)
    }
}

enum ItemChoice {
    Add,
    Row(ItemId, String),
    Back,
}

impl fmt::Display for ItemChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add => f.write_str("➕ Add Item"),
            Self::Row(_, label) => f.write_str(label),
            Self::Back => f.write_str("⬅️  Back"),
        }
    }
}

enum ImageAction {
    Keep,
    Upload,
    Remove,
}

impl fmt::Display for ImageAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Keep => f.write_str("Keep current"),
            Self::Upload => f.write_str("Upload new"),
            Self::Remove => f.write_str("Remove"),
        }
    }
}

pub struct Editor {
    store: InvoiceStore,
    surface: PreviewSurface,
    renderer: Renderer,
    boundary: ExportBoundary<TypstExporter>,
}

impl Editor {
    pub fn new(settings: &Settings, live_preview: bool) -> Result<Self, Error> {
        let renderer = Renderer::from_dir(&settings.template_dir())?;
        let exporter = TypstExporter::new(
            renderer.clone(),
            settings.build_dir(),
            settings.output_dir(),
        );
        let surface = if live_preview {
            PreviewSurface::with_live_file(settings.preview_path())
        } else {
            PreviewSurface::new()
        };

        Ok(Self {
            store: InvoiceStore::with_defaults(&settings.defaults, Local::now().date_naive()),
            surface,
            renderer,
            boundary: ExportBoundary::new(exporter),
        })
    }

    pub fn run(&mut self) -> Result<(), Error> {
        self.refresh();
        if let Some(path) = self.surface.live_path() {
            println!("💡 Live preview: typst watch {:?}", path);
        }

        loop {
            let section = match Select::new("Invoice Builder:", Section::ALL.to_vec())
                .with_page_size(Section::ALL.len())
                .prompt()
            {
                Ok(section) => section,
                Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => {
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            };

            let result = match section {
                Section::Design => self.edit_design(),
                Section::Info => self.edit_info(),
                Section::From => self.edit_sender(),
                Section::To => self.edit_recipient(),
                Section::Items => self.edit_items(),
                Section::Tax => self.edit_tax(),
                Section::Notes => self.edit_notes(),
                Section::Preview => {
                    println!("\n{}\n", terminal_preview(&self.store.snapshot()));
                    Ok(())
                }
                Section::Download => self.download(),
                Section::Quit => return Ok(()),
            };

            match result {
                Ok(()) => {}
                Err(Error::Prompt(InquireError::OperationCanceled)) => println!("Cancelled"),
                Err(Error::Prompt(InquireError::OperationInterrupted)) => return Ok(()),
                Err(e) => println!("❌ Error: {}", e),
            }
            self.refresh();
        }
    }

    /// Brings the surface up to the store's current snapshot.
    fn sync_preview(&mut self) -> Result<(), Error> {
        self.surface.show(self.store.snapshot(), &self.renderer)?;
        Ok(())
    }

    fn refresh(&mut self) {
        if let Err(e) = self.sync_preview() {
            tracing::warn!(error = %e, "preview refresh failed");
            println!("❌ Preview Error: {}", e);
        }
    }

    fn edit_design(&mut self) -> Result<(), Error> {
        let header = self.store.snapshot().header().clone();

        let color = Text::new("Brand Color (hex):")
            .with_default(&header.brand_color)
            .prompt()?;
        if color != header.brand_color {
            self.store.update_header(HeaderUpdate::BrandColor(color));
        }

        let background = Select::new("Background Style:", BackgroundStyle::ALL.to_vec())
            .with_starting_cursor(position(&BackgroundStyle::ALL, &header.background))
            .prompt()?;
        if background != header.background {
            self.store.update_header(HeaderUpdate::Background(background));
        }

        let currency = prompt_currency(&header.currency)?;
        if currency != header.currency {
            self.store.update_header(HeaderUpdate::Currency(currency));
        }

        self.edit_image(ImageSlot::Logo)
    }

    fn edit_info(&mut self) -> Result<(), Error> {
        let header = self.store.snapshot().header().clone();

        let number = Text::new("Invoice Number:")
            .with_default(&header.invoice_number)
            .prompt()?;
        if number != header.invoice_number {
            self.store.update_header(HeaderUpdate::InvoiceNumber(number));
        }

        let date = DateSelect::new("Date:")
            .with_default(header.issue_date)
            .prompt()?;
        if date != header.issue_date {
            self.store.update_header(HeaderUpdate::IssueDate(date));
        }

        let due = DateSelect::new("Due Date:")
            .with_default(header.due_date)
            .prompt()?;
        if due != header.due_date {
            self.store.update_header(HeaderUpdate::DueDate(due));
        }

        let status = Select::new("Payment Status:", PaymentStatus::ALL.to_vec())
            .with_starting_cursor(position(&PaymentStatus::ALL, &header.status))
            .prompt()?;
        if status != header.status {
            self.store.update_header(HeaderUpdate::Status(status));
        }
        Ok(())
    }

    fn edit_sender(&mut self) -> Result<(), Error> {
        let header = self.store.snapshot().header().clone();
        println!("💡 Tip: Use '\\n' for new lines.");

        let name = Text::new("Company Name:")
            .with_default(&header.sender_name)
            .prompt()?;
        if name != header.sender_name {
            self.store.update_header(HeaderUpdate::SenderName(name));
        }

        let details = prompt_multiline("Address / Details:", &header.sender_details)?;
        if details != header.sender_details {
            self.store.update_header(HeaderUpdate::SenderDetails(details));
        }
        Ok(())
    }

    fn edit_recipient(&mut self) -> Result<(), Error> {
        let header = self.store.snapshot().header().clone();
        println!("💡 Tip: Use '\\n' for new lines.");

        let name = Text::new("Client Name:")
            .with_default(&header.recipient_name)
            .with_placeholder("Client Name")
            .prompt()?;
        if name != header.recipient_name {
            self.store.update_header(HeaderUpdate::RecipientName(name));
        }

        let details = prompt_multiline("Address / Details:", &header.recipient_details)?;
        if details != header.recipient_details {
            self.store.update_header(HeaderUpdate::RecipientDetails(details));
        }
        Ok(())
    }

    fn edit_items(&mut self) -> Result<(), Error> {
        loop {
            let snapshot = self.store.snapshot();
            let currency = snapshot.header().currency.clone();

            let mut options = vec![ItemChoice::Add];
            for (index, item) in snapshot.items().iter().enumerate() {
                let description = if item.description.is_empty() {
                    "(no description)"
                } else {
                    item.description.as_str()
                };
                options.push(ItemChoice::Row(
                    item.id,
                    format!(
                        "Item {}: {} | {} × {}{} = {}",
                        index + 1,
                        description,
                        item.quantity,
                        currency,
                        item.rate,
                        format_money(&currency, item.amount())
                    ),
                ));
            }
            options.push(ItemChoice::Back);

            match Select::new("Items:", options).with_page_size(12).prompt()? {
                ItemChoice::Add => {
                    let (id, _) = self.store.add_item();
                    self.edit_item(id)?;
                }
                ItemChoice::Row(id, _) => {
                    let actions = vec!["✏️  Edit", "🗑  Delete"];
                    if Select::new("Item:", actions).prompt()? == "🗑  Delete" {
                        self.store.remove_item(id);
                    } else {
                        self.edit_item(id)?;
                    }
                }
                ItemChoice::Back => return Ok(()),
            }
            self.refresh();
        }
    }

    fn edit_item(&mut self, id: ItemId) -> Result<(), Error> {
        let snapshot = self.store.snapshot();
        let Some(item) = snapshot.item(id) else {
            return Ok(());
        };

        let description = Text::new("Description:")
            .with_default(&item.description)
            .prompt()?;
        if description != item.description {
            self.store.update_item(id, ItemUpdate::Description(description));
        }

        let quantity = coerce_number(
            &Text::new("Qty:")
                .with_default(&item.quantity.to_string())
                .prompt()?,
        );
        if quantity != item.quantity {
            self.store.update_item(id, ItemUpdate::Quantity(quantity));
        }

        let rate = coerce_number(
            &Text::new("Rate:")
                .with_default(&item.rate.to_string())
                .prompt()?,
        );
        if rate != item.rate {
            self.store.update_item(id, ItemUpdate::Rate(rate));
        }
        Ok(())
    }

    fn edit_tax(&mut self) -> Result<(), Error> {
        let header = self.store.snapshot().header().clone();

        let label = Text::new("Tax Label:")
            .with_default(&header.tax_label)
            .prompt()?;
        if label != header.tax_label {
            self.store.update_header(HeaderUpdate::TaxLabel(label));
        }

        let rate = coerce_number(
            &Text::new("Tax Rate (%):")
                .with_default(&header.tax_rate.to_string())
                .prompt()?,
        );
        if rate != header.tax_rate {
            self.store.update_header(HeaderUpdate::TaxRate(rate));
        }
        Ok(())
    }

    fn edit_notes(&mut self) -> Result<(), Error> {
        let header = self.store.snapshot().header().clone();

        let notes = prompt_multiline("Notes / Terms:", &header.notes)?;
        if notes != header.notes {
            self.store.update_header(HeaderUpdate::Notes(notes));
        }

        self.edit_image(ImageSlot::Signature)
    }

    fn edit_image(&mut self, slot: ImageSlot) -> Result<(), Error> {
        let present = self.store.snapshot().header().image(slot).is_some();
        let action = if present {
            Select::new(
                &format!("Current {}:", slot),
                vec![ImageAction::Keep, ImageAction::Upload, ImageAction::Remove],
            )
            .prompt()?
        } else if Confirm::new(&format!("Upload {}?", slot))
            .with_default(false)
            .prompt()?
        {
            ImageAction::Upload
        } else {
            ImageAction::Keep
        };

        match action {
            ImageAction::Keep => {}
            ImageAction::Remove => {
                self.store.update_header(HeaderUpdate::Image(slot, None));
            }
            ImageAction::Upload => {
                let Some(path) = pick_image(slot)? else {
                    return Ok(());
                };
                match images::read_image(&path) {
                    Ok(payload) => {
                        self.store
                            .update_header(HeaderUpdate::Image(slot, Some(payload)));
                        println!("✅ {} loaded from {:?}", slot, path);
                    }
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "image upload ignored");
                        println!("❌ Could not load {:?}: {}", path, e);
                    }
                }
            }
        }
        Ok(())
    }

    fn download(&mut self) -> Result<(), Error> {
        // the surface must show the latest edits before it is exported
        if let Err(e) = self.sync_preview() {
            tracing::warn!(error = %e, "export aborted, preview is stale");
            return Err(e);
        }
        match self.boundary.export(Some(&mut self.surface))? {
            Some(path) => {
                println!("✅ PDF Generated: {:?}", path);
                open_and_reveal(&path);
            }
            None => println!("Nothing to export yet."),
        }
        Ok(())
    }
}

fn position<T: PartialEq>(all: &[T], current: &T) -> usize {
    all.iter().position(|v| v == current).unwrap_or(0)
}

fn prompt_currency(current: &str) -> Result<String, Error> {
    let mut options: Vec<String> = CURRENCY_PRESETS
        .iter()
        .map(|(symbol, code)| format!("{} ({})", code, symbol))
        .collect();
    options.push(OTHER_CURRENCY.to_string());

    let cursor = CURRENCY_PRESETS
        .iter()
        .position(|(symbol, _)| *symbol == current)
        .unwrap_or(options.len() - 1);
    let choice = Select::new("Currency:", options)
        .with_starting_cursor(cursor)
        .prompt()?;

    if choice == OTHER_CURRENCY {
        return Ok(Text::new("Currency Symbol:")
            .with_default(current)
            .prompt()?);
    }
    Ok(CURRENCY_PRESETS
        .iter()
        .find(|(symbol, code)| choice == format!("{} ({})", code, symbol))
        .map(|(symbol, _)| symbol.to_string())
        .unwrap_or_else(|| current.to_string()))
}

/// Single-line prompt where a typed `\n` stands for a line break.
fn prompt_multiline(message: &str, current: &str) -> Result<String, Error> {
    let shown = current.replace('\n', "\\n");
    let answer = Text::new(message).with_default(&shown).prompt()?;
    Ok(answer.replace("\\n", "\n"))
}

fn pick_image(slot: ImageSlot) -> Result<Option<PathBuf>, Error> {
    println!("📂 Opening file picker...");
    let picked = rfd::FileDialog::new()
        .set_title(format!("Select {} image", slot))
        .add_filter("Images", ACCEPTED_EXTENSIONS)
        .pick_file();
    if picked.is_some() {
        return Ok(picked);
    }

    println!("❌ No file selected. Falling back to manual input.");
    let typed = Text::new("Image path (leave empty to skip):").prompt()?;
    let typed = typed.trim();
    if typed.is_empty() {
        return Ok(None);
    }
    Ok(Some(PathBuf::from(expand_home_dir(typed))))
}

// Open file and reveal in Finder/Explorer
fn open_and_reveal(path: &Path) {
    #[cfg(target_os = "macos")]
    Command::new("open").arg("-R").arg(path).spawn().ok();

    #[cfg(target_os = "windows")]
    Command::new("explorer")
        .arg(format!("/select,{}", path.to_string_lossy()))
        .spawn()
        .ok();

    #[cfg(target_os = "linux")]
    Command::new("xdg-open").arg(path).spawn().ok();
}
