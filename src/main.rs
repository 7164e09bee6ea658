use clap::{Parser, Subcommand};
use inquire::Text;
use tracing_subscriber::EnvFilter;

use invoice_builder::config::{self, DEFAULT_DATA_ROOT};
use invoice_builder::editor::Editor;
use invoice_builder::input::coerce_number;
use invoice_builder::{Error, Settings};

#[derive(Parser)]
#[command(name = "invoice-builder")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new invoice (default)
    New {
        /// Do not write the live preview file
        #[arg(long)]
        no_live_preview: bool,
    },
    /// Configure data directory and invoice defaults
    Config,
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command.unwrap_or(Commands::New { no_live_preview: false }) {
        Commands::New { no_live_preview } => run_editor(!no_live_preview),
        Commands::Config => setup_config_wizard().map(|_| ()),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run_editor(live_preview: bool) -> Result<(), Error> {
    let settings = Settings::load()?;
    let mut editor = Editor::new(&settings, live_preview)?;
    editor.run()
}

fn setup_config_wizard() -> Result<Settings, Error> {
    println!("\n⚙️  --- Configuration Setup ---");
    let mut settings = Settings::load().unwrap_or_else(|e| {
        println!("❌ Existing settings unreadable ({}), starting from defaults.", e);
        Settings::default()
    });

    println!("📂 Opening folder picker...");
    let picked_path = rfd::FileDialog::new()
        .set_title("Select Root Data Directory")
        .pick_folder();

    settings.data_root = if let Some(path) = picked_path {
        path.to_string_lossy().to_string()
    } else {
        println!("❌ No folder selected. Falling back to manual input.");
        let current = if settings.data_root.is_empty() {
            DEFAULT_DATA_ROOT.to_string()
        } else {
            settings.data_root.clone()
        };
        Text::new("Enter Root Data Directory:")
            .with_default(&current)
            .prompt()?
    };

    println!("\n--- Invoice Defaults ---");
    let defaults = &mut settings.defaults;
    defaults.sender_name = Text::new("Company Name:")
        .with_default(&defaults.sender_name)
        .prompt()?;
    defaults.sender_details = Text::new("Company Address / Details:")
        .with_default(&defaults.sender_details)
        .prompt()?;
    defaults.currency = Text::new("Currency Symbol:")
        .with_default(&defaults.currency)
        .prompt()?;
    defaults.tax_label = Text::new("Tax Label:")
        .with_default(&defaults.tax_label)
        .prompt()?;
    defaults.tax_rate = coerce_number(
        &Text::new("Tax Rate (%):")
            .with_default(&defaults.tax_rate.to_string())
            .prompt()?,
    );
    defaults.notes = Text::new("Notes / Terms:")
        .with_default(&defaults.notes)
        .prompt()?;
    defaults.brand_color = Text::new("Brand Color (hex):")
        .with_default(&defaults.brand_color)
        .prompt()?;

    settings.save()?;
    println!("✅ Settings saved to {:?}", config::config_path());
    Ok(settings)
}
