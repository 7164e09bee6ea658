use std::fs;
use std::path::{Path, PathBuf};

use directories::{BaseDirs, ProjectDirs};
use serde::{Deserialize, Serialize};

use crate::error::Error;

pub const DEFAULT_DATA_ROOT: &str = "~/Documents/Invoices";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Root for output PDFs, staged sources, templates and the live preview.
    pub data_root: String,
    pub defaults: InvoiceDefaults,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_root: DEFAULT_DATA_ROOT.to_string(),
            defaults: InvoiceDefaults::default(),
        }
    }
}

/// Values a new invoice starts from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvoiceDefaults {
    pub sender_name: String,
    pub sender_details: String,
    pub currency: String,
    pub tax_label: String,
    pub tax_rate: f64,
    pub notes: String,
    pub brand_color: String,
}

impl Default for InvoiceDefaults {
    fn default() -> Self {
        Self {
            sender_name: "Visernic Limited".to_string(),
            sender_details: "123 Business St, Tech City, 5000".to_string(),
            currency: "$".to_string(),
            tax_label: "Tax".to_string(),
            tax_rate: 0.0,
            notes: "Thank you for your business.".to_string(),
            brand_color: "#2563eb".to_string(),
        }
    }
}

impl Settings {
    pub fn root(&self) -> PathBuf {
        PathBuf::from(expand_home_dir(&self.data_root))
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root().join("output")
    }

    pub fn build_dir(&self) -> PathBuf {
        self.root().join("build")
    }

    pub fn template_dir(&self) -> PathBuf {
        self.root().join("templates")
    }

    pub fn preview_path(&self) -> PathBuf {
        self.root().join("preview").join("preview.typ")
    }

    /// Reads `path`; a missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, Error> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no settings file, using defaults");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), Error> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn load() -> Result<Self, Error> {
        Self::load_from(&config_path())
    }

    pub fn save(&self) -> Result<(), Error> {
        self.save_to(&config_path())
    }
}

pub fn config_path() -> PathBuf {
    if let Some(proj_dirs) = ProjectDirs::from("com", "invoice-builder", "app") {
        return proj_dirs.config_dir().join("settings.toml");
    }
    PathBuf::from("settings.toml")
}

pub fn expand_home_dir(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(base_dirs) = BaseDirs::new() {
            let home = base_dirs.home_dir().to_string_lossy();
            return path.replacen('~', &home, 1);
        }
    }
    path.to_string()
}
