use thiserror::Error;

use crate::export::ExportError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    #[error("Failed to parse settings: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Failed to write settings: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Prompt error: {0}")]
    Prompt(#[from] inquire::InquireError),

    #[error(transparent)]
    Export(#[from] ExportError),
}
