//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom dell'applicazione.
//!
//! ## Categorie di errori:
//! - `Io`: Errori di I/O (file non trovati, permessi, etc.)
//! - `Image`: Errori di decodifica/codifica immagini
//! - `Classification`: Sniffing del mime type fallito (file saltato)
//! - `Transform`: Resize o encoding della foto fallito (job fallito)
//! - `Transcoder`: FFmpeg ha rifiutato l'input o è uscito con errore
//! - `Metadata`: Lettura/scrittura tag fallita (output mantenuto)
//! - `Configuration`: Argomenti o configurazione non validi (fatale)
//! - `HiddenFolder`: Cartella nascosta, uscita silenziosa
//! - `MissingDependency`: Tool esterno mancante (file, ffmpeg, exiftool)
//! - `Timeout`: Transcodifica interrotta dal timeout configurato
//!
//! ## Politica di propagazione:
//! - Gli errori per singolo file vengono contenuti al confine del job
//! - Solo `Configuration` e `HiddenFolder` interrompono l'intera esecuzione
//!
//! ## Esempio:
//! ```rust,ignore
//! if folder.is_file() {
//!     return Err(ResizeError::Configuration("Program only handles folders".to_string()));
//! }
//! ```

use std::path::PathBuf;

/// Custom error types for media resizing
#[derive(thiserror::Error, Debug)]
pub enum ResizeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Classification error: {0}")]
    Classification(String),

    #[error("Transform error: {0}")]
    Transform(String),

    #[error("Transcoder error: {0}")]
    Transcoder(String),

    #[error("Metadata preservation error: {0}")]
    Metadata(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Ignoring hidden folder: {}", .0.display())]
    HiddenFolder(PathBuf),

    #[error("Dependency missing: {0}")]
    MissingDependency(String),

    #[error("Timed out: {0}")]
    Timeout(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_folder_message_names_path() {
        let err = ResizeError::HiddenFolder(PathBuf::from("/tmp/.secret"));
        assert_eq!(err.to_string(), "Ignoring hidden folder: /tmp/.secret");
    }
}
