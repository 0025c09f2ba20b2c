//! # File Management Module
//!
//! Questo modulo gestisce le operazioni sui file che il resto del core usa.
//!
//! ## Responsabilità:
//! - Listing piatto (non ricorsivo) della cartella di input, ordinato per nome
//! - Riconoscimento dei nomi "nascosti" (prefisso `.`)
//! - Cattura dei timestamp accessed/modified al momento dell'enumerazione
//! - Creazione idempotente della directory di output (sicura tra worker concorrenti)
//! - Formattazione human-readable delle dimensioni
//!
//! ## Esempio:
//! ```rust,ignore
//! let entries = FileManager::list_entries(folder)?;
//! FileManager::ensure_dir(&folder.join("resized_1920x1080"))?;
//! ```

use crate::job::SourceTimes;
use anyhow::Result;
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Marker prefix for hidden files and folders
pub const HIDDEN_MARKER: char = '.';

/// Manages file operations and discovery
pub struct FileManager;

impl FileManager {
    /// List the direct children of `folder`, sorted by file name
    pub fn list_entries(folder: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = Vec::new();

        for entry in WalkDir::new(folder)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| anyhow::anyhow!("Failed to list {}: {}", folder.display(), e))?;
            entries.push(entry.into_path());
        }

        Ok(entries)
    }

    /// Check if a file or folder name starts with the hidden marker
    pub fn is_hidden_name(name: &str) -> bool {
        name.starts_with(HIDDEN_MARKER)
    }

    /// Check if the last component of a path is hidden.
    ///
    /// `.` and `..` are spelled with the marker, so they count as hidden too.
    pub fn is_hidden(path: &Path) -> bool {
        match path.components().next_back() {
            Some(Component::Normal(name)) => Self::is_hidden_name(&name.to_string_lossy()),
            Some(Component::CurDir) | Some(Component::ParentDir) => true,
            _ => false,
        }
    }

    /// Read accessed/modified times of a file
    pub fn capture_times(path: &Path) -> Result<SourceTimes> {
        let metadata = fs::metadata(path)?;
        Ok(SourceTimes {
            accessed: metadata.accessed()?,
            modified: metadata.modified()?,
        })
    }

    /// Create `dir` if missing; a concurrent creation counts as success
    pub fn ensure_dir(dir: &Path) -> Result<()> {
        match fs::create_dir(dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists && dir.is_dir() => Ok(()),
            Err(e) => Err(anyhow::anyhow!("Failed to create output directory {}: {}", dir.display(), e)),
        }
    }

    /// Get human-readable file size
    pub fn format_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = size as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }
}
