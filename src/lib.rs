//! # Media Resizer Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare dell'applicazione
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per altri consumatori
//!
//! ## Architettura dei moduli:
//! - `config`: Configurazione immutabile del run e validazione
//! - `error`: Tipi di errore custom
//! - `job`: `JobDescriptor` e naming degli output
//! - `classifier`: Sniffing dei mime type e partizione in job
//! - `image_processor`: Resize e encoding JPEG di una singola foto
//! - `video_processor`: Transcodifica FFmpeg con preset fisso
//! - `metadata`: Propagazione tag e pass dei timestamp
//! - `pipeline`: Orchestratore, photo pool e video queue
//! - `progress`: Aggregazione dei risultati e progress bar
//! - `events`: Eventi strutturati e sink di presentazione
//! - `file_manager`, `platform`: Utility su file e piattaforma
//!
//! ## Utilizzo:
//! ```rust,ignore
//! use media_resizer::{Config, LogSink, MediaResizer};
//!
//! let resizer = MediaResizer::new(Config::default(), Arc::new(LogSink))?;
//! let summary = resizer.run(&path).await?;
//! println!("{}", summary.format_summary());
//! ```

pub mod classifier;
pub mod config;
pub mod error;
pub mod events;
pub mod file_manager;
pub mod image_processor;
pub mod job;
pub mod metadata;
pub mod pipeline;
pub mod platform;
pub mod progress;
pub mod video_processor;

#[cfg(test)]
mod test_support;

pub use config::{Config, Dimensions, LegacyTagCopy};
pub use error::ResizeError;
pub use events::{EventSink, JsonSink, LogSink, ProgressSink, RunEvent};
pub use job::{JobDescriptor, MediaKind};
pub use pipeline::MediaResizer;
pub use progress::{JobOutcome, JobReport, RunSummary, RunTally};
