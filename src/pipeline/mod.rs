//! # Pipeline Module
//!
//! Motore di esecuzione del run, diviso in sottomoduli:
//! - `media_resizer`: Orchestratore (validazione, classificazione, stage, riepilogo)
//! - `photo_pool`: Pool parallelo limitato per le foto
//! - `video_queue`: Coda FIFO a consumer singolo per i video

pub mod media_resizer;
pub mod photo_pool;
pub mod video_queue;

pub use media_resizer::{check_dependencies, MediaResizer};
pub use photo_pool::PhotoPool;
pub use video_queue::{QueueItem, VideoQueue};
