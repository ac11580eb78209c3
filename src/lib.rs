//! # aurora-research
//!
//! An academic research assistant over the Gemini API.
//!
//! ## Features
//!
//! - Grounded literature search returning verifiable sources
//! - Methodology plans, research project outlines and academic advice
//! - Reference formatting in ABNT, APA, Vancouver or Chicago
//! - Batch fichamentos of PDFs and images with a comparative synthesis
//! - A local library of saved results
//!
//! ## Quick Start
//!
//! ```no_run
//! use aurora_research::{Assistant, CitationStandard, Config};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Config::builder()
//!     .api_key(std::env::var("GEMINI_API_KEY")?)
//!     .build()?;
//!
//! let assistant = Assistant::from_config(&config)?;
//! let reference = assistant
//!     .gateway()
//!     .format_reference("SILVA, J. Metodologia científica. Atlas, 2020", CitationStandard::Apa)
//!     .await?;
//! assistant.save_reference("SILVA, J. Metodologia científica", CitationStandard::Apa, &reference)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! 1. **Client**: one `generateContent` call per request, behind [`GenerativeClient`]
//! 2. **Gateway**: one operation per feature, with a shared failure policy
//! 3. **Batch**: sequential analysis of an upload queue, then consolidation
//! 4. **Store**: saved artifacts as a JSON array in a key-value backend
//! 5. **View**: named screens and plain-text rendering

#![warn(
    missing_docs,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]
#![allow(clippy::module_name_repetitions)]

mod app;
mod config;
mod error;
mod template;

pub mod batch;
pub mod client;
pub mod gateway;
pub mod preset;
pub mod store;
pub mod view;

pub use app::{Assistant, excerpt_title, synthesis_title};
pub use batch::{
    BatchController, BatchEvent, BatchEvents, BatchSummary, DocumentFile, ItemStatus, UploadItem,
};
pub use client::{GeminiClient, GenerativeClient, GroundingSource};
pub use config::{Config, ConfigBuilder};
pub use error::{Error, Result};
pub use gateway::{Gateway, ProjectBrief, ResearchResult};
pub use preset::{CitationStandard, Feature, PromptPreset, WorkType};
pub use store::{ArtifactStore, ArtifactType, Library, SavedArtifact};
pub use view::{Navigator, View};
