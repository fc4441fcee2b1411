//! Core classification and pipeline logic for issuekb.
//!
//! - [`organizer`] and [`classifier`] are the pure classification core:
//!   no I/O, no shared state, safe to run on any number of threads at once.
//! - [`acceptance`] holds the pluggable accepted-answer policies.
//! - [`refine`] orchestrates the external LLM extractor.
//! - [`pipeline`] ties loading, classification, refinement, and export into
//!   end-to-end workflows (`build_kb`, `refine_kb`).

pub mod acceptance;
pub mod classifier;
pub mod organizer;
pub mod pipeline;
pub mod refine;

pub use acceptance::{AcceptancePolicy, LastMaintainerReply, NeverAccept};
pub use classifier::{QaClassifier, classify};
pub use organizer::{discussion, organize};
