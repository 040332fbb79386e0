//! # fddflow
//!
//! Guided design workflows whose answers are proposed from static analysis
//! of your codebase.
//!
//! A run resolves a workflow definition and its extensions into one ordered
//! list of steps, runs the detectors the steps ask for, ranks candidate
//! answers per question, lets a human confirm or override each one, then
//! renders design artifacts stamped with provenance and an acceptance score.
//!
//! ## Pieces
//!
//! - **detect**: detectors that turn manifests and directory layout into signals
//! - **propose**: ranks signals into proposals per question step
//! - **workflow**: YAML definitions, the catalog and the extension resolver
//! - **session**: the confirm/override loop, resumable from saved state
//! - **artifact**: templates, validation, provenance and atomic publishing
//!
//! ## Quick Start
//!
//! ```bash
//! # See what the detectors find
//! fddflow detect .
//!
//! # Reverse-engineer design docs for an existing project
//! fddflow run fdd-reverse-engineering .
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
// Allow common patterns that are intentional in this codebase
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::redundant_else)]
#![allow(clippy::if_not_else)]
#![allow(clippy::manual_let_else)]
#![allow(clippy::derivable_impls)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::significant_drop_tightening)]
#![allow(clippy::map_unwrap_or)]
#![allow(clippy::needless_lifetimes)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::redundant_clone)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unused_self)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::float_cmp)]

pub mod artifact;
pub mod core;
pub mod detect;
pub mod pipeline;
pub mod propose;
pub mod session;
pub mod workflow;

// Re-export commonly used types
pub use artifact::{Artifact, ArtifactGenerator, ArtifactStatus, ProvenanceBlock};
pub use core::Config;
pub use detect::{DetectionReport, Signal, SignalExtractor};
pub use pipeline::{Pipeline, Prepared, RunReport};
pub use propose::{Proposal, ProposalEngine, ProposalSet};
pub use session::{AnswerSet, Interactor, Session};
pub use workflow::{ResolvedWorkflow, WorkflowCatalog, WorkflowDefinition};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "fddflow";
