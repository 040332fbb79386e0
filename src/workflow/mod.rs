//! Workflow definitions and their resolution.
//!
//! A workflow is a declarative list of steps. Extensions never subclass a
//! workflow: they list `changes` (insert, override, append) and `actions`
//! that the resolver applies to their parent's steps, producing one
//! [`ResolvedWorkflow`] with a total step order.
//!
//! ## Locations
//!
//! - built-ins: `fdd-base`, `fdd-reverse-engineering`
//! - `.fddflow/workflows/*.yaml`
//! - `workflows/*.yaml`

mod builtin;
mod catalog;
mod error;
mod parser;
mod resolver;
mod schema;

pub use catalog::{WorkflowCatalog, WorkflowSource};
pub use error::WorkflowError;
pub use parser::{parse_workflow, parse_workflow_str, scan_workflow_dir, validate_definition, workflow_dirs};
pub use resolver::{resolve, ResolvedWorkflow};
pub use schema::{ArtifactSpec, Position, Step, StepChange, StepKind, WorkflowDefinition};
