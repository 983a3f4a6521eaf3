//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on I/O boundary traits (FileSystem, GenerationBackend)
//! but are themselves concrete structs, not traits.

mod generation;
mod workspace;

pub use generation::{GenerationService, ProposedEdit, ProposedNode};
pub use workspace::{ImportFile, WorkspaceService};
