//! Domain models for loadout.
//!
//! # Core Concepts
//!
//! - [`Manifest`]: the remote JSON document enumerating available modules
//!   and the current release version. Fetched fresh each run; the cached
//!   copy is used only when the network fetch fails.
//! - [`ModuleDescriptor`]: a named, versioned unit of page automation with
//!   URL applicability rules. Identity is `id`; uniqueness is assumed, not
//!   enforced — on duplicates the first activation wins.
//! - [`ModuleType`]: screening modules auto-run on matching pages; utility
//!   modules are toggled on and off explicitly and may carry cleanup logic.

mod manifest;

pub use manifest::*;
