//! The IRC-facing collaborators: line framing and the namespace registry.
//!
//! Out of scope per the bridge design (a generic dispatcher and codec are
//! assumed collaborators), but the workspace has no such crate to borrow,
//! so a minimal version lives here rather than being faked away.

pub mod codec;
pub mod registry;
