//! Local retrieval and context fusion.
//!
//! This crate provides:
//! - [`KnowledgeStore`] — the local similarity-store collaborator contract
//! - [`ChunkStore`] — the default keyword-ranked chunk store
//! - [`fusion`] — the Context Fusion Engine that merges local and web
//!   retrieval into one bounded [`docweaver_shared::ContextBundle`]

pub mod fusion;
pub mod store;

pub use fusion::fuse;
pub use store::{ChunkStore, KnowledgeStore};
