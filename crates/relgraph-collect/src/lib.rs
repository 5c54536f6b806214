//! Node and edge collection for diagram rendering.
//!
//! This crate turns a diagram description into a format-agnostic
//! [`GraphCollector`] that renderers (DOT, PlantUML) consume.
//!
//! # Module Structure
//!
//! - [`description`]: line classification and mini-language parsing
//! - [`walk`]: attribute path evaluation against the model
//! - [`types`]: node options, dedup keys and the rendered edge variants
//! - [`collector`]: the deduplicating node/relation store
//! - [`collect`]: declaration and relation resolution into a collector

pub mod collect;
pub mod collector;
pub mod description;
pub mod types;
pub mod walk;

pub use collect::{CollectOptions, collect_graph};
pub use collector::GraphCollector;
pub use description::{
    Declaration, Description, Expansion, Hop, InlineOptions, RelationExpr, Selector,
    SelectorTarget,
};
pub use types::{Edge, EndKey, NodeOptions, NodeRef, RankGroup, RelationKey};
pub use walk::{ClassRelation, PathWalker, WalkResult};
