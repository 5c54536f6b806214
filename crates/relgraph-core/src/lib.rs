//! Model-facing types for relgraph.
//!
//! - [`model`]: the [`ModelLookup`] contract the host implements, plus ids and values
//! - [`ident`]: surrogate identities used for dedup keys and rendered node ids
//! - [`memory`]: [`MemoryModel`], a `ModelLookup` loaded from a JSON model document

pub mod ident;
pub mod memory;
pub mod model;

pub use ident::{IdentityMap, NodeId};
pub use memory::{GRAPH_ENTITY, MemoryModel, ModelDocument};
pub use model::{
    AttributeDef, AttributeKind, EntityDef, EntityId, InstanceId, ModelKey, ModelLookup,
    QualifiedName, ROOT_ENTITY, Value,
};
pub use relgraph_error::{Error, ErrorKind, Result};
