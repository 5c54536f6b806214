//! The model lookup contract.
//!
//! The host owns the entity/instance model; relgraph only reads it through
//! [`ModelLookup`]. Entities and instances are addressed by the host's own
//! dense ids, which relgraph maps to render-local surrogates.

use std::fmt;

use relgraph_error::{Error, Result};

/// Universal base entity. Parent edges to it are never drawn.
pub const ROOT_ENTITY: &str = "std::Entity";

/// Host identity of an entity (type definition).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u32);

/// Host identity of an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(pub u32);

/// Anything that can become a diagram node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ModelKey {
    Entity(EntityId),
    Instance(InstanceId),
}

/// A `ns::sub::Name` path split into namespace and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedName {
    pub namespace: Vec<String>,
    pub name: String,
}

impl QualifiedName {
    pub fn new(namespace: Vec<String>, name: impl Into<String>) -> Self {
        Self {
            namespace,
            name: name.into(),
        }
    }

    /// Split on `::`. The last segment is the name.
    pub fn parse(path: &str) -> Self {
        let mut parts: Vec<String> = path.split("::").map(|s| s.trim().to_string()).collect();
        let name = parts.pop().unwrap_or_default();
        Self {
            namespace: parts,
            name,
        }
    }

    pub fn is_qualified(&self) -> bool {
        !self.namespace.is_empty()
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for ns in &self.namespace {
            write!(f, "{}::", ns)?;
        }
        write!(f, "{}", self.name)
    }
}

/// An attribute value as seen by the path walker.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Instance(InstanceId),
    List(Vec<Value>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeKind {
    /// Plain data attribute, e.g. `string name`.
    Primitive { type_name: String },
    /// Relation to another entity, optionally with a named inverse end.
    Relation {
        target: EntityId,
        inverse: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttributeDef {
    pub name: String,
    pub kind: AttributeKind,
}

impl AttributeDef {
    pub fn is_relation(&self) -> bool {
        matches!(self.kind, AttributeKind::Relation { .. })
    }

    /// Target entity and inverse end name of a relation attribute.
    pub fn relation(&self) -> Option<(EntityId, Option<&str>)> {
        match &self.kind {
            AttributeKind::Relation { target, inverse } => Some((*target, inverse.as_deref())),
            AttributeKind::Primitive { .. } => None,
        }
    }
}

/// A type definition.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityDef {
    pub name: QualifiedName,
    pub parents: Vec<EntityId>,
    /// Attributes declared on this entity, in declaration order.
    pub attributes: Vec<AttributeDef>,
}

impl EntityDef {
    pub fn full_name(&self) -> String {
        self.name.to_string()
    }

    pub fn short_name(&self) -> &str {
        &self.name.name
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeDef> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn relation_attributes(&self) -> impl Iterator<Item = &AttributeDef> {
        self.attributes.iter().filter(|a| a.is_relation())
    }

    pub fn data_attributes(&self) -> impl Iterator<Item = &AttributeDef> {
        self.attributes.iter().filter(|a| !a.is_relation())
    }
}

/// Read-only view of the host model.
///
/// Implementations must be side-effect free: the export batch calls into
/// one model from several threads.
pub trait ModelLookup {
    /// All instances named by `name` (the instances of an entity, including
    /// instances of its subtypes).
    fn resolve_instances(&self, name: &QualifiedName) -> Result<Vec<InstanceId>>;

    /// The entity named by `name`.
    fn resolve_entity(&self, name: &QualifiedName) -> Result<EntityId>;

    /// All entities declared directly in `namespace`.
    fn entities_in(&self, namespace: &[String]) -> Result<Vec<EntityId>>;

    fn entity(&self, id: EntityId) -> &EntityDef;

    /// Dynamic type of an instance.
    fn instance_type(&self, id: InstanceId) -> EntityId;

    /// Value of `name` on an instance. Unset declared attributes are `Null`.
    fn attribute(&self, id: InstanceId, name: &str) -> Result<Value>;

    /// Default display string of an instance.
    fn instance_repr(&self, id: InstanceId) -> String;

    /// Ancestors of `id` in breadth-first order, without `id` itself.
    fn ancestors(&self, id: EntityId) -> Vec<EntityId> {
        let mut out: Vec<EntityId> = Vec::new();
        let mut queue: Vec<EntityId> = self.entity(id).parents.clone();
        let mut index = 0;
        while index < queue.len() {
            let current = queue[index];
            index += 1;
            if out.contains(&current) {
                continue;
            }
            out.push(current);
            queue.extend(self.entity(current).parents.iter().copied());
        }
        out
    }

    /// True when `id` or one of its ancestors has the short name `name`.
    fn has_type_named(&self, id: EntityId, name: &str) -> bool {
        self.entity(id).short_name() == name
            || self
                .ancestors(id)
                .into_iter()
                .any(|a| self.entity(a).short_name() == name)
    }

    /// Text shown for an attribute value used as a node label.
    fn display_value(&self, value: &Value) -> String {
        match value {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Str(s) => s.clone(),
            Value::Instance(id) => self.instance_repr(*id),
            Value::List(items) => items
                .iter()
                .map(|v| self.display_value(v))
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    /// Look up an attribute definition on an entity or its ancestors.
    fn find_attribute(&self, id: EntityId, name: &str) -> Option<&AttributeDef> {
        if let Some(attr) = self.entity(id).attribute(name) {
            return Some(attr);
        }
        self.ancestors(id)
            .into_iter()
            .find_map(|a| self.entity(a).attribute(name))
    }

    /// Like [`find_attribute`](Self::find_attribute) but fails with a lookup error.
    fn require_attribute(&self, id: EntityId, name: &str) -> Result<&AttributeDef> {
        self.find_attribute(id, name)
            .ok_or_else(|| Error::attribute_not_found(self.entity(id).full_name(), name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualified_name_parse() {
        let name = QualifiedName::parse("app::web::Service");
        assert_eq!(name.namespace, vec!["app".to_string(), "web".to_string()]);
        assert_eq!(name.name, "Service");
        assert!(name.is_qualified());
        assert_eq!(name.to_string(), "app::web::Service");

        let bare = QualifiedName::parse("Service");
        assert!(!bare.is_qualified());
        assert_eq!(bare.to_string(), "Service");
    }

    #[test]
    fn test_attribute_relation_accessor() {
        let attr = AttributeDef {
            name: "host".to_string(),
            kind: AttributeKind::Relation {
                target: EntityId(3),
                inverse: Some("services".to_string()),
            },
        };
        assert!(attr.is_relation());
        assert_eq!(attr.relation(), Some((EntityId(3), Some("services"))));

        let plain = AttributeDef {
            name: "name".to_string(),
            kind: AttributeKind::Primitive {
                type_name: "string".to_string(),
            },
        };
        assert_eq!(plain.relation(), None);
    }
}
