//! In-memory model loaded from a JSON model document.
//!
//! Document shape:
//!
//! ```json
//! {
//!   "entities": [
//!     { "name": "app::Service",
//!       "parents": ["app::Component"],
//!       "attributes": [
//!         { "name": "name", "type": "string" },
//!         { "name": "host", "relation": "app::Host", "inverse": "services" }
//!       ] }
//!   ],
//!   "instances": [
//!     { "id": "svcA", "type": "app::Service",
//!       "attributes": { "name": "a", "host": { "ref": "web1" } } }
//!   ]
//! }
//! ```
//!
//! `std::Entity` and `graph::Graph` are predefined unless the document
//! declares them itself.

use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;
use tracing::debug;

use relgraph_error::{Error, ErrorKind, Result};

use crate::model::{
    AttributeDef, AttributeKind, EntityDef, EntityId, InstanceId, ModelLookup, QualifiedName,
    ROOT_ENTITY, Value,
};

/// Entity that carries diagram definitions (`name`, `config`).
pub const GRAPH_ENTITY: &str = "graph::Graph";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelDocument {
    #[serde(default)]
    pub entities: Vec<EntityDocument>,
    #[serde(default)]
    pub instances: Vec<InstanceDocument>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EntityDocument {
    pub name: String,
    #[serde(default)]
    pub parents: Vec<String>,
    #[serde(default)]
    pub attributes: Vec<AttributeDocument>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AttributeDocument {
    Relation {
        name: String,
        relation: String,
        #[serde(default)]
        inverse: Option<String>,
    },
    Primitive {
        name: String,
        #[serde(rename = "type")]
        type_name: String,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstanceDocument {
    pub id: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone)]
struct InstanceData {
    key: String,
    entity: EntityId,
    values: BTreeMap<String, Value>,
}

/// A [`ModelLookup`] backed by plain vectors.
#[derive(Debug, Clone)]
pub struct MemoryModel {
    entities: Vec<EntityDef>,
    entity_index: HashMap<String, EntityId>,
    instances: Vec<InstanceData>,
    instance_index: HashMap<String, InstanceId>,
}

impl MemoryModel {
    /// Parse a JSON model document.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let document: ModelDocument = serde_json::from_str(text).map_err(|err| {
            Error::new(ErrorKind::DeserializationFailed, err.to_string())
                .with_operation("memory::from_json_str")
                .set_source(err)
        })?;
        Self::from_document(document)
    }

    /// Build a model from an already deserialized document.
    pub fn from_document(document: ModelDocument) -> Result<Self> {
        let mut entity_docs = builtin_entities();
        for doc in document.entities {
            if let Some(pos) = entity_docs.iter().position(|e| e.name == doc.name) {
                entity_docs[pos] = doc;
            } else {
                entity_docs.push(doc);
            }
        }

        // First pass: names -> ids, so parents and relations may point forward.
        let mut entity_index = HashMap::new();
        for (index, doc) in entity_docs.iter().enumerate() {
            if entity_index
                .insert(doc.name.clone(), EntityId(index as u32))
                .is_some()
            {
                return Err(Error::config_invalid(format!(
                    "entity '{}' declared twice",
                    doc.name
                )));
            }
        }
        let lookup_entity = |name: &str| -> Result<EntityId> {
            entity_index
                .get(name)
                .copied()
                .ok_or_else(|| Error::symbol_not_found(name))
        };
        let root = lookup_entity(ROOT_ENTITY)?;

        let mut entities = Vec::with_capacity(entity_docs.len());
        for doc in &entity_docs {
            let mut parents = doc
                .parents
                .iter()
                .map(|p| lookup_entity(p.as_str()))
                .collect::<Result<Vec<_>>>()?;
            if parents.is_empty() && doc.name != ROOT_ENTITY {
                parents.push(root);
            }

            let mut attributes = Vec::with_capacity(doc.attributes.len());
            for attr in &doc.attributes {
                attributes.push(match attr {
                    AttributeDocument::Relation {
                        name,
                        relation,
                        inverse,
                    } => AttributeDef {
                        name: name.clone(),
                        kind: AttributeKind::Relation {
                            target: lookup_entity(relation.as_str())?,
                            inverse: inverse.clone(),
                        },
                    },
                    AttributeDocument::Primitive { name, type_name } => AttributeDef {
                        name: name.clone(),
                        kind: AttributeKind::Primitive {
                            type_name: type_name.clone(),
                        },
                    },
                });
            }

            entities.push(EntityDef {
                name: QualifiedName::parse(&doc.name),
                parents,
                attributes,
            });
        }

        let mut instance_index = HashMap::new();
        for (index, doc) in document.instances.iter().enumerate() {
            if instance_index
                .insert(doc.id.clone(), InstanceId(index as u32))
                .is_some()
            {
                return Err(Error::config_invalid(format!(
                    "instance '{}' declared twice",
                    doc.id
                )));
            }
        }

        let mut instances = Vec::with_capacity(document.instances.len());
        for doc in &document.instances {
            let entity = lookup_entity(doc.type_name.as_str())?;
            let mut values = BTreeMap::new();
            for (name, raw) in &doc.attributes {
                let value = convert_value(raw, &instance_index).map_err(|err| {
                    err.with_detail("instance", doc.id.clone())
                        .with_detail("attribute", name.clone())
                })?;
                values.insert(name.clone(), value);
            }
            instances.push(InstanceData {
                key: doc.id.clone(),
                entity,
                values,
            });
        }

        let model = Self {
            entities,
            entity_index,
            instances,
            instance_index,
        };
        model.check_inverses()?;

        debug!(
            entities = model.entity_count(),
            instances = model.instance_count(),
            "model loaded"
        );
        Ok(model)
    }

    /// A declared inverse must be a relation on the target entity that
    /// names the original attribute as its own inverse.
    fn check_inverses(&self) -> Result<()> {
        for (index, def) in self.entities.iter().enumerate() {
            let owner = EntityId(index as u32);
            for attr in def.relation_attributes() {
                let Some((target, Some(inverse))) = attr.relation() else {
                    continue;
                };
                let points_back = match self
                    .find_attribute(target, inverse)
                    .and_then(|back| back.relation())
                {
                    Some((back_target, back_inverse)) => {
                        self.is_subtype_of(owner, back_target)
                            && back_inverse == Some(attr.name.as_str())
                    }
                    None => false,
                };
                if !points_back {
                    return Err(Error::config_invalid(format!(
                        "inverse '{}.{inverse}' of '{}.{}' does not point back",
                        self.entity(target).full_name(),
                        def.full_name(),
                        attr.name
                    ))
                    .with_operation("memory::check_inverses"));
                }
            }
        }
        Ok(())
    }

    /// Instance by its document id.
    pub fn instance_by_key(&self, key: &str) -> Option<InstanceId> {
        self.instance_index.get(key).copied()
    }

    /// Entity by its full name.
    pub fn entity_by_name(&self, name: &str) -> Option<EntityId> {
        self.entity_index.get(name).copied()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    fn is_subtype_of(&self, ty: EntityId, target: EntityId) -> bool {
        ty == target || self.ancestors(ty).contains(&target)
    }
}

impl ModelLookup for MemoryModel {
    fn resolve_instances(&self, name: &QualifiedName) -> Result<Vec<InstanceId>> {
        let entity = self.resolve_entity(name)?;
        Ok(self
            .instances
            .iter()
            .enumerate()
            .filter(|(_, data)| self.is_subtype_of(data.entity, entity))
            .map(|(index, _)| InstanceId(index as u32))
            .collect())
    }

    fn resolve_entity(&self, name: &QualifiedName) -> Result<EntityId> {
        let full = name.to_string();
        self.entity_by_name(&full)
            .ok_or_else(|| Error::symbol_not_found(full))
    }

    fn entities_in(&self, namespace: &[String]) -> Result<Vec<EntityId>> {
        let found: Vec<EntityId> = self
            .entities
            .iter()
            .enumerate()
            .filter(|(_, def)| def.name.namespace == namespace)
            .map(|(index, _)| EntityId(index as u32))
            .collect();
        if found.is_empty() {
            return Err(Error::symbol_not_found(format!("{}::*", namespace.join("::"))));
        }
        Ok(found)
    }

    fn entity(&self, id: EntityId) -> &EntityDef {
        &self.entities[id.0 as usize]
    }

    fn instance_type(&self, id: InstanceId) -> EntityId {
        self.instances[id.0 as usize].entity
    }

    fn attribute(&self, id: InstanceId, name: &str) -> Result<Value> {
        let data = &self.instances[id.0 as usize];
        if let Some(value) = data.values.get(name) {
            return Ok(value.clone());
        }
        match self.find_attribute(data.entity, name) {
            Some(_) => Ok(Value::Null),
            None => Err(Error::attribute_not_found(data.key.clone(), name)),
        }
    }

    fn instance_repr(&self, id: InstanceId) -> String {
        self.instances[id.0 as usize].key.clone()
    }
}

fn builtin_entities() -> Vec<EntityDocument> {
    let primitive = |name: &str| AttributeDocument::Primitive {
        name: name.to_string(),
        type_name: "string".to_string(),
    };
    vec![
        EntityDocument {
            name: ROOT_ENTITY.to_string(),
            parents: Vec::new(),
            attributes: Vec::new(),
        },
        EntityDocument {
            name: GRAPH_ENTITY.to_string(),
            parents: Vec::new(),
            attributes: vec![primitive("name"), primitive("config")],
        },
    ]
}

fn convert_value(raw: &serde_json::Value, index: &HashMap<String, InstanceId>) -> Result<Value> {
    use serde_json::Value as Json;

    Ok(match raw {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Float(n.as_f64().unwrap_or_default()),
        },
        Json::String(s) => Value::Str(s.clone()),
        Json::Array(items) => Value::List(
            items
                .iter()
                .map(|item| convert_value(item, index))
                .collect::<Result<Vec<_>>>()?,
        ),
        Json::Object(map) => match (map.len(), map.get("ref")) {
            (1, Some(Json::String(key))) => {
                Value::Instance(index.get(key).copied().ok_or_else(|| Error::symbol_not_found(key))?)
            }
            _ => {
                return Err(Error::config_invalid(
                    "object attribute values must have the form {\"ref\": \"<instance id>\"}",
                ));
            }
        },
    })
}
