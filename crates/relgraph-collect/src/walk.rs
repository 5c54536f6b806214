//! Attribute path evaluation.

use std::collections::HashSet;

use tracing::debug;

use relgraph_core::{EntityId, InstanceId, ModelLookup, ROOT_ENTITY, Value};
use relgraph_error::{Error, Result};

use crate::description::{Hop, RelationExpr};

/// Targets reached from one root instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkResult {
    pub root: InstanceId,
    /// Never contains `root` itself.
    pub targets: Vec<InstanceId>,
}

/// Outcome of a one-step type-level relation expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassRelation {
    Parents {
        child: EntityId,
        parents: Vec<EntityId>,
    },
    Relation {
        from: EntityId,
        to: EntityId,
    },
}

/// Walks dotted attribute paths over a model.
pub struct PathWalker<'m> {
    model: &'m dyn ModelLookup,
    root_entity: String,
}

impl<'m> PathWalker<'m> {
    pub fn new(model: &'m dyn ModelLookup) -> Self {
        Self {
            model,
            root_entity: ROOT_ENTITY.to_string(),
        }
    }

    /// Entity whose parent edges are never emitted.
    pub fn with_root_entity(mut self, name: impl Into<String>) -> Self {
        self.root_entity = name.into();
        self
    }

    /// Evaluate an instance-level expression, one result per root instance.
    pub fn walk(&self, expr: &RelationExpr) -> Result<Vec<WalkResult>> {
        let roots = self
            .model
            .resolve_instances(&expr.root)
            .map_err(|err| err.with_line(expr.line.clone()))?;

        let mut results = Vec::with_capacity(roots.len());
        for root in roots {
            let mut targets = vec![root];
            for hop in &expr.hops {
                targets = self
                    .follow_hop(&targets, hop)
                    .map_err(|err| err.with_line(expr.line.clone()))?;
            }
            targets.retain(|&target| target != root);
            results.push(WalkResult { root, targets });
        }

        debug!(line = %expr.line, roots = results.len(), "relation walked");
        Ok(results)
    }

    /// Follow one hop from every instance of the working set.
    pub fn follow_hop(&self, current: &[InstanceId], hop: &Hop) -> Result<Vec<InstanceId>> {
        let mut candidates = Vec::new();
        for &instance in current {
            let value = self
                .model
                .attribute(instance, &hop.attribute)
                .map_err(|err| err.with_operation("walk::follow_hop"))?;
            self.push_targets(&value, &hop.attribute, &mut candidates)?;
        }

        if let Some(filter) = &hop.filter {
            candidates.retain(|&candidate| {
                self.model
                    .has_type_named(self.model.instance_type(candidate), filter)
            });
        }

        let mut seen = HashSet::with_capacity(candidates.len());
        candidates.retain(|&candidate| seen.insert(candidate));
        Ok(candidates)
    }

    fn push_targets(&self, value: &Value, attribute: &str, out: &mut Vec<InstanceId>) -> Result<()> {
        match value {
            Value::Null => Ok(()),
            Value::Instance(id) => {
                out.push(*id);
                Ok(())
            }
            Value::List(items) => {
                for item in items {
                    self.push_targets(item, attribute, out)?;
                }
                Ok(())
            }
            _ => Err(Error::type_mismatch(format!(
                "attribute '{}' does not reference an instance",
                attribute
            ))
            .with_operation("walk::follow_hop")
            .with_detail("attribute", attribute)),
        }
    }

    /// Evaluate a type-level expression (exactly one hop).
    pub fn class_relation(&self, expr: &RelationExpr) -> Result<ClassRelation> {
        let [hop] = expr.hops.as_slice() else {
            return Err(Error::parse_failed(
                expr.line.clone(),
                "in class diagrams only one-step relations are supported",
            ));
        };

        let entity = self
            .model
            .resolve_entity(&expr.root)
            .map_err(|err| err.with_line(expr.line.clone()))?;

        if hop.is_parents() {
            return Ok(ClassRelation::Parents {
                child: entity,
                parents: self.visible_parents(entity),
            });
        }

        let attr = self
            .model
            .require_attribute(entity, &hop.attribute)
            .map_err(|err| err.with_line(expr.line.clone()))?;
        match attr.relation() {
            Some((target, _)) => Ok(ClassRelation::Relation {
                from: entity,
                to: target,
            }),
            None => Err(Error::attribute_not_found(
                self.model.entity(entity).full_name(),
                format!("{} (relation)", hop.attribute),
            )
            .with_line(expr.line.clone())),
        }
    }

    /// Direct parents of `entity`, minus the universal root entity.
    pub fn visible_parents(&self, entity: EntityId) -> Vec<EntityId> {
        self.model
            .entity(entity)
            .parents
            .iter()
            .copied()
            .filter(|&parent| self.model.entity(parent).full_name() != self.root_entity)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relgraph_core::MemoryModel;
    use relgraph_error::ErrorKind;

    const MODEL: &str = r#"{
        "entities": [
            { "name": "app::Node", "attributes": [ { "name": "name", "type": "string" } ] },
            { "name": "app::Host", "parents": ["app::Node"],
              "attributes": [ { "name": "services", "relation": "app::Service", "inverse": "host" } ] },
            { "name": "app::Service", "parents": ["app::Node"],
              "attributes": [
                { "name": "host", "relation": "app::Host", "inverse": "services" },
                { "name": "peers", "relation": "app::Node" }
              ] }
        ],
        "instances": [
            { "id": "web1", "type": "app::Host",
              "attributes": { "name": "web1", "services": [ { "ref": "svcA" }, { "ref": "svcB" } ] } },
            { "id": "svcA", "type": "app::Service",
              "attributes": { "name": "a", "host": { "ref": "web1" },
                              "peers": [ { "ref": "svcB" }, { "ref": "web1" }, { "ref": "svcA" } ] } },
            { "id": "svcB", "type": "app::Service",
              "attributes": { "name": "b", "host": { "ref": "web1" } } }
        ]
    }"#;

    fn model() -> MemoryModel {
        MemoryModel::from_json_str(MODEL).unwrap()
    }

    fn key(model: &MemoryModel, id: &str) -> InstanceId {
        model.instance_by_key(id).unwrap()
    }

    #[test]
    fn test_single_hop() {
        let model = model();
        let walker = PathWalker::new(&model);
        let expr = RelationExpr::parse("app::Service.host").unwrap();
        let results = walker.walk(&expr).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].root, key(&model, "svcA"));
        assert_eq!(results[0].targets, vec![key(&model, "web1")]);
    }

    #[test]
    fn test_self_loops_dropped() {
        let model = model();
        let walker = PathWalker::new(&model);
        let expr = RelationExpr::parse("app::Service.peers").unwrap();
        let results = walker.walk(&expr).unwrap();
        let a = &results[0];
        assert_eq!(a.root, key(&model, "svcA"));
        assert!(!a.targets.contains(&a.root));
        assert_eq!(a.targets, vec![key(&model, "svcB"), key(&model, "web1")]);
    }

    #[test]
    fn test_filter_keeps_subtypes_by_name() {
        let model = model();
        let walker = PathWalker::new(&model);
        let expr = RelationExpr::parse("app::Service.peers|Host").unwrap();
        let results = walker.walk(&expr).unwrap();
        assert_eq!(results[0].targets, vec![key(&model, "web1")]);

        let expr = RelationExpr::parse("app::Service.peers|Node").unwrap();
        let results = walker.walk(&expr).unwrap();
        assert_eq!(results[0].targets.len(), 2);
    }

    #[test]
    fn test_multi_hop_back_to_siblings() {
        let model = model();
        let walker = PathWalker::new(&model);
        let expr = RelationExpr::parse("app::Service.host.services").unwrap();
        let results = walker.walk(&expr).unwrap();
        // svcA -> web1 -> {svcA, svcB}; svcA itself dropped
        assert_eq!(results[0].targets, vec![key(&model, "svcB")]);
        assert_eq!(results[1].targets, vec![key(&model, "svcA")]);
    }

    #[test]
    fn test_hop_targets_unique_in_first_seen_order() {
        let model = model();
        let walker = PathWalker::new(&model);
        let (a, b, web1) = (key(&model, "svcA"), key(&model, "svcB"), key(&model, "web1"));

        let hop = Hop::parse("host", "app::Service.host").unwrap();
        assert_eq!(walker.follow_hop(&[a, b], &hop).unwrap(), vec![web1]);

        let hop = Hop::parse("peers", "app::Service.peers").unwrap();
        assert_eq!(walker.follow_hop(&[a, a], &hop).unwrap(), vec![b, web1, a]);
    }

    #[test]
    fn test_scalar_hop_fails() {
        let model = model();
        let walker = PathWalker::new(&model);
        let expr = RelationExpr::parse("app::Service.name").unwrap();
        let err = walker.walk(&expr).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_unknown_root_fails() {
        let model = model();
        let walker = PathWalker::new(&model);
        let expr = RelationExpr::parse("app::Missing.host").unwrap();
        let err = walker.walk(&expr).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SymbolNotFound);
        assert_eq!(err.line(), Some("app::Missing.host"));
    }

    #[test]
    fn test_class_parents_skip_root() {
        let model = model();
        let walker = PathWalker::new(&model);
        let expr = RelationExpr::parse("@app::Service._parents").unwrap();
        let node = model.entity_by_name("app::Node").unwrap();
        let service = model.entity_by_name("app::Service").unwrap();
        assert_eq!(
            walker.class_relation(&expr).unwrap(),
            ClassRelation::Parents {
                child: service,
                parents: vec![node]
            }
        );

        // app::Node only has std::Entity as parent
        let expr = RelationExpr::parse("@app::Node._parents").unwrap();
        assert_eq!(
            walker.class_relation(&expr).unwrap(),
            ClassRelation::Parents {
                child: node,
                parents: vec![]
            }
        );
    }

    #[test]
    fn test_class_relation_attribute() {
        let model = model();
        let walker = PathWalker::new(&model);
        let expr = RelationExpr::parse("@app::Service.host").unwrap();
        assert_eq!(
            walker.class_relation(&expr).unwrap(),
            ClassRelation::Relation {
                from: model.entity_by_name("app::Service").unwrap(),
                to: model.entity_by_name("app::Host").unwrap(),
            }
        );

        let expr = RelationExpr::parse("@app::Service.name").unwrap();
        let err = walker.class_relation(&expr).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SymbolNotFound);

        let expr = RelationExpr::parse("@app::Service.nope").unwrap();
        assert!(walker.class_relation(&expr).is_err());
    }
}
