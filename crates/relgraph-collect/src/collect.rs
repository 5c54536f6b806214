//! Populate a [`GraphCollector`] from a parsed description.

use tracing::debug;

use relgraph_core::{EntityId, InstanceId, ModelKey, ModelLookup, QualifiedName, ROOT_ENTITY, Value};
use relgraph_error::Result;

use crate::collector::{GraphCollector, entity_options};
use crate::description::{Declaration, Description, Expansion, InlineOptions, Selector, SelectorTarget};
use crate::types::{EndKey, NodeOptions};
use crate::walk::{ClassRelation, PathWalker};

/// Option naming the attribute used as node label.
const LABEL_OPTION: &str = "label";
/// Option moved into a rank group instead of the node.
const RANK_OPTION: &str = "rank";
/// Label attribute of instance declarations without an option list.
const DEFAULT_LABEL_ATTRIBUTE: &str = "name";

#[derive(Debug, Clone)]
pub struct CollectOptions {
    /// Entity whose inheritance edges are hidden.
    pub root_entity: String,
}

impl Default for CollectOptions {
    fn default() -> Self {
        Self {
            root_entity: ROOT_ENTITY.to_string(),
        }
    }
}

/// Run every declaration, then every relation expression, against `model`.
pub fn collect_graph<'m>(
    description: &Description,
    model: &'m dyn ModelLookup,
    options: &CollectOptions,
) -> Result<GraphCollector<'m>> {
    let walker = PathWalker::new(model).with_root_entity(options.root_entity.clone());
    let mut collector = GraphCollector::new(model);

    for declaration in &description.declarations {
        match declaration {
            Declaration::Class(selector) => {
                collect_class(&mut collector, &walker, selector)?;
            }
            Declaration::Instance { name, options } => {
                collect_instances(&mut collector, name, options.as_ref())?;
            }
        }
    }

    for expr in &description.relations {
        if expr.class_level {
            match walker.class_relation(expr)? {
                ClassRelation::Parents { child, parents } => {
                    for parent in parents {
                        collector.add_parent(ModelKey::Entity(child), ModelKey::Entity(parent));
                    }
                }
                ClassRelation::Relation { from, to } => {
                    collector.add_relation(ModelKey::Entity(from), ModelKey::Entity(to), None);
                }
            }
        } else {
            for result in walker.walk(expr)? {
                for target in result.targets {
                    collector.add_relation(
                        ModelKey::Instance(result.root),
                        ModelKey::Instance(target),
                        None,
                    );
                }
            }
        }
    }

    debug!(
        nodes = collector.node_count(),
        relations = collector.relation_count(),
        parents = collector.parent_count(),
        "graph collected"
    );
    Ok(collector)
}

fn collect_class(
    collector: &mut GraphCollector<'_>,
    walker: &PathWalker<'_>,
    selector: &Selector,
) -> Result<()> {
    let model = collector.model();
    let entities = match &selector.target {
        SelectorTarget::Named(name) => vec![model.resolve_entity(name)?],
        SelectorTarget::Namespace(namespace) => model.entities_in(namespace)?,
    };

    for &entity in &entities {
        collector.add_node(ModelKey::Entity(entity), entity_options(model, entity));
        match selector.expansion {
            Expansion::None => {}
            Expansion::Parents => add_parents(collector, walker, entity),
            Expansion::RelationsAndParents => {
                add_relation_pairs(collector, entity);
                add_parents(collector, walker, entity);
            }
        }
    }
    Ok(())
}

fn add_parents(collector: &mut GraphCollector<'_>, walker: &PathWalker<'_>, entity: EntityId) {
    for parent in walker.visible_parents(entity) {
        collector.add_parent(ModelKey::Entity(entity), ModelKey::Entity(parent));
    }
}

/// One dual-keyed call per relation attribute declared on `entity`. When the
/// target side is expanded as well its call lands on the same entry.
fn add_relation_pairs(collector: &mut GraphCollector<'_>, entity: EntityId) {
    let model = collector.model();
    for attr in model.entity(entity).relation_attributes() {
        let Some((target, inverse)) = attr.relation() else {
            continue;
        };
        let near = EndKey::Named {
            entity,
            attribute: attr.name.clone(),
        };
        let far = match inverse {
            Some(inverse) => EndKey::Named {
                entity: target,
                attribute: inverse.to_string(),
            },
            None => EndKey::Anonymous {
                owner: entity,
                attribute: attr.name.clone(),
            },
        };
        collector.add_dual_keyed(
            &near,
            &far,
            ModelKey::Entity(entity),
            ModelKey::Entity(target),
            attr.name.as_str(),
        );
    }
}

fn collect_instances(
    collector: &mut GraphCollector<'_>,
    name: &QualifiedName,
    options: Option<&InlineOptions>,
) -> Result<()> {
    let model = collector.model();
    let instances = model.resolve_instances(name)?;

    let mut options = match options {
        Some(options) => options.clone(),
        None => {
            let mut defaults = InlineOptions::new();
            defaults.insert(LABEL_OPTION, DEFAULT_LABEL_ATTRIBUTE);
            defaults
        }
    };
    let rank = options.remove(RANK_OPTION);
    let label_attribute = options.remove(LABEL_OPTION);

    for &instance in &instances {
        let label = label_attribute
            .as_deref()
            .and_then(|attr| instance_label(model, instance, attr))
            .unwrap_or_else(|| model.instance_repr(instance));
        let mut node = NodeOptions::new(label);
        for (key, value) in options.iter() {
            node = node.with_attr(key, value);
        }
        collector.add_node(ModelKey::Instance(instance), node);
    }

    if let Some(rank) = rank {
        collector.add_rank_group(rank, &instances);
    }
    debug!(declaration = %name, instances = instances.len(), "instances collected");
    Ok(())
}

/// Display value of `attribute`, or `None` when the instance has no such
/// attribute or it is unset.
fn instance_label(
    model: &dyn ModelLookup,
    instance: InstanceId,
    attribute: &str,
) -> Option<String> {
    match model.attribute(instance, attribute).ok()? {
        Value::Null => None,
        value => Some(model.display_value(&value)),
    }
}
