//! PlantUML class diagram output.

use std::fmt::Write;

use relgraph_collect::{Edge, GraphCollector};
use relgraph_core::{AttributeKind, ModelKey, ModelLookup, NodeId};

/// PlantUML identifier for a qualified name.
pub fn sanitize_name(name: &str) -> String {
    name.replace(':', "_")
}

/// Attribute type as shown in a class body.
pub fn sanitize_type(type_name: &str) -> String {
    type_name.replace(['<', '>'], "").replace(' ', "_")
}

fn identifier(collector: &GraphCollector<'_>, id: NodeId) -> String {
    match collector.node(id).map(|node| node.key) {
        Some(ModelKey::Entity(entity)) => sanitize_name(&collector.model().entity(entity).full_name()),
        Some(ModelKey::Instance(_)) | None => format!("i{id}"),
    }
}

/// Render every node, then parent edges, then relations.
///
/// Rank groups have no PlantUML counterpart and are dropped.
pub fn render_plantuml(collector: &GraphCollector<'_>) -> String {
    let model: &dyn ModelLookup = collector.model();
    let mut out = String::with_capacity(4096);
    out.push_str("@startuml\n");

    for node in collector.nodes() {
        match node.key {
            ModelKey::Entity(entity) => {
                let def = model.entity(entity);
                let _ = writeln!(out, "class {}{{", sanitize_name(&def.full_name()));
                for attr in def.data_attributes() {
                    if let AttributeKind::Primitive { type_name } = &attr.kind {
                        let _ = writeln!(out, " {} {}", sanitize_type(type_name), attr.name);
                    }
                }
                out.push_str("}\n");
            }
            ModelKey::Instance(_) => {
                let _ = writeln!(
                    out,
                    "object \"{}\" as i{}",
                    node.options.label.replace('"', "'"),
                    node.id
                );
            }
        }
    }

    for edge in collector.parents() {
        if let Edge::Parent { child, parent } = edge {
            let _ = writeln!(
                out,
                "{} --> {}",
                identifier(collector, child),
                identifier(collector, parent)
            );
        }
    }

    for edge in collector.relations() {
        match edge {
            Edge::Plain { from, to, label } => {
                let _ = write!(
                    out,
                    "{} -- {}",
                    identifier(collector, from),
                    identifier(collector, to)
                );
                if let Some(label) = label {
                    let _ = write!(out, " : {label}");
                }
                out.push('\n');
            }
            Edge::DualPaired {
                from,
                to,
                label_from,
                label_to,
            } => {
                let _ = writeln!(
                    out,
                    "{} \"{}\" -- \"{}\" {}",
                    identifier(collector, from),
                    label_from.unwrap_or_default(),
                    label_to.unwrap_or_default(),
                    identifier(collector, to)
                );
            }
            Edge::Parent { .. } => {}
        }
    }

    out.push_str("@enduml\n");
    out
}
