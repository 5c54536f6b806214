//! DOT output.

use std::fmt::Write;

use relgraph_collect::{Edge, GraphCollector};
use relgraph_core::NodeId;

use crate::RenderOptions;

/// Escape special characters for DOT labels.
pub fn escape_label(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

/// Write indentation to output.
pub fn write_indent(output: &mut String, level: usize) {
    for _ in 0..level {
        output.push_str("  ");
    }
}

/// Quoted DOT identifier of a node.
pub fn node_id(id: NodeId) -> String {
    format!("\"n{id}\"")
}

/// Builder for an undirected DOT graph.
pub struct DotBuilder {
    output: String,
    indent: usize,
}

impl Default for DotBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DotBuilder {
    pub fn new() -> Self {
        let mut output = String::with_capacity(4096);
        output.push_str("graph {\n");
        Self { output, indent: 1 }
    }

    /// Add a node; every attribute value is quoted and escaped.
    pub fn node(&mut self, id: &str, attrs: &[(&str, &str)]) -> &mut Self {
        write_indent(&mut self.output, self.indent);
        let _ = write!(self.output, "{id} [");
        write_attrs(&mut self.output, attrs);
        self.output.push_str("];\n");
        self
    }

    /// Add an edge, with a bracketed attribute list when `attrs` is non-empty.
    pub fn edge(&mut self, from: &str, to: &str, attrs: &[(&str, &str)]) -> &mut Self {
        write_indent(&mut self.output, self.indent);
        let _ = write!(self.output, "{from} -- {to}");
        if !attrs.is_empty() {
            self.output.push_str(" [");
            write_attrs(&mut self.output, attrs);
            self.output.push(']');
        }
        self.output.push_str(";\n");
        self
    }

    /// Add an edge with a raw, unescaped attribute list such as `dir=forward`.
    pub fn edge_raw(&mut self, from: &str, to: &str, style: &str) -> &mut Self {
        write_indent(&mut self.output, self.indent);
        if style.is_empty() {
            let _ = writeln!(self.output, "{from} -- {to};");
        } else {
            let _ = writeln!(self.output, "{from} -- {to} [{style}];");
        }
        self
    }

    /// Add a `{ rank=...; ... }` group.
    pub fn rank(&mut self, rank: &str, members: &[String]) -> &mut Self {
        write_indent(&mut self.output, self.indent);
        let _ = write!(self.output, "{{ rank={rank};");
        for member in members {
            let _ = write!(self.output, " {member};");
        }
        self.output.push_str(" }\n");
        self
    }

    /// Finish building and return the DOT string.
    pub fn build(mut self) -> String {
        self.output.push_str("}\n");
        self.output
    }
}

fn write_attrs(output: &mut String, attrs: &[(&str, &str)]) {
    for (i, (key, value)) in attrs.iter().enumerate() {
        if i > 0 {
            output.push(',');
        }
        let _ = write!(output, "{}=\"{}\"", key, escape_label(value));
    }
}

/// Render nodes, rank groups, relations and parent edges, in that order.
pub fn render_dot(collector: &GraphCollector<'_>, options: &RenderOptions) -> String {
    let mut dot = DotBuilder::new();

    for node in collector.nodes() {
        let mut attrs: Vec<(&str, &str)> = Vec::with_capacity(node.options.attrs.len() + 1);
        attrs.push(("label", node.options.label.as_str()));
        attrs.extend(
            node.options
                .attrs
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str())),
        );
        dot.node(&node_id(node.id), &attrs);
    }

    for group in collector.rank_groups() {
        let members: Vec<String> = group.members.iter().map(|&m| node_id(m)).collect();
        dot.rank(&group.rank, &members);
    }

    for edge in collector.edges() {
        match edge {
            Edge::Plain { from, to, label } => {
                let attrs: Vec<(&str, &str)> = label.map(|l| ("label", l)).into_iter().collect();
                dot.edge(&node_id(from), &node_id(to), &attrs);
            }
            Edge::DualPaired {
                from,
                to,
                label_from,
                label_to,
            } => {
                let mut attrs = Vec::with_capacity(2);
                if let Some(label) = label_from {
                    attrs.push(("taillabel", label));
                }
                if let Some(label) = label_to {
                    attrs.push(("headlabel", label));
                }
                dot.edge(&node_id(from), &node_id(to), &attrs);
            }
            Edge::Parent { child, parent } => {
                dot.edge_raw(&node_id(child), &node_id(parent), &options.parent_edge_style);
            }
        }
    }

    dot.build()
}
