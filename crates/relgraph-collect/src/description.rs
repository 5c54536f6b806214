//! Diagram description parsing.
//!
//! A description is line oriented:
//!
//! ```text
//! # comment
//! @app::*+                      type-level declaration, all types plus parents
//! app::Host[label=name,rank=same]   instance declaration with options
//! app::Service.host|Host        instance-level relation expression
//! @app::Service._parents        type-level relation expression
//! ```
//!
//! Lines containing a `.` are relation expressions. Other lines are
//! declarations unless they start with whitespace.

use tracing::debug;

use relgraph_core::QualifiedName;
use relgraph_error::{Error, Result};

/// Pseudo attribute selecting the supertypes of an entity.
pub const PARENTS_HOP: &str = "_parents";

/// What a type-level selector pulls in besides the types themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Expansion {
    #[default]
    None,
    /// `*+`: parent edges.
    Parents,
    /// `**`: relation pairs and parent edges.
    RelationsAndParents,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorTarget {
    Named(QualifiedName),
    /// Every entity declared in the namespace.
    Namespace(Vec<String>),
}

/// A type-level declaration target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    pub target: SelectorTarget,
    pub expansion: Expansion,
}

impl Selector {
    /// Parse `ns::Name`, `ns::Name*`, `ns::Name**`, `ns::Name*+`, `ns::*`,
    /// `ns::**` or `ns::*+` (without the leading `@`).
    pub fn parse(text: &str, line: &str) -> Result<Self> {
        let qualified = QualifiedName::parse(text);
        let (base, expansion) = split_marker(&qualified.name);

        if base.contains('*') {
            return Err(Error::parse_failed(
                line,
                format!("misplaced wildcard in '{}'", qualified.name),
            ));
        }

        let target = if base.is_empty() {
            if expansion.is_none() {
                return Err(Error::parse_failed(line, "empty type name"));
            }
            SelectorTarget::Namespace(qualified.namespace)
        } else {
            SelectorTarget::Named(QualifiedName::new(qualified.namespace, base))
        };

        Ok(Self {
            target,
            expansion: expansion.unwrap_or_default(),
        })
    }
}

/// Strip a wildcard marker from the end of a name.
///
/// Returns the remaining name and the expansion, `None` when there was no
/// marker at all.
fn split_marker(name: &str) -> (&str, Option<Expansion>) {
    if let Some(base) = name.strip_suffix("**") {
        (base, Some(Expansion::RelationsAndParents))
    } else if let Some(base) = name.strip_suffix("*+") {
        (base, Some(Expansion::Parents))
    } else if let Some(base) = name.strip_suffix('*') {
        (base, Some(Expansion::None))
    } else {
        (name, None)
    }
}

/// Ordered `key=value` pairs of an inline option list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineOptions {
    entries: Vec<(String, String)>,
}

impl InlineOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the body of `[...]`, without the brackets.
    pub fn parse(body: &str, line: &str) -> Result<Self> {
        let mut options = Self::new();
        if body.trim().is_empty() {
            return Ok(options);
        }
        for segment in body.split(',') {
            let Some((key, value)) = segment.split_once('=') else {
                return Err(Error::parse_failed(
                    line,
                    format!("option '{}' has no '='", segment.trim()),
                ));
            };
            let key = key.trim();
            if key.is_empty() {
                return Err(Error::parse_failed(line, "option with empty key"));
            }
            options.insert(key, unquote(value.trim()));
        }
        Ok(options)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Insert or replace, keeping the position of an existing key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

/// One node-producing line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declaration {
    /// `@`-prefixed: render entities as classes.
    Class(Selector),
    /// Render the instances of an entity.
    Instance {
        name: QualifiedName,
        options: Option<InlineOptions>,
    },
}

/// One step of a relation expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hop {
    pub attribute: String,
    /// Keep only targets whose type (or a supertype) has this short name.
    pub filter: Option<String>,
}

impl Hop {
    /// Parse `attr` or `attr|Type`.
    pub fn parse(text: &str, line: &str) -> Result<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::parse_failed(line, "empty hop in relation expression"));
        }

        let parts: Vec<&str> = text.split('|').map(str::trim).collect();
        match parts.as_slice() {
            [attribute] => Ok(Self {
                attribute: attribute.to_string(),
                filter: None,
            }),
            [attribute, filter] => {
                if attribute.is_empty() || filter.is_empty() {
                    return Err(Error::parse_failed(
                        line,
                        format!("invalid use of '|' in '{}'", text),
                    ));
                }
                if filter.contains("::") {
                    return Err(Error::unsupported(format!(
                        "namespaced type filter '{}' is not implemented",
                        filter
                    ))
                    .with_line(line));
                }
                Ok(Self {
                    attribute: attribute.to_string(),
                    filter: Some(filter.to_string()),
                })
            }
            _ => Err(Error::parse_failed(
                line,
                format!("invalid use of '|' in '{}'", text),
            )),
        }
    }

    pub fn is_parents(&self) -> bool {
        self.attribute == PARENTS_HOP
    }
}

/// A dotted attribute path, `Root.hop1.hop2`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationExpr {
    /// `@`-prefixed: walk type definitions instead of instances.
    pub class_level: bool,
    pub root: QualifiedName,
    pub hops: Vec<Hop>,
    /// Source line, for error context.
    pub line: String,
}

impl RelationExpr {
    pub fn parse(line: &str) -> Result<Self> {
        let (class_level, body) = match line.strip_prefix('@') {
            Some(rest) => (true, rest),
            None => (false, line),
        };

        let mut segments = body.split('.');
        let root = segments.next().unwrap_or_default().trim();
        if root.is_empty() {
            return Err(Error::parse_failed(line, "relation expression without root"));
        }
        let hops = segments
            .map(|segment| Hop::parse(segment, line))
            .collect::<Result<Vec<_>>>()?;

        if class_level && hops.len() != 1 {
            return Err(Error::parse_failed(
                line,
                "in class diagrams only one-step relations are supported",
            ));
        }
        if class_level && hops[0].filter.is_some() {
            return Err(Error::unsupported("type filters on class-level relations")
                .with_line(line));
        }

        Ok(Self {
            class_level,
            root: QualifiedName::parse(root),
            hops,
            line: line.to_string(),
        })
    }
}

/// A parsed diagram description.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Description {
    pub declarations: Vec<Declaration>,
    pub relations: Vec<RelationExpr>,
}

/// How a raw description line is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind<'a> {
    Skip,
    Declaration(&'a str),
    Relation(&'a str),
}

/// Classify one raw line. Returned slices are trimmed.
pub fn classify_line(raw: &str) -> LineKind<'_> {
    let line = raw.trim();
    if line.is_empty() || line.starts_with('#') {
        LineKind::Skip
    } else if line.contains('.') {
        LineKind::Relation(line)
    } else if raw.starts_with(char::is_whitespace) {
        LineKind::Skip
    } else {
        LineKind::Declaration(line)
    }
}

impl Description {
    pub fn parse(text: &str) -> Result<Self> {
        let mut description = Self::default();

        for raw in text.lines() {
            match classify_line(raw) {
                LineKind::Skip => {}
                LineKind::Relation(line) => {
                    description.relations.push(RelationExpr::parse(line)?);
                }
                LineKind::Declaration(line) => {
                    description.declarations.push(parse_declaration(line)?);
                }
            }
        }

        debug!(
            declarations = description.declarations.len(),
            relations = description.relations.len(),
            "description parsed"
        );
        Ok(description)
    }
}

fn parse_declaration(line: &str) -> Result<Declaration> {
    if let Some(rest) = line.strip_prefix('@') {
        if rest.contains('[') {
            return Err(Error::unsupported("options on type-level declarations")
                .with_line(line));
        }
        return Ok(Declaration::Class(Selector::parse(rest, line)?));
    }

    let (selector, options) = match line.split_once('[') {
        Some((selector, rest)) => {
            let Some(body) = rest.trim_end().strip_suffix(']') else {
                return Err(Error::parse_failed(line, "unterminated option list"));
            };
            (selector, Some(InlineOptions::parse(body, line)?))
        }
        None => (line, None),
    };

    let name = QualifiedName::parse(selector.trim());
    if name.name.is_empty() {
        return Err(Error::parse_failed(line, "empty instance selector"));
    }
    if name.name.contains('*') {
        return Err(
            Error::unsupported("wildcards on instance declarations").with_line(line)
        );
    }

    Ok(Declaration::Instance { name, options })
}
