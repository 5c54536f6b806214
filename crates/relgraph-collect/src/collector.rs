//! The deduplicating node and relation store.

use std::collections::{BTreeMap, BTreeSet};

use relgraph_core::{EntityId, IdentityMap, InstanceId, ModelKey, ModelLookup, NodeId};

use crate::types::{Edge, EndKey, NodeOptions, NodeRef, RankGroup, RelationKey};

/// Which label slot of a dual entry a call writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Low,
    High,
}

#[derive(Debug, Clone)]
enum StoredRelation {
    Plain {
        from: NodeId,
        to: NodeId,
        label: Option<String>,
    },
    Dual {
        from: NodeId,
        to: NodeId,
        /// Slot written by the call that created the entry. That label names
        /// the role of `to`.
        first: Slot,
        low: Option<String>,
        high: Option<String>,
    },
}

/// Collects the nodes and edges of one diagram.
///
/// Node identity is the surrogate assigned to a [`ModelKey`] at first
/// sight, so iteration order follows the order in which the description
/// mentioned things. Rendering the same collector twice gives identical
/// output.
pub struct GraphCollector<'m> {
    model: &'m dyn ModelLookup,
    node_ids: IdentityMap<ModelKey>,
    end_ids: IdentityMap<EndKey>,
    nodes: BTreeMap<NodeId, NodeRef>,
    relations: BTreeMap<RelationKey, StoredRelation>,
    parents: BTreeSet<(NodeId, NodeId)>,
    rank_groups: Vec<RankGroup>,
}

impl<'m> GraphCollector<'m> {
    pub fn new(model: &'m dyn ModelLookup) -> Self {
        Self {
            model,
            node_ids: IdentityMap::new(),
            end_ids: IdentityMap::new(),
            nodes: BTreeMap::new(),
            relations: BTreeMap::new(),
            parents: BTreeSet::new(),
            rank_groups: Vec::new(),
        }
    }

    /// The model this collector reads default labels from.
    pub fn model(&self) -> &'m dyn ModelLookup {
        self.model
    }

    /// Insert a node; a node that already exists keeps its first options.
    pub fn add_node(&mut self, key: ModelKey, options: NodeOptions) -> NodeId {
        let id = NodeId::new(self.node_ids.id_of(&key));
        self.nodes
            .entry(id)
            .or_insert_with(|| NodeRef { id, key, options });
        id
    }

    /// Register `key` with its default options unless already present.
    pub fn ensure_node(&mut self, key: ModelKey) -> NodeId {
        let id = NodeId::new(self.node_ids.id_of(&key));
        if !self.nodes.contains_key(&id) {
            let options = self.default_options(key);
            self.nodes.insert(id, NodeRef { id, key, options });
        }
        id
    }

    /// Default display options: entities are boxes labelled with their full
    /// name, instances are labelled with their string representation.
    pub fn default_options(&self, key: ModelKey) -> NodeOptions {
        match key {
            ModelKey::Entity(entity) => entity_options(self.model, entity),
            ModelKey::Instance(instance) => NodeOptions::new(self.model.instance_repr(instance)),
        }
    }

    /// Add an undirected relation. The same endpoints in either order with the
    /// same label replace the earlier entry.
    pub fn add_relation(&mut self, from: ModelKey, to: ModelKey, label: Option<String>) {
        let from = self.ensure_node(from);
        let to = self.ensure_node(to);
        let key = RelationKey::pair(from, to, label.clone());
        self.relations
            .insert(key, StoredRelation::Plain { from, to, label });
    }

    /// Add a directed inheritance edge. `(a, b)` and `(b, a)` are distinct.
    pub fn add_parent(&mut self, child: ModelKey, parent: ModelKey) {
        let child = self.ensure_node(child);
        let parent = self.ensure_node(parent);
        self.parents.insert((child, parent));
    }

    /// Add one end of a bidirectional relation.
    ///
    /// `end_a` is the end this call describes from, `end_b` the opposite end;
    /// `label` names the role of `to`. Declaring the opposite end later
    /// (`end_b`, `end_a`, `to`, `from`) merges into the same entry.
    ///
    /// Slot convention: a call whose `end_a` has the smaller surrogate writes
    /// the low slot, otherwise the high slot. The other slot is kept. The
    /// stored `(from, to)` orientation is the one of the first call.
    pub fn add_dual_keyed(
        &mut self,
        end_a: &EndKey,
        end_b: &EndKey,
        from: ModelKey,
        to: ModelKey,
        label: impl Into<String>,
    ) {
        let a = self.end_ids.id_of(end_a);
        let b = self.end_ids.id_of(end_b);
        let slot = if a <= b { Slot::Low } else { Slot::High };
        let label = Some(label.into());

        let from = self.ensure_node(from);
        let to = self.ensure_node(to);

        let entry = self
            .relations
            .entry(RelationKey::dual(a, b))
            .or_insert(StoredRelation::Dual {
                from,
                to,
                first: slot,
                low: None,
                high: None,
            });
        if let StoredRelation::Dual { low, high, .. } = entry {
            match slot {
                Slot::Low => *low = label,
                Slot::High => *high = label,
            }
        }
    }

    /// Group instance nodes on one DOT rank.
    pub fn add_rank_group(&mut self, rank: impl Into<String>, members: &[InstanceId]) {
        let members = members
            .iter()
            .map(|&m| self.ensure_node(ModelKey::Instance(m)))
            .collect();
        self.rank_groups.push(RankGroup {
            rank: rank.into(),
            members,
        });
    }

    pub fn node_id(&self, key: ModelKey) -> Option<NodeId> {
        let id = NodeId::new(self.node_ids.get(&key)?);
        self.nodes.contains_key(&id).then_some(id)
    }

    pub fn node(&self, id: NodeId) -> Option<&NodeRef> {
        self.nodes.get(&id)
    }

    /// Nodes in first-encounter order.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeRef> {
        self.nodes.values()
    }

    /// Plain and dual relations in key order.
    pub fn relations(&self) -> impl Iterator<Item = Edge<'_>> {
        self.relations.values().map(|stored| match stored {
            StoredRelation::Plain { from, to, label } => Edge::Plain {
                from: *from,
                to: *to,
                label: label.as_deref(),
            },
            StoredRelation::Dual {
                from,
                to,
                first,
                low,
                high,
            } => {
                let (label_to, label_from) = match first {
                    Slot::Low => (low, high),
                    Slot::High => (high, low),
                };
                Edge::DualPaired {
                    from: *from,
                    to: *to,
                    label_from: label_from.as_deref(),
                    label_to: label_to.as_deref(),
                }
            }
        })
    }

    /// Parent edges in `(child, parent)` order.
    pub fn parents(&self) -> impl Iterator<Item = Edge<'_>> {
        self.parents
            .iter()
            .map(|&(child, parent)| Edge::Parent { child, parent })
    }

    /// Every edge: relations first, then parent edges.
    pub fn edges(&self) -> impl Iterator<Item = Edge<'_>> {
        self.relations().chain(self.parents())
    }

    pub fn rank_groups(&self) -> &[RankGroup] {
        &self.rank_groups
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn relation_count(&self) -> usize {
        self.relations.len()
    }

    pub fn parent_count(&self) -> usize {
        self.parents.len()
    }
}

/// Display options used for entity nodes.
pub fn entity_options(model: &dyn ModelLookup, entity: EntityId) -> NodeOptions {
    NodeOptions::new(model.entity(entity).full_name()).with_attr("shape", "rect")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use relgraph_core::MemoryModel;

    const MODEL: &str = r#"{
        "entities": [
            { "name": "app::Host",
              "attributes": [ { "name": "services", "relation": "app::Service", "inverse": "host" } ] },
            { "name": "app::Service",
              "attributes": [ { "name": "host", "relation": "app::Host", "inverse": "services" } ] }
        ],
        "instances": [
            { "id": "a", "type": "app::Service" },
            { "id": "b", "type": "app::Service" },
            { "id": "c", "type": "app::Service" }
        ]
    }"#;

    fn instance(model: &MemoryModel, id: &str) -> ModelKey {
        ModelKey::Instance(model.instance_by_key(id).unwrap())
    }

    fn entity(model: &MemoryModel, name: &str) -> ModelKey {
        ModelKey::Entity(model.entity_by_name(name).unwrap())
    }

    #[test]
    fn test_relation_dedup_ignores_order() {
        let model = MemoryModel::from_json_str(MODEL).unwrap();
        let (a, b) = (instance(&model, "a"), instance(&model, "b"));
        let mut collector = GraphCollector::new(&model);
        collector.add_relation(a, b, None);
        collector.add_relation(b, a, None);
        assert_eq!(collector.relation_count(), 1);

        // last write wins: orientation of the second call is kept
        let edges: Vec<_> = collector.relations().collect();
        let (ia, ib) = (collector.node_id(a).unwrap(), collector.node_id(b).unwrap());
        assert_eq!(
            edges,
            vec![Edge::Plain {
                from: ib,
                to: ia,
                label: None
            }]
        );
    }

    #[test]
    fn test_relation_labels_are_part_of_key() {
        let model = MemoryModel::from_json_str(MODEL).unwrap();
        let (a, b) = (instance(&model, "a"), instance(&model, "b"));
        let mut collector = GraphCollector::new(&model);
        collector.add_relation(a, b, Some("uses".to_string()));
        collector.add_relation(b, a, Some("uses".to_string()));
        collector.add_relation(a, b, None);
        assert_eq!(collector.relation_count(), 2);
    }

    #[test]
    fn test_parents_are_directed() {
        let model = MemoryModel::from_json_str(MODEL).unwrap();
        let host = entity(&model, "app::Host");
        let service = entity(&model, "app::Service");
        let mut collector = GraphCollector::new(&model);
        collector.add_parent(host, service);
        collector.add_parent(service, host);
        collector.add_parent(service, host);
        assert_eq!(collector.parent_count(), 2);
        assert_eq!(collector.relation_count(), 0);
    }

    #[test]
    fn test_endpoints_auto_registered() {
        let model = MemoryModel::from_json_str(MODEL).unwrap();
        let (a, c) = (instance(&model, "a"), instance(&model, "c"));
        let host = entity(&model, "app::Host");
        let mut collector = GraphCollector::new(&model);
        collector.add_relation(a, c, None);
        collector.add_parent(host, entity(&model, "std::Entity"));

        let labels: Vec<_> = collector
            .nodes()
            .map(|n| n.options.label.as_str())
            .collect();
        assert_eq!(labels, vec!["a", "c", "app::Host", "std::Entity"]);
        let host_node = collector.node(collector.node_id(host).unwrap()).unwrap();
        assert_eq!(
            host_node.options.attrs,
            vec![("shape".to_string(), "rect".to_string())]
        );
    }

    #[test]
    fn test_first_node_options_win() {
        let model = MemoryModel::from_json_str(MODEL).unwrap();
        let a = instance(&model, "a");
        let mut collector = GraphCollector::new(&model);
        collector.add_node(a, NodeOptions::new("first"));
        collector.add_node(a, NodeOptions::new("second"));
        collector.add_relation(a, instance(&model, "b"), None);
        let id = collector.node_id(a).unwrap();
        assert_eq!(collector.node(id).unwrap().options.label, "first");
    }

    struct DualEnds {
        host: EntityId,
        service: EntityId,
        host_end: EndKey,
        service_end: EndKey,
    }

    fn dual_ends(model: &MemoryModel) -> DualEnds {
        let host = model.entity_by_name("app::Host").unwrap();
        let service = model.entity_by_name("app::Service").unwrap();
        DualEnds {
            host,
            service,
            host_end: EndKey::Named {
                entity: host,
                attribute: "services".to_string(),
            },
            service_end: EndKey::Named {
                entity: service,
                attribute: "host".to_string(),
            },
        }
    }

    fn declare_from_host(collector: &mut GraphCollector<'_>, ends: &DualEnds) {
        collector.add_dual_keyed(
            &ends.host_end,
            &ends.service_end,
            ModelKey::Entity(ends.host),
            ModelKey::Entity(ends.service),
            "services",
        );
    }

    fn declare_from_service(collector: &mut GraphCollector<'_>, ends: &DualEnds) {
        collector.add_dual_keyed(
            &ends.service_end,
            &ends.host_end,
            ModelKey::Entity(ends.service),
            ModelKey::Entity(ends.host),
            "host",
        );
    }

    #[test]
    fn test_dual_keyed_merges_host_first() {
        let model = MemoryModel::from_json_str(MODEL).unwrap();
        let ends = dual_ends(&model);
        let mut collector = GraphCollector::new(&model);
        declare_from_host(&mut collector, &ends);
        declare_from_service(&mut collector, &ends);
        assert_eq!(collector.relation_count(), 1);

        // Host -> Service, "services" at the Service end, "host" at the Host end
        let host = collector.node_id(ModelKey::Entity(ends.host)).unwrap();
        let service = collector.node_id(ModelKey::Entity(ends.service)).unwrap();
        let edges: Vec<_> = collector.relations().collect();
        assert_eq!(
            edges,
            vec![Edge::DualPaired {
                from: host,
                to: service,
                label_from: Some("host"),
                label_to: Some("services"),
            }]
        );
    }

    #[test]
    fn test_dual_keyed_merges_service_first() {
        let model = MemoryModel::from_json_str(MODEL).unwrap();
        let ends = dual_ends(&model);
        let mut collector = GraphCollector::new(&model);
        declare_from_service(&mut collector, &ends);
        declare_from_host(&mut collector, &ends);
        assert_eq!(collector.relation_count(), 1);

        // orientation follows the first call
        let host = collector.node_id(ModelKey::Entity(ends.host)).unwrap();
        let service = collector.node_id(ModelKey::Entity(ends.service)).unwrap();
        let edges: Vec<_> = collector.relations().collect();
        assert_eq!(
            edges,
            vec![Edge::DualPaired {
                from: service,
                to: host,
                label_from: Some("services"),
                label_to: Some("host"),
            }]
        );
    }

    #[test]
    fn test_dual_keyed_single_side_leaves_slot_unset() {
        let model = MemoryModel::from_json_str(MODEL).unwrap();
        let host = model.entity_by_name("app::Host").unwrap();
        let service = model.entity_by_name("app::Service").unwrap();
        let mut collector = GraphCollector::new(&model);
        collector.add_dual_keyed(
            &EndKey::Named {
                entity: host,
                attribute: "services".to_string(),
            },
            &EndKey::Anonymous {
                owner: host,
                attribute: "services".to_string(),
            },
            ModelKey::Entity(host),
            ModelKey::Entity(service),
            "services",
        );
        let edges: Vec<_> = collector.relations().collect();
        assert!(matches!(
            edges[0],
            Edge::DualPaired {
                label_from: None,
                label_to: Some("services"),
                ..
            }
        ));
    }

    #[test]
    fn test_rank_groups() {
        let model = MemoryModel::from_json_str(MODEL).unwrap();
        let a = model.instance_by_key("a").unwrap();
        let b = model.instance_by_key("b").unwrap();
        let mut collector = GraphCollector::new(&model);
        collector.add_rank_group("same", &[a, b]);
        assert_eq!(collector.rank_groups().len(), 1);
        assert_eq!(collector.rank_groups()[0].members.len(), 2);
        assert_eq!(collector.node_count(), 2);
    }
}
