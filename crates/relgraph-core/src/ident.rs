use std::collections::HashMap;
use std::hash::Hash;

/// Rendering-level node identity.
///
/// Assigned once per render pass at first encounter of the underlying model
/// object, so it never depends on display attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct NodeId(pub u32);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl NodeId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }
}

/// Assigns stable `u32` surrogates to keys in first-encounter order.
///
/// Surrogates are dense and start at zero. Ordering keys by surrogate gives
/// the same order every run for the same sequence of lookups.
#[derive(Debug, Clone)]
pub struct IdentityMap<K> {
    ids: HashMap<K, u32>,
}

impl<K> Default for IdentityMap<K> {
    fn default() -> Self {
        Self {
            ids: HashMap::new(),
        }
    }
}

impl<K> IdentityMap<K>
where
    K: Hash + Eq + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Surrogate for `key`, assigning the next free one on first sight.
    pub fn id_of(&mut self, key: &K) -> u32 {
        if let Some(&id) = self.ids.get(key) {
            return id;
        }
        let id = self.ids.len() as u32;
        self.ids.insert(key.clone(), id);
        id
    }

    /// Surrogate for `key` if it was seen before.
    pub fn get(&self, key: &K) -> Option<u32> {
        self.ids.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
