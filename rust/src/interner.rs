//! Task id interning for arena-style graph storage.
//!
//! Maps string task ids to dense integer node ids so the graph can keep
//! tasks, timings and adjacency in flat index-addressed vectors.

use rustc_hash::FxHashMap;

/// Dense node id (u32 for compact storage and fast hashing).
pub type NodeId = u32;

/// Bidirectional task id <-> node id mapping.
///
/// Ids are handed out in insertion order, so interning tasks in catalog
/// order makes node ids follow catalog order.
#[derive(Debug, Clone)]
pub struct TaskIndex {
    to_node: FxHashMap<String, NodeId>,
    from_node: Vec<String>,
}

impl TaskIndex {
    /// Create a new index with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            to_node: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            from_node: Vec::with_capacity(capacity),
        }
    }

    /// Intern a task id, returning its node id and whether it was new.
    pub fn intern(&mut self, task_id: &str) -> (NodeId, bool) {
        if let Some(&node) = self.to_node.get(task_id) {
            return (node, false);
        }
        let node = self.from_node.len() as NodeId;
        self.from_node.push(task_id.to_string());
        self.to_node.insert(task_id.to_string(), node);
        (node, true)
    }

    #[inline]
    pub fn get(&self, task_id: &str) -> Option<NodeId> {
        self.to_node.get(task_id).copied()
    }

    #[inline]
    pub fn resolve(&self, node: NodeId) -> Option<&str> {
        self.from_node.get(node as usize).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.from_node.len()
    }

    pub fn is_empty(&self) -> bool {
        self.from_node.is_empty()
    }
}

impl Default for TaskIndex {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_order_ids() {
        let mut index = TaskIndex::with_capacity(4);

        let (brief, new_brief) = index.intern("brief");
        let (copy, new_copy) = index.intern("copy");
        let (again, new_again) = index.intern("brief");

        assert_eq!((brief, copy), (0, 1));
        assert!(new_brief && new_copy);
        assert_eq!(again, brief);
        assert!(!new_again);

        assert_eq!(index.resolve(copy), Some("copy"));
        assert_eq!(index.get("brief"), Some(0));
        assert_eq!(index.get("missing"), None);
        assert_eq!(index.resolve(7), None);
        assert_eq!(index.len(), 2);
    }
}
