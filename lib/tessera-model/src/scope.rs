use crate::blank_node::BlankNode;
use std::collections::HashMap;

/// Maps the blank node labels of one document to freshly minted blank nodes.
///
/// Labels are case-sensitive. Each scope mints its own nodes, so the same label read by two
/// decoders yields two different blank nodes.
///
/// ```
/// use tessera_model::BlankNodeScope;
///
/// let mut first = BlankNodeScope::default();
/// let mut second = BlankNodeScope::default();
/// assert_eq!(first.intern("b0"), first.intern("b0"));
/// assert_ne!(first.intern("b0"), first.intern("B0"));
/// assert_ne!(first.intern("b0"), second.intern("b0"));
/// ```
#[derive(Debug, Default)]
pub struct BlankNodeScope {
    labels: HashMap<String, BlankNode>,
}

impl BlankNodeScope {
    /// Returns the node bound to `label`, minting it on first use.
    pub fn intern(&mut self, label: &str) -> BlankNode {
        if let Some(node) = self.labels.get(label) {
            return node.clone();
        }
        let node = BlankNode::default();
        self.labels.insert(label.to_owned(), node.clone());
        node
    }

    /// Mints a node not bound to any label.
    #[inline]
    pub fn fresh(&self) -> BlankNode {
        BlankNode::default()
    }

    /// Number of labels seen so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Forgets all labels.
    pub fn clear(&mut self) {
        self.labels.clear();
    }
}
