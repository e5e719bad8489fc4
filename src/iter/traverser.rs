use crate::node::Node;
use crate::raw::Tables;
use crate::reclaim::{Guard, Linked};
use std::sync::atomic::Ordering;

/// Traverses the bucket chains of a single generation, in bucket order.
///
/// The generation is captured when the traverser is created. Buckets and
/// next links are read with acquire loads and no locks are ever taken, so
/// the traversal never blocks and always terminates after the captured
/// generation's buckets are exhausted. Entries inserted or removed after
/// creation may or may not be observed.
pub(crate) struct NodeIter<'g, K, V> {
    /// the generation being traversed
    tables: &'g Linked<Tables<K, V>>,

    /// index of the next bucket to scan
    bini: usize,

    /// the node the previous `next` call stopped at
    node: Option<&'g Linked<Node<K, V>>>,

    guard: &'g Guard<'g>,
}

impl<'g, K, V> NodeIter<'g, K, V> {
    pub(crate) fn new(tables: &'g Linked<Tables<K, V>>, guard: &'g Guard<'g>) -> Self {
        Self {
            tables,
            bini: 0,
            node: None,
            guard,
        }
    }
}

impl<'g, K, V> Iterator for NodeIter<'g, K, V> {
    type Item = &'g Linked<Node<K, V>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(node) = self.node {
                let next = node.next.load(Ordering::Acquire, self.guard);
                if !next.is_null() {
                    // safety: nodes reachable from the captured generation
                    // are retired only after they become unreachable, and our
                    // guard delays their reclamation beyond this borrow.
                    let next = unsafe { next.deref() };
                    self.node = Some(next);
                    return Some(next);
                }
                self.node = None;
            }

            if self.bini >= self.tables.len() {
                return None;
            }
            let head = self.tables.bucket(self.bini, self.guard);
            self.bini += 1;
            if !head.is_null() {
                // safety: same as above
                let head = unsafe { head.deref() };
                self.node = Some(head);
                return Some(head);
            }
        }
    }
}
