//! Best-first priority queue of open search nodes.

use super::node::SearchNode;
use ordered_float::OrderedFloat;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

struct Entry {
    bound: OrderedFloat<f64>,
    seq: u64,
    node: SearchNode,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.bound == other.bound && self.seq == other.seq
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    // BinaryHeap is a max-heap: the smallest bound, then the earliest
    // insertion, must compare greatest.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .bound
            .cmp(&self.bound)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Open nodes ordered by ascending bound; equal bounds pop in insertion order.
#[derive(Default)]
pub struct Frontier {
    heap: BinaryHeap<Entry>,
    next_seq: u64,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, node: SearchNode) {
        let entry = Entry {
            bound: OrderedFloat(node.bound()),
            seq: self.next_seq,
            node,
        };
        self.next_seq += 1;
        self.heap.push(entry);
    }

    /// Remove and return the node with the smallest bound.
    pub fn pop(&mut self) -> Option<SearchNode> {
        self.heap.pop().map(|entry| entry.node)
    }

    /// Smallest bound currently queued.
    pub fn peek_bound(&self) -> Option<f64> {
        self.heap.peek().map(|entry| entry.bound.into_inner())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
