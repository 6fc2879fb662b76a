//! Recycled storage for parse trees.
//!
//! A [ParseTree] is an arena: nodes live in one flat `Vec` and refer to each
//!  other by [NodeId]. Trees are built and thrown away once per request, so
//!  instead of freeing the vectors we hand them back to a [NodePool] which
//!  gives them, cleared but with their capacity intact, to the next parse.
//!
//! The free list is a bounded MPMC channel so concurrent requests never
//!  contend on a lock. Releasing a tree is dropping it; every [NodeId] it
//!  handed out becomes meaningless at the same moment. Ids carry the
//!  generation of the tree that issued them so that feeding one to a
//!  different tree is detected instead of silently reading the wrong node.

use std::sync::{
    Arc, LazyLock,
    atomic::{AtomicU32, Ordering},
};

use crossbeam_channel::{Receiver, Sender, bounded};

use crate::parser::{Node, Span};

/// Trees larger than this aren't worth keeping around: one pathological
///  request shouldn't pin its allocation for the life of the process.
pub const MAX_RETAINED_NODES: usize = 4096;

pub const DEFAULT_POOL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

/// Function calls and lists (compute items, orderby items) don't own a `Vec`
///  of children. Their ids are packed contiguously into the tree's
///  `arg_lists` and the node keeps the span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgList {
    start: u32,
    len: u32,
}

impl ArgList {
    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[derive(Debug, Default)]
struct Storage {
    nodes: Vec<Node>,
    arg_lists: Vec<NodeId>,
}

impl Storage {
    fn clear(&mut self) {
        self.nodes.clear();
        self.arg_lists.clear();
    }
}

#[derive(Debug, Clone)]
pub struct NodePool {
    released: Sender<Storage>,
    available: Receiver<Storage>,
    generation: Arc<AtomicU32>,
}

static GLOBAL: LazyLock<NodePool> = LazyLock::new(|| NodePool::new(DEFAULT_POOL_CAPACITY));

impl NodePool {
    /// [capacity] bounds how many idle trees are retained, not how many can
    ///  be live at once.
    pub fn new(capacity: usize) -> Self {
        let (released, available) = bounded(capacity);
        Self {
            released,
            available,
            generation: Arc::new(AtomicU32::new(1)),
        }
    }

    /// The process-wide pool used by the top level `compile_*` functions.
    pub fn global() -> &'static NodePool {
        &GLOBAL
    }

    /// Hands out an empty tree for parsing [source], reusing released storage
    ///  when there is some.
    pub fn acquire<'input>(&self, source: &'input str) -> ParseTree<'input> {
        let storage = match self.available.try_recv() {
            Ok(storage) => {
                tracing::trace!(capacity = storage.nodes.capacity(), "reusing pooled tree");
                storage
            }
            Err(_) => Storage {
                nodes: Vec::with_capacity(32),
                arg_lists: Vec::with_capacity(32),
            },
        };
        ParseTree {
            source,
            storage,
            generation: self.generation.fetch_add(1, Ordering::Relaxed),
            recycle: self.released.clone(),
        }
    }

    /// Number of released trees waiting to be reused.
    pub fn idle(&self) -> usize {
        self.available.len()
    }
}

impl Default for NodePool {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_CAPACITY)
    }
}

/// A parse tree borrowing its source text. Dropping it returns its storage to
///  the pool it came from.
pub struct ParseTree<'input> {
    source: &'input str,
    storage: Storage,
    generation: u32,
    recycle: Sender<Storage>,
}

impl<'input> ParseTree<'input> {
    pub fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId {
            index: self.storage.nodes.len() as u32,
            generation: self.generation,
        };
        self.storage.nodes.push(node);
        id
    }

    pub fn push_args(&mut self, ids: impl ExactSizeIterator<Item = NodeId>) -> ArgList {
        let start = self.storage.arg_lists.len() as u32;
        let len = ids.len() as u32;
        self.storage.arg_lists.extend(ids);
        ArgList { start, len }
    }

    /// Returns `None` for ids issued by a different tree.
    #[inline]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        if id.generation != self.generation {
            return None;
        }
        self.storage.nodes.get(id.index as usize)
    }

    /// Like [ParseTree::get] for ids known to come from this tree. Panics
    ///  otherwise.
    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        assert_eq!(
            id.generation, self.generation,
            "node id used with a tree that did not issue it"
        );
        &self.storage.nodes[id.index as usize]
    }

    /// Get the NodeIds of a particular argument list
    #[inline]
    pub fn args(&self, list: &ArgList) -> &[NodeId] {
        let start = list.start as usize;
        &self.storage.arg_lists[start..start + list.len as usize]
    }

    #[inline]
    pub fn text(&self, span: Span) -> &'input str {
        &self.source[span.start..span.end]
    }

    #[inline]
    pub fn source(&self) -> &'input str {
        self.source
    }

    pub fn node_count(&self) -> usize {
        self.storage.nodes.len()
    }

    /// Releases the tree. Equivalent to dropping it; spelled out where the
    ///  hand-back is the point.
    pub fn release(self) {}
}

impl Drop for ParseTree<'_> {
    fn drop(&mut self) {
        let mut storage = std::mem::take(&mut self.storage);
        if storage.nodes.capacity() > MAX_RETAINED_NODES {
            return;
        }
        storage.clear();
        // A full free list means enough trees are idle already
        if self.recycle.try_send(storage).is_err() {
            tracing::trace!("pool full, dropping released tree");
        }
    }
}

impl std::fmt::Debug for ParseTree<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParseTree")
            .field("source", &self.source)
            .field("nodes", &self.storage.nodes)
            .field("generation", &self.generation)
            .finish()
    }
}
