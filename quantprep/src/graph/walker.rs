//! Block-tree traversal.
//!
//! Both walkers keep an explicit stack of blocks instead of recursing, so
//! nesting depth never grows the call stack. Blocks are visited in stack
//! order; nodes of one block in execution order.
use super::arena::Graph;
use super::types::{BlockId, NodeId};

type Prune<'g> = Box<dyn Fn(&Graph, NodeId) -> bool + 'g>;

/// Yields every block reachable from a root exactly once.
pub struct BlockWalker<'g> {
    graph: &'g Graph,
    stack: Vec<BlockId>,
    prune: Option<Prune<'g>>,
}

impl<'g> BlockWalker<'g> {
    pub fn new(graph: &'g Graph, root: BlockId) -> Self {
        Self {
            graph,
            stack: vec![root],
            prune: None,
        }
    }

    /// Do not descend into sub-blocks of nodes matching `prune`.
    pub fn with_pruning<F>(graph: &'g Graph, root: BlockId, prune: F) -> Self
    where
        F: Fn(&Graph, NodeId) -> bool + 'g,
    {
        Self {
            graph,
            stack: vec![root],
            prune: Some(Box::new(prune)),
        }
    }

    fn pruned(&self, node: NodeId) -> bool {
        self.prune
            .as_ref()
            .map(|prune| prune(self.graph, node))
            .unwrap_or(false)
    }
}

impl Iterator for BlockWalker<'_> {
    type Item = BlockId;

    fn next(&mut self) -> Option<BlockId> {
        let block = self.stack.pop()?;
        if let Ok(data) = self.graph.block(block) {
            for &node in data.nodes() {
                if self.pruned(node) {
                    continue;
                }
                if let Ok(node) = self.graph.node(node) {
                    self.stack.extend(node.blocks().iter().copied());
                }
            }
        }
        Some(block)
    }
}

/// Yields `(owning block, node)` for every node reachable from a root.
pub struct NodeWalker<'g> {
    graph: &'g Graph,
    blocks: BlockWalker<'g>,
    current: Option<(BlockId, usize)>,
}

impl<'g> NodeWalker<'g> {
    pub fn new(graph: &'g Graph, root: BlockId) -> Self {
        Self {
            graph,
            blocks: BlockWalker::new(graph, root),
            current: None,
        }
    }

    pub fn with_pruning<F>(graph: &'g Graph, root: BlockId, prune: F) -> Self
    where
        F: Fn(&Graph, NodeId) -> bool + 'g,
    {
        Self {
            graph,
            blocks: BlockWalker::with_pruning(graph, root, prune),
            current: None,
        }
    }
}

impl Iterator for NodeWalker<'_> {
    type Item = (BlockId, NodeId);

    fn next(&mut self) -> Option<(BlockId, NodeId)> {
        loop {
            if let Some((block, index)) = self.current {
                let node = self
                    .graph
                    .block(block)
                    .ok()
                    .and_then(|data| data.nodes().get(index).copied());
                if let Some(node) = node {
                    self.current = Some((block, index + 1));
                    return Some((block, node));
                }
            }
            let block = self.blocks.next()?;
            self.current = Some((block, 0));
        }
    }
}

impl Graph {
    /// Every node in the graph, nested blocks included.
    pub fn walk_nodes(&self) -> NodeWalker<'_> {
        NodeWalker::new(self, self.top_block())
    }

    pub fn walk_blocks(&self) -> BlockWalker<'_> {
        BlockWalker::new(self, self.top_block())
    }
}
