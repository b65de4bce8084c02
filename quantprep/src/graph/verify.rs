use std::collections::HashSet;

use anyhow::{anyhow, Result};

use super::arena::Graph;
use super::types::{BlockId, NodeId, Producer, Use, User};

impl Graph {
    /// Check that producers, use-lists, node inputs, block outputs and block
    /// membership all agree.
    pub fn verify_uses(&self) -> Result<()> {
        // Walking assumes a tree; check that first.
        self.verify_block_tree()?;

        for node in self.node_ids() {
            let data = self.node(node)?;
            for (offset, &value) in data.inputs().iter().enumerate() {
                let uses = self.value(value)?.uses();
                if !uses.contains(&Use::node(node, offset)) {
                    return Err(anyhow!(
                        "input {} of node {} reads {} without a recorded use",
                        offset,
                        node,
                        value
                    ));
                }
            }
            for (offset, &value) in data.outputs().iter().enumerate() {
                if self.value(value)?.producer() != (Producer::Node { node, offset }) {
                    return Err(anyhow!("output {} of node {} has a foreign producer", offset, node));
                }
            }
            if let Some(owner) = data.owner() {
                if !self.block(owner)?.nodes().contains(&node) {
                    return Err(anyhow!("node {} missing from owning block {}", node, owner));
                }
            }
        }

        for block in self.walk_blocks() {
            let data = self.block(block)?;
            for (offset, &value) in data.outputs().iter().enumerate() {
                if !self.value(value)?.uses().contains(&Use::block_output(block, offset)) {
                    return Err(anyhow!(
                        "output {} of block {} reads {} without a recorded use",
                        offset,
                        block,
                        value
                    ));
                }
            }
            for (offset, &value) in data.inputs().iter().enumerate() {
                if self.value(value)?.producer() != (Producer::Block { block, offset }) {
                    return Err(anyhow!("input {} of block {} has a foreign producer", offset, block));
                }
            }
        }

        for value in self.value_ids() {
            for item in self.value(value)?.uses() {
                let referenced = match item.user {
                    User::Node(node) => self.node(node)?.inputs().get(item.offset).copied(),
                    User::BlockOutput(block) => {
                        self.block(block)?.outputs().get(item.offset).copied()
                    }
                };
                if referenced != Some(value) {
                    return Err(anyhow!("stale use {:?} recorded on {}", item, value));
                }
            }
        }
        Ok(())
    }

    /// Every block has at most one owning node and every node at most one
    /// owning block, both recorded on both sides. The top block has no owner.
    fn verify_block_tree(&self) -> Result<()> {
        let top = self.top_block();
        if self.block(top)?.owner().is_some() {
            return Err(anyhow!("top block {} is owned by a node", top));
        }

        let mut parented: HashSet<BlockId> = HashSet::new();
        for node in self.node_ids() {
            for &block in self.node(node)?.blocks() {
                if self.block(block)?.owner() != Some(node) {
                    return Err(anyhow!("block {} listed by node {} has another owner", block, node));
                }
                if !parented.insert(block) {
                    return Err(anyhow!("block {} is listed by more than one node", block));
                }
            }
        }

        let mut placed: HashSet<NodeId> = HashSet::new();
        for block in self.block_ids() {
            let data = self.block(block)?;
            if let Some(owner) = data.owner() {
                if !self.node(owner)?.blocks().contains(&block) {
                    return Err(anyhow!("block {} is missing from owner node {}", block, owner));
                }
            }
            for &node in data.nodes() {
                if self.node(node)?.owner() != Some(block) {
                    return Err(anyhow!("node {} listed in block {} has another owner", node, block));
                }
                if !placed.insert(node) {
                    return Err(anyhow!("node {} appears more than once in blocks", node));
                }
            }
        }
        Ok(())
    }
}
