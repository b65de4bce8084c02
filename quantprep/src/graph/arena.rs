use std::collections::HashMap;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use super::types::{
    AttrValue, BlockData, BlockId, InsertPoint, NodeData, NodeId, OpAttrs, Producer, Scope, Use,
    User, ValueData, ValueId, ValueType, CONSTANT_KIND, CONSTANT_VALUE_ATTR,
};

/// Dataflow graph: one top-level block plus every node, value and nested
/// block reachable from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Graph {
    nodes: Vec<NodeData>,
    values: Vec<ValueData>,
    blocks: Vec<BlockData>,
    top: BlockId,
    names: HashMap<String, ValueId>,
    entry_scope: Scope,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    /// Create a graph with an empty top-level block.
    ///
    /// # Example
    /// ```
    /// # use quantprep::{Graph, InsertPoint, Scope, ValueType};
    /// # fn main() -> anyhow::Result<()> {
    /// let mut g = Graph::new();
    /// let x = g.add_input("x", ValueType::Tensor);
    /// let relu = g.create_node("aten::relu", Scope::root());
    /// g.add_input_to_node(relu, x)?;
    /// let y = g.add_output(relu, "y", ValueType::Tensor)?;
    /// g.insert(relu, InsertPoint::End(g.top_block()))?;
    /// g.register_output(y)?;
    /// # Ok(()) }
    /// ```
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            values: Vec::new(),
            blocks: vec![BlockData::default()],
            top: BlockId(0),
            names: HashMap::new(),
            entry_scope: Scope::root(),
        }
    }

    pub fn top_block(&self) -> BlockId {
        self.top
    }

    /// Graph inputs, i.e. the top-level block inputs.
    pub fn inputs(&self) -> &[ValueId] {
        &self.blocks[self.top.0].inputs
    }

    pub fn outputs(&self) -> &[ValueId] {
        &self.blocks[self.top.0].outputs
    }

    /// Scope given to nodes inserted on behalf of graph inputs.
    pub fn entry_scope(&self) -> &Scope {
        &self.entry_scope
    }

    pub fn set_entry_scope(&mut self, scope: Scope) {
        self.entry_scope = scope;
    }

    pub fn node(&self, id: NodeId) -> Result<&NodeData> {
        self.nodes
            .get(id.0)
            .ok_or_else(|| anyhow!("unknown node {}", id))
    }

    pub fn value(&self, id: ValueId) -> Result<&ValueData> {
        self.values
            .get(id.0)
            .ok_or_else(|| anyhow!("unknown value {}", id))
    }

    pub fn block(&self, id: BlockId) -> Result<&BlockData> {
        self.blocks
            .get(id.0)
            .ok_or_else(|| anyhow!("unknown block {}", id))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn value_count(&self) -> usize {
        self.values.len()
    }

    /// All node ids ever created, attached or not.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId)
    }

    pub fn value_ids(&self) -> impl Iterator<Item = ValueId> {
        (0..self.values.len()).map(ValueId)
    }

    pub(crate) fn block_ids(&self) -> impl Iterator<Item = BlockId> {
        (0..self.blocks.len()).map(BlockId)
    }

    /// Look a value up by its unique name.
    pub fn find_value(&self, name: &str) -> Option<ValueId> {
        self.names.get(name).copied()
    }

    /// Producing node of a value, `None` for block inputs.
    pub fn producer_node(&self, value: ValueId) -> Result<Option<NodeId>> {
        Ok(self.value(value)?.producer_node())
    }

    /// Add a graph input.
    pub fn add_input(&mut self, name: &str, ty: ValueType) -> ValueId {
        let top = self.top;
        self.push_block_input(top, name, ty)
    }

    pub fn add_block_input(&mut self, block: BlockId, name: &str, ty: ValueType) -> Result<ValueId> {
        self.block(block)?;
        Ok(self.push_block_input(block, name, ty))
    }

    fn push_block_input(&mut self, block: BlockId, name: &str, ty: ValueType) -> ValueId {
        let offset = self.blocks[block.0].inputs.len();
        let value = self.new_value(name, ty, Producer::Block { block, offset });
        self.blocks[block.0].inputs.push(value);
        value
    }

    /// Mark a value as a graph output.
    pub fn register_output(&mut self, value: ValueId) -> Result<usize> {
        let top = self.top;
        self.register_block_output(top, value)
    }

    pub fn register_block_output(&mut self, block: BlockId, value: ValueId) -> Result<usize> {
        self.block(block)?;
        self.value(value)?;
        let offset = self.blocks[block.0].outputs.len();
        self.blocks[block.0].outputs.push(value);
        self.values[value.0].uses.push(Use::block_output(block, offset));
        Ok(offset)
    }

    /// Create a detached node. It has to be placed with [`Graph::insert`].
    pub fn create_node(&mut self, kind: impl Into<String>, scope: Scope) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            kind: kind.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            blocks: Vec::new(),
            attrs: OpAttrs::none(),
            scope,
            owner: None,
        });
        id
    }

    pub fn set_attr(&mut self, node: NodeId, name: &str, value: AttrValue) -> Result<()> {
        self.node(node)?;
        self.nodes[node.0].attrs.set(name, value);
        Ok(())
    }

    pub(crate) fn set_attrs(&mut self, node: NodeId, attrs: OpAttrs) -> Result<()> {
        self.node(node)?;
        self.nodes[node.0].attrs = attrs;
        Ok(())
    }

    /// Append `value` to the node's inputs and record the use.
    pub fn add_input_to_node(&mut self, node: NodeId, value: ValueId) -> Result<usize> {
        self.node(node)?;
        self.value(value)?;
        let offset = self.nodes[node.0].inputs.len();
        self.nodes[node.0].inputs.push(value);
        self.values[value.0].uses.push(Use::node(node, offset));
        Ok(offset)
    }

    /// Append a fresh output value to the node.
    pub fn add_output(&mut self, node: NodeId, name: &str, ty: ValueType) -> Result<ValueId> {
        self.node(node)?;
        let offset = self.nodes[node.0].outputs.len();
        let value = self.new_value(name, ty, Producer::Node { node, offset });
        self.nodes[node.0].outputs.push(value);
        Ok(value)
    }

    /// Attach a new empty sub-block to the node.
    pub fn add_block_to_node(&mut self, node: NodeId) -> Result<BlockId> {
        self.node(node)?;
        let block = BlockId(self.blocks.len());
        self.blocks.push(BlockData {
            owner: Some(node),
            ..BlockData::default()
        });
        self.nodes[node.0].blocks.push(block);
        Ok(block)
    }

    /// Place a detached node at `point`.
    pub fn insert(&mut self, node: NodeId, point: InsertPoint) -> Result<()> {
        if let Some(owner) = self.node(node)?.owner {
            return Err(anyhow!("node {} is already in block {}", node, owner));
        }
        let (block, position) = match point {
            InsertPoint::Before(anchor) => {
                let (block, index) = self.position_of(anchor)?;
                (block, index)
            }
            InsertPoint::After(anchor) => {
                let (block, index) = self.position_of(anchor)?;
                (block, index + 1)
            }
            InsertPoint::End(block) => (block, self.block(block)?.nodes.len()),
        };
        self.blocks[block.0].nodes.insert(position, node);
        self.nodes[node.0].owner = Some(block);
        Ok(())
    }

    pub fn insert_before(&mut self, node: NodeId, anchor: NodeId) -> Result<()> {
        self.insert(node, InsertPoint::Before(anchor))
    }

    pub fn insert_after(&mut self, node: NodeId, anchor: NodeId) -> Result<()> {
        self.insert(node, InsertPoint::After(anchor))
    }

    pub fn append_node(&mut self, block: BlockId, node: NodeId) -> Result<()> {
        self.insert(node, InsertPoint::End(block))
    }

    fn position_of(&self, anchor: NodeId) -> Result<(BlockId, usize)> {
        let block = self
            .node(anchor)?
            .owner
            .ok_or_else(|| anyhow!("anchor node {} is not in a block", anchor))?;
        let index = self.blocks[block.0]
            .nodes
            .iter()
            .position(|&n| n == anchor)
            .ok_or_else(|| anyhow!("anchor node {} missing from block {}", anchor, block))?;
        Ok((block, index))
    }

    /// Create a constant node at `point` and return its output.
    pub fn insert_constant(
        &mut self,
        value: AttrValue,
        scope: Scope,
        point: InsertPoint,
    ) -> Result<ValueId> {
        let ty = value.value_type();
        let node = self.create_node(CONSTANT_KIND, scope);
        self.nodes[node.0].attrs.set(CONSTANT_VALUE_ATTR, value);
        let output = self.add_output(node, "", ty)?;
        self.insert(node, point)?;
        Ok(output)
    }

    /// Redirect every use of `old` (node inputs and block outputs) to `new`.
    pub fn replace_all_uses_with(&mut self, old: ValueId, new: ValueId) -> Result<()> {
        self.value(old)?;
        self.value(new)?;
        if old == new {
            return Ok(());
        }
        let uses = std::mem::take(&mut self.values[old.0].uses);
        for item in &uses {
            match item.user {
                User::Node(node) => self.nodes[node.0].inputs[item.offset] = new,
                User::BlockOutput(block) => self.blocks[block.0].outputs[item.offset] = new,
            }
        }
        self.values[new.0].uses.extend(uses);
        Ok(())
    }

    /// Redirect input `offset` of `node` to `new`, leaving other uses of the
    /// previous value untouched.
    pub fn replace_input(&mut self, node: NodeId, offset: usize, new: ValueId) -> Result<ValueId> {
        self.value(new)?;
        let old = *self
            .node(node)?
            .inputs
            .get(offset)
            .ok_or_else(|| anyhow!("node {} has no input {}", node, offset))?;
        if old == new {
            return Ok(old);
        }
        let target = Use::node(node, offset);
        self.values[old.0].uses.retain(|item| *item != target);
        self.nodes[node.0].inputs[offset] = new;
        self.values[new.0].uses.push(target);
        Ok(old)
    }

    pub fn set_value_name(&mut self, value: ValueId, name: &str) -> Result<()> {
        self.value(value)?;
        let previous = std::mem::take(&mut self.values[value.0].name);
        if self.names.get(&previous) == Some(&value) {
            self.names.remove(&previous);
        }
        let name = self.unique_name(name);
        if !name.is_empty() {
            self.names.insert(name.clone(), value);
        }
        self.values[value.0].name = name;
        Ok(())
    }

    fn new_value(&mut self, name: &str, ty: ValueType, producer: Producer) -> ValueId {
        let id = ValueId(self.values.len());
        let name = self.unique_name(name);
        if !name.is_empty() {
            self.names.insert(name.clone(), id);
        }
        self.values.push(ValueData {
            name,
            ty,
            producer,
            uses: Vec::new(),
        });
        id
    }

    /// `base`, or `base.N` with the smallest free N when `base` is taken.
    fn unique_name(&self, base: &str) -> String {
        if base.is_empty() || !self.names.contains_key(base) {
            return base.to_string();
        }
        let mut suffix = 1usize;
        loop {
            let candidate = format!("{}.{}", base, suffix);
            if !self.names.contains_key(&candidate) {
                return candidate;
            }
            suffix += 1;
        }
    }
}
