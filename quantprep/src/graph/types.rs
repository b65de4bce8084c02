//! Core graph data types.
//!
//! A graph is an arena of nodes, values and blocks addressed by copyable ids.
//! Values keep an explicit use-list that is only changed by the rewiring
//! operations on [`Graph`](super::Graph).
use std::fmt;

use serde::{Deserialize, Serialize};

/// Operator kind of constant nodes.
pub const CONSTANT_KIND: &str = "prim::Constant";

/// Attribute name holding a constant node's payload.
pub const CONSTANT_VALUE_ATTR: &str = "value";

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub(crate) usize);

        impl $name {
            /// Arena index of this id.
            pub fn index(self) -> usize {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

define_id!(
    /// Handle to a node in a [`Graph`](super::Graph).
    NodeId,
    "n"
);
define_id!(
    /// Handle to a value in a [`Graph`](super::Graph).
    ValueId,
    "v"
);
define_id!(
    /// Handle to a block in a [`Graph`](super::Graph).
    BlockId,
    "b"
);

/// Static type of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Tensor,
    Int,
    Float,
    Bool,
    Str,
    IntList,
    None,
}

impl ValueType {
    /// Only tensor values are candidates for instrumentation.
    pub fn is_tensor(self) -> bool {
        matches!(self, ValueType::Tensor)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ValueType::Tensor => "Tensor",
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::Bool => "bool",
            ValueType::Str => "str",
            ValueType::IntList => "int[]",
            ValueType::None => "None",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Attribute value carried by a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttrValue {
    Float(f64),
    Int(i64),
    Bool(bool),
    Str(String),
    IntList(Vec<i64>),
}

impl AttrValue {
    /// Type of the value a constant holding this attribute produces.
    pub fn value_type(&self) -> ValueType {
        match self {
            AttrValue::Float(_) => ValueType::Float,
            AttrValue::Int(_) => ValueType::Int,
            AttrValue::Bool(_) => ValueType::Bool,
            AttrValue::Str(_) => ValueType::Str,
            AttrValue::IntList(_) => ValueType::IntList,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Float(value) => write!(f, "{:?}", value),
            AttrValue::Int(value) => write!(f, "{}", value),
            AttrValue::Bool(value) => write!(f, "{}", value),
            AttrValue::Str(value) => write!(f, "\"{}\"", value),
            AttrValue::IntList(values) => {
                let rendered = values
                    .iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "[{}]", rendered)
            }
        }
    }
}

/// Named attribute on a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpAttr {
    pub name: String,
    pub value: AttrValue,
}

/// Collection of node attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpAttrs {
    pub items: Vec<OpAttr>,
}

impl OpAttrs {
    /// Build an empty attribute set.
    pub fn none() -> Self {
        Self { items: Vec::new() }
    }

    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.items
            .iter()
            .find(|item| item.name == name)
            .map(|item| &item.value)
    }

    /// Set an attribute, replacing an existing one with the same name.
    pub fn set(&mut self, name: impl Into<String>, value: AttrValue) {
        let name = name.into();
        match self.items.iter_mut().find(|item| item.name == name) {
            Some(item) => item.value = value,
            None => self.items.push(OpAttr { name, value }),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Provenance tag attached to nodes, e.g. `encoder/conv1`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope(String);

impl Scope {
    pub fn root() -> Self {
        Self(String::new())
    }

    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Child scope `self/name`.
    pub fn push(&self, name: &str) -> Self {
        if self.is_root() {
            Self(name.to_string())
        } else {
            Self(format!("{}/{}", self.0, name))
        }
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Producer {
    Node { node: NodeId, offset: usize },
    Block { block: BlockId, offset: usize },
}

/// Consumer side of a use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum User {
    Node(NodeId),
    BlockOutput(BlockId),
}

/// One reference to a value: input `offset` of a node, or output `offset` of
/// a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Use {
    pub user: User,
    pub offset: usize,
}

impl Use {
    pub fn node(node: NodeId, offset: usize) -> Self {
        Self {
            user: User::Node(node),
            offset,
        }
    }

    pub fn block_output(block: BlockId, offset: usize) -> Self {
        Self {
            user: User::BlockOutput(block),
            offset,
        }
    }
}

/// An operator invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeData {
    pub(crate) kind: String,
    pub(crate) inputs: Vec<ValueId>,
    pub(crate) outputs: Vec<ValueId>,
    pub(crate) blocks: Vec<BlockId>,
    pub(crate) attrs: OpAttrs,
    pub(crate) scope: Scope,
    pub(crate) owner: Option<BlockId>,
}

impl NodeData {
    /// Qualified operator name, e.g. `aten::relu`.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn inputs(&self) -> &[ValueId] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[ValueId] {
        &self.outputs
    }

    /// Nested blocks, e.g. the branches of a conditional.
    pub fn blocks(&self) -> &[BlockId] {
        &self.blocks
    }

    pub fn attrs(&self) -> &OpAttrs {
        &self.attrs
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Block the node is inserted in, `None` while detached.
    pub fn owner(&self) -> Option<BlockId> {
        self.owner
    }

    pub fn is_constant(&self) -> bool {
        self.kind == CONSTANT_KIND
    }
}

/// A single-producer, multi-consumer datum.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueData {
    pub(crate) name: String,
    pub(crate) ty: ValueType,
    pub(crate) producer: Producer,
    pub(crate) uses: Vec<Use>,
}

impl ValueData {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> ValueType {
        self.ty
    }

    pub fn producer(&self) -> Producer {
        self.producer
    }

    /// Producing node, `None` for block inputs.
    pub fn producer_node(&self) -> Option<NodeId> {
        match self.producer {
            Producer::Node { node, .. } => Some(node),
            Producer::Block { .. } => None,
        }
    }

    pub fn uses(&self) -> &[Use] {
        &self.uses
    }
}

/// An ordered region of nodes with declared inputs and outputs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlockData {
    pub(crate) nodes: Vec<NodeId>,
    pub(crate) inputs: Vec<ValueId>,
    pub(crate) outputs: Vec<ValueId>,
    pub(crate) owner: Option<NodeId>,
}

impl BlockData {
    /// Nodes in execution order.
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn inputs(&self) -> &[ValueId] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[ValueId] {
        &self.outputs
    }

    /// Node this block is nested in, `None` for the top-level block.
    pub fn owner(&self) -> Option<NodeId> {
        self.owner
    }
}

/// Position for inserting a detached node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPoint {
    Before(NodeId),
    After(NodeId),
    End(BlockId),
}
