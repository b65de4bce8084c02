mod arena;
mod clone;
mod function;
mod graph_serde;
mod node;
mod types;
mod verify;
mod walker;

pub use arena::Graph;
pub use clone::{NodeTemplate, ValueRemap};
pub use function::{Function, Module};
pub use graph_serde::{GraphDeserialize, GraphSerialize};
pub use node::describe_node;
pub use types::{
    AttrValue, BlockData, BlockId, InsertPoint, NodeData, NodeId, OpAttr, OpAttrs, Producer,
    Scope, Use, User, ValueData, ValueId, ValueType, CONSTANT_KIND, CONSTANT_VALUE_ATTR,
};
pub use walker::{BlockWalker, NodeWalker};
