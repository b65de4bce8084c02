//! Graph passes that prepare a dataflow IR for quantized execution.
//!
//! - [`insert_observer_nodes`] instruments values with calibration observers.
//! - [`insert_quant_dequant_nodes`] brackets quantizable operators with
//!   quant-dequant pairs.
//!
//! Which operators count as quantizable is decided by [`OpRegistry`]; the
//! built-in allow-list lives in `quantizable_ops.json`.
pub mod logging;

mod error;
mod graph;
mod passes;
mod registry;
mod settings;

pub use error::{QuantError, Result};
pub use graph::{
    describe_node, AttrValue, BlockData, BlockId, BlockWalker, Function, Graph, GraphDeserialize,
    GraphSerialize, InsertPoint, Module, NodeData, NodeId, NodeTemplate, NodeWalker, OpAttr,
    OpAttrs, Producer, Scope, Use, User, ValueData, ValueId, ValueRemap, ValueType, CONSTANT_KIND,
    CONSTANT_VALUE_ATTR,
};
pub use passes::{
    apply_quant_dequant, fold_quant_nodes_into_inputs_outputs, insert_observer_nodes,
    insert_observer_nodes_for_function, insert_observer_nodes_for_method,
    insert_observer_nodes_with, insert_quant_dequant_nodes, insert_quant_dequant_nodes_with,
    plan_observed_values, plan_quant_dequant, propagate_quant_info, quant_linting, EdgeInsertion,
    InsertionReport, QuantDequantPair, QuantDequantPlan,
};
pub use registry::{
    is_quantizable, parse_schema, quantizable_ops, OpRegistry, OpSchema, SchemaArg, SignatureKey,
};
pub use settings::QuantSettings;
