//! Extension points whose policies are not defined yet.
use crate::error::{QuantError, Result};
use crate::graph::Graph;

/// Propagate inferred quantization parameters along the graph.
pub fn propagate_quant_info(_graph: &mut Graph) -> Result<()> {
    Err(QuantError::NotImplemented("propagate_quant_info"))
}

/// Validate the structure of a quantized graph.
pub fn quant_linting(_graph: &mut Graph) -> Result<()> {
    Err(QuantError::NotImplemented("quant_linting"))
}

/// Collapse explicit quant/dequant pairs into quantized operator parameters.
pub fn fold_quant_nodes_into_inputs_outputs(_graph: &mut Graph) -> Result<()> {
    Err(QuantError::NotImplemented("fold_quant_nodes_into_inputs_outputs"))
}
