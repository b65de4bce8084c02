mod observers;
mod quant_dequant;
mod stubs;

pub use observers::{
    insert_observer_nodes, insert_observer_nodes_for_function, insert_observer_nodes_for_method,
    insert_observer_nodes_with, plan_observed_values,
};
pub use quant_dequant::{
    apply_quant_dequant, insert_quant_dequant_nodes, insert_quant_dequant_nodes_with,
    plan_quant_dequant, EdgeInsertion, InsertionReport, QuantDequantPair, QuantDequantPlan,
};
pub use stubs::{fold_quant_nodes_into_inputs_outputs, propagate_quant_info, quant_linting};
