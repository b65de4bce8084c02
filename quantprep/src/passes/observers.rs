//! Observer insertion for calibration.
//!
//! Activation inputs and the tensor outputs of every non-constant node get a
//! clone of a caller supplied observer node. The clone reads the value and a
//! constant holding the value's name, and produces an unused
//! `<name>.observed` output. Consumers of the observed value are never
//! rewired.
use std::collections::HashSet;

use crate::error::{QuantError, Result};
use crate::graph::{
    AttrValue, Function, Graph, InsertPoint, Module, NodeId, NodeTemplate, NodeWalker, Scope,
    ValueId, ValueRemap,
};
use crate::settings::QuantSettings;

/// Insert observers for the first `num_activation_inputs` graph inputs and
/// for every output of every non-constant node. Returns the inserted
/// observer nodes in insertion order.
pub fn insert_observer_nodes(
    graph: &mut Graph,
    observer: &NodeTemplate,
    num_activation_inputs: usize,
) -> Result<Vec<NodeId>> {
    insert_observer_nodes_with(graph, observer, num_activation_inputs, &QuantSettings::default())
}

pub fn insert_observer_nodes_with(
    graph: &mut Graph,
    observer: &NodeTemplate,
    num_activation_inputs: usize,
    settings: &QuantSettings,
) -> Result<Vec<NodeId>> {
    if observer.kind().is_empty() {
        return Err(QuantError::precondition("observer template has no operator kind"));
    }
    // Clones use the identity remap, so template inputs must already exist.
    for &input in observer.inputs() {
        if graph.value(input).is_err() {
            return Err(QuantError::precondition(format!(
                "observer template input {} is not a value of this graph",
                input
            )));
        }
    }
    if num_activation_inputs > graph.inputs().len() {
        return Err(QuantError::precondition(format!(
            "{} activation inputs requested but the graph has {} inputs",
            num_activation_inputs,
            graph.inputs().len()
        )));
    }

    let mut inserted = Vec::new();
    // Observers of graph inputs are in the graph before the walk and must not
    // be observed themselves.
    let mut input_observers: HashSet<NodeId> = HashSet::new();

    let top = graph.top_block();
    let entry = match graph.block(top)?.nodes().first() {
        Some(&first) => InsertPoint::Before(first),
        None => InsertPoint::End(top),
    };
    let activations = graph.inputs()[..num_activation_inputs].to_vec();
    for value in activations {
        if !graph.value(value)?.ty().is_tensor() {
            crate::warning!(
                "skipping observer for non-tensor input {}",
                graph.value(value)?.name()
            );
            continue;
        }
        let scope = graph.entry_scope().clone();
        let node = create_observer(graph, observer, value, entry, scope, settings)?;
        graph.insert(node, entry)?;
        input_observers.insert(node);
        inserted.push(node);
    }

    let candidates = plan_observed_values(graph, &input_observers)?;
    for value in candidates {
        if !graph.value(value)?.ty().is_tensor() {
            continue;
        }
        let producer = graph.producer_node(value)?.ok_or_else(|| {
            QuantError::precondition(format!("observed value {} has no producing node", value))
        })?;
        let scope = graph.node(producer)?.scope().clone();
        let node = create_observer(
            graph,
            observer,
            value,
            InsertPoint::Before(producer),
            scope,
            settings,
        )?;
        graph.insert_after(node, producer)?;
        inserted.push(node);
    }

    crate::trace!(
        "inserted {} observers ({} for graph inputs)",
        inserted.len(),
        input_observers.len()
    );
    Ok(inserted)
}

/// Outputs of every node that needs observing, in walk order. Constants and
/// the nodes in `skip` are excluded, and their sub-blocks are not entered.
pub fn plan_observed_values(graph: &Graph, skip: &HashSet<NodeId>) -> Result<Vec<ValueId>> {
    let excluded = |graph: &Graph, node: NodeId| {
        skip.contains(&node) || graph.node(node).map(|n| n.is_constant()).unwrap_or(true)
    };
    let mut values = Vec::new();
    for (_, node) in NodeWalker::with_pruning(graph, graph.top_block(), excluded) {
        if excluded(graph, node) {
            continue;
        }
        values.extend_from_slice(graph.node(node)?.outputs());
    }
    Ok(values)
}

/// Build a detached observer clone for `value`. The name constant is placed
/// at `name_point` so it precedes the observer wherever the observer lands.
fn create_observer(
    graph: &mut Graph,
    observer: &NodeTemplate,
    value: ValueId,
    name_point: InsertPoint,
    scope: Scope,
    settings: &QuantSettings,
) -> Result<NodeId> {
    let (name, ty) = {
        let data = graph.value(value)?;
        (data.name().to_string(), data.ty())
    };
    let name_const =
        graph.insert_constant(AttrValue::Str(name.clone()), scope.clone(), name_point)?;
    let node = graph.create_clone(observer, &ValueRemap::Identity, scope)?;
    graph.add_output(node, &format!("{}{}", name, settings.observed_suffix), ty)?;
    graph.add_input_to_node(node, value)?;
    graph.add_input_to_node(node, name_const)?;
    Ok(node)
}

/// Resolve `method_name` on `module` and observe its graph.
pub fn insert_observer_nodes_for_method(
    module: &mut Module,
    method_name: &str,
    observer: &NodeTemplate,
) -> Result<Vec<NodeId>> {
    let module_name = module.name().to_string();
    let method = module.method_mut(method_name).ok_or_else(|| {
        QuantError::precondition(format!(
            "module {} has no method {}",
            module_name, method_name
        ))
    })?;
    insert_observer_nodes_for_function(method, observer)
}

pub fn insert_observer_nodes_for_function(
    function: &mut Function,
    observer: &NodeTemplate,
) -> Result<Vec<NodeId>> {
    let num_inputs = function.num_inputs();
    insert_observer_nodes(function.graph_mut(), observer, num_inputs)
}
