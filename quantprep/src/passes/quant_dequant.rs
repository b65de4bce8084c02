//! Quant-dequant insertion.
//!
//! Planning walks the graph read-only and produces a [`QuantDequantPlan`];
//! applying it is the only step that mutates the graph. Two buckets are
//! planned:
//!
//! - output insertions: values produced by a quantizable node. One pair is
//!   placed right after the producer and serves every consumer.
//! - edge insertions: a value from a non-quantizable origin read by a
//!   quantizable node. The pair is placed right before that consumer and only
//!   that input slot is rewired, since other consumers of the value may not
//!   be quantized at all.
use std::collections::HashSet;

use crate::error::{QuantError, Result};
use crate::graph::{AttrValue, Graph, InsertPoint, NodeId, Scope, ValueId};
use crate::registry::{quantizable_ops, OpRegistry};
use crate::settings::QuantSettings;

/// A (value, consumer input slot) pair that gets its own quant-dequant pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EdgeInsertion {
    pub value: ValueId,
    pub consumer: NodeId,
    pub offset: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuantDequantPlan {
    pub outputs: Vec<ValueId>,
    pub edges: Vec<EdgeInsertion>,
}

impl QuantDequantPlan {
    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty() && self.edges.is_empty()
    }
}

/// Nodes created for one instrumented value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuantDequantPair {
    pub value: ValueId,
    pub quant: NodeId,
    pub dequant: NodeId,
    /// `None` when every use of `value` was rewired.
    pub consumer: Option<NodeId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsertionReport {
    pub pairs: Vec<QuantDequantPair>,
}

impl InsertionReport {
    pub fn output_pairs(&self) -> usize {
        self.pairs.iter().filter(|p| p.consumer.is_none()).count()
    }

    pub fn edge_pairs(&self) -> usize {
        self.pairs.iter().filter(|p| p.consumer.is_some()).count()
    }
}

/// Bracket quantizable computations with quant-dequant pairs using the
/// built-in allow-list and default settings.
pub fn insert_quant_dequant_nodes(graph: &mut Graph) -> Result<InsertionReport> {
    insert_quant_dequant_nodes_with(graph, quantizable_ops(), &QuantSettings::default())
}

pub fn insert_quant_dequant_nodes_with(
    graph: &mut Graph,
    registry: &OpRegistry,
    settings: &QuantSettings,
) -> Result<InsertionReport> {
    let plan = plan_quant_dequant(graph, registry)?;
    let report = apply_quant_dequant(graph, &plan, settings)?;
    crate::trace!(
        "inserted {} quant-dequant pairs ({} output, {} edge)",
        report.pairs.len(),
        report.output_pairs(),
        report.edge_pairs()
    );
    Ok(report)
}

fn producer_is_quantizable(graph: &Graph, registry: &OpRegistry, value: ValueId) -> Result<bool> {
    match graph.producer_node(value)? {
        Some(node) => Ok(registry.is_quantizable(graph.node(node)?)),
        None => Ok(false),
    }
}

/// Decide every insertion without touching the graph.
pub fn plan_quant_dequant(graph: &Graph, registry: &OpRegistry) -> Result<QuantDequantPlan> {
    let mut plan = QuantDequantPlan::default();
    let mut seen: HashSet<ValueId> = HashSet::new();

    for block in graph.walk_blocks() {
        let data = graph.block(block)?;
        for &node in data.nodes() {
            let consumer = graph.node(node)?;
            for (offset, &value) in consumer.inputs().iter().enumerate() {
                if !graph.value(value)?.ty().is_tensor() {
                    continue;
                }
                if producer_is_quantizable(graph, registry, value)? {
                    if seen.insert(value) {
                        plan.outputs.push(value);
                    }
                } else if registry.is_quantizable(consumer) {
                    plan.edges.push(EdgeInsertion {
                        value,
                        consumer: node,
                        offset,
                    });
                }
            }
        }

        // Block outputs are uses too, but they are not node inputs.
        for &value in data.outputs() {
            if graph.value(value)?.ty().is_tensor()
                && producer_is_quantizable(graph, registry, value)?
                && seen.insert(value)
            {
                plan.outputs.push(value);
            }
        }
    }
    Ok(plan)
}

/// Apply a plan produced by [`plan_quant_dequant`] on the same graph.
pub fn apply_quant_dequant(
    graph: &mut Graph,
    plan: &QuantDequantPlan,
    settings: &QuantSettings,
) -> Result<InsertionReport> {
    let mut report = InsertionReport::default();
    for &value in &plan.outputs {
        report.pairs.push(insert_for_output(graph, value, settings)?);
    }
    for edge in &plan.edges {
        report.pairs.push(insert_for_edge(graph, edge, settings)?);
    }
    Ok(report)
}

fn insert_for_output(
    graph: &mut Graph,
    value: ValueId,
    settings: &QuantSettings,
) -> Result<QuantDequantPair> {
    let producer = graph.producer_node(value)?.ok_or_else(|| {
        QuantError::precondition(format!("value {} has no producing node", value))
    })?;
    let scope = graph.node(producer)?.scope().clone();
    let (quant, dequant) = create_quant_dequant(graph, value, scope.clone(), settings)?;
    graph.insert_after(quant, producer)?;
    graph.insert_after(dequant, quant)?;

    // Rewire before the quant node reads `value`, so the quant input is not
    // redirected along with everything else.
    let dequantized = graph.node(dequant)?.outputs()[0];
    graph.replace_all_uses_with(value, dequantized)?;

    attach_inputs(
        graph,
        quant,
        dequant,
        value,
        InsertPoint::Before(producer),
        scope,
        settings,
    )?;
    Ok(QuantDequantPair {
        value,
        quant,
        dequant,
        consumer: None,
    })
}

fn insert_for_edge(
    graph: &mut Graph,
    edge: &EdgeInsertion,
    settings: &QuantSettings,
) -> Result<QuantDequantPair> {
    let current = graph.node(edge.consumer)?.inputs().get(edge.offset).copied();
    if current != Some(edge.value) {
        return Err(QuantError::precondition(format!(
            "input {} of node {} no longer reads {}",
            edge.offset, edge.consumer, edge.value
        )));
    }
    let scope = graph.node(edge.consumer)?.scope().clone();
    let (quant, dequant) = create_quant_dequant(graph, edge.value, scope.clone(), settings)?;
    graph.insert_before(dequant, edge.consumer)?;
    graph.insert_before(quant, dequant)?;

    let dequantized = graph.node(dequant)?.outputs()[0];
    graph.replace_input(edge.consumer, edge.offset, dequantized)?;

    attach_inputs(
        graph,
        quant,
        dequant,
        edge.value,
        InsertPoint::Before(quant),
        scope,
        settings,
    )?;
    Ok(QuantDequantPair {
        value: edge.value,
        quant,
        dequant,
        consumer: Some(edge.consumer),
    })
}

/// Detached quant and dequant nodes with their named tensor outputs.
fn create_quant_dequant(
    graph: &mut Graph,
    value: ValueId,
    scope: Scope,
    settings: &QuantSettings,
) -> Result<(NodeId, NodeId)> {
    let name = graph.value(value)?.name().to_string();
    let ty = graph.value(value)?.ty();

    let quant = graph.create_node(settings.quant_op.clone(), scope.clone());
    graph.add_output(quant, &format!("{}{}", name, settings.quant_suffix), ty)?;

    let dequant = graph.create_node(settings.dequant_op.clone(), scope);
    graph.add_output(dequant, &format!("{}{}", name, settings.dequant_suffix), ty)?;
    Ok((quant, dequant))
}

/// `quant(value, scale, zero_point)` then `dequant(quant)`. The parameter
/// constants are placed at `params_at`, which must precede the quant node.
fn attach_inputs(
    graph: &mut Graph,
    quant: NodeId,
    dequant: NodeId,
    value: ValueId,
    params_at: InsertPoint,
    scope: Scope,
    settings: &QuantSettings,
) -> Result<()> {
    graph.add_input_to_node(quant, value)?;
    let scale = graph.insert_constant(
        AttrValue::Float(settings.default_scale),
        scope.clone(),
        params_at,
    )?;
    let zero_point = graph.insert_constant(
        AttrValue::Int(settings.default_zero_point),
        scope,
        params_at,
    )?;
    graph.add_input_to_node(quant, scale)?;
    graph.add_input_to_node(quant, zero_point)?;

    let quantized = graph.node(quant)?.outputs()[0];
    graph.add_input_to_node(dequant, quantized)?;
    Ok(())
}
