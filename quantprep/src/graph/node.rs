use std::fmt;

use super::arena::Graph;
use super::types::{BlockId, NodeId, ValueId, CONSTANT_VALUE_ATTR};

fn value_ref(graph: &Graph, value: ValueId) -> String {
    match graph.value(value) {
        Ok(data) if !data.name().is_empty() => format!("%{}", data.name()),
        _ => format!("%{}", value.index()),
    }
}

fn value_list(graph: &Graph, values: &[ValueId]) -> String {
    values
        .iter()
        .map(|&v| value_ref(graph, v))
        .collect::<Vec<_>>()
        .join(", ")
}

/// One-line rendering of a node, e.g. `%y = aten::relu(%x)`.
pub fn describe_node(graph: &Graph, node: NodeId) -> String {
    let data = match graph.node(node) {
        Ok(data) => data,
        Err(_) => return format!("<unknown node {}>", node),
    };
    let outputs = data
        .outputs()
        .iter()
        .map(|&v| {
            let ty = graph.value(v).map(|d| d.ty().as_str()).unwrap_or("?");
            format!("{} : {}", value_ref(graph, v), ty)
        })
        .collect::<Vec<_>>()
        .join(", ");
    let mut line = String::new();
    if !outputs.is_empty() {
        line.push_str(&outputs);
        line.push_str(" = ");
    }
    line.push_str(data.kind());
    if data.is_constant() {
        if let Some(value) = data.attrs().get(CONSTANT_VALUE_ATTR) {
            line.push_str(&format!("[value={}]", value));
        }
    } else if !data.attrs().is_empty() {
        let attrs = data
            .attrs()
            .items
            .iter()
            .map(|attr| format!("{}={}", attr.name, attr.value))
            .collect::<Vec<_>>()
            .join(", ");
        line.push_str(&format!("[{}]", attrs));
    }
    line.push_str(&format!("({})", value_list(graph, data.inputs())));
    if !data.scope().is_root() {
        line.push_str(&format!(", scope: {}", data.scope()));
    }
    line
}

fn write_block(
    f: &mut fmt::Formatter<'_>,
    graph: &Graph,
    block: BlockId,
    depth: usize,
) -> fmt::Result {
    let indent = "  ".repeat(depth);
    let data = match graph.block(block) {
        Ok(data) => data,
        Err(_) => return Ok(()),
    };
    for &node in data.nodes() {
        writeln!(f, "{}{}", indent, describe_node(graph, node))?;
        if let Ok(node) = graph.node(node) {
            for (index, &sub) in node.blocks().iter().enumerate() {
                let inputs = graph
                    .block(sub)
                    .map(|b| value_list(graph, b.inputs()))
                    .unwrap_or_default();
                writeln!(f, "{}  block{}({}):", indent, index, inputs)?;
                write_block(f, graph, sub, depth + 2)?;
            }
        }
    }
    writeln!(f, "{}-> ({})", indent, value_list(graph, data.outputs()))
}

impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "graph({}):", value_list(self, self.inputs()))?;
        write_block(f, self, self.top_block(), 1)
    }
}
