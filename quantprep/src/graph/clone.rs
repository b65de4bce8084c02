use std::collections::HashMap;

use anyhow::{anyhow, Result};

use super::arena::Graph;
use super::types::{AttrValue, NodeId, OpAttrs, Scope, ValueId};

/// Detached prototype of a node, e.g. the observer a caller wants cloned
/// next to every observed value.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeTemplate {
    kind: String,
    attrs: OpAttrs,
    inputs: Vec<ValueId>,
}

impl NodeTemplate {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            attrs: OpAttrs::none(),
            inputs: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: &str, value: AttrValue) -> Self {
        self.attrs.set(name, value);
        self
    }

    /// Leading input every clone receives, subject to the clone's remap.
    pub fn with_input(mut self, value: ValueId) -> Self {
        self.inputs.push(value);
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn attrs(&self) -> &OpAttrs {
        &self.attrs
    }

    pub fn inputs(&self) -> &[ValueId] {
        &self.inputs
    }
}

/// How template inputs map onto values of the graph receiving the clone.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ValueRemap {
    #[default]
    Identity,
    Map(HashMap<ValueId, ValueId>),
}

impl ValueRemap {
    pub fn apply(&self, value: ValueId) -> ValueId {
        match self {
            ValueRemap::Identity => value,
            ValueRemap::Map(map) => map.get(&value).copied().unwrap_or(value),
        }
    }
}

impl Graph {
    /// Create a detached node copying the template's kind and attributes.
    /// Template inputs are attached after remapping; outputs are left to the
    /// caller.
    pub fn create_clone(
        &mut self,
        template: &NodeTemplate,
        remap: &ValueRemap,
        scope: Scope,
    ) -> Result<NodeId> {
        if template.kind.is_empty() {
            return Err(anyhow!("node template has no operator kind"));
        }
        let inputs = template
            .inputs
            .iter()
            .map(|&value| {
                let mapped = remap.apply(value);
                self.value(mapped).map(|_| mapped)
            })
            .collect::<Result<Vec<_>>>()?;
        let node = self.create_node(template.kind.clone(), scope);
        self.set_attrs(node, template.attrs.clone())?;
        for value in inputs {
            self.add_input_to_node(node, value)?;
        }
        Ok(node)
    }
}
