use std::collections::BTreeMap;

use anyhow::{anyhow, Result};

use super::arena::Graph;

/// A graph together with the number of positional inputs callers supply.
/// Inputs past that count are bound parameters.
#[derive(Debug, Clone)]
pub struct Function {
    name: String,
    graph: Graph,
    num_inputs: usize,
}

impl Function {
    pub fn new(name: impl Into<String>, graph: Graph, num_inputs: usize) -> Result<Self> {
        let name = name.into();
        if num_inputs > graph.inputs().len() {
            return Err(anyhow!(
                "function {} declares {} inputs but its graph has {}",
                name,
                num_inputs,
                graph.inputs().len()
            ));
        }
        Ok(Self {
            name,
            graph,
            num_inputs,
        })
    }

    /// Every graph input is positional.
    pub fn from_graph(name: impl Into<String>, graph: Graph) -> Self {
        let num_inputs = graph.inputs().len();
        Self {
            name: name.into(),
            graph,
            num_inputs,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    pub fn num_inputs(&self) -> usize {
        self.num_inputs
    }
}

/// Named collection of methods.
#[derive(Debug, Clone, Default)]
pub struct Module {
    name: String,
    methods: BTreeMap<String, Function>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register a method under its function name, replacing any previous one.
    pub fn add_method(&mut self, method: Function) {
        self.methods.insert(method.name().to_string(), method);
    }

    pub fn method(&self, name: &str) -> Option<&Function> {
        self.methods.get(name)
    }

    pub fn method_mut(&mut self, name: &str) -> Option<&mut Function> {
        self.methods.get_mut(name)
    }

    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(|k| k.as_str())
    }
}
