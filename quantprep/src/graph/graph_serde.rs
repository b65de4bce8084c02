use anyhow::{anyhow, Result};
use serde_json::Value;

use crate::graph::Graph;

pub struct GraphSerialize;

impl GraphSerialize {
    pub fn json(graph: &Graph) -> Result<Value> {
        Ok(serde_json::to_value(graph)?)
    }

    pub fn pretty(graph: &Graph) -> Result<String> {
        Ok(serde_json::to_string_pretty(graph)?)
    }
}

pub struct GraphDeserialize;

impl GraphDeserialize {
    /// Rebuild a graph and check that its use-lists agree with the node
    /// inputs and block outputs they index.
    pub fn from_json(value: Value) -> Result<Graph> {
        let graph: Graph = serde_json::from_value(value)?;
        graph
            .verify_uses()
            .map_err(|err| anyhow!("inconsistent graph json: {}", err))?;
        Ok(graph)
    }

    pub fn from_text(text: &str) -> Result<Graph> {
        Self::from_json(serde_json::from_str(text)?)
    }
}
