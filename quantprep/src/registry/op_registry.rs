use std::collections::HashSet;

use anyhow::{anyhow, Result};
use once_cell::sync::OnceCell;
use serde::Deserialize;

use crate::graph::NodeData;

use super::schema::{parse_schema, OpSchema, SignatureKey};

/// Allow-list of operator signatures eligible for quantization.
#[derive(Debug, Clone, Default)]
pub struct OpRegistry {
    schemas: Vec<OpSchema>,
    keys: HashSet<SignatureKey>,
}

static QUANTIZABLE_OPS: OnceCell<OpRegistry> = OnceCell::new();

#[derive(Debug, Deserialize)]
struct RegistryFile {
    version: u32,
    quantizable: Vec<String>,
}

impl OpRegistry {
    pub fn from_schemas<I, S>(schemas: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut registry = Self::default();
        for schema in schemas {
            registry.insert(schema.as_ref())?;
        }
        Ok(registry)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let file: RegistryFile = serde_json::from_str(json)?;
        if file.version != 1 {
            return Err(anyhow!("unsupported quantizable ops version {}", file.version));
        }
        Self::from_schemas(&file.quantizable)
    }

    /// Copy of this registry extended with one more schema.
    pub fn with_schema(mut self, schema: &str) -> Result<Self> {
        self.insert(schema)?;
        Ok(self)
    }

    fn insert(&mut self, schema: &str) -> Result<()> {
        let schema = parse_schema(schema)?;
        if self.keys.insert(schema.key()) {
            self.schemas.push(schema);
        }
        Ok(())
    }

    pub fn contains(&self, name: &str, arity: usize) -> bool {
        self.keys.contains(&SignatureKey::new(name, arity))
    }

    /// A node matches when both its kind and its input count match a schema.
    pub fn is_quantizable(&self, node: &NodeData) -> bool {
        self.contains(node.kind(), node.inputs().len())
    }

    pub fn schemas(&self) -> &[OpSchema] {
        &self.schemas
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

/// Built-in allow-list, parsed once on first use.
pub fn quantizable_ops() -> &'static OpRegistry {
    QUANTIZABLE_OPS.get_or_init(|| {
        let json = include_str!("../../quantizable_ops.json");
        OpRegistry::from_json(json).unwrap_or_else(|err| {
            crate::critical!("quantizable ops registry init failed: {}", err);
            panic!("quantizable ops registry init failed: {err}")
        })
    })
}

/// Whether `node` is in the built-in allow-list.
pub fn is_quantizable(node: &NodeData) -> bool {
    quantizable_ops().is_quantizable(node)
}
