mod op_registry;
mod schema;

pub use op_registry::{is_quantizable, quantizable_ops, OpRegistry};
pub use schema::{parse_schema, OpSchema, SchemaArg, SignatureKey};
