use anyhow::{anyhow, Result};

/// One declared argument of an operator schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaArg {
    pub ty: String,
    pub name: String,
    pub default: Option<String>,
}

/// Parsed operator schema, e.g.
/// `aten::relu(Tensor self) -> Tensor`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpSchema {
    pub name: String,
    /// Overload tag, e.g. `Tensor` in `aten::add.Tensor`. Node kinds never
    /// carry it, so it is not part of the match key.
    pub overload: Option<String>,
    /// Positional and keyword-only arguments; the `*` separator is dropped.
    pub arguments: Vec<SchemaArg>,
    pub returns: String,
}

/// Normalized match key: qualified name plus argument count.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SignatureKey {
    pub name: String,
    pub arity: usize,
}

impl SignatureKey {
    pub fn new(name: impl Into<String>, arity: usize) -> Self {
        Self {
            name: name.into(),
            arity,
        }
    }
}

impl OpSchema {
    pub fn key(&self) -> SignatureKey {
        SignatureKey::new(self.name.clone(), self.arguments.len())
    }
}

pub fn parse_schema(text: &str) -> Result<OpSchema> {
    let text = text.trim();
    let open = text
        .find('(')
        .ok_or_else(|| anyhow!("schema missing argument list: {}", text))?;
    let qualified = text[..open].trim();
    let (name, overload) = match qualified.split_once('.') {
        Some((name, overload)) if !overload.is_empty() => (name, Some(overload.to_string())),
        Some(_) => return Err(anyhow!("schema has an empty overload name: {}", text)),
        None => (qualified, None),
    };
    if name.is_empty() || !name.contains("::") {
        return Err(anyhow!("schema needs a qualified operator name: {}", text));
    }
    let close = matching_paren(text, open)?;
    // Keyword-only arguments still become node inputs, so only the marker
    // itself is skipped.
    let arguments = split_top_level(&text[open + 1..close])
        .into_iter()
        .filter(|arg| *arg != "*")
        .map(parse_arg)
        .collect::<Result<Vec<_>>>()?;
    let rest = text[close + 1..].trim();
    let returns = match rest.strip_prefix("->") {
        Some(ret) => ret.trim().to_string(),
        None if rest.is_empty() => String::new(),
        None => return Err(anyhow!("unexpected trailing text in schema: {}", rest)),
    };
    Ok(OpSchema {
        name: name.to_string(),
        overload,
        arguments,
        returns,
    })
}

fn matching_paren(text: &str, open: usize) -> Result<usize> {
    let mut depth = 0usize;
    for (index, ch) in text.char_indices().skip_while(|(i, _)| *i < open) {
        match ch {
            '(' | '[' => depth += 1,
            ')' | ']' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| anyhow!("unbalanced brackets in schema: {}", text))?;
                if depth == 0 {
                    return Ok(index);
                }
            }
            _ => {}
        }
    }
    Err(anyhow!("unterminated argument list in schema: {}", text))
}

fn split_top_level(args: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (index, ch) in args.char_indices() {
        match ch {
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(args[start..index].trim());
                start = index + 1;
            }
            _ => {}
        }
    }
    let last = args[start..].trim();
    if !last.is_empty() || !parts.is_empty() {
        parts.push(last);
    }
    parts
}

fn parse_arg(arg: &str) -> Result<SchemaArg> {
    let (decl, default) = match arg.split_once('=') {
        Some((decl, default)) => (decl.trim(), Some(default.trim().to_string())),
        None => (arg.trim(), None),
    };
    let (ty, name) = decl
        .rsplit_once(char::is_whitespace)
        .ok_or_else(|| anyhow!("schema argument needs a type and a name: '{}'", arg))?;
    let (ty, name) = (ty.trim(), name.trim());
    if ty.is_empty() || name.is_empty() {
        return Err(anyhow!("schema argument needs a type and a name: '{}'", arg));
    }
    Ok(SchemaArg {
        ty: ty.to_string(),
        name: name.to_string(),
        default,
    })
}
