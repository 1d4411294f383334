//! Tool descriptor builder
//!
//! Local callables carry no runtime signature to introspect, so they describe
//! themselves once with a [`ToolSpec`]: a name, a docstring and typed
//! parameters. Remote tools arrive already described by their MCP server and
//! are taken as advertised.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde_json::{json, Map, Value};

use crate::mcp::{McpPool, RemoteToolMeta};
use crate::types::ToolSchema;

use super::error::SchemaError;
use super::function::LocalTool;
use super::source::ToolSource;

/// JSON type of a tool parameter
#[derive(Debug, Clone, PartialEq)]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Array(Box<ParamType>),
    Object,
    /// No declared type: an open schema slot that accepts anything
    Any,
    /// A hand-written JSON schema, must be an object
    Schema(Value),
}

impl ParamType {
    /// Array of `item`
    pub fn array(item: ParamType) -> Self {
        ParamType::Array(Box::new(item))
    }

    fn json_schema(&self) -> Result<Value, String> {
        Ok(match self {
            ParamType::String => json!({ "type": "string" }),
            ParamType::Integer => json!({ "type": "integer" }),
            ParamType::Number => json!({ "type": "number" }),
            ParamType::Boolean => json!({ "type": "boolean" }),
            ParamType::Object => json!({ "type": "object" }),
            ParamType::Any => json!({}),
            ParamType::Array(item) => json!({ "type": "array", "items": item.json_schema()? }),
            ParamType::Schema(schema) if schema.is_object() => schema.clone(),
            ParamType::Schema(other) => {
                return Err(format!("schema must be a JSON object, got `{}`", other))
            }
        })
    }
}

/// One declared parameter of a local tool
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: String,
    pub ty: ParamType,
    pub description: Option<String>,
    pub required: bool,
    pub default: Option<Value>,
}

impl ParamSpec {
    /// A required parameter
    pub fn new(name: impl Into<String>, ty: ParamType) -> Self {
        Self {
            name: name.into(),
            ty,
            description: None,
            required: true,
            default: None,
        }
    }

    /// A required parameter with no declared type
    pub fn untyped(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Any)
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Give the parameter a default value, which also makes it optional
    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self.required = false;
        self
    }
}

/// Self-description of a local callable
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSpec {
    pub name: String,
    pub doc: Option<String>,
    pub params: Vec<ParamSpec>,
}

impl ToolSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            doc: None,
            params: Vec::new(),
        }
    }

    /// Docstring; its summary paragraph becomes the tool description
    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    /// Names of parameters that must be present in a call
    pub fn required_params(&self) -> impl Iterator<Item = &str> {
        self.params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
    }
}

/// A registered tool: what the provider sees plus how to invoke it
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    pub schema: ToolSchema,
    pub source: ToolSource,
}

impl ToolDescriptor {
    /// Describe an in-process tool
    pub fn local(tool: Arc<dyn LocalTool>) -> Result<Self, SchemaError> {
        let schema = describe_local(tool.spec())?;
        Ok(Self {
            schema,
            source: ToolSource::Local(tool),
        })
    }

    /// Describe a tool served by the MCP connection `server`
    pub fn remote(
        server: &str,
        meta: &RemoteToolMeta,
        pool: &Arc<McpPool>,
    ) -> Result<Self, SchemaError> {
        let schema = describe_remote(server, meta)?;
        Ok(Self {
            source: ToolSource::remote(server, &schema.name, pool),
            schema,
        })
    }

    pub fn name(&self) -> &str {
        &self.schema.name
    }
}

/// Build the provider-facing schema of a local tool
pub fn describe_local(spec: &ToolSpec) -> Result<ToolSchema, SchemaError> {
    validate_name(&spec.name)?;

    let doc = spec.doc.as_deref().unwrap_or_default();
    let arg_docs = arg_docs(doc);

    let mut seen = HashSet::new();
    let mut properties = Map::new();
    let mut required = Vec::new();

    for param in &spec.params {
        if !seen.insert(param.name.as_str()) {
            return Err(SchemaError::DuplicateParameter {
                tool: spec.name.clone(),
                param: param.name.clone(),
            });
        }

        let mut schema = param
            .ty
            .json_schema()
            .map_err(|reason| SchemaError::UnresolvableType {
                tool: spec.name.clone(),
                param: param.name.clone(),
                reason,
            })?;

        if let Value::Object(fields) = &mut schema {
            let description = param
                .description
                .clone()
                .or_else(|| arg_docs.get(param.name.as_str()).cloned());
            if let Some(description) = description {
                fields.insert("description".into(), Value::String(description));
            }
            if let Some(default) = &param.default {
                fields.insert("default".into(), default.clone());
            }
        }

        if param.required {
            required.push(Value::String(param.name.clone()));
        }
        properties.insert(param.name.clone(), schema);
    }

    Ok(ToolSchema::new(
        spec.name.clone(),
        summary(doc),
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        }),
    ))
}

/// Take a remote tool's advertised metadata as its schema
pub fn describe_remote(server: &str, meta: &RemoteToolMeta) -> Result<ToolSchema, SchemaError> {
    if meta.name.trim().is_empty() {
        return Err(SchemaError::MissingName {
            server: server.to_string(),
        });
    }

    let parameters = if meta.input_schema.is_object() {
        meta.input_schema.clone()
    } else {
        json!({ "type": "object", "properties": {} })
    };

    Ok(ToolSchema::new(
        meta.name.clone(),
        meta.description.clone().unwrap_or_default(),
        parameters,
    ))
}

fn validate_name(name: &str) -> Result<(), SchemaError> {
    let valid = !name.is_empty()
        && name.len() <= 64
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(SchemaError::InvalidName {
            name: name.to_string(),
        })
    }
}

const SECTION_HEADERS: &[&str] = &[
    "Args:",
    "Arguments:",
    "Parameters:",
    "Returns:",
    "Raises:",
    "Yields:",
    "Example:",
    "Examples:",
];

fn is_section_header(line: &str) -> bool {
    SECTION_HEADERS.contains(&line.trim())
}

/// First paragraph of a docstring, whitespace-normalized
fn summary(doc: &str) -> String {
    doc.lines()
        .map(str::trim)
        .skip_while(|l| l.is_empty())
        .take_while(|l| !l.is_empty() && !is_section_header(l))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Per-parameter descriptions from an `Args:` section
///
/// Accepts `name: text` and `name (type): text`; indented continuation
/// lines are appended to the previous entry.
fn arg_docs(doc: &str) -> HashMap<String, String> {
    let mut docs: HashMap<String, String> = HashMap::new();
    let mut in_args = false;
    let mut current: Option<String> = None;

    for line in doc.lines() {
        let trimmed = line.trim();
        if is_section_header(trimmed) {
            in_args = matches!(trimmed, "Args:" | "Arguments:" | "Parameters:");
            current = None;
            continue;
        }
        if !in_args {
            continue;
        }
        if trimmed.is_empty() {
            current = None;
            continue;
        }

        match trimmed.split_once(':') {
            Some((head, text)) if is_param_head(head) => {
                let name = head.split_whitespace().next().unwrap_or(head).to_string();
                docs.insert(name.clone(), text.trim().to_string());
                current = Some(name);
            }
            _ => {
                if let Some(entry) = current.as_ref().and_then(|n| docs.get_mut(n)) {
                    entry.push(' ');
                    entry.push_str(trimmed);
                }
            }
        }
    }

    docs
}

fn is_param_head(head: &str) -> bool {
    let mut parts = head.splitn(2, ' ');
    let name = parts.next().unwrap_or_default();
    let rest = parts.next().map(str::trim).unwrap_or_default();
    !name.is_empty()
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && (rest.is_empty() || (rest.starts_with('(') && rest.ends_with(')')))
}

#[cfg(test)]
mod tests {
    use super::*;

    const STOCK_DOC: &str = "
        Takes the ticker symbol for a given stock and returns
        the current stock price in USD.

        Args:
            ticker_symbol (str): The ticker symbol,
                for example TSLA.

        Returns:
            float: The current price of the stock
    ";

    #[test]
    fn test_describe_local_schema() {
        let spec = ToolSpec::new("fetch_stock_price")
            .doc(STOCK_DOC)
            .param(ParamSpec::new("ticker_symbol", ParamType::String))
            .param(ParamSpec::new("currency", ParamType::String).default_value(json!("USD")));

        let schema = describe_local(&spec).unwrap();
        assert_eq!(schema.name, "fetch_stock_price");
        assert_eq!(
            schema.description,
            "Takes the ticker symbol for a given stock and returns the current stock price in USD."
        );
        assert_eq!(
            schema.parameters,
            json!({
                "type": "object",
                "properties": {
                    "ticker_symbol": {
                        "type": "string",
                        "description": "The ticker symbol, for example TSLA."
                    },
                    "currency": { "type": "string", "default": "USD" }
                },
                "required": ["ticker_symbol"]
            })
        );
    }

    #[test]
    fn test_untyped_param_is_open_slot() {
        let spec = ToolSpec::new("echo").param(ParamSpec::untyped("value"));
        let schema = describe_local(&spec).unwrap();
        assert_eq!(schema.parameters["properties"]["value"], json!({}));
        assert_eq!(schema.description, "");
    }

    #[test]
    fn test_nested_array_type() {
        let spec = ToolSpec::new("total")
            .param(ParamSpec::new("values", ParamType::array(ParamType::Number)));
        let schema = describe_local(&spec).unwrap();
        assert_eq!(
            schema.parameters["properties"]["values"],
            json!({ "type": "array", "items": { "type": "number" } })
        );
    }

    #[test]
    fn test_schema_errors() {
        let bad_name = ToolSpec::new("get weather");
        assert!(matches!(
            describe_local(&bad_name),
            Err(SchemaError::InvalidName { .. })
        ));

        let dup = ToolSpec::new("sum")
            .param(ParamSpec::new("a", ParamType::Integer))
            .param(ParamSpec::new("a", ParamType::Integer));
        assert!(matches!(
            describe_local(&dup),
            Err(SchemaError::DuplicateParameter { .. })
        ));

        let bad_type =
            ToolSpec::new("sum").param(ParamSpec::new("a", ParamType::Schema(json!("int"))));
        assert!(matches!(
            describe_local(&bad_type),
            Err(SchemaError::UnresolvableType { .. })
        ));
    }

    #[test]
    fn test_describe_remote() {
        let meta = RemoteToolMeta {
            name: "search".into(),
            description: Some("Search the web".into()),
            input_schema: json!({ "type": "object", "properties": { "q": { "type": "string" } } }),
        };
        let schema = describe_remote("web", &meta).unwrap();
        assert_eq!(schema.parameters["properties"]["q"]["type"], "string");

        let loose = RemoteToolMeta {
            name: "ping".into(),
            description: None,
            input_schema: Value::Null,
        };
        let schema = describe_remote("web", &loose).unwrap();
        assert_eq!(schema.parameters, json!({ "type": "object", "properties": {} }));

        let nameless = RemoteToolMeta {
            name: " ".into(),
            description: None,
            input_schema: Value::Null,
        };
        assert_eq!(
            describe_remote("web", &nameless),
            Err(SchemaError::MissingName { server: "web".into() })
        );
    }
}
