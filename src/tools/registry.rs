//! Tool descriptors and the name → handler table

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::{Map, Value, json};
use tokio_util::sync::CancellationToken;

use super::args::Arguments;
use super::error::CallResult;
use crate::protocol::{Tool, ToolAnnotations};
use crate::{Error, Result};

/// JSON type of a tool parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// JSON string
    String,
    /// JSON number
    Number,
    /// JSON array of strings
    StringArray,
}

/// One advertised tool parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    /// Parameter name
    pub name: &'static str,
    /// JSON type
    pub kind: ParamKind,
    /// Whether callers must supply it
    pub required: bool,
    /// Human description
    pub description: &'static str,
}

impl ParamSpec {
    /// Required parameter
    #[must_use]
    pub const fn required(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: true,
            description,
        }
    }

    /// Optional parameter
    #[must_use]
    pub const fn optional(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: false,
            description,
        }
    }

    fn schema(&self) -> Value {
        match self.kind {
            ParamKind::String => json!({"type": "string", "description": self.description}),
            ParamKind::Number => json!({"type": "number", "description": self.description}),
            ParamKind::StringArray => json!({
                "type": "array",
                "items": {"type": "string"},
                "description": self.description,
            }),
        }
    }
}

/// Name, description and parameters of a tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDescriptor {
    /// Tool name
    pub name: &'static str,
    /// Human description
    pub description: &'static str,
    /// Parameters in advertised order
    pub params: Vec<ParamSpec>,
}

impl ToolDescriptor {
    /// Descriptor without parameters
    #[must_use]
    pub fn new(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            params: Vec::new(),
        }
    }

    /// Add a parameter
    #[must_use]
    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }

    /// Names of the required parameters, in order
    pub fn required_params(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.params.iter().filter(|p| p.required).map(|p| p.name)
    }

    /// JSON Schema of the parameters
    #[must_use]
    pub fn input_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .params
            .iter()
            .map(|p| (p.name.to_string(), p.schema()))
            .collect();
        let required: Vec<&str> = self.required_params().collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// MCP tool definition
    #[must_use]
    pub fn to_tool(&self) -> Tool {
        Tool {
            name: self.name.to_string(),
            title: None,
            description: Some(self.description.to_string()),
            input_schema: self.input_schema(),
            annotations: Some(ToolAnnotations::read_only()),
        }
    }
}

/// Async tool handler
pub type ToolHandler =
    Arc<dyn Fn(CancellationToken, Arguments) -> BoxFuture<'static, CallResult> + Send + Sync>;

/// A descriptor bound to its handler
#[derive(Clone)]
pub struct RegisteredTool {
    /// Advertised descriptor
    pub descriptor: ToolDescriptor,
    handler: ToolHandler,
}

impl RegisteredTool {
    /// Bind `handler` to `descriptor`
    pub fn new(descriptor: ToolDescriptor, handler: ToolHandler) -> Self {
        Self {
            descriptor,
            handler,
        }
    }

    /// Tool name
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.descriptor.name
    }

    /// Invoke the handler
    pub async fn call(&self, ctx: CancellationToken, args: Arguments) -> CallResult {
        (self.handler)(ctx, args).await
    }
}

impl std::fmt::Debug for RegisteredTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredTool")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// Immutable table of tools, in registration order
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
    index: HashMap<&'static str, usize>,
}

impl ToolRegistry {
    /// Build from tools; duplicate names are rejected
    pub fn new(tools: Vec<RegisteredTool>) -> Result<Self> {
        let mut index = HashMap::with_capacity(tools.len());
        for (i, tool) in tools.iter().enumerate() {
            if index.insert(tool.name(), i).is_some() {
                return Err(Error::Config(format!("Duplicate tool name: {}", tool.name())));
            }
        }
        Ok(Self { tools, index })
    }

    /// Concatenate several tool sources, in order
    pub fn concat(sources: impl IntoIterator<Item = Vec<RegisteredTool>>) -> Result<Self> {
        Self::new(sources.into_iter().flatten().collect())
    }

    /// Look up a tool
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RegisteredTool> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    /// Tool names, in order
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.tools.iter().map(RegisteredTool::name)
    }

    /// Number of tools
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether no tools are registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// MCP definitions for `tools/list`
    #[must_use]
    pub fn list_tools(&self) -> Vec<Tool> {
        self.tools.iter().map(|t| t.descriptor.to_tool()).collect()
    }

    /// Invoke `name`; `None` if no such tool exists
    pub async fn call(
        &self,
        name: &str,
        ctx: CancellationToken,
        args: Arguments,
    ) -> Option<CallResult> {
        let tool = self.get(name)?;
        Some(tool.call(ctx, args).await)
    }
}
