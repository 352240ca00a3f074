//! Tool registry: name → tool, plus the advertised definitions in
//! registration order.

use super::traits::{Tool, ToolArgs, ToolDefinition, ToolDescriptor, ToolError};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("tool '{name}' is already registered")]
    Duplicate { name: String },

    #[error("invalid descriptor for tool '{name}': {reason}")]
    InvalidDescriptor { name: String, reason: String },
}

/// A registered tool. Cloning shares the same handle.
#[derive(Clone)]
pub struct RegisteredTool {
    tool: Arc<dyn Tool>,
}

impl RegisteredTool {
    pub fn descriptor(&self) -> &ToolDescriptor {
        self.tool.descriptor()
    }

    pub fn name(&self) -> &str {
        &self.descriptor().name
    }

    /// Check the arguments against the descriptor, then run the handle.
    pub async fn invoke(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        self.descriptor().check_arguments(args)?;
        self.tool.execute(ToolArgs::new(args)).await
    }
}

impl std::fmt::Debug for RegisteredTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredTool")
            .field("name", &self.name())
            .finish()
    }
}

/// Registry of locally invocable tools.
///
/// Populated once at startup, then shared read-only (wrap in `Arc`).
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, RegisteredTool>,
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Names must be unique.
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> Result<RegisteredTool, RegistryError> {
        self.register_arc(Arc::new(tool))
    }

    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) -> Result<RegisteredTool, RegistryError> {
        let descriptor = tool.descriptor();
        validate_descriptor(descriptor)?;

        let name = descriptor.name.clone();
        if self.tools.contains_key(&name) {
            return Err(RegistryError::Duplicate { name });
        }

        debug!(tool = %name, params = descriptor.params.len(), "Registered tool");
        let registered = RegisteredTool { tool };
        self.tools.insert(name.clone(), registered.clone());
        self.order.push(name);
        Ok(registered)
    }

    /// Look up a tool by exact name.
    pub fn resolve(&self, name: &str) -> Option<RegisteredTool> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Descriptors in registration order.
    pub fn descriptors(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(RegisteredTool::descriptor)
    }

    /// Definitions advertised to the model backend, in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.descriptors().map(ToolDescriptor::definition).collect()
    }
}

fn validate_descriptor(descriptor: &ToolDescriptor) -> Result<(), RegistryError> {
    if descriptor.name.trim().is_empty() {
        return Err(RegistryError::InvalidDescriptor {
            name: descriptor.name.clone(),
            reason: "name must not be empty".into(),
        });
    }

    let mut seen = HashSet::new();
    for p in &descriptor.params {
        if !seen.insert(p.name.as_str()) {
            return Err(RegistryError::InvalidDescriptor {
                name: descriptor.name.clone(),
                reason: format!("parameter '{}' declared twice", p.name),
            });
        }
    }
    Ok(())
}
