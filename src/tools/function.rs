//! Closure-backed tools for handles that need no async work.

use super::traits::{Tool, ToolArgs, ToolDescriptor, ToolError};
use async_trait::async_trait;
use serde_json::Value;

type Handler = dyn Fn(ToolArgs<'_>) -> Result<Value, ToolError> + Send + Sync;

/// A tool whose handle is a plain synchronous function.
pub struct FnTool {
    descriptor: ToolDescriptor,
    handler: Box<Handler>,
}

impl FnTool {
    pub fn new<F>(descriptor: ToolDescriptor, handler: F) -> Self
    where
        F: Fn(ToolArgs<'_>) -> Result<Value, ToolError> + Send + Sync + 'static,
    {
        Self {
            descriptor,
            handler: Box::new(handler),
        }
    }
}

impl std::fmt::Debug for FnTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnTool")
            .field("name", &self.descriptor.name)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Tool for FnTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn execute(&self, args: ToolArgs<'_>) -> Result<Value, ToolError> {
        (self.handler)(args)
    }
}
