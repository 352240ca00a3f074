pub mod builtin;
pub mod function;
pub mod registry;
pub mod traits;

pub use builtin::{add_tool, weather_tool};
pub use function::FnTool;
pub use registry::{RegisteredTool, RegistryError, ToolRegistry};
pub use traits::{ParamSpec, ParamType, Tool, ToolArgs, ToolDefinition, ToolDescriptor, ToolError};

/// Registry holding the demonstration tools, in their advertised order.
pub fn builtin_registry() -> Result<ToolRegistry, RegistryError> {
    let mut registry = ToolRegistry::new();
    registry.register(add_tool())?;
    registry.register(weather_tool())?;
    Ok(registry)
}
