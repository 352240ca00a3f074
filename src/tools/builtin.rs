//! Demonstration tools shipped with the binary.

use super::function::FnTool;
use super::traits::{ParamType, ToolArgs, ToolDescriptor, ToolError};
use rand::seq::SliceRandom;
use serde_json::{json, Value};

const TEMPERATURES: &[i64] = &[20, 22, 25, 27, 30];
const CONDITIONS: &[&str] = &["sunny", "cloudy", "light rain"];

/// `add(a, b) -> a + b`.
pub fn add_tool() -> FnTool {
    FnTool::new(
        ToolDescriptor::new("add", "Return the sum of two integers.")
            .param("a", ParamType::Integer)
            .param("b", ParamType::Integer),
        add,
    )
}

fn add(args: ToolArgs<'_>) -> Result<Value, ToolError> {
    let a = args.i64("a")?;
    let b = args.i64("b")?;
    let sum = a
        .checked_add(b)
        .ok_or_else(|| ToolError::failed(format!("{} + {} overflows", a, b)))?;
    Ok(json!(sum))
}

/// `get_weather(city)` with a made-up forecast.
pub fn weather_tool() -> FnTool {
    FnTool::new(
        ToolDescriptor::new("get_weather", "Get today's weather for a city.").param_described(
            "city",
            ParamType::String,
            "Name of the city",
        ),
        get_weather,
    )
}

fn get_weather(args: ToolArgs<'_>) -> Result<Value, ToolError> {
    let city = args.str("city")?.trim();
    if city.is_empty() {
        return Err(ToolError::failed("city must not be empty"));
    }

    let mut rng = rand::thread_rng();
    let temp = TEMPERATURES.choose(&mut rng).copied().unwrap_or(25);
    let condition = CONDITIONS.choose(&mut rng).copied().unwrap_or("sunny");
    Ok(json!(format!(
        "Today in {} it is {}°C and {}.",
        city, temp, condition
    )))
}
