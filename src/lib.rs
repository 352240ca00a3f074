//! tool-agent — a minimal tool-calling agent.
//!
//! Each user request runs exactly one cycle: the model picks which
//! registered tools to call, the calls run locally with bounded retry, and
//! the model summarizes the outcomes into the final reply.

pub mod agent;
pub mod backend;
pub mod config;
pub mod tools;
pub mod types;
