//! Tools module: function-calling definitions and dispatch
//!
//! A [`Tool`] wraps an async handler behind a declared JSON-Schema argument
//! shape; a [`ToolSet`] keys tools by name and executes the tool-use blocks
//! of a model response.

mod set;
mod tool;

pub use set::ToolSet;
pub use tool::{schema_of, Tool, ToolError, ToolHandler, ToolResult};
