//! Shared data types used across the agent runtime.

pub mod conversation;
pub mod plan;
pub mod tool;

pub use conversation::{ConversationTurn, Role};
pub use plan::{AgentPlan, PlanStep};
pub use tool::{ToolDescriptor, ToolResult, ToolStatus};
