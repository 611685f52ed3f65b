pub mod agent_loop;
pub mod planner;
pub mod prompts;
pub mod tracker;
