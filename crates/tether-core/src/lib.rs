//! Core of the tether code agent.
//!
//! A [`Toolset`] executes one textual command at a time inside a sandboxed
//! working root. An [`Agent`] drives an [`InferenceBackend`] through a
//! step-bounded loop, feeding each [`ToolResult`] back as the next
//! observation.

mod agent;
mod backend;
mod command;
mod config;
mod error;
mod events;
mod protocol;
mod toolset;

pub use agent::{Agent, AgentState, AgentStep, RunOutcome, parse_model_output};
pub use backend::{CancelFlag, InferenceBackend, InferenceRequest, ScriptedBackend};
pub use command::ToolCommand;
pub use config::{
    AgentConfig, AgentProjectConfig, DisplayConfig, PROJECT_DIR, ProjectConfig, PromptsConfig,
    ToolLimits, load_project_config, project_config_path,
};
pub use error::{CoreError, ToolError};
pub use events::{AgentEvent, AgentObserver, AgentStream, ChannelObserver, NoopObserver};
pub use protocol::{ACTION_MARKER, AGENT_GRAMMAR, CommandKind, END_INSERT, END_WRITE, THOUGHT_MARKER};
pub use toolset::{ToolResult, Toolset, WorkingRoot};
