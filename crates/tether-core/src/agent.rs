//! The step-bounded agent loop.
//!
//! Each step renders a prompt from the task and the latest observation, asks
//! the backend for one grammar-constrained turn, parses it into a thought and
//! a command, and hands the command to the [`Toolset`]. Tool failures become
//! the next observation; unparsable output, inference failures and an
//! exhausted step budget end the task in [`AgentState::Error`].

use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::json;
use tether_pm::PromptManager;
use tracing::{debug, info, instrument, warn};

use crate::backend::{CancelFlag, InferenceBackend, InferenceRequest};
use crate::config::{AgentConfig, ProjectConfig, ToolLimits};
use crate::error::CoreError;
use crate::events::AgentObserver;
use crate::protocol::{ACTION_MARKER, AGENT_GRAMMAR, CommandKind, THOUGHT_MARKER};
use crate::toolset::{ToolResult, Toolset, WorkingRoot};

const TURN_TEMPLATE: &str = "agent/turn";
const DEFAULT_RESULT_CHARS: usize = 1000;
const TRUNCATION_MARKER: &str = "...[truncated]";

// ── State ────────────────────────────────────────────────────

/// Where the loop is. `Finished`, `Error` and `Interrupted` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    Ready,
    Thinking,
    Executing,
    Finished,
    Error,
    Interrupted,
}

impl AgentState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Error | Self::Interrupted)
    }
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ready => "ready",
            Self::Thinking => "thinking",
            Self::Executing => "executing",
            Self::Finished => "finished",
            Self::Error => "error",
            Self::Interrupted => "interrupted",
        };
        f.write_str(name)
    }
}

/// One completed reasoning, action and observation cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentStep {
    /// What the model saw before this step.
    pub observation: String,
    pub thought: String,
    /// Raw command text as generated.
    pub command: String,
    pub result: ToolResult,
}

/// How a run ended, short of an agent-level error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    Finished { summary: String },
    Interrupted,
}

// ── Agent ────────────────────────────────────────────────────

/// A single-task agent driving one inference backend.
pub struct Agent<B> {
    config: AgentConfig,
    backend: B,
    observer: Box<dyn AgentObserver>,
    prompts: PromptManager,
    limits: ToolLimits,
    result_chars: usize,
    tools: Option<Toolset>,
    task: Option<String>,
    state: AgentState,
    history: Vec<AgentStep>,
    step_count: u32,
}

impl<B: fmt::Debug> fmt::Debug for Agent<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("config", &self.config)
            .field("backend", &self.backend)
            .field("state", &self.state)
            .field("task", &self.task)
            .field("step_count", &self.step_count)
            .finish_non_exhaustive()
    }
}

impl<B: InferenceBackend> Agent<B> {
    /// Create an agent with the built-in prompts and default tool limits.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidConfig` if `config` fails validation and
    /// `CoreError::Prompt` if the built-in templates cannot be loaded.
    pub fn new(
        config: AgentConfig,
        backend: B,
        observer: impl AgentObserver + 'static,
    ) -> Result<Self, CoreError> {
        config.validate()?;
        Ok(Self {
            config,
            backend,
            observer: Box::new(observer),
            prompts: PromptManager::new()?,
            limits: ToolLimits::default(),
            result_chars: DEFAULT_RESULT_CHARS,
            tools: None,
            task: None,
            state: AgentState::Ready,
            history: Vec::new(),
            step_count: 0,
        })
    }

    /// Apply tool limits, display cap and prompt overrides from a project
    /// config. Relative include directories are resolved against `base`;
    /// directories that do not exist are skipped. Limits take effect at the
    /// next `start_task`.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidConfig` if a limit is zero and
    /// `CoreError::Prompt` if an override template is invalid.
    pub fn with_project_config(
        mut self,
        project: &ProjectConfig,
        base: &Path,
    ) -> Result<Self, CoreError> {
        project.limits.validate()?;
        self.limits = project.limits;
        self.result_chars = project.display.result_chars;

        for dir in &project.prompts.include {
            let resolved: PathBuf = if dir.is_absolute() {
                dir.clone()
            } else {
                base.join(dir)
            };
            if resolved.is_dir() {
                let count = self.prompts.load_dir(&resolved)?;
                debug!(dir = %resolved.display(), count, "loaded prompt overrides");
            }
        }
        Ok(self)
    }

    /// Replace the prompt manager, e.g. with custom templates.
    pub fn with_prompts(mut self, prompts: PromptManager) -> Self {
        self.prompts = prompts;
        self
    }

    /// Tool caps for tasks started from now on.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidConfig` if a limit is zero.
    pub fn with_limits(mut self, limits: ToolLimits) -> Result<Self, CoreError> {
        limits.validate()?;
        self.limits = limits;
        Ok(self)
    }

    // ── Lifecycle ────────────────────────────────────────────

    /// Load the model into the backend.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::ModelLoad` on failure, after moving to
    /// [`AgentState::Error`] and reporting it to the observer.
    #[instrument(skip(self), fields(model = %self.config.model()))]
    pub fn init(&mut self) -> Result<(), CoreError> {
        let model = self.config.model().to_owned();
        match self.backend.load(&model, self.config.context_window()) {
            Ok(()) => {
                info!(context_window = self.config.context_window(), "model loaded");
                Ok(())
            }
            Err(e) => {
                let e = match e {
                    CoreError::ModelLoad { .. } => e,
                    other => CoreError::ModelLoad {
                        model,
                        reason: other.to_string(),
                    },
                };
                self.fail(&e);
                Err(e)
            }
        }
    }

    /// Release the model. `init` must be called again before running.
    pub fn unload(&mut self) {
        self.backend.unload();
        debug!("model unloaded");
    }

    pub fn is_loaded(&self) -> bool {
        self.backend.is_loaded()
    }

    /// Begin a new task rooted at `working_dir`.
    ///
    /// Clears history and the step counter and returns to
    /// [`AgentState::Ready`]. Nothing changes if the directory is invalid.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidWorkingDirectory` if `working_dir` does
    /// not exist or is not a directory.
    #[instrument(skip_all, fields(dir = %working_dir.as_ref().display()))]
    pub fn start_task(
        &mut self,
        description: impl Into<String>,
        working_dir: impl AsRef<Path>,
    ) -> Result<(), CoreError> {
        self.tools = Some(Toolset::new(working_dir, self.limits)?);
        self.reset();
        self.task = Some(description.into());
        info!("task started");
        Ok(())
    }

    /// Forget the task and its history. The model stays loaded.
    pub fn reset(&mut self) {
        self.history.clear();
        self.step_count = 0;
        self.task = None;
        self.state = AgentState::Ready;
    }

    // ── Loop ─────────────────────────────────────────────────

    /// Step until the task reaches a terminal state.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::NoTaskSet` or `CoreError::ModelNotLoaded` before
    /// any step runs. Returns the agent-level error that moved the loop to
    /// [`AgentState::Error`], including `CoreError::StepBudgetExceeded`.
    #[instrument(skip_all, fields(max_steps = self.config.max_steps()))]
    pub async fn run(&mut self, cancel: &CancelFlag) -> Result<RunOutcome, CoreError> {
        self.ensure_runnable()?;

        while !self.state.is_terminal() {
            if cancel.is_cancelled() {
                self.interrupt();
                break;
            }
            self.step(cancel).await?;
        }

        match self.state {
            AgentState::Finished => Ok(RunOutcome::Finished {
                summary: self.summary().unwrap_or_default().to_owned(),
            }),
            AgentState::Interrupted => Ok(RunOutcome::Interrupted),
            _ => Err(CoreError::TaskEnded),
        }
    }

    /// Perform one step.
    ///
    /// Returns `Ok(true)` if the loop can continue and `Ok(false)` once it
    /// is (or already was) in a terminal state.
    ///
    /// # Errors
    ///
    /// Returns the agent-level error that moved the loop to
    /// [`AgentState::Error`].
    #[instrument(skip_all, fields(step = self.step_count + 1))]
    pub async fn step(&mut self, cancel: &CancelFlag) -> Result<bool, CoreError> {
        if self.state.is_terminal() {
            return Ok(false);
        }
        self.ensure_runnable()?;

        let max_steps = self.config.max_steps();
        if self.step_count >= max_steps {
            let e = CoreError::StepBudgetExceeded { max_steps };
            self.fail(&e);
            return Err(e);
        }

        self.step_count += 1;
        self.observer
            .on_progress(&format!("Step {}/{max_steps}", self.step_count));
        self.state = AgentState::Thinking;

        let prompt = match self.build_prompt() {
            Ok(prompt) => prompt,
            Err(e) => {
                self.fail(&e);
                return Err(e);
            }
        };

        let request = InferenceRequest {
            prompt: &prompt,
            grammar: AGENT_GRAMMAR,
            max_tokens: self.config.max_tokens_per_step(),
            cancel,
        };
        let observer = &mut self.observer;
        let inferred = self
            .backend
            .infer(request, &mut |token| observer.on_stream(token))
            .await;
        let raw = match inferred {
            Ok(raw) => raw,
            Err(e) => {
                let e = match e {
                    CoreError::Inference(_) | CoreError::ModelNotLoaded => e,
                    other => CoreError::Inference(other.to_string()),
                };
                self.fail(&e);
                return Err(e);
            }
        };

        if cancel.is_cancelled() {
            self.interrupt();
            return Ok(false);
        }

        let Some((thought, command)) = parse_model_output(&raw) else {
            let e = CoreError::UnparsableOutput { raw };
            self.fail(&e);
            return Err(e);
        };
        self.observer.on_thought(&thought);
        self.observer.on_command(&command);

        self.state = AgentState::Executing;
        let Some(tools) = self.tools.as_ref() else {
            return Err(CoreError::NoTaskSet);
        };
        let result = tools.execute(&command);
        self.observer.on_tool_result(&result);
        debug!(
            command = %command.lines().next().unwrap_or_default(),
            success = result.success,
            "command executed"
        );

        let observation = self.current_observation();
        let finished = result.finished;
        self.history.push(AgentStep {
            observation,
            thought,
            command,
            result,
        });

        if finished {
            self.state = AgentState::Finished;
            let summary = self.summary().unwrap_or_default().to_owned();
            info!(steps = self.step_count, "task finished");
            self.observer.on_finish(&summary);
            Ok(false)
        } else {
            self.state = AgentState::Ready;
            Ok(true)
        }
    }

    /// Render the prompt for the next step.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::NoTaskSet` without a task and `CoreError::Prompt`
    /// if the turn template fails to render.
    pub fn build_prompt(&self) -> Result<String, CoreError> {
        let (Some(task), Some(tools)) = (self.task.as_deref(), self.tools.as_ref()) else {
            return Err(CoreError::NoTaskSet);
        };

        let last = self.recent_history().last().map(|step| {
            json!({
                "command": step.command,
                "success": step.result.success,
                "output": truncate_display(&step.result.output, self.result_chars),
                "error": truncate_display(&step.result.error, self.result_chars),
            })
        });
        let commands: Vec<&str> = CommandKind::ALL.iter().map(|k| k.usage()).collect();

        let ctx = json!({
            "commands": commands,
            "max_read_lines": tools.limits().max_read_lines,
            "task": task,
            "working_dir": tools.root().display().to_string(),
            "last": last,
        });
        Ok(self.prompts.render(TURN_TEMPLATE, &ctx)?)
    }

    // ── Accessors ────────────────────────────────────────────

    pub fn state(&self) -> AgentState {
        self.state
    }

    pub fn history(&self) -> &[AgentStep] {
        &self.history
    }

    /// The last `history_window` steps.
    pub fn recent_history(&self) -> &[AgentStep] {
        let window = self.config.history_window() as usize;
        &self.history[self.history.len().saturating_sub(window)..]
    }

    pub fn step_count(&self) -> u32 {
        self.step_count
    }

    pub fn task(&self) -> Option<&str> {
        self.task.as_deref()
    }

    pub fn working_root(&self) -> Option<&WorkingRoot> {
        self.tools.as_ref().map(Toolset::working_root)
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    // ── Internals ────────────────────────────────────────────

    fn ensure_runnable(&self) -> Result<(), CoreError> {
        if self.task.is_none() {
            return Err(CoreError::NoTaskSet);
        }
        if !self.backend.is_loaded() {
            return Err(CoreError::ModelNotLoaded);
        }
        Ok(())
    }

    /// The previous result, or the task context before the first step.
    fn current_observation(&self) -> String {
        match self.history.last() {
            Some(step) => step.result.observation(),
            None => format!(
                "Working directory: {}\nTask: {}",
                self.tools
                    .as_ref()
                    .map(|t| t.root().display().to_string())
                    .unwrap_or_default(),
                self.task.as_deref().unwrap_or_default()
            ),
        }
    }

    fn summary(&self) -> Option<&str> {
        self.history
            .last()
            .filter(|step| step.result.finished)
            .map(|step| step.result.output.as_str())
    }

    fn interrupt(&mut self) {
        self.state = AgentState::Interrupted;
        info!(steps = self.step_count, "task interrupted");
    }

    fn fail(&mut self, error: &CoreError) {
        self.state = AgentState::Error;
        warn!(error = %error, steps = self.step_count, "task failed");
        self.observer.on_error(&error.to_string());
    }
}

// ── Model Output ─────────────────────────────────────────────

/// Split one model turn into `(thought, command)`.
///
/// The thought marker must come before the action marker. The thought is
/// right-trimmed; the command keeps its internal line breaks so WRITE and
/// INSERT bodies survive. Returns `None` if either part is missing or empty.
pub fn parse_model_output(raw: &str) -> Option<(String, String)> {
    let thought_start = raw.find(THOUGHT_MARKER)? + THOUGHT_MARKER.len();
    let action_at = thought_start + raw[thought_start..].find(ACTION_MARKER)?;

    let thought = raw[thought_start..action_at]
        .trim_start_matches([' ', '\t'])
        .trim_end();
    let command = raw[action_at + ACTION_MARKER.len()..]
        .trim_start_matches([' ', '\t'])
        .trim_end();

    if thought.is_empty() || command.is_empty() {
        return None;
    }
    Some((thought.to_owned(), command.to_owned()))
}

/// Cap `text` at `max_chars` characters, marking the cut.
fn truncate_display(text: &str, max_chars: usize) -> Cow<'_, str> {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => Cow::Owned(format!("{}{TRUNCATION_MARKER}", &text[..cut])),
        None => Cow::Borrowed(text),
    }
}
