//! Configuration types for tether-core.
//!
//! This module defines [`AgentConfig`] (per-task agent limits), [`ToolLimits`]
//! (the interpreter's fixed caps), and [`ProjectConfig`] (from
//! `.tether/config.yaml`). CLI flags take precedence over values read from
//! `ProjectConfig`, which in turn take precedence over built-in defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::error::CoreError;

/// Directory under the working root that holds project-level settings.
pub const PROJECT_DIR: &str = ".tether";

// ── Agent Configuration ──────────────────────────────────────

/// Immutable configuration for one agent task.
///
/// # Examples
///
/// ```
/// use tether_core::AgentConfig;
///
/// let config = AgentConfig::builder()
///     .model("models/tiny.gguf")
///     .max_steps(10_u32)
///     .build();
/// assert_eq!(config.max_steps(), 10);
/// assert_eq!(config.history_window(), 8);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
pub struct AgentConfig {
    /// Model reference handed to the inference backend on load.
    #[builder(default = default_model(), setter(into))]
    model: String,

    /// Hard upper bound on steps per task.
    #[builder(default = default_max_steps())]
    max_steps: u32,

    /// Hard upper bound on generated tokens per step.
    #[builder(default = default_max_tokens_per_step())]
    max_tokens_per_step: u32,

    /// Token budget of the model's context.
    #[builder(default = default_context_window())]
    context_window: u32,

    /// Number of recent steps available for prompt rendering.
    #[builder(default = default_history_window())]
    history_window: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl AgentConfig {
    /// Returns the model reference.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Returns the maximum number of steps per task.
    pub fn max_steps(&self) -> u32 {
        self.max_steps
    }

    /// Returns the per-step generation budget.
    pub fn max_tokens_per_step(&self) -> u32 {
        self.max_tokens_per_step
    }

    /// Returns the model context window.
    pub fn context_window(&self) -> u32 {
        self.context_window
    }

    /// Returns the prompt history window.
    pub fn history_window(&self) -> u32 {
        self.history_window
    }

    /// Apply project-level overrides. Fields set in `overrides` replace ours.
    pub fn merged_with(mut self, overrides: &AgentProjectConfig) -> Self {
        if let Some(model) = &overrides.model {
            self.model.clone_from(model);
        }
        if let Some(v) = overrides.max_steps {
            self.max_steps = v;
        }
        if let Some(v) = overrides.max_tokens_per_step {
            self.max_tokens_per_step = v;
        }
        if let Some(v) = overrides.context_window {
            self.context_window = v;
        }
        if let Some(v) = overrides.history_window {
            self.history_window = v;
        }
        self
    }

    /// Check that every limit is usable.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidConfig` if a limit is zero or the model
    /// reference is empty.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.model.trim().is_empty() {
            return Err(CoreError::InvalidConfig("model must not be empty".to_owned()));
        }
        let limits = [
            ("max_steps", self.max_steps),
            ("max_tokens_per_step", self.max_tokens_per_step),
            ("context_window", self.context_window),
            ("history_window", self.history_window),
        ];
        for (name, value) in limits {
            if value == 0 {
                return Err(CoreError::InvalidConfig(format!("{name} must be at least 1")));
            }
        }
        Ok(())
    }
}

// ── Tool Limits ──────────────────────────────────────────────

/// Fixed caps enforced by the tool interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ToolLimits {
    /// Maximum lines a single READ_LINES may request.
    pub max_read_lines: usize,
    /// Maximum GREP matches before truncation.
    pub max_grep_results: usize,
    /// Maximum LIST entries before truncation.
    pub max_list_entries: usize,
    /// Maximum lines in a WRITE or INSERT body.
    pub max_write_lines: usize,
    /// Maximum length of a path argument.
    pub max_path_length: usize,
}

impl ToolLimits {
    pub const MAX_READ_LINES: usize = 50;
    pub const MAX_GREP_RESULTS: usize = 20;
    pub const MAX_LIST_ENTRIES: usize = 100;
    pub const MAX_WRITE_LINES: usize = 200;
    pub const MAX_PATH_LENGTH: usize = 256;

    /// Check that every cap is at least 1.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidConfig` naming the first zero cap.
    pub fn validate(&self) -> Result<(), CoreError> {
        let caps = [
            ("maxReadLines", self.max_read_lines),
            ("maxGrepResults", self.max_grep_results),
            ("maxListEntries", self.max_list_entries),
            ("maxWriteLines", self.max_write_lines),
            ("maxPathLength", self.max_path_length),
        ];
        for (name, value) in caps {
            if value == 0 {
                return Err(CoreError::InvalidConfig(format!("limits.{name} must be at least 1")));
            }
        }
        Ok(())
    }
}

impl Default for ToolLimits {
    fn default() -> Self {
        Self {
            max_read_lines: Self::MAX_READ_LINES,
            max_grep_results: Self::MAX_GREP_RESULTS,
            max_list_entries: Self::MAX_LIST_ENTRIES,
            max_write_lines: Self::MAX_WRITE_LINES,
            max_path_length: Self::MAX_PATH_LENGTH,
        }
    }
}

// ── Project Configuration (.tether/config.yaml) ──────────────

/// Project-level configuration, deserialized from `.tether/config.yaml`.
///
/// All fields have serde defaults so that missing keys in the YAML file
/// produce valid configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    /// Optional agent overrides.
    #[serde(default)]
    pub agent: AgentProjectConfig,

    /// Interpreter caps.
    #[serde(default)]
    pub limits: ToolLimits,

    /// Prompt template search paths.
    #[serde(default)]
    pub prompts: PromptsConfig,

    /// Prompt display settings.
    #[serde(default)]
    pub display: DisplayConfig,
}

/// Agent overrides from the project config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentProjectConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_steps: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens_per_step: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_window: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_window: Option<u32>,
}

/// Prompt template configuration.
///
/// Templates found in these directories replace built-in templates with the
/// same name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptsConfig {
    /// Additional template directories to search (in order).
    #[serde(default)]
    pub include: Vec<PathBuf>,
}

/// How much of the previous result is shown to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayConfig {
    /// Characters of the previous tool result rendered into the prompt.
    #[serde(default = "default_result_chars")]
    pub result_chars: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            result_chars: default_result_chars(),
        }
    }
}

// ── Default value functions ──────────────────────────────────

fn default_model() -> String {
    "models/Qwen3-0.6B-Q8_0.gguf".to_owned()
}

fn default_max_steps() -> u32 {
    25
}

fn default_max_tokens_per_step() -> u32 {
    512
}

fn default_context_window() -> u32 {
    2048
}

fn default_history_window() -> u32 {
    8
}

fn default_result_chars() -> usize {
    1000
}

// ── Config loading ───────────────────────────────────────────

/// Path of the project config file for a working directory.
pub fn project_config_path(working_dir: &Path) -> PathBuf {
    working_dir.join(PROJECT_DIR).join("config.yaml")
}

/// Load [`ProjectConfig`] from a `config.yaml` file.
///
/// If the file does not exist, returns the default configuration.
///
/// # Errors
///
/// Returns `CoreError::Io` if the file exists but cannot be read.
/// Returns `CoreError::Config` if the file contains invalid YAML.
pub fn load_project_config(config_path: &Path) -> Result<ProjectConfig, CoreError> {
    if !config_path.exists() {
        return Ok(ProjectConfig::default());
    }
    let content = std::fs::read_to_string(config_path)?;
    if content.trim().is_empty() {
        return Ok(ProjectConfig::default());
    }
    let config: ProjectConfig = serde_yaml::from_str(&content)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_should_build_agent_config_with_defaults() {
        let config = AgentConfig::builder().build();

        assert_eq!(config.model(), "models/Qwen3-0.6B-Q8_0.gguf");
        assert_eq!(config.max_steps(), 25);
        assert_eq!(config.max_tokens_per_step(), 512);
        assert_eq!(config.context_window(), 2048);
        assert_eq!(config.history_window(), 8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_should_reject_each_zero_tool_cap() {
        assert!(ToolLimits::default().validate().is_ok());

        let zeroed: [fn(&mut ToolLimits); 5] = [
            |l| l.max_read_lines = 0,
            |l| l.max_grep_results = 0,
            |l| l.max_list_entries = 0,
            |l| l.max_write_lines = 0,
            |l| l.max_path_length = 0,
        ];
        let names = ["maxReadLines", "maxGrepResults", "maxListEntries", "maxWriteLines", "maxPathLength"];
        for (zero, name) in zeroed.iter().zip(names) {
            let mut limits = ToolLimits::default();
            zero(&mut limits);
            let err = limits.validate().unwrap_err();
            assert!(
                matches!(err, CoreError::InvalidConfig(ref msg) if msg.contains(name)),
                "{name}: {err}"
            );
        }
    }

    #[test]
    fn test_should_reject_zero_limits() {
        let config = AgentConfig::builder().max_steps(0_u32).build();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, CoreError::InvalidConfig(msg) if msg.contains("max_steps")));

        let config = AgentConfig::builder().history_window(0_u32).build();
        assert!(config.validate().is_err());

        let config = AgentConfig::builder().model("  ").build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_should_merge_project_overrides() {
        let overrides = AgentProjectConfig {
            model: Some("models/other.gguf".to_owned()),
            max_steps: Some(5),
            ..Default::default()
        };

        let config = AgentConfig::default().merged_with(&overrides);
        assert_eq!(config.model(), "models/other.gguf");
        assert_eq!(config.max_steps(), 5);
        assert_eq!(config.max_tokens_per_step(), 512);
    }

    #[test]
    fn test_should_default_tool_limits_to_constants() {
        let limits = ToolLimits::default();
        assert_eq!(limits.max_read_lines, 50);
        assert_eq!(limits.max_grep_results, 20);
        assert_eq!(limits.max_list_entries, 100);
        assert_eq!(limits.max_write_lines, 200);
        assert_eq!(limits.max_path_length, 256);
    }

    #[test]
    fn test_should_deserialize_full_project_config() {
        let yaml = r#"
agent:
  model: models/coder.gguf
  maxSteps: 40
  historyWindow: 4
limits:
  maxReadLines: 30
  maxGrepResults: 10
prompts:
  include:
    - .tether/prompts
display:
  resultChars: 500
"#;

        let config: ProjectConfig = serde_yaml::from_str(yaml).expect("should parse YAML");

        assert_eq!(config.agent.model.as_deref(), Some("models/coder.gguf"));
        assert_eq!(config.agent.max_steps, Some(40));
        assert_eq!(config.agent.history_window, Some(4));
        assert!(config.agent.context_window.is_none());
        assert_eq!(config.limits.max_read_lines, 30);
        assert_eq!(config.limits.max_grep_results, 10);
        // unspecified limits keep their defaults
        assert_eq!(config.limits.max_write_lines, 200);
        assert_eq!(config.prompts.include.len(), 1);
        assert_eq!(config.display.result_chars, 500);
    }

    #[test]
    fn test_should_serialize_agent_config_to_json() {
        let config = AgentConfig::builder().max_steps(3_u32).build();
        let value = serde_json::to_value(&config).expect("should serialize");
        assert_eq!(value["max_steps"], json!(3));
        assert_eq!(value["model"], json!("models/Qwen3-0.6B-Q8_0.gguf"));
    }

    #[test]
    fn test_should_load_default_when_config_file_missing() {
        let path = PathBuf::from("/nonexistent/config.yaml");
        let config = load_project_config(&path).expect("should return default");
        assert!(config.agent.model.is_none());
        assert_eq!(config.display.result_chars, 1000);
    }

    #[test]
    fn test_should_load_config_from_tempfile() {
        let dir = tempfile::TempDir::new().expect("should create temp dir");
        let config_path = project_config_path(dir.path());
        std::fs::create_dir_all(config_path.parent().expect("has parent"))
            .expect("should create config dir");
        std::fs::write(&config_path, "agent:\n  maxSteps: 7\n").expect("should write config");

        let config = load_project_config(&config_path).expect("should load config");
        assert_eq!(config.agent.max_steps, Some(7));
        assert_eq!(config.limits, ToolLimits::default());
    }

    #[test]
    fn test_should_fail_on_invalid_yaml() {
        let dir = tempfile::TempDir::new().expect("should create temp dir");
        let config_path = dir.path().join("config.yaml");
        std::fs::write(&config_path, "agent: [unclosed").expect("should write config");

        let err = load_project_config(&config_path).unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }
}
