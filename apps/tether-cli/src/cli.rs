use std::io::Read as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tether_core::{
    AGENT_GRAMMAR, Agent, AgentConfig, AgentProjectConfig, CancelFlag, CommandKind,
    ProjectConfig, RunOutcome, ScriptedBackend, ToolResult, Toolset, load_project_config,
    project_config_path,
};
use tracing::{info, warn};

use crate::console::ConsoleObserver;

const MAX_SLUG_LEN: usize = 40;

#[derive(Debug, Parser)]
#[command(name = "tether", version, about = "Sandboxed, step-bounded local code agent")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Execute one tool command inside a working directory
    Tool {
        /// Working directory (defaults to current directory)
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,

        /// Command text, e.g. `READ_LINES src/main.rs 1-20`. Use `-` to read it from stdin.
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Print the grammar that constrains model output
    Grammar,

    /// Run the agent loop against recorded model turns
    Replay {
        /// Working directory (defaults to current directory)
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,

        /// Task description
        #[arg(short, long)]
        task: String,

        /// YAML file with the model turns to replay
        #[arg(short, long)]
        script: PathBuf,

        /// Override the step budget
        #[arg(long)]
        max_steps: Option<u32>,

        /// Override the model reference
        #[arg(short, long)]
        model: Option<String>,

        /// Echo generated tokens as they stream
        #[arg(long)]
        stream: bool,
    },
}

/// Recorded model turns: a plain list, or a document with a `turns` key.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Script {
    Turns(Vec<String>),
    Document { turns: Vec<String> },
}

impl Script {
    fn into_turns(self) -> Vec<String> {
        match self {
            Self::Turns(turns) | Self::Document { turns } => turns,
        }
    }
}

impl Cli {
    /// Working directory for log files, and the slug naming the log
    /// directory for commands that run a task.
    pub fn log_context(&self) -> (PathBuf, Option<String>) {
        match &self.command {
            Commands::Replay { dir, task, .. } => (dir.clone(), Some(slugify(task))),
            Commands::Tool { dir, .. } => (dir.clone(), None),
            Commands::Grammar => (PathBuf::from("."), None),
        }
    }

    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Tool { dir, json, command } => {
                let result = execute_tool(&dir, &command)?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&result)?);
                } else if result.success {
                    print!("{}", result.output);
                } else {
                    bail!("{}", result.error);
                }
                Ok(())
            }
            Commands::Grammar => {
                for kind in CommandKind::ALL {
                    println!("# {}", kind.usage());
                }
                println!();
                println!("{AGENT_GRAMMAR}");
                Ok(())
            }
            Commands::Replay {
                dir,
                task,
                script,
                max_steps,
                model,
                stream,
            } => {
                let overrides = AgentProjectConfig {
                    model,
                    max_steps,
                    ..Default::default()
                };
                match replay(&dir, &task, &script, &overrides, stream).await? {
                    RunOutcome::Finished { summary } => println!("\n{summary}"),
                    RunOutcome::Interrupted => eprintln!("interrupted"),
                }
                Ok(())
            }
        }
    }
}

/// Run one raw command through a fresh toolset rooted at `dir`.
fn execute_tool(dir: &Path, words: &[String]) -> Result<ToolResult> {
    let raw = if words.len() == 1 && words[0] == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read command from stdin")?;
        buf
    } else {
        words.join(" ")
    };

    let project = load_project(dir)?;
    let tools = Toolset::new(dir, project.limits)?;
    Ok(tools.execute(&raw))
}

/// Drive the full agent loop with a scripted backend.
async fn replay(
    dir: &Path,
    task: &str,
    script: &Path,
    overrides: &AgentProjectConfig,
    stream: bool,
) -> Result<RunOutcome> {
    let project = load_project(dir)?;
    let config = AgentConfig::default()
        .merged_with(&project.agent)
        .merged_with(overrides);
    let turns = load_script(script)?;
    info!(turns = turns.len(), max_steps = config.max_steps(), "replaying script");

    let mut agent = Agent::new(config, ScriptedBackend::new(turns), ConsoleObserver::new(stream))?
        .with_project_config(&project, dir)?;
    agent.init()?;
    agent.start_task(task, dir)?;

    let cancel = CancelFlag::new();
    let flag = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt requested");
            flag.cancel();
        }
    });

    Ok(agent.run(&cancel).await?)
}

fn load_project(dir: &Path) -> Result<ProjectConfig> {
    let path = project_config_path(dir);
    load_project_config(&path)
        .with_context(|| format!("failed to load project config: {}", path.display()))
}

fn load_script(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read script: {}", path.display()))?;
    let script: Script = serde_yaml::from_str(&content)
        .with_context(|| format!("invalid script: {}", path.display()))?;
    Ok(script.into_turns())
}

/// Lowercase, dash-separated form of a task description for log paths.
fn slugify(text: &str) -> String {
    let mut slug = String::new();
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
        if slug.len() >= MAX_SLUG_LEN {
            break;
        }
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "task".to_owned()
    } else {
        slug.to_owned()
    }
}
