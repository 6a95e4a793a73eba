//! Terminal rendering of agent events.

use std::io::Write as _;

use tether_core::{AgentObserver, ToolResult};

/// Result lines shown per step before eliding the rest.
const MAX_RESULT_LINES: usize = 20;

/// Prints thoughts, commands and results as they happen.
#[derive(Debug, Default)]
pub struct ConsoleObserver {
    /// Echo generated tokens while the model is thinking.
    stream: bool,
    streaming: bool,
}

impl ConsoleObserver {
    pub fn new(stream: bool) -> Self {
        Self {
            stream,
            streaming: false,
        }
    }

    fn end_stream(&mut self) {
        if self.streaming {
            println!();
            self.streaming = false;
        }
    }
}

impl AgentObserver for ConsoleObserver {
    fn on_thought(&mut self, thought: &str) {
        self.end_stream();
        println!("THOUGHT: {thought}");
    }

    fn on_command(&mut self, command: &str) {
        println!("CMD: {command}");
    }

    fn on_tool_result(&mut self, result: &ToolResult) {
        println!("{}", format_result(result, MAX_RESULT_LINES));
    }

    fn on_progress(&mut self, message: &str) {
        self.end_stream();
        println!("── {message} ──");
    }

    fn on_finish(&mut self, summary: &str) {
        println!("✓ {summary}");
    }

    fn on_error(&mut self, error: &str) {
        self.end_stream();
        eprintln!("✗ {error}");
    }

    fn on_stream(&mut self, token: &str) {
        if !self.stream {
            return;
        }
        self.streaming = true;
        print!("{token}");
        let _ = std::io::stdout().flush();
    }
}

/// Indented observation text, cut after `max_lines` lines.
pub fn format_result(result: &ToolResult, max_lines: usize) -> String {
    let text = result.observation();
    let lines: Vec<&str> = text.lines().collect();
    let mut out: Vec<String> = lines
        .iter()
        .take(max_lines)
        .map(|line| format!("  {line}"))
        .collect();
    if lines.len() > max_lines {
        out.push(format!("  [{} more lines]", lines.len() - max_lines));
    }
    out.join("\n")
}
