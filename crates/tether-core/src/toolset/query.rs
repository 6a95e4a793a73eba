//! Read-only queries: GREP, LIST and FILE_INFO.

use std::fs;
use std::path::Path;

use regex::RegexBuilder;
use tracing::debug;

use super::edit::split_lines;
use super::{ToolResult, Toolset};
use crate::error::ToolError;

impl Toolset {
    /// Directory search looks at immediate children only, in name order.
    pub(crate) fn try_grep(&self, pattern: &str, path: &str) -> Result<ToolResult, ToolError> {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| ToolError::InvalidPattern(e.to_string()))?;

        let resolved = self.resolve(path)?;
        let files = if resolved.is_dir() {
            let mut files = Vec::new();
            for entry in fs::read_dir(&resolved).map_err(|e| ToolError::io(path, e))? {
                let entry = entry.map_err(|e| ToolError::io(path, e))?;
                // symlinks are skipped: file_type() does not follow them
                if entry.file_type().is_ok_and(|t| t.is_file()) {
                    files.push(entry.path());
                }
            }
            files.sort();
            files
        } else if resolved.exists() {
            vec![resolved]
        } else {
            return Err(ToolError::not_found("Path", path));
        };

        let max = self.limits().max_grep_results;
        let mut output = String::new();
        let mut matches = 0;
        let mut truncated = false;

        'files: for file in &files {
            let bytes = match fs::read(file) {
                Ok(bytes) => bytes,
                Err(e) => {
                    debug!(file = %file.display(), error = %e, "grep skipped unreadable file");
                    continue;
                }
            };
            let content = String::from_utf8_lossy(&bytes);
            let display = self.working_root().display_relative(file);

            for (idx, line) in split_lines(&content).into_iter().enumerate() {
                let line = line.trim_end_matches('\r');
                if !regex.is_match(line) {
                    continue;
                }
                output.push_str(&format!("{display}:{}: {line}\n", idx + 1));
                matches += 1;
                if matches >= max {
                    truncated = true;
                    break 'files;
                }
            }
        }

        if matches == 0 {
            output.push_str(&format!("No matches found for pattern: {pattern}\n"));
        } else if truncated {
            output.push_str(&format!("[Results truncated at {max} matches]\n"));
        }

        debug!(pattern, path, files = files.len(), matches, truncated, "grep");
        Ok(ToolResult::ok(output)
            .with_lines_returned(matches)
            .with_truncated(truncated))
    }

    pub(crate) fn try_list_dir(&self, path: &str) -> Result<ToolResult, ToolError> {
        let resolved = self.resolve(path)?;
        if !resolved.exists() {
            return Err(ToolError::not_found("Directory", path));
        }
        if !resolved.is_dir() {
            return Err(ToolError::NotADirectory(path.to_owned()));
        }

        let mut entries = Vec::new();
        for entry in fs::read_dir(&resolved).map_err(|e| ToolError::io(path, e))? {
            let entry = entry.map_err(|e| ToolError::io(path, e))?;
            let mut name = entry.file_name().to_string_lossy().into_owned();
            if entry.path().is_dir() {
                name.push('/');
            }
            entries.push(name);
        }
        entries.sort();

        let max = self.limits().max_list_entries;
        let shown = entries.len().min(max);
        let mut output = String::new();
        for name in &entries[..shown] {
            output.push_str(name);
            output.push('\n');
        }

        let truncated = entries.len() > max;
        if truncated {
            output.push_str(&format!("[... {} more entries]\n", entries.len() - max));
        }
        if entries.is_empty() {
            output.push_str("[Empty directory]\n");
        }

        debug!(path, entries = entries.len(), truncated, "listed directory");
        Ok(ToolResult::ok(output)
            .with_lines_returned(shown)
            .with_truncated(truncated))
    }

    /// Absence is reported in the output, not as a failure.
    pub(crate) fn try_file_info(&self, path: &str) -> Result<ToolResult, ToolError> {
        let resolved = self.resolve(path)?;
        if !resolved.exists() {
            return Ok(ToolResult::ok(format!("exists: false\npath: {path}\n")));
        }

        let mut output = format!("exists: true\npath: {path}\n");
        if resolved.is_dir() {
            let count = fs::read_dir(&resolved)
                .map_err(|e| ToolError::io(path, e))?
                .count();
            output.push_str(&format!("type: directory\nentries: {count}\n"));
        } else {
            let (size, lines) = file_stats(&resolved).map_err(|e| ToolError::io(path, e))?;
            output.push_str(&format!("type: file\nsize_bytes: {size}\nline_count: {lines}\n"));
        }

        Ok(ToolResult::ok(output))
    }
}

/// Byte size and line count, counted the same way the editor splits lines.
fn file_stats(path: &Path) -> std::io::Result<(u64, usize)> {
    let bytes = fs::read(path)?;
    let newlines = bytes.iter().filter(|b| **b == b'\n').count();
    let lines = match bytes.last() {
        None => 0,
        Some(b'\n') => newlines,
        Some(_) => newlines + 1,
    };
    Ok((bytes.len() as u64, lines))
}
