//! Line-oriented file reads and edits.
//!
//! Line numbers are 1-based on the command surface and converted to 0-based
//! indices only inside [`replace_range`], [`insert_at`] and [`delete_range`].
//! Files are rewritten as the lines joined by `\n`, with a trailing newline
//! whenever the file is non-empty.

use std::fs;
use std::io;
use std::path::Path;

use tracing::debug;

use super::{ToolResult, Toolset};
use crate::error::ToolError;

impl Toolset {
    pub(crate) fn try_read_lines(
        &self,
        path: &str,
        start: usize,
        end: usize,
    ) -> Result<ToolResult, ToolError> {
        check_range(start, end)?;
        let requested = end - start + 1;
        let max = self.limits().max_read_lines;
        if requested > max {
            return Err(ToolError::RangeTooLarge { requested, max });
        }

        let resolved = self.resolve(path)?;
        ensure_file(&resolved, path, ToolError::not_found("File", path))?;

        let bytes = fs::read(&resolved).map_err(|e| ToolError::io(path, e))?;
        let content = String::from_utf8_lossy(&bytes);
        let lines = split_lines(&content);

        let mut output = String::new();
        let last = end.min(lines.len());
        let mut returned = 0;
        for number in start..=last {
            let line = lines[number - 1].trim_end_matches('\r');
            output.push_str(&format!("{number}: {line}\n"));
            returned += 1;
        }
        if end > lines.len() {
            output.push_str(&format!("[EOF at line {}]\n", lines.len()));
        }

        debug!(path, start, end, returned, "read lines");
        Ok(ToolResult::ok(output).with_lines_returned(returned))
    }

    pub(crate) fn try_write_lines(
        &self,
        path: &str,
        start: usize,
        end: usize,
        content: &str,
    ) -> Result<ToolResult, ToolError> {
        check_range(start, end)?;
        let resolved = self.resolve(path)?;
        ensure_file(&resolved, path, ToolError::file_not_found_for_edit(path))?;

        let new_lines = self.split_new_content(content)?;
        let written = new_lines.len();
        let lines = read_lines_for_edit(&resolved, path)?;
        check_padding(start, lines.len(), self.limits().max_write_lines)?;

        let lines = replace_range(lines, start, end, new_lines);
        write_lines(&resolved, &lines).map_err(|e| ToolError::io(path, e))?;

        debug!(path, start, end, written, total = lines.len(), "replaced lines");
        Ok(ToolResult::ok(format!(
            "Replaced lines {start}-{end} with {written} new lines.\nFile now has {} lines.\n",
            lines.len()
        )))
    }

    pub(crate) fn try_insert_lines(
        &self,
        path: &str,
        after_line: usize,
        content: &str,
    ) -> Result<ToolResult, ToolError> {
        let resolved = self.resolve(path)?;
        ensure_file(&resolved, path, ToolError::file_not_found_for_edit(path))?;

        let new_lines = self.split_new_content(content)?;
        let inserted = new_lines.len();
        let lines = read_lines_for_edit(&resolved, path)?;

        let lines = insert_at(lines, after_line, new_lines);
        write_lines(&resolved, &lines).map_err(|e| ToolError::io(path, e))?;

        debug!(path, after_line, inserted, total = lines.len(), "inserted lines");
        Ok(ToolResult::ok(format!(
            "Inserted {inserted} lines after line {after_line}.\nFile now has {} lines.\n",
            lines.len()
        )))
    }

    pub(crate) fn try_delete_lines(
        &self,
        path: &str,
        start: usize,
        end: usize,
    ) -> Result<ToolResult, ToolError> {
        check_range(start, end)?;
        let resolved = self.resolve(path)?;
        ensure_file(&resolved, path, ToolError::not_found("File", path))?;

        let lines = read_lines_for_edit(&resolved, path)?;
        let (lines, deleted) = delete_range(lines, start, end)?;
        write_lines(&resolved, &lines).map_err(|e| ToolError::io(path, e))?;

        debug!(path, start, end, deleted, total = lines.len(), "deleted lines");
        Ok(ToolResult::ok(format!(
            "Deleted {deleted} lines.\nFile now has {} lines.\n",
            lines.len()
        )))
    }

    pub(crate) fn try_create_file(&self, path: &str) -> Result<ToolResult, ToolError> {
        let resolved = self.resolve(path)?;
        if resolved.exists() {
            return Err(ToolError::AlreadyExists(path.to_owned()));
        }

        if let Some(parent) = resolved.parent() {
            fs::create_dir_all(parent).map_err(|e| ToolError::io(path, e))?;
        }
        fs::File::create_new(&resolved).map_err(|e| match e.kind() {
            io::ErrorKind::AlreadyExists => ToolError::AlreadyExists(path.to_owned()),
            _ => ToolError::io(path, e),
        })?;

        debug!(path, "created file");
        Ok(ToolResult::ok(format!("Created empty file: {path}\n")))
    }

    fn split_new_content(&self, content: &str) -> Result<Vec<String>, ToolError> {
        let lines = split_lines(content);
        let max = self.limits().max_write_lines;
        if lines.len() > max {
            return Err(ToolError::TooManyLines {
                count: lines.len(),
                max,
            });
        }
        Ok(lines.into_iter().map(str::to_owned).collect())
    }
}

/// Padding past EOF is bounded by the write cap, so a huge start line can
/// neither exhaust memory nor grow the file without limit.
fn check_padding(start: usize, len: usize, max_write_lines: usize) -> Result<(), ToolError> {
    if start > len.saturating_add(1).saturating_add(max_write_lines) {
        return Err(ToolError::StartBeyondEof { start, len });
    }
    Ok(())
}

fn check_range(start: usize, end: usize) -> Result<(), ToolError> {
    if start < 1 || end < start {
        return Err(ToolError::InvalidRange(
            "Use 1-indexed positive integers with start <= end.",
        ));
    }
    Ok(())
}

fn ensure_file(resolved: &Path, path: &str, missing: ToolError) -> Result<(), ToolError> {
    if !resolved.exists() {
        return Err(missing);
    }
    if resolved.is_dir() {
        return Err(ToolError::NotAFile(path.to_owned()));
    }
    Ok(())
}

/// Split text into lines on `\n`. A trailing newline does not start an
/// extra empty line, and `\r` is kept so CRLF files round-trip.
pub(crate) fn split_lines(content: &str) -> Vec<&str> {
    if content.is_empty() {
        return Vec::new();
    }
    let body = content.strip_suffix('\n').unwrap_or(content);
    body.split('\n').collect()
}

/// Edits require valid UTF-8 so a rewrite never mangles the file.
fn read_lines_for_edit(resolved: &Path, path: &str) -> Result<Vec<String>, ToolError> {
    let content = fs::read_to_string(resolved).map_err(|e| ToolError::io(path, e))?;
    Ok(split_lines(&content).into_iter().map(str::to_owned).collect())
}

fn write_lines(resolved: &Path, lines: &[String]) -> io::Result<()> {
    let mut content = lines.join("\n");
    if !lines.is_empty() {
        content.push('\n');
    }
    fs::write(resolved, content)
}

/// Replace lines `start..=end` (1-based) with `new_lines`.
///
/// Lines past the end of the file are clamped; a `start` beyond the end pads
/// the gap with empty lines.
pub(crate) fn replace_range(
    mut lines: Vec<String>,
    start: usize,
    end: usize,
    new_lines: Vec<String>,
) -> Vec<String> {
    let idx_start = start - 1;
    let keep_before = idx_start.min(lines.len());
    let after_from = end.min(lines.len()).max(keep_before);

    let after = lines.split_off(after_from);
    lines.truncate(keep_before);
    lines.resize(idx_start, String::new());
    lines.extend(new_lines);
    lines.extend(after);
    lines
}

/// Insert `new_lines` after line `after_line` (0 = top), clamped to the end.
pub(crate) fn insert_at(
    mut lines: Vec<String>,
    after_line: usize,
    new_lines: Vec<String>,
) -> Vec<String> {
    let pos = after_line.min(lines.len());
    lines.splice(pos..pos, new_lines);
    lines
}

/// Remove lines `start..=end` (1-based), clamping `end`. Returns the new
/// lines and the number removed.
pub(crate) fn delete_range(
    mut lines: Vec<String>,
    start: usize,
    end: usize,
) -> Result<(Vec<String>, usize), ToolError> {
    let idx_start = start - 1;
    if idx_start >= lines.len() {
        return Err(ToolError::StartBeyondEof {
            start,
            len: lines.len(),
        });
    }
    let idx_end = end.min(lines.len());
    lines.drain(idx_start..idx_end);
    Ok((lines, idx_end - idx_start))
}
