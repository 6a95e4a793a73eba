//! Sandboxed tool interpreter.
//!
//! [`Toolset`] owns the [`WorkingRoot`] and turns one [`ToolCommand`] into
//! bounded filesystem reads or line edits. It knows nothing about models:
//! command in, [`ToolResult`] out. Every failure, including a path that
//! escapes the root, comes back as a `ToolResult` with `success = false`.

mod edit;
mod query;
mod sandbox;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

pub use sandbox::WorkingRoot;

use crate::command::ToolCommand;
use crate::config::ToolLimits;
use crate::error::{CoreError, ToolError};
use crate::protocol::CommandKind;

/// Outcome of one command.
///
/// Either `success` with `output`, or failure with `error`. FILE_INFO on a
/// missing path is a success that reports the absence in `output`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    pub output: String,
    pub error: String,
    /// Lines (or matches, or entries) actually returned.
    pub lines_returned: usize,
    /// Output was capped.
    pub truncated: bool,
    /// Set only by FINISH.
    pub finished: bool,
}

impl ToolResult {
    pub(crate) fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            ..Default::default()
        }
    }

    pub(crate) fn failure(error: &ToolError) -> Self {
        Self {
            success: false,
            error: error.to_string(),
            ..Default::default()
        }
    }

    pub(crate) fn with_lines_returned(mut self, lines: usize) -> Self {
        self.lines_returned = lines;
        self
    }

    pub(crate) fn with_truncated(mut self, truncated: bool) -> Self {
        self.truncated = truncated;
        self
    }

    /// Text fed back to the model: the output, or the error prefixed with `ERROR:`.
    pub fn observation(&self) -> String {
        if self.success {
            self.output.clone()
        } else {
            format!("ERROR: {}", self.error)
        }
    }
}

impl From<Result<ToolResult, ToolError>> for ToolResult {
    fn from(outcome: Result<ToolResult, ToolError>) -> Self {
        match outcome {
            Ok(result) => result,
            Err(e) => {
                debug!(error = %e, "tool command failed");
                Self::failure(&e)
            }
        }
    }
}

/// Executes commands inside one working root under fixed [`ToolLimits`].
#[derive(Debug, Clone)]
pub struct Toolset {
    root: WorkingRoot,
    limits: ToolLimits,
}

impl Toolset {
    /// Create a toolset rooted at `dir`.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidConfig` if a limit is zero and
    /// `CoreError::InvalidWorkingDirectory` if `dir` is not an existing
    /// directory.
    pub fn new(dir: impl AsRef<Path>, limits: ToolLimits) -> Result<Self, CoreError> {
        limits.validate()?;
        Ok(Self {
            root: WorkingRoot::new(dir)?,
            limits,
        })
    }

    /// The canonical working root.
    pub fn root(&self) -> &Path {
        self.root.path()
    }

    pub fn working_root(&self) -> &WorkingRoot {
        &self.root
    }

    /// Move the working root. The current root is kept if `dir` is invalid.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidWorkingDirectory` if `dir` is not an
    /// existing directory.
    pub fn set_root(&mut self, dir: impl AsRef<Path>) -> Result<(), CoreError> {
        self.root = WorkingRoot::new(dir)?;
        debug!(root = %self.root.path().display(), "working root changed");
        Ok(())
    }

    pub fn limits(&self) -> &ToolLimits {
        &self.limits
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, ToolError> {
        self.root.resolve(path, self.limits.max_path_length)
    }

    /// Parse and execute one raw command.
    #[instrument(skip_all, fields(root = %self.root.path().display()))]
    pub fn execute(&self, raw: &str) -> ToolResult {
        match ToolCommand::parse(raw) {
            Ok(command) => self.run(command),
            Err(e) => ToolResult::from(Err(e)),
        }
    }

    /// Execute an already parsed command.
    pub fn run(&self, command: ToolCommand) -> ToolResult {
        match command {
            ToolCommand::ReadLines { path, start, end } => self.read_lines(&path, start, end),
            ToolCommand::Grep { pattern, path } => self.grep(&pattern, &path),
            ToolCommand::ListDir { path } => self.list_dir(&path),
            ToolCommand::FileInfo { path } => self.file_info(&path),
            ToolCommand::WriteLines {
                path,
                start,
                end,
                content,
            } => self.write_lines(&path, start, end, &content),
            ToolCommand::InsertLines {
                path,
                after_line,
                content,
            } => self.insert_lines(&path, after_line, &content),
            ToolCommand::DeleteLines { path, start, end } => self.delete_lines(&path, start, end),
            ToolCommand::CreateFile { path } => self.create_file(&path),
            ToolCommand::Finish { summary } => self.finish(&summary),
            ToolCommand::Unknown { raw } => {
                let name = raw.split_whitespace().next().unwrap_or_default();
                ToolResult::from(Err(ToolError::UnknownCommand {
                    name: name.to_owned(),
                    available: CommandKind::vocabulary(),
                }))
            }
        }
    }

    /// Lines `start..=end` (1-based) of a file, numbered, capped at
    /// `max_read_lines` requested lines. A range past the end returns the
    /// lines that exist plus an `[EOF at line N]` marker.
    pub fn read_lines(&self, path: &str, start: usize, end: usize) -> ToolResult {
        self.try_read_lines(path, start, end).into()
    }

    /// Case-insensitive regex search of a file or the files directly inside a
    /// directory, capped at `max_grep_results` matches.
    pub fn grep(&self, pattern: &str, path: &str) -> ToolResult {
        self.try_grep(pattern, path).into()
    }

    /// Sorted entry names, directories suffixed with `/`.
    pub fn list_dir(&self, path: &str) -> ToolResult {
        self.try_list_dir(path).into()
    }

    /// Existence, type, size and line or entry count. Never file contents.
    pub fn file_info(&self, path: &str) -> ToolResult {
        self.try_file_info(path).into()
    }

    /// Replace lines `start..=end` of an existing file with `content`.
    pub fn write_lines(&self, path: &str, start: usize, end: usize, content: &str) -> ToolResult {
        self.try_write_lines(path, start, end, content).into()
    }

    /// Insert `content` after line `after_line` (0 = top, clamped to the end).
    pub fn insert_lines(&self, path: &str, after_line: usize, content: &str) -> ToolResult {
        self.try_insert_lines(path, after_line, content).into()
    }

    /// Delete lines `start..=end`, clamping `end` to the file length.
    pub fn delete_lines(&self, path: &str, start: usize, end: usize) -> ToolResult {
        self.try_delete_lines(path, start, end).into()
    }

    /// Create an empty file and any missing parents. Fails if it exists.
    pub fn create_file(&self, path: &str) -> ToolResult {
        self.try_create_file(path).into()
    }

    /// Signal task completion. No filesystem effect.
    pub fn finish(&self, summary: &str) -> ToolResult {
        ToolResult {
            finished: true,
            ..ToolResult::ok(summary)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn toolset_with(files: &[(&str, &str)]) -> (tempfile::TempDir, Toolset) {
        let dir = tempfile::TempDir::new().expect("should create temp dir");
        for (path, content) in files {
            let full = dir.path().join(path);
            fs::create_dir_all(full.parent().expect("has parent")).expect("should create dirs");
            fs::write(full, content).expect("should write file");
        }
        let toolset = Toolset::new(dir.path(), ToolLimits::default()).expect("should create toolset");
        (dir, toolset)
    }

    fn ten_lines() -> String {
        (1..=10).map(|i| format!("Line {i}\n")).collect()
    }

    fn five_lines() -> String {
        (1..=5).map(|i| format!("line {i}\n")).collect()
    }

    fn read(dir: &tempfile::TempDir, path: &str) -> String {
        fs::read_to_string(dir.path().join(path)).expect("should read file")
    }

    // ── READ_LINES ──────────────────────────────────────────

    #[test]
    fn test_should_read_requested_range() {
        let (_dir, tools) = toolset_with(&[("file.txt", &ten_lines())]);

        let result = tools.execute("READ_LINES file.txt 3-5");
        assert!(result.success, "{}", result.error);
        assert_eq!(result.lines_returned, 3);
        assert_eq!(result.output, "3: Line 3\n4: Line 4\n5: Line 5\n");
        assert!(!result.truncated);
        assert!(!result.finished);
    }

    #[test]
    fn test_should_clamp_read_past_eof_and_mark_it() {
        let (_dir, tools) = toolset_with(&[("file.txt", &ten_lines())]);

        let result = tools.read_lines("file.txt", 8, 15);
        assert!(result.success);
        assert_eq!(result.lines_returned, 3);
        assert_eq!(result.output, "8: Line 8\n9: Line 9\n10: Line 10\n[EOF at line 10]\n");
    }

    #[test]
    fn test_should_refuse_oversized_read_before_touching_disk() {
        let (_dir, tools) = toolset_with(&[]);

        // the file does not exist: the cap must trigger first
        let result = tools.read_lines("missing.txt", 1, 100);
        assert!(!result.success);
        assert!(result.error.contains("Too many lines requested (100)"));
        assert!(result.output.is_empty());
    }

    #[test]
    fn test_should_reject_invalid_read_range() {
        let (_dir, tools) = toolset_with(&[("file.txt", "a\n")]);
        assert!(tools.read_lines("file.txt", 0, 3).error.contains("Invalid line range"));
        assert!(tools.read_lines("file.txt", 5, 2).error.contains("Invalid line range"));
    }

    #[test]
    fn test_should_report_missing_file_on_read() {
        let (_dir, tools) = toolset_with(&[]);
        let result = tools.read_lines("nonexistent.txt", 1, 5);
        assert!(!result.success);
        assert!(result.error.contains("not found"));
    }

    #[test]
    fn test_should_refuse_reading_directory() {
        let (_dir, tools) = toolset_with(&[("src/lib.rs", "")]);
        let result = tools.read_lines("src", 1, 5);
        assert!(result.error.contains("Not a file"));
    }

    // ── GREP ────────────────────────────────────────────────

    #[test]
    fn test_should_grep_case_insensitively_in_file() {
        let (_dir, tools) = toolset_with(&[("main.rs", "fn main() {\n    println!(\"Hi\");\n}\n")]);

        let result = tools.execute("GREP PRINTLN main.rs");
        assert!(result.success);
        assert_eq!(result.lines_returned, 1);
        assert_eq!(result.output, "main.rs:2:     println!(\"Hi\");\n");
    }

    #[test]
    fn test_should_grep_directory_shallowly_in_name_order() {
        let (_dir, tools) = toolset_with(&[
            ("b.txt", "needle b\n"),
            ("a.txt", "hay\nneedle a\n"),
            ("deep/c.txt", "needle c\n"),
        ]);

        let result = tools.grep("needle", ".");
        assert!(result.success);
        assert_eq!(result.output, "a.txt:2: needle a\nb.txt:1: needle b\n");
        assert_eq!(result.lines_returned, 2);
    }

    #[test]
    fn test_should_truncate_grep_at_cap() {
        let content: String = (0..30).map(|i| format!("match {i}\n")).collect();
        let (_dir, tools) = toolset_with(&[("a_many.txt", &content), ("z_later.txt", "match\n")]);

        let result = tools.grep("match", ".");
        assert!(result.success);
        assert!(result.truncated);
        assert_eq!(result.lines_returned, 20);
        assert!(result.output.ends_with("[Results truncated at 20 matches]\n"));
        assert!(!result.output.contains("z_later.txt"));
    }

    #[test]
    fn test_should_report_no_matches_as_success() {
        let (_dir, tools) = toolset_with(&[("a.txt", "hello\n")]);

        let result = tools.grep("absent", "a.txt");
        assert!(result.success);
        assert_eq!(result.output, "No matches found for pattern: absent\n");
        assert_eq!(result.lines_returned, 0);
    }

    #[test]
    fn test_should_fail_on_invalid_pattern() {
        let (_dir, tools) = toolset_with(&[("a.txt", "hello\n")]);

        let result = tools.grep("(unclosed", "a.txt");
        assert!(!result.success);
        assert!(result.error.starts_with("Invalid regex pattern"));

        // pattern errors win over path errors
        let result = tools.grep("[", "missing");
        assert!(result.error.starts_with("Invalid regex pattern"));
    }

    #[test]
    fn test_should_fail_grep_on_missing_path() {
        let (_dir, tools) = toolset_with(&[]);
        let result = tools.grep("x", "nowhere");
        assert!(!result.success);
        assert!(result.error.contains("Path not found: nowhere"));
    }

    // ── LIST ────────────────────────────────────────────────

    #[test]
    fn test_should_list_sorted_with_dir_marker() {
        let (_dir, tools) = toolset_with(&[("zeta.rs", ""), ("alpha.rs", ""), ("src/lib.rs", "")]);

        let result = tools.execute("LIST .");
        assert!(result.success);
        assert_eq!(result.output, "alpha.rs\nsrc/\nzeta.rs\n");
        assert_eq!(result.lines_returned, 3);
    }

    #[test]
    fn test_should_cap_listing_and_report_remainder() {
        let dir = tempfile::TempDir::new().expect("should create temp dir");
        for i in 0..105 {
            fs::write(dir.path().join(format!("f{i:03}")), "").expect("should write file");
        }
        let tools = Toolset::new(dir.path(), ToolLimits::default()).expect("should create toolset");

        let result = tools.list_dir(".");
        assert!(result.success);
        assert!(result.truncated);
        assert_eq!(result.lines_returned, 100);
        assert!(result.output.ends_with("f099\n[... 5 more entries]\n"));
    }

    #[test]
    fn test_should_mark_empty_directory() {
        let (dir, tools) = toolset_with(&[]);
        fs::create_dir(dir.path().join("empty")).expect("should create dir");

        let result = tools.list_dir("empty");
        assert!(result.success);
        assert_eq!(result.output, "[Empty directory]\n");
    }

    #[test]
    fn test_should_fail_listing_missing_or_file() {
        let (_dir, tools) = toolset_with(&[("a.txt", "")]);
        assert!(tools.list_dir("nope").error.contains("Directory not found"));
        assert!(tools.list_dir("a.txt").error.contains("Not a directory"));
    }

    // ── FILE_INFO ───────────────────────────────────────────

    #[test]
    fn test_should_report_file_info() {
        let (_dir, tools) = toolset_with(&[("info.txt", "Line 1\nLine 2\nLine 3\n")]);

        let result = tools.execute("FILE_INFO info.txt");
        assert!(result.success);
        assert_eq!(
            result.output,
            "exists: true\npath: info.txt\ntype: file\nsize_bytes: 21\nline_count: 3\n"
        );
    }

    #[test]
    fn test_should_report_directory_entries() {
        let (_dir, tools) = toolset_with(&[("src/a.rs", ""), ("src/b.rs", "")]);
        let result = tools.file_info("src");
        assert!(result.output.contains("type: directory\nentries: 2\n"));
    }

    #[test]
    fn test_should_report_absence_idempotently() {
        let (_dir, tools) = toolset_with(&[]);

        let first = tools.file_info("ghost.txt");
        let second = tools.file_info("ghost.txt");
        assert!(first.success);
        assert!(first.output.contains("exists: false"));
        assert_eq!(first, second);
    }

    #[test]
    fn test_should_count_last_line_without_newline() {
        let (_dir, tools) = toolset_with(&[("no_nl.txt", "a\nb")]);
        assert!(tools.file_info("no_nl.txt").output.contains("line_count: 2\n"));
    }

    // ── WRITE ───────────────────────────────────────────────

    #[test]
    fn test_should_replace_lines_end_to_end() {
        let (dir, tools) = toolset_with(&[("file.txt", &five_lines())]);

        let result = tools.execute("WRITE file.txt 2-3\nnew two\nnew three\nEND_WRITE");
        assert!(result.success, "{}", result.error);
        assert!(result.output.contains("File now has 5 lines."));
        assert_eq!(
            read(&dir, "file.txt"),
            "line 1\nnew two\nnew three\nline 4\nline 5\n"
        );
    }

    #[test]
    fn test_should_read_back_written_range_verbatim() {
        let (_dir, tools) = toolset_with(&[("file.txt", &five_lines())]);

        tools.write_lines("file.txt", 4, 4, "    indented\nplain");
        let result = tools.read_lines("file.txt", 4, 5);
        assert_eq!(result.output, "4:     indented\n5: plain\n");
    }

    #[test]
    fn test_should_require_existing_file_for_write() {
        let (_dir, tools) = toolset_with(&[]);
        let result = tools.write_lines("new.txt", 1, 1, "x");
        assert!(!result.success);
        assert!(result.error.contains("Use CREATE first"));
    }

    #[test]
    fn test_should_cap_written_lines() {
        let (dir, tools) = toolset_with(&[("file.txt", "keep\n")]);
        let body = "x\n".repeat(201);

        let result = tools.write_lines("file.txt", 1, 1, &body);
        assert!(!result.success);
        assert!(result.error.contains("Too many lines to write (201)"));
        assert_eq!(read(&dir, "file.txt"), "keep\n");
    }

    #[test]
    fn test_should_write_past_eof_with_padding() {
        let (dir, tools) = toolset_with(&[("file.txt", "a\n")]);
        let result = tools.write_lines("file.txt", 3, 3, "c");
        assert!(result.success);
        assert_eq!(read(&dir, "file.txt"), "a\n\nc\n");
    }

    #[test]
    fn test_should_refuse_zero_limits() {
        let dir = tempfile::TempDir::new().expect("should create temp dir");
        let limits = ToolLimits {
            max_grep_results: 0,
            ..ToolLimits::default()
        };
        assert!(matches!(
            Toolset::new(dir.path(), limits),
            Err(CoreError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_should_reject_write_start_far_past_eof() {
        let (dir, tools) = toolset_with(&[("f.txt", "only\n")]);

        for raw in [
            "WRITE f.txt 4611686018427387904-4611686018427387904\nx\nEND_WRITE",
            "WRITE f.txt 5000000-5000000\nx\nEND_WRITE",
        ] {
            let result = tools.execute(raw);
            assert!(!result.success);
            assert!(
                result.error.contains("beyond end of file (1 lines)"),
                "{}",
                result.error
            );
            assert_eq!(read(&dir, "f.txt"), "only\n");
        }
    }

    #[test]
    fn test_should_bound_padding_by_write_cap() {
        let (dir, tools) = toolset_with(&[("f.txt", "only\n")]);
        let max = ToolLimits::MAX_WRITE_LINES;

        let result = tools.write_lines("f.txt", max + 3, max + 3, "x");
        assert!(!result.success);

        let result = tools.write_lines("f.txt", max + 2, max + 2, "x");
        assert!(result.success, "{}", result.error);
        assert_eq!(read(&dir, "f.txt").lines().count(), max + 2);
    }

    // ── INSERT ──────────────────────────────────────────────

    #[test]
    fn test_should_insert_at_beginning_and_clamp_past_end() {
        let (dir, tools) = toolset_with(&[("file.txt", "a\nb\n")]);

        let result = tools.execute("INSERT file.txt 0\nfirst\nEND_INSERT");
        assert!(result.success, "{}", result.error);
        assert_eq!(read(&dir, "file.txt"), "first\na\nb\n");

        let result = tools.insert_lines("file.txt", 42, "last");
        assert!(result.success);
        assert!(result.output.contains("File now has 4 lines."));
        assert_eq!(read(&dir, "file.txt"), "first\na\nb\nlast\n");
    }

    #[test]
    fn test_should_cap_inserted_lines() {
        let (_dir, tools) = toolset_with(&[("file.txt", "a\n")]);
        let result = tools.insert_lines("file.txt", 0, &"x\n".repeat(250));
        assert!(result.error.contains("Too many lines"));
    }

    // ── DELETE_LINES ────────────────────────────────────────

    #[test]
    fn test_should_delete_lines_end_to_end() {
        let (dir, tools) = toolset_with(&[("file.txt", &five_lines())]);

        let result = tools.execute("DELETE_LINES file.txt 2-4");
        assert!(result.success, "{}", result.error);
        assert!(result.output.starts_with("Deleted 3 lines."));
        assert_eq!(read(&dir, "file.txt"), "line 1\nline 5\n");
    }

    #[test]
    fn test_should_fail_delete_starting_past_eof() {
        let (dir, tools) = toolset_with(&[("file.txt", "a\nb\n")]);
        let result = tools.delete_lines("file.txt", 3, 4);
        assert!(!result.success);
        assert!(result.error.contains("beyond end of file"));
        assert_eq!(read(&dir, "file.txt"), "a\nb\n");
    }

    // ── CREATE ──────────────────────────────────────────────

    #[test]
    fn test_should_create_nested_file_once() {
        let (dir, tools) = toolset_with(&[]);

        let result = tools.execute("CREATE new/nested.txt");
        assert!(result.success, "{}", result.error);
        assert!(dir.path().join("new").is_dir());
        assert_eq!(read(&dir, "new/nested.txt"), "");

        let again = tools.execute("CREATE new/nested.txt");
        assert!(!again.success);
        assert!(again.error.contains("already exists"));
    }

    #[test]
    fn test_should_write_after_create() {
        let (dir, tools) = toolset_with(&[]);
        tools.create_file("notes.md");

        let result = tools.write_lines("notes.md", 1, 1, "# Notes");
        assert!(result.success, "{}", result.error);
        assert_eq!(read(&dir, "notes.md"), "# Notes\n");
    }

    // ── FINISH / dispatch ───────────────────────────────────

    #[test]
    fn test_should_finish_with_summary() {
        let (_dir, tools) = toolset_with(&[]);
        let result = tools.execute("FINISH Added the helper.");
        assert!(result.success);
        assert!(result.finished);
        assert_eq!(result.output, "Added the helper.");
    }

    #[test]
    fn test_should_list_vocabulary_for_unknown_command() {
        let (_dir, tools) = toolset_with(&[]);
        let result = tools.execute("  cat file.txt");
        assert!(!result.success);
        assert!(result.error.starts_with("Unknown command: cat"));
        assert!(result.error.contains("READ_LINES, GREP, LIST"));
    }

    #[test]
    fn test_should_fail_empty_command() {
        let (_dir, tools) = toolset_with(&[]);
        let result = tools.execute("   ");
        assert_eq!(result.error, "Empty command.");
    }

    #[test]
    fn test_should_report_observation_text() {
        let (_dir, tools) = toolset_with(&[]);
        assert_eq!(tools.execute("FINISH done").observation(), "done");
        assert_eq!(tools.execute("").observation(), "ERROR: Empty command.");
    }

    // ── Sandbox ─────────────────────────────────────────────

    #[test]
    fn test_should_block_escapes_for_every_command() {
        let outside = tempfile::TempDir::new().expect("should create temp dir");
        let victim = outside.path().join("victim.txt");
        fs::write(&victim, "untouched\n").expect("should write file");
        let victim_str = victim.to_str().expect("utf-8 path");

        let (_dir, tools) = toolset_with(&[]);
        let commands = [
            "READ_LINES ../../etc/passwd 1-5".to_owned(),
            format!("READ_LINES {victim_str} 1-1"),
            "GREP root ../../etc".to_owned(),
            "LIST ..".to_owned(),
            "FILE_INFO /etc/passwd".to_owned(),
            format!("WRITE {victim_str} 1-1\nowned\nEND_WRITE"),
            format!("INSERT {victim_str} 0\nowned\nEND_INSERT"),
            format!("DELETE_LINES {victim_str} 1-1"),
            format!("CREATE {}", outside.path().join("new.txt").display()),
        ];

        for command in &commands {
            let result = tools.execute(command);
            assert!(!result.success, "{command} should fail");
            assert!(
                result.error.starts_with("Path outside working directory"),
                "{command}: {}",
                result.error
            );
        }

        assert_eq!(fs::read_to_string(&victim).expect("should read"), "untouched\n");
        assert!(!outside.path().join("new.txt").exists());
    }

    #[test]
    fn test_should_keep_root_when_setter_rejects() {
        let (dir, mut tools) = toolset_with(&[("a.txt", "")]);
        let before = tools.root().to_path_buf();

        assert!(tools.set_root(dir.path().join("missing")).is_err());
        assert!(tools.set_root(dir.path().join("a.txt")).is_err());
        assert_eq!(tools.root(), before);

        fs::create_dir(dir.path().join("sub")).expect("should create dir");
        tools.set_root(dir.path().join("sub")).expect("should move root");
        assert!(tools.root().ends_with("sub"));
    }

    #[test]
    fn test_should_apply_custom_limits() {
        let dir = tempfile::TempDir::new().expect("should create temp dir");
        fs::write(dir.path().join("f.txt"), "a\nb\nc\n").expect("should write file");
        let limits = ToolLimits {
            max_read_lines: 2,
            ..ToolLimits::default()
        };
        let tools = Toolset::new(dir.path(), limits).expect("should create toolset");

        assert!(tools.read_lines("f.txt", 1, 2).success);
        assert!(tools.read_lines("f.txt", 1, 3).error.contains("Maximum is 2"));
    }
}
