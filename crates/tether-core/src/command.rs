//! Parsing of one action line into a [`ToolCommand`].
//!
//! Arguments are either a double-quoted segment (which may contain spaces)
//! or a single whitespace-delimited word, consumed left to right. Escaped
//! quotes inside a quoted segment are not supported: the segment ends at the
//! next `"`.

use serde::{Deserialize, Serialize};

use crate::error::ToolError;
use crate::protocol::{CommandKind, END_INSERT, END_WRITE};

/// One parsed action. Line numbers are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ToolCommand {
    ReadLines {
        path: String,
        start: usize,
        end: usize,
    },
    Grep {
        pattern: String,
        path: String,
    },
    ListDir {
        path: String,
    },
    FileInfo {
        path: String,
    },
    WriteLines {
        path: String,
        start: usize,
        end: usize,
        content: String,
    },
    InsertLines {
        path: String,
        after_line: usize,
        content: String,
    },
    DeleteLines {
        path: String,
        start: usize,
        end: usize,
    },
    CreateFile {
        path: String,
    },
    Finish {
        summary: String,
    },
    /// A verb outside the vocabulary; carries the command text as given.
    Unknown {
        raw: String,
    },
}

impl ToolCommand {
    /// Parse raw command text.
    ///
    /// Leading whitespace is ignored and the verb is matched
    /// case-insensitively. An unrecognized verb is not an error here; it
    /// yields [`ToolCommand::Unknown`] so the interpreter can report the
    /// vocabulary back to the model.
    ///
    /// # Errors
    ///
    /// Returns `ToolError::EmptyCommand` for blank input,
    /// `ToolError::InvalidArguments` when arguments do not fit the verb's
    /// usage form, `ToolError::InvalidRange` for a negative insert position,
    /// and `ToolError::MissingContentBlock` when `WRITE`/`INSERT` has no body.
    pub fn parse(raw: &str) -> Result<Self, ToolError> {
        let cmd = raw.trim_start();
        if cmd.is_empty() {
            return Err(ToolError::EmptyCommand);
        }

        let (name, args) = match cmd.char_indices().find(|(_, c)| c.is_whitespace()) {
            Some((idx, c)) => (&cmd[..idx], &cmd[idx + c.len_utf8()..]),
            None => (cmd, ""),
        };

        let Some(kind) = CommandKind::from_name(name) else {
            return Ok(Self::Unknown {
                raw: cmd.trim_end().to_owned(),
            });
        };

        let usage = ToolError::InvalidArguments(kind.usage());
        let mut cursor = ArgCursor::new(args);

        let command = match kind {
            CommandKind::ReadLines => {
                let path = cursor.next_arg().ok_or(usage)?;
                let (start, end) = cursor
                    .next_arg()
                    .and_then(parse_line_range)
                    .ok_or(ToolError::InvalidArguments(kind.usage()))?;
                Self::ReadLines {
                    path: path.to_owned(),
                    start,
                    end,
                }
            }
            CommandKind::Grep => {
                let pattern = cursor.next_arg().ok_or(usage)?;
                let path = cursor.next_arg().unwrap_or(".");
                Self::Grep {
                    pattern: pattern.to_owned(),
                    path: path.to_owned(),
                }
            }
            CommandKind::List => {
                let path = args.trim();
                Self::ListDir {
                    path: if path.is_empty() { "." } else { path }.to_owned(),
                }
            }
            CommandKind::FileInfo => Self::FileInfo {
                path: whole_path(args).ok_or(usage)?,
            },
            CommandKind::Create => Self::CreateFile {
                path: whole_path(args).ok_or(usage)?,
            },
            CommandKind::DeleteLines => {
                let path = cursor.next_arg().ok_or(usage)?;
                let (start, end) = cursor
                    .next_arg()
                    .and_then(parse_line_range)
                    .ok_or(ToolError::InvalidArguments(kind.usage()))?;
                Self::DeleteLines {
                    path: path.to_owned(),
                    start,
                    end,
                }
            }
            CommandKind::Write => {
                let path = cursor.next_arg().ok_or(usage)?;
                let (start, end) = cursor
                    .next_arg()
                    .and_then(parse_line_range)
                    .ok_or(ToolError::InvalidArguments(kind.usage()))?;
                let content = content_block(args, cursor.pos, END_WRITE)?;
                Self::WriteLines {
                    path: path.to_owned(),
                    start,
                    end,
                    content,
                }
            }
            CommandKind::Insert => {
                let path = cursor.next_arg().ok_or(usage)?;
                let line: i64 = cursor
                    .next_arg()
                    .and_then(|s| s.parse().ok())
                    .ok_or(ToolError::InvalidArguments(kind.usage()))?;
                let after_line = usize::try_from(line)
                    .map_err(|_| ToolError::InvalidRange("Use 0 to insert at the beginning."))?;
                let content = content_block(args, cursor.pos, END_INSERT)?;
                Self::InsertLines {
                    path: path.to_owned(),
                    after_line,
                    content,
                }
            }
            CommandKind::Finish => Self::Finish {
                summary: args.to_owned(),
            },
        };

        Ok(command)
    }

    /// The verb of this command, or `None` for [`ToolCommand::Unknown`].
    pub fn kind(&self) -> Option<CommandKind> {
        let kind = match self {
            Self::ReadLines { .. } => CommandKind::ReadLines,
            Self::Grep { .. } => CommandKind::Grep,
            Self::ListDir { .. } => CommandKind::List,
            Self::FileInfo { .. } => CommandKind::FileInfo,
            Self::WriteLines { .. } => CommandKind::Write,
            Self::InsertLines { .. } => CommandKind::Insert,
            Self::DeleteLines { .. } => CommandKind::DeleteLines,
            Self::CreateFile { .. } => CommandKind::Create,
            Self::Finish { .. } => CommandKind::Finish,
            Self::Unknown { .. } => return None,
        };
        Some(kind)
    }
}

/// Left-to-right reader over quoted-or-word arguments.
struct ArgCursor<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> ArgCursor<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn next_arg(&mut self) -> Option<&'a str> {
        let rest = &self.input[self.pos..];
        let trimmed = rest.trim_start();
        self.pos += rest.len() - trimmed.len();
        if trimmed.is_empty() {
            return None;
        }

        if let Some(quoted) = trimmed.strip_prefix('"') {
            let (value, consumed) = match quoted.find('"') {
                Some(close) => (&quoted[..close], close + 2),
                None => (quoted, quoted.len() + 1),
            };
            self.pos += consumed;
            return Some(value);
        }

        let len = trimmed.find(char::is_whitespace).unwrap_or(trimmed.len());
        self.pos += len;
        Some(&trimmed[..len])
    }
}

/// `"3-7"` -> `(3, 7)`. Bounds are validated by the interpreter.
fn parse_line_range(range: &str) -> Option<(usize, usize)> {
    let (start, end) = range.split_once('-')?;
    Some((start.trim().parse().ok()?, end.trim().parse().ok()?))
}

/// The whole argument tail as one path, trailing whitespace removed.
fn whole_path(args: &str) -> Option<String> {
    let path = args.trim();
    (!path.is_empty()).then(|| path.to_owned())
}

/// Body text after the first newline following `from`, cut at `end_marker`.
fn content_block(args: &str, from: usize, end_marker: &'static str) -> Result<String, ToolError> {
    let newline = args[from..]
        .find('\n')
        .ok_or(ToolError::MissingContentBlock { end_marker })?;

    let mut block = &args[from + newline + 1..];
    if let Some(end) = block.find(end_marker) {
        block = &block[..end];
    }
    let block = block.strip_suffix('\n').unwrap_or(block);
    let block = block.strip_suffix('\r').unwrap_or(block);
    Ok(block.to_owned())
}
