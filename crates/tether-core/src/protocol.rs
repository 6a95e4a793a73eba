//! The fixed command vocabulary and its textual grammar.
//!
//! Every model turn is one reasoning line and one action line:
//!
//! ```text
//! THOUGHT: <reasoning>
//! CMD: <VERB> <arguments>
//! ```
//!
//! `WRITE` and `INSERT` carry a multi-line body after the action line,
//! closed by `END_WRITE` / `END_INSERT`. [`AGENT_GRAMMAR`] is the GBNF form of
//! this contract and is handed to the inference backend on every call.

use std::fmt;

/// Prefix of the reasoning line.
pub const THOUGHT_MARKER: &str = "THOUGHT:";

/// Prefix of the action line.
pub const ACTION_MARKER: &str = "CMD:";

/// Terminates a `WRITE` body.
pub const END_WRITE: &str = "END_WRITE";

/// Terminates an `INSERT` body.
pub const END_INSERT: &str = "END_INSERT";

/// GBNF grammar constraining generation to one well-formed turn.
pub const AGENT_GRAMMAR: &str = r#"root ::= thought command

thought ::= "THOUGHT: " thought-text "\n"
thought-text ::= [^\n]+

command ::= "CMD: " cmd-body

cmd-body ::= read-cmd | grep-cmd | list-cmd | file-info-cmd | create-cmd | write-cmd | insert-cmd | delete-cmd | finish-cmd

read-cmd ::= "READ_LINES " path " " line-range "\n"
grep-cmd ::= "GREP " pattern " " path "\n"
list-cmd ::= "LIST " path "\n"
file-info-cmd ::= "FILE_INFO " path "\n"
create-cmd ::= "CREATE " path "\n"
write-cmd ::= "WRITE " path " " line-range "\n" content-block "END_WRITE\n"
insert-cmd ::= "INSERT " path " " number "\n" content-block "END_INSERT\n"
delete-cmd ::= "DELETE_LINES " path " " line-range "\n"
finish-cmd ::= "FINISH " [^\n]+ "\n"

line-range ::= number "-" number
number ::= [0-9]+
path ::= [a-zA-Z0-9_./-]+
pattern ::= "\"" [^"]* "\"" | [a-zA-Z0-9_.*?|\\^$()+{}\[\]-]+
content-block ::= content-line*
content-line ::= [^\n]* "\n"
"#;

/// The nine verbs a model may issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    ReadLines,
    Grep,
    List,
    FileInfo,
    Write,
    Insert,
    DeleteLines,
    Create,
    Finish,
}

impl CommandKind {
    /// All verbs in the order they are presented to the model.
    pub const ALL: [CommandKind; 9] = [
        CommandKind::ReadLines,
        CommandKind::Grep,
        CommandKind::List,
        CommandKind::FileInfo,
        CommandKind::Write,
        CommandKind::Insert,
        CommandKind::DeleteLines,
        CommandKind::Create,
        CommandKind::Finish,
    ];

    /// The verb as it appears on the wire.
    pub fn name(self) -> &'static str {
        match self {
            Self::ReadLines => "READ_LINES",
            Self::Grep => "GREP",
            Self::List => "LIST",
            Self::FileInfo => "FILE_INFO",
            Self::Write => "WRITE",
            Self::Insert => "INSERT",
            Self::DeleteLines => "DELETE_LINES",
            Self::Create => "CREATE",
            Self::Finish => "FINISH",
        }
    }

    /// Usage form shown in prompts and in argument errors.
    pub fn usage(self) -> &'static str {
        match self {
            Self::ReadLines => "READ_LINES <path> <start>-<end>",
            Self::Grep => "GREP <pattern> <path>",
            Self::List => "LIST <path>",
            Self::FileInfo => "FILE_INFO <path>",
            Self::Write => "WRITE <path> <start>-<end> (new lines follow, then END_WRITE)",
            Self::Insert => "INSERT <path> <after_line> (new lines follow, then END_INSERT)",
            Self::DeleteLines => "DELETE_LINES <path> <start>-<end>",
            Self::Create => "CREATE <path>",
            Self::Finish => "FINISH <summary>",
        }
    }

    /// Case-insensitive lookup of a verb.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name))
    }

    /// Comma-separated list of every verb, for error messages.
    pub fn vocabulary() -> String {
        Self::ALL
            .iter()
            .map(|kind| kind.name())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
