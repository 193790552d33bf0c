/// Models module
/// Shared data types passed between the background workers, the workbench
/// and the front end. Everything that crosses a queue lives here.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Stable tab identity. Never reused within one workbench.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TabId(pub u64);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Debug session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Idle,
    Starting,
    Running,
    Stopping,
    Terminated,
}

impl SessionState {
    /// True while a session owns a child process
    pub fn is_active(self) -> bool {
        matches!(
            self,
            SessionState::Starting | SessionState::Running | SessionState::Stopping
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            SessionState::Idle => "Idle",
            SessionState::Starting => "Starting",
            SessionState::Running => "Running",
            SessionState::Stopping => "Stopping",
            SessionState::Terminated => "Terminated",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// Everything the debug bridge reports to its observer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SessionEvent {
    /// One line (or trailing prompt fragment) of child output
    Output { stream: OutputStream, line: String },
    /// State machine transition
    StateChanged { state: SessionState },
    /// Relay or dispatch failure; the session is shutting down
    Error { message: String },
    /// Child reaped. `code` is None when it died from a signal.
    Exited { code: Option<i32> },
}

/// Completed script run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

impl RunResult {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    Folder,
    PythonFile,
    File,
}

impl EntryKind {
    pub fn icon(self) -> &'static str {
        match self {
            EntryKind::Folder => "📁",
            EntryKind::PythonFile => "🐍",
            EntryKind::File => "📄",
        }
    }
}

/// One row of the file explorer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplorerEntry {
    pub name: String,
    pub path: PathBuf,
    pub kind: EntryKind,
}

/// Highlighting categories, named after the tags the editor colours
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    Keyword,
    Constant,
    Function,
    Class,
    Name,
    String,
    Comment,
    Number,
    Operator,
    Punctuation,
    Whitespace,
    Text,
}

impl TokenKind {
    /// Foreground colour for the tag, None means default text colour
    pub fn color(self) -> Option<&'static str> {
        match self {
            TokenKind::Keyword | TokenKind::Constant => Some("#569CD6"),
            TokenKind::Function | TokenKind::Class => Some("#DCDCAA"),
            TokenKind::String => Some("#CE9178"),
            TokenKind::Comment => Some("#6A9955"),
            TokenKind::Operator => Some("#D4D4D4"),
            TokenKind::Number => Some("#B5CEA8"),
            _ => None,
        }
    }
}
