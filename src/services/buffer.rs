/// Editor Buffer Model
/// Text of one open file plus its save state. Observers hear about every
/// change so the tab label and highlighting can be refreshed.

use std::path::{Path, PathBuf};

use crate::error::IoError;
use crate::models::{TabId, TokenKind};
use crate::services::highlight::Tokenizer;

/// Undo steps kept per buffer; the oldest are dropped first
pub const MAX_UNDO: usize = 500;

/// What happened to a buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BufferChange {
    /// Content replaced wholesale (open, reload)
    Replaced,
    /// User edit
    Edited,
    /// Written to disk
    Saved,
}

/// Notification handed to observers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferEvent {
    pub id: TabId,
    pub change: BufferChange,
    pub title: String,
    pub dirty: bool,
    /// Bumped on every content change, used to drop stale highlight passes
    pub revision: u64,
}

pub type BufferObserver = Box<dyn Fn(&BufferEvent) + Send>;

/// One highlighted piece of the buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighlightSpan<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    /// Byte offset into the buffer content
    pub start: usize,
}

pub struct EditorBuffer {
    id: TabId,
    path: Option<PathBuf>,
    /// Label used until the buffer has a path, e.g. `Untitled-3`
    untitled_name: String,
    content: String,
    /// Last content loaded from or written to disk
    saved: String,
    dirty: bool,
    revision: u64,
    /// Content before each edit, newest last
    undo_stack: Vec<String>,
    redo_stack: Vec<String>,
    observers: Vec<BufferObserver>,
}

impl EditorBuffer {
    pub fn new_untitled(id: TabId, untitled_name: impl Into<String>) -> Self {
        Self {
            id,
            path: None,
            untitled_name: untitled_name.into(),
            content: String::new(),
            saved: String::new(),
            dirty: false,
            revision: 0,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            observers: Vec::new(),
        }
    }

    /// Load a file into a clean buffer
    pub fn open(id: TabId, path: &Path) -> Result<Self, IoError> {
        let content = std::fs::read_to_string(path).map_err(|source| IoError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;

        let mut buffer = Self::new_untitled(id, String::new());
        buffer.path = Some(path.to_path_buf());
        buffer.set_content(content);
        Ok(buffer)
    }

    pub fn subscribe(&mut self, observer: impl Fn(&BufferEvent) + Send + 'static) {
        self.observers.push(Box::new(observer));
    }

    fn notify(&self, change: BufferChange) {
        let event = BufferEvent {
            id: self.id,
            change,
            title: self.title(),
            dirty: self.dirty,
            revision: self.revision,
        };
        for observer in &self.observers {
            observer(&event);
        }
    }

    /// Replace the content and treat it as the persisted state.
    /// Edit history starts over.
    pub fn set_content(&mut self, text: impl Into<String>) {
        self.content = text.into();
        self.saved = self.content.clone();
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.dirty = false;
        self.revision += 1;
        self.notify(BufferChange::Replaced);
    }

    /// Apply a user edit. Reverting to the saved text clears dirty again.
    pub fn on_user_edit(&mut self, new_content: impl Into<String>) {
        let new_content = new_content.into();
        if new_content != self.content {
            let previous = std::mem::replace(&mut self.content, new_content);
            self.undo_stack.push(previous);
            if self.undo_stack.len() > MAX_UNDO {
                self.undo_stack.remove(0);
            }
            self.redo_stack.clear();
        }
        self.after_edit();
    }

    /// Step back one edit. Returns false when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.undo_stack.pop() else {
            return false;
        };
        let current = std::mem::replace(&mut self.content, previous);
        self.redo_stack.push(current);
        self.after_edit();
        true
    }

    /// Re-apply the last undone edit
    pub fn redo(&mut self) -> bool {
        let Some(next) = self.redo_stack.pop() else {
            return false;
        };
        let current = std::mem::replace(&mut self.content, next);
        self.undo_stack.push(current);
        self.after_edit();
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    fn after_edit(&mut self) {
        self.dirty = self.content != self.saved;
        self.revision += 1;
        self.notify(BufferChange::Edited);
    }

    /// Write to the current path
    pub fn save(&mut self) -> Result<(), IoError> {
        let path = self.path.clone().ok_or(IoError::NoPath)?;
        std::fs::write(&path, &self.content).map_err(|source| IoError::SaveFailed {
            path: path.clone(),
            source,
        })?;
        log::info!("saved {}", path.display());

        self.saved = self.content.clone();
        self.dirty = false;
        self.notify(BufferChange::Saved);
        Ok(())
    }

    /// Adopt `path` and write to it. The old path is kept if writing fails.
    pub fn save_as(&mut self, path: &Path) -> Result<(), IoError> {
        let previous = self.path.replace(path.to_path_buf());
        let result = self.save();
        if result.is_err() {
            self.path = previous;
        }
        result
    }

    /// Re-read the file from disk, dropping unsaved edits
    pub fn reload(&mut self) -> Result<(), IoError> {
        let path = self.path.clone().ok_or(IoError::NoPath)?;
        let content = std::fs::read_to_string(&path)
            .map_err(|source| IoError::ReadFailed { path, source })?;
        self.set_content(content);
        Ok(())
    }

    /// Tokens for the whole content with byte offsets. Lazy; call again
    /// after every change to get a fresh pass.
    pub fn highlighting_tokens<'a>(
        &'a self,
        tokenizer: &'a dyn Tokenizer,
    ) -> impl Iterator<Item = HighlightSpan<'a>> + 'a {
        tokenizer
            .tokenize(&self.content)
            .scan(0usize, |offset, (kind, text)| {
                let start = *offset;
                *offset += text.len();
                Some(HighlightSpan { kind, text, start })
            })
    }

    pub fn id(&self) -> TabId {
        self.id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// File name, or the untitled label; `*` while unsaved
    pub fn title(&self) -> String {
        let base = self
            .path
            .as_deref()
            .and_then(Path::file_name)
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.untitled_name.clone());

        if self.dirty {
            format!("{}*", base)
        } else {
            base
        }
    }

    pub fn line_count(&self) -> usize {
        self.content.matches('\n').count() + 1
    }
}
