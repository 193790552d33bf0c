/// Tab collection
/// Open buffers keyed by a stable TabId. Titles are derived from the
/// buffer and never used for lookup.

use std::path::Path;

use crate::error::IoError;
use crate::models::TabId;
use crate::services::buffer::{BufferEvent, EditorBuffer};

/// What to do with unsaved changes when closing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseDecision {
    /// Only close if clean
    Ask,
    Save,
    Discard,
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    Closed,
    /// Dirty and no decision given; the tab stays open
    NeedsDecision,
    Cancelled,
    NotFound,
}

type ObserverFactory = Box<dyn Fn() -> Box<dyn Fn(&BufferEvent) + Send> + Send>;

#[derive(Default)]
pub struct TabSet {
    tabs: Vec<EditorBuffer>,
    active: Option<TabId>,
    next_id: u64,
    untitled_count: u32,
    /// Every new buffer gets an observer from here
    observer_factory: Option<ObserverFactory>,
}

impl TabSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an observer to every buffer created from now on
    pub fn with_observer<F, O>(mut self, factory: F) -> Self
    where
        F: Fn() -> O + Send + 'static,
        O: Fn(&BufferEvent) + Send + 'static,
    {
        self.observer_factory = Some(Box::new(move || -> Box<dyn Fn(&BufferEvent) + Send> {
            Box::new(factory())
        }));
        self
    }

    fn allocate_id(&mut self) -> TabId {
        self.next_id += 1;
        TabId(self.next_id)
    }

    fn insert(&mut self, mut buffer: EditorBuffer) -> TabId {
        if let Some(factory) = &self.observer_factory {
            let observer = factory();
            buffer.subscribe(move |event| observer(event));
        }
        let id = buffer.id();
        self.tabs.push(buffer);
        self.active = Some(id);
        id
    }

    /// Create and activate an empty `Untitled-N` buffer
    pub fn new_tab(&mut self) -> TabId {
        self.untitled_count += 1;
        let id = self.allocate_id();
        let buffer = EditorBuffer::new_untitled(id, format!("Untitled-{}", self.untitled_count));
        self.insert(buffer)
    }

    /// Open `path`, or activate the tab already showing it
    pub fn open(&mut self, path: &Path) -> Result<TabId, IoError> {
        if let Some(id) = self.find_by_path(path) {
            self.active = Some(id);
            return Ok(id);
        }

        let id = self.allocate_id();
        let buffer = EditorBuffer::open(id, path)?;
        Ok(self.insert(buffer))
    }

    pub fn find_by_path(&self, path: &Path) -> Option<TabId> {
        self.tabs
            .iter()
            .find(|b| b.path().map_or(false, |p| same_file(p, path)))
            .map(EditorBuffer::id)
    }

    pub fn close(&mut self, id: TabId, decision: CloseDecision) -> Result<CloseOutcome, IoError> {
        let Some(index) = self.tabs.iter().position(|b| b.id() == id) else {
            return Ok(CloseOutcome::NotFound);
        };

        if self.tabs[index].is_dirty() {
            match decision {
                CloseDecision::Ask => return Ok(CloseOutcome::NeedsDecision),
                CloseDecision::Cancel => return Ok(CloseOutcome::Cancelled),
                CloseDecision::Save => self.tabs[index].save()?,
                CloseDecision::Discard => {}
            }
        }

        self.tabs.remove(index);

        if self.active == Some(id) {
            // Activate the neighbour that slid into this slot, else the new last tab
            self.active = self
                .tabs
                .get(index)
                .or_else(|| self.tabs.last())
                .map(EditorBuffer::id);
        }

        Ok(CloseOutcome::Closed)
    }

    pub fn activate(&mut self, id: TabId) -> bool {
        if self.get(id).is_some() {
            self.active = Some(id);
            true
        } else {
            false
        }
    }

    pub fn active_id(&self) -> Option<TabId> {
        self.active
    }

    pub fn active(&self) -> Option<&EditorBuffer> {
        self.active.and_then(|id| self.get(id))
    }

    pub fn active_mut(&mut self) -> Option<&mut EditorBuffer> {
        let id = self.active?;
        self.get_mut(id)
    }

    pub fn get(&self, id: TabId) -> Option<&EditorBuffer> {
        self.tabs.iter().find(|b| b.id() == id)
    }

    pub fn get_mut(&mut self, id: TabId) -> Option<&mut EditorBuffer> {
        self.tabs.iter_mut().find(|b| b.id() == id)
    }

    /// Buffers in tab-strip order
    pub fn iter(&self) -> impl Iterator<Item = &EditorBuffer> {
        self.tabs.iter()
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn new_tabs_get_distinct_ids_and_names() {
        let mut tabs = TabSet::new();
        let a = tabs.new_tab();
        let b = tabs.new_tab();
        assert_ne!(a, b);
        assert_eq!(tabs.get(a).unwrap().title(), "Untitled-1");
        assert_eq!(tabs.get(b).unwrap().title(), "Untitled-2");
        assert_eq!(tabs.active_id(), Some(b));
    }

    #[test]
    fn open_twice_reuses_tab() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.py");
        std::fs::write(&path, "x = 1\n").unwrap();

        let mut tabs = TabSet::new();
        let first = tabs.open(&path).unwrap();
        tabs.new_tab();
        let second = tabs.open(&path).unwrap();

        assert_eq!(first, second);
        assert_eq!(tabs.len(), 2);
        assert_eq!(tabs.active_id(), Some(first));
        assert_eq!(tabs.active().unwrap().content(), "x = 1\n");
    }

    #[test]
    fn dirty_close_needs_decision() {
        let mut tabs = TabSet::new();
        let id = tabs.new_tab();
        tabs.active_mut().unwrap().on_user_edit("changed");

        assert_eq!(tabs.close(id, CloseDecision::Ask).unwrap(), CloseOutcome::NeedsDecision);
        assert_eq!(tabs.close(id, CloseDecision::Cancel).unwrap(), CloseOutcome::Cancelled);
        assert_eq!(tabs.len(), 1);

        assert_eq!(tabs.close(id, CloseDecision::Discard).unwrap(), CloseOutcome::Closed);
        assert!(tabs.is_empty());
        assert_eq!(tabs.active_id(), None);
    }

    #[test]
    fn save_on_close_without_path_keeps_tab() {
        let mut tabs = TabSet::new();
        let id = tabs.new_tab();
        tabs.active_mut().unwrap().on_user_edit("changed");

        assert!(matches!(tabs.close(id, CloseDecision::Save), Err(IoError::NoPath)));
        assert_eq!(tabs.len(), 1);
    }

    #[test]
    fn closing_active_tab_activates_neighbour() {
        let mut tabs = TabSet::new();
        let a = tabs.new_tab();
        let b = tabs.new_tab();
        let c = tabs.new_tab();
        tabs.activate(b);

        tabs.close(b, CloseDecision::Ask).unwrap();
        assert_eq!(tabs.active_id(), Some(c));
        tabs.close(c, CloseDecision::Ask).unwrap();
        assert_eq!(tabs.active_id(), Some(a));
        assert_eq!(tabs.close(c, CloseDecision::Ask).unwrap(), CloseOutcome::NotFound);
    }

    #[test]
    fn observer_factory_reaches_every_buffer() {
        let titles = Arc::new(Mutex::new(Vec::new()));
        let sink = titles.clone();
        let mut tabs = TabSet::new().with_observer(move || {
            let sink = sink.clone();
            move |event: &BufferEvent| sink.lock().push(event.title.clone())
        });

        tabs.new_tab();
        tabs.active_mut().unwrap().on_user_edit("x");
        tabs.new_tab();
        tabs.active_mut().unwrap().on_user_edit("y");

        assert_eq!(*titles.lock(), vec!["Untitled-1*", "Untitled-2*"]);
    }
}
