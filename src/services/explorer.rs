/// File explorer
/// Flat listing of one folder, folders and files mixed, sorted by name.

use std::path::Path;

use crate::error::IoError;
use crate::models::{EntryKind, ExplorerEntry};

pub fn list_folder(dir: &Path) -> Result<Vec<ExplorerEntry>, IoError> {
    let read_failed = |source| IoError::ReadFailed {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(read_failed)? {
        let entry = entry.map_err(read_failed)?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();

        let kind = if path.is_dir() {
            EntryKind::Folder
        } else if name.ends_with(".py") {
            EntryKind::PythonFile
        } else {
            EntryKind::File
        };

        entries.push(ExplorerEntry { name, path, kind });
    }

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

/// Explorer pane text: folder header, then one indented row per entry
pub fn render_tree(dir: &Path, entries: &[ExplorerEntry]) -> String {
    let root = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| dir.display().to_string());

    let mut out = format!("{} {}\n", EntryKind::Folder.icon(), root);
    for entry in entries {
        out.push_str(&format!("  {} {}\n", entry.kind.icon(), entry.name));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_sorted_and_tagged() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.py"), "").unwrap();
        std::fs::write(dir.path().join("a.txt"), "").unwrap();
        std::fs::create_dir(dir.path().join("pkg")).unwrap();

        let entries = list_folder(dir.path()).unwrap();
        let summary: Vec<_> = entries.iter().map(|e| (e.name.as_str(), e.kind)).collect();
        assert_eq!(
            summary,
            vec![
                ("a.txt", EntryKind::File),
                ("b.py", EntryKind::PythonFile),
                ("pkg", EntryKind::Folder),
            ]
        );

        let tree = render_tree(dir.path(), &entries);
        assert!(tree.contains("  🐍 b.py\n"));
        assert_eq!(tree.lines().count(), 4);
    }

    #[test]
    fn missing_folder_is_read_error() {
        assert!(matches!(
            list_folder(Path::new("/no/such/dir")),
            Err(IoError::ReadFailed { .. })
        ));
    }
}
