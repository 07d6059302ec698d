//! In-memory [`StorageService`] used by tests and dry runs.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;

use super::error::{Result, StorageError};
use super::{FileEntry, FileUpdate, NewFile, StorageService};
use crate::query::{FileQuery, FOLDER_MIME_TYPE};

#[derive(Debug, Default)]
struct State {
    files: BTreeMap<String, (FileEntry, Vec<u8>)>,
    next_id: u32,
    media_failures: u32,
    delete_failures: u32,
    creates: u32,
}

/// A storage service holding files in a map keyed by id.
///
/// Ids are allocated sequentially (`mem-0001`, `mem-0002`, ...), so listing
/// order matches creation order.
#[derive(Debug, Default)]
pub struct MemoryDrive {
    state: Mutex<State>,
}

impl MemoryDrive {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Makes the next `count` media reads fail with a transient error.
    pub fn fail_media_reads(&self, count: u32) {
        self.state().media_failures = count;
    }

    /// Makes the next `count` deletes fail with a transient error.
    pub fn fail_deletes(&self, count: u32) {
        self.state().delete_failures = count;
    }

    /// Every stored file, folders included, in creation order.
    pub fn files(&self) -> Vec<FileEntry> {
        self.state()
            .files
            .values()
            .map(|(entry, _)| entry.clone())
            .collect()
    }

    /// Non-folder files whose parents include `parent_id`.
    pub fn children(&self, parent_id: &str) -> Vec<FileEntry> {
        let query = FileQuery::new().in_parent(parent_id).not_trashed();
        self.files()
            .into_iter()
            .filter(|f| f.mime_type != FOLDER_MIME_TYPE && query.matches(f))
            .collect()
    }

    /// Folders with the given name, regardless of parent.
    pub fn folders_named(&self, name: &str) -> Vec<FileEntry> {
        self.files()
            .into_iter()
            .filter(|f| f.mime_type == FOLDER_MIME_TYPE && f.name == name)
            .collect()
    }

    pub fn content(&self, id: &str) -> Option<Vec<u8>> {
        self.state().files.get(id).map(|(_, bytes)| bytes.clone())
    }

    /// Total successful create calls, folders included.
    pub fn create_count(&self) -> u32 {
        self.state().creates
    }

    /// Places a file directly, bypassing the create path counters.
    pub fn seed(&self, file: &NewFile, content: &[u8]) -> String {
        let mut state = self.state();
        let id = Self::allocate(&mut state);
        state
            .files
            .insert(id.clone(), (Self::entry(&id, file), content.to_vec()));
        id
    }

    /// Soft-deletes a file the way the storage UI's bin does.
    pub fn trash(&self, id: &str) {
        if let Some((entry, _)) = self.state().files.get_mut(id) {
            entry.trashed = true;
        }
    }

    fn allocate(state: &mut State) -> String {
        state.next_id += 1;
        format!("mem-{:04}", state.next_id)
    }

    fn entry(id: &str, file: &NewFile) -> FileEntry {
        FileEntry {
            id: id.to_string(),
            name: file.name.clone(),
            mime_type: file.mime_type.clone(),
            parents: file.parents.clone(),
            app_properties: file.app_properties.clone(),
            trashed: false,
            modified_time: Some(Utc::now().to_rfc3339()),
        }
    }
}

impl StorageService for MemoryDrive {
    fn list(&self, query: &FileQuery) -> Result<Vec<FileEntry>> {
        Ok(self
            .state()
            .files
            .values()
            .filter(|(entry, _)| query.matches(entry))
            .map(|(entry, _)| entry.clone())
            .collect())
    }

    fn get(&self, id: &str) -> Result<FileEntry> {
        self.state()
            .files
            .get(id)
            .map(|(entry, _)| entry.clone())
            .ok_or_else(|| StorageError::NotFound { id: id.to_string() })
    }

    fn create(&self, file: &NewFile, content: Option<&[u8]>) -> Result<String> {
        let mut state = self.state();
        let id = Self::allocate(&mut state);
        let bytes = content.map(<[u8]>::to_vec).unwrap_or_default();
        state
            .files
            .insert(id.clone(), (Self::entry(&id, file), bytes));
        state.creates += 1;
        Ok(id)
    }

    fn update(&self, id: &str, update: &FileUpdate) -> Result<()> {
        let mut state = self.state();
        let (entry, _) = state
            .files
            .get_mut(id)
            .ok_or_else(|| StorageError::NotFound { id: id.to_string() })?;

        if let Some(name) = &update.name {
            entry.name = name.clone();
        }
        entry
            .parents
            .retain(|parent| !update.remove_parents.contains(parent));
        for parent in &update.add_parents {
            if !entry.parents.contains(parent) {
                entry.parents.push(parent.clone());
            }
        }
        entry.modified_time = Some(Utc::now().to_rfc3339());
        Ok(())
    }

    fn get_media(&self, id: &str) -> Result<Vec<u8>> {
        let mut state = self.state();
        if state.media_failures > 0 {
            state.media_failures -= 1;
            return Err(StorageError::Status {
                operation: "download",
                status: 503,
                body: "injected failure".to_string(),
            });
        }
        state
            .files
            .get(id)
            .map(|(_, bytes)| bytes.clone())
            .ok_or_else(|| StorageError::NotFound { id: id.to_string() })
    }

    fn delete(&self, id: &str) -> Result<()> {
        let mut state = self.state();
        if state.delete_failures > 0 {
            state.delete_failures -= 1;
            return Err(StorageError::Status {
                operation: "delete",
                status: 503,
                body: "injected failure".to_string(),
            });
        }
        state
            .files
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound { id: id.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_read_back() {
        let drive = MemoryDrive::new();
        let id = drive
            .create(&NewFile::new("a.txt", "text/plain").in_parent("p"), Some(b"hi"))
            .unwrap();
        assert_eq!(id, "mem-0001");
        assert_eq!(drive.get_media(&id).unwrap(), b"hi");
        assert_eq!(drive.get(&id).unwrap().parents, vec!["p".to_string()]);
    }

    #[test]
    fn test_update_moves_between_parents() {
        let drive = MemoryDrive::new();
        let id = drive
            .create(&NewFile::new("a.txt", "text/plain").in_parent("p"), Some(b""))
            .unwrap();
        drive
            .update(
                &id,
                &FileUpdate::relocate(Some("b.txt".to_string()), &["p".to_string()], "q"),
            )
            .unwrap();

        let entry = drive.get(&id).unwrap();
        assert_eq!(entry.name, "b.txt");
        assert_eq!(entry.parents, vec!["q".to_string()]);
        assert!(drive.children("p").is_empty());
    }

    #[test]
    fn test_injected_media_failures() {
        let drive = MemoryDrive::new();
        let id = drive.seed(&NewFile::new("a.txt", "text/plain"), b"x");
        drive.fail_media_reads(1);
        assert!(drive.get_media(&id).is_err());
        assert_eq!(drive.get_media(&id).unwrap(), b"x");
        assert_eq!(drive.create_count(), 0);
    }

    #[test]
    fn test_injected_delete_failures() {
        let drive = MemoryDrive::new();
        let id = drive.seed(&NewFile::new("a.txt", "text/plain"), b"x");
        drive.fail_deletes(1);
        assert!(matches!(
            drive.delete(&id),
            Err(StorageError::Status { status: 503, .. })
        ));
        assert!(drive.get(&id).is_ok());
        drive.delete(&id).unwrap();
        assert!(drive.content(&id).is_none());
    }

    #[test]
    fn test_delete_missing_is_not_found() {
        let drive = MemoryDrive::new();
        assert!(matches!(
            drive.delete("nope"),
            Err(StorageError::NotFound { .. })
        ));
    }
}
