use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info};

use super::error::{Result, StorageError};
use super::{NewFile, StorageService};
use crate::config::FolderConfig;
use crate::query::{FileQuery, FOLDER_MIME_TYPE};

type FolderKey = (Option<String>, String);

/// Get-or-create lookup of folders by exact name within a parent scope.
///
/// Resolved ids are cached for the lifetime of the resolver, so repeated
/// resolution within one invocation costs a single list call.
pub struct FolderResolver {
    storage: Arc<dyn StorageService>,
    cache: Mutex<HashMap<FolderKey, String>>,
}

impl FolderResolver {
    pub fn new(storage: Arc<dyn StorageService>) -> Self {
        Self {
            storage,
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn cache(&self) -> MutexGuard<'_, HashMap<FolderKey, String>> {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns the id of the non-trashed folder `name` under `parent`, creating it if absent.
    ///
    /// Without a parent only top-level folders match, so a same-named folder
    /// nested elsewhere is never picked up. When several folders match, the
    /// first one the storage service lists wins.
    pub fn resolve(&self, name: &str, parent: Option<&str>) -> Result<String> {
        let key = (parent.map(str::to_string), name.to_string());
        if let Some(id) = self.cache().get(&key) {
            return Ok(id.clone());
        }

        let query = FileQuery::folder(name, parent);
        let existing = self
            .storage
            .list(&query)
            .map_err(|e| StorageError::folder("lookup", name, e))?;

        let id = match existing.into_iter().next() {
            Some(folder) => {
                debug!(folder = %name, id = %folder.id, "Found existing folder");
                folder.id
            }
            None => {
                let mut metadata = NewFile::new(name, FOLDER_MIME_TYPE);
                if let Some(parent) = parent {
                    metadata = metadata.in_parent(parent);
                }
                let id = self
                    .storage
                    .create(&metadata, None)
                    .map_err(|e| StorageError::folder("create", name, e))?;
                info!(folder = %name, id = %id, "Created folder");
                id
            }
        };

        self.cache().insert(key, id.clone());
        Ok(id)
    }
}

/// The persisted folder layout: a root folder, its archive subfolder, and a
/// top-level folder for checkpoint artifacts.
pub struct Layout {
    resolver: FolderResolver,
    folders: FolderConfig,
}

impl Layout {
    pub fn new(storage: Arc<dyn StorageService>, folders: FolderConfig) -> Self {
        Self {
            resolver: FolderResolver::new(storage),
            folders,
        }
    }

    pub fn root(&self) -> Result<String> {
        self.resolver.resolve(&self.folders.root, None)
    }

    pub fn archive(&self) -> Result<String> {
        let root = self.root()?;
        self.resolver.resolve(&self.folders.archive, Some(&root))
    }

    pub fn temp(&self) -> Result<String> {
        self.resolver.resolve(&self.folders.temp, None)
    }

    pub fn resolver(&self) -> &FolderResolver {
        &self.resolver
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryDrive;

    #[test]
    fn test_resolve_is_idempotent() {
        let drive = Arc::new(MemoryDrive::new());
        let resolver = FolderResolver::new(drive.clone());

        let first = resolver.resolve("Kindle Notebooks", None).unwrap();
        let second = resolver.resolve("Kindle Notebooks", None).unwrap();
        assert_eq!(first, second);
        assert_eq!(drive.folders_named("Kindle Notebooks").len(), 1);

        // A fresh resolver has no cache and must find the folder by lookup.
        let fresh = FolderResolver::new(drive.clone());
        assert_eq!(fresh.resolve("Kindle Notebooks", None).unwrap(), first);
        assert_eq!(drive.create_count(), 1);
    }

    #[test]
    fn test_parent_scope_is_respected() {
        let drive = Arc::new(MemoryDrive::new());
        let resolver = FolderResolver::new(drive.clone());

        let a = resolver.resolve("A", None).unwrap();
        let b = resolver.resolve("B", None).unwrap();
        let old_a = resolver.resolve("Old", Some(&a)).unwrap();
        let old_b = resolver.resolve("Old", Some(&b)).unwrap();
        assert_ne!(old_a, old_b);
        assert_eq!(drive.folders_named("Old").len(), 2);
    }

    #[test]
    fn test_top_level_lookup_ignores_nested_namesake() {
        let drive = Arc::new(MemoryDrive::new());
        let resolver = FolderResolver::new(drive.clone());

        let projects = resolver.resolve("Projects", None).unwrap();
        let nested = resolver.resolve("Old", Some(&projects)).unwrap();

        let fresh = FolderResolver::new(drive.clone());
        let top = fresh.resolve("Old", None).unwrap();
        assert_ne!(top, nested);
        assert!(drive.get(&top).unwrap().parents.is_empty());
    }

    #[test]
    fn test_trashed_folder_is_ignored() {
        let drive = Arc::new(MemoryDrive::new());
        let trashed = drive.seed(&NewFile::new("Old", FOLDER_MIME_TYPE), b"");
        drive.trash(&trashed);

        let resolver = FolderResolver::new(drive.clone());
        let found = resolver.resolve("Old", None).unwrap();
        assert_ne!(found, trashed);
        assert_eq!(drive.folders_named("Old").len(), 2);
    }

    #[test]
    fn test_layout_nests_archive_under_root() {
        let drive = Arc::new(MemoryDrive::new());
        let layout = Layout::new(drive.clone(), FolderConfig::default());

        let root = layout.root().unwrap();
        let archive = layout.archive().unwrap();
        let temp = layout.temp().unwrap();

        assert_eq!(drive.get(&archive).unwrap().parents, vec![root.clone()]);
        assert!(drive.get(&temp).unwrap().parents.is_empty());
        assert_ne!(temp, root);
    }
}
