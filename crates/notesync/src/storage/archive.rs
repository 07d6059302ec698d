use std::sync::Arc;

use tracing::info;

use super::error::Result;
use super::{FileEntry, FileUpdate, Layout, NewFile, StorageService};
use crate::artifact::ArtifactKind;
use crate::clock::ArchiveClock;
use crate::query::FileQuery;

/// Writes artifacts into the root folder with archive-then-create semantics.
///
/// An incumbent with the same name is never overwritten: it is renamed with
/// a timestamp suffix and moved into the archive folder before the new file
/// is created.
pub struct ArtifactWriter {
    storage: Arc<dyn StorageService>,
    layout: Arc<Layout>,
    clock: ArchiveClock,
}

impl ArtifactWriter {
    pub fn new(storage: Arc<dyn StorageService>, layout: Arc<Layout>, clock: ArchiveClock) -> Self {
        Self {
            storage,
            layout,
            clock,
        }
    }

    /// Stores `content` as `<base><ext>` in the root folder and returns the new id.
    pub fn write(&self, base: &str, kind: ArtifactKind, content: &[u8]) -> Result<String> {
        let root = self.layout.root()?;
        self.layout.archive()?;
        let name = kind.file_name(base);

        let incumbents = self.storage.list(
            &FileQuery::new()
                .name(name.as_str())
                .in_parent(root.as_str())
                .not_trashed(),
        )?;
        for incumbent in &incumbents {
            self.archive_existing(incumbent, kind)?;
        }

        let id = self.storage.create(
            &NewFile::new(name.as_str(), kind.mime_type()).in_parent(root.as_str()),
            Some(content),
        )?;
        info!(
            file = %name,
            id = %id,
            bytes = content.len(),
            archived = incumbents.len(),
            "Stored artifact"
        );
        Ok(id)
    }

    /// Renames `entry` with a timestamp suffix and moves it into the archive folder.
    ///
    /// Returns the archived name.
    pub fn archive_existing(&self, entry: &FileEntry, kind: ArtifactKind) -> Result<String> {
        let archive = self.layout.archive()?;
        let archived_name = kind.archived_name(kind.base_name(&entry.name), &self.clock.timestamp());

        self.storage.update(
            &entry.id,
            &FileUpdate::relocate(Some(archived_name.clone()), &entry.parents, &archive),
        )?;
        info!(
            file = %entry.name,
            archived_as = %archived_name,
            id = %entry.id,
            "Archived previous version"
        );
        Ok(archived_name)
    }

    /// Current artifacts of `kind` in the root folder.
    pub fn list_active(&self, kind: ArtifactKind) -> Result<Vec<FileEntry>> {
        let root = self.layout.root()?;
        self.storage.list(
            &FileQuery::new()
                .in_parent(root)
                .mime_type(kind.mime_type())
                .not_trashed(),
        )
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }
}
