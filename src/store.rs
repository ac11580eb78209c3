//! Persistent library of saved artifacts.
//!
//! All artifacts live in one JSON array stored under [`LIBRARY_KEY`] in a
//! string key-value backend. The array is kept newest first. Storage that
//! cannot be read or parsed lists as an empty library; entries this version
//! does not recognise are hidden from listings but kept on every write.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, warn};

/// Key under which the whole library is stored.
pub const LIBRARY_KEY: &str = "aurora_academic_library";

/// Kind of saved artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactType {
    /// Literature search result
    Search,
    /// Methodology plan
    Methodology,
    /// Formatted reference
    Formatter,
    /// Document analysis or group synthesis
    Fichamento,
    /// Advisor answer
    Advisor,
    /// Research project outline
    Project,
}

impl ArtifactType {
    /// Wire name.
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Methodology => "methodology",
            Self::Formatter => "formatter",
            Self::Fichamento => "fichamento",
            Self::Advisor => "advisor",
            Self::Project => "project",
        }
    }

    /// All types, in display order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Search,
            Self::Fichamento,
            Self::Methodology,
            Self::Formatter,
            Self::Advisor,
            Self::Project,
        ]
    }

    /// Parse a type from its wire name.
    #[must_use]
    pub fn from_id(id: &str) -> Option<Self> {
        Self::all().iter().copied().find(|t| t.id() == id)
    }
}

impl fmt::Display for ArtifactType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// A persisted piece of generated content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedArtifact {
    /// Unique id
    pub id: String,
    /// Kind of content
    #[serde(rename = "type")]
    pub artifact_type: ArtifactType,
    /// Display title
    pub title: String,
    /// Generated text
    pub content: String,
    /// When it was saved (UTC)
    pub date: DateTime<Utc>,
    /// Free-form extra data (sources, citation standard, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// An artifact about to be saved; id and date are assigned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewArtifact {
    /// Kind of content
    pub artifact_type: ArtifactType,
    /// Display title
    pub title: String,
    /// Generated text
    pub content: String,
    /// Free-form extra data
    pub metadata: Option<serde_json::Value>,
}

impl NewArtifact {
    /// Creates an artifact without metadata.
    #[must_use]
    pub fn new(
        artifact_type: ArtifactType,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            artifact_type,
            title: title.into(),
            content: content.into(),
            metadata: None,
        }
    }

    /// Attaches metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Storage of saved artifacts.
pub trait ArtifactStore: Send + Sync {
    /// All artifacts, newest first. Unreadable storage yields an empty list.
    fn list(&self) -> Vec<SavedArtifact>;

    /// Saves an artifact with a fresh id and the current time, as the newest entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn save(&self, artifact: NewArtifact) -> Result<SavedArtifact>;

    /// Removes the artifact with the given id. Unknown ids are a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn delete(&self, id: &str) -> Result<()>;

    /// Artifacts of one type, newest first.
    fn list_by_type(&self, artifact_type: ArtifactType) -> Vec<SavedArtifact> {
        self.list()
            .into_iter()
            .filter(|a| a.artifact_type == artifact_type)
            .collect()
    }

    /// Looks up one artifact.
    fn get(&self, id: &str) -> Option<SavedArtifact> {
        self.list().into_iter().find(|a| a.id == id)
    }
}

/// String key-value storage underneath a [`Library`].
pub trait KeyValueBackend: Send + Sync {
    /// Reads a value; `None` when the key was never written.
    ///
    /// # Errors
    ///
    /// Returns an error if the value exists but cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Writes a value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Stores each key as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    /// Creates a backend rooted at `dir`. The directory is created on first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the file holding `key`.
    #[must_use]
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn write_file_atomic(path: &Path, content: &str) -> Result<()> {
        let temp_path = path.with_extension("json.tmp");
        let mut temp_file = fs::File::create(&temp_path).map_err(|e| Error::io(&temp_path, e))?;

        temp_file
            .write_all(content.as_bytes())
            .map_err(|e| Error::io(&temp_path, e))?;
        temp_file
            .sync_all()
            .map_err(|e| Error::io(&temp_path, e))?;
        drop(temp_file);

        fs::rename(&temp_path, path).map_err(|e| Error::io(path, e))
    }
}

impl KeyValueBackend for FileBackend {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::io(path, e)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| Error::io(&self.dir, e))?;
        Self::write_file_atomic(&self.path_for(key), value)
    }
}

/// Keeps values in memory for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// [`ArtifactStore`] keeping the whole collection under [`LIBRARY_KEY`].
pub struct Library<B: KeyValueBackend> {
    backend: B,
    // Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl<B: KeyValueBackend> Library<B> {
    /// Creates a library over `backend`.
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            write_lock: Mutex::new(()),
        }
    }

    /// The underlying backend.
    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Raw entries as stored. Storage that is not a JSON array starts a fresh
    /// library; a backend read failure is an error so writes never clobber it.
    fn load_entries(&self) -> Result<Vec<serde_json::Value>> {
        let Some(raw) = self.backend.get(LIBRARY_KEY)? else {
            return Ok(Vec::new());
        };

        match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(serde_json::Value::Array(entries)) => Ok(entries),
            Ok(_) => {
                warn!("Library storage is not an array; treating as empty");
                Ok(Vec::new())
            }
            Err(e) => {
                warn!(error = %e, "Library storage malformed; treating as empty");
                Ok(Vec::new())
            }
        }
    }

    fn load(&self) -> Vec<SavedArtifact> {
        let entries = self.load_entries().unwrap_or_else(|e| {
            warn!(error = %e, "Library storage unreadable; treating as empty");
            Vec::new()
        });

        entries
            .into_iter()
            .filter_map(|entry| {
                serde_json::from_value(entry)
                    .map_err(|e| warn!(error = %e, "Skipping unrecognised library entry"))
                    .ok()
            })
            .collect()
    }

    fn store(&self, entries: &[serde_json::Value]) -> Result<()> {
        let json = serde_json::to_string(entries)?;
        self.backend.set(LIBRARY_KEY, &json)
    }
}

impl Library<FileBackend> {
    /// Opens the file-backed library in `dir`.
    #[must_use]
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        Self::new(FileBackend::new(dir))
    }
}

impl Library<MemoryBackend> {
    /// Creates an empty in-memory library.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new())
    }
}

impl<B: KeyValueBackend> ArtifactStore for Library<B> {
    fn list(&self) -> Vec<SavedArtifact> {
        self.load()
    }

    fn save(&self, artifact: NewArtifact) -> Result<SavedArtifact> {
        let _lock = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let saved = SavedArtifact {
            id: uuid::Uuid::new_v4().to_string(),
            artifact_type: artifact.artifact_type,
            title: artifact.title,
            content: artifact.content,
            date: Utc::now(),
            metadata: artifact.metadata,
        };

        let mut entries = self.load_entries()?;
        entries.insert(0, serde_json::to_value(&saved)?);
        self.store(&entries)?;

        debug!(id = saved.id.as_str(), kind = %saved.artifact_type, "Saved artifact");
        Ok(saved)
    }

    fn delete(&self, id: &str) -> Result<()> {
        let _lock = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut entries = self.load_entries()?;
        let before = entries.len();
        entries.retain(|entry| entry.get("id").and_then(serde_json::Value::as_str) != Some(id));

        if entries.len() == before {
            debug!(id, "Artifact not found; nothing to delete");
            return Ok(());
        }
        self.store(&entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use serde_json::json;
    use std::collections::HashSet;

    fn note(title: &str) -> NewArtifact {
        NewArtifact::new(ArtifactType::Advisor, title, "conteúdo")
    }

    #[test]
    fn test_list_is_newest_first_with_unique_ids() {
        let library = Library::in_memory();
        for i in 0..5 {
            library.save(note(&format!("nota {i}"))).unwrap();
        }

        let items = library.list();
        let titles: Vec<_> = items.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["nota 4", "nota 3", "nota 2", "nota 1", "nota 0"]);

        let ids: HashSet<_> = items.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids.len(), 5);
        assert!(items.windows(2).all(|w| w[0].date >= w[1].date));
    }

    #[test]
    fn test_delete_is_idempotent() {
        let library = Library::in_memory();
        let keep = library.save(note("fica")).unwrap();
        let gone = library.save(note("sai")).unwrap();

        library.delete(&gone.id).unwrap();
        let once = library.list();
        library.delete(&gone.id).unwrap();
        library.delete("never-existed").unwrap();

        assert_eq!(library.list(), once);
        assert_eq!(once.len(), 1);
        assert_eq!(once[0].id, keep.id);
    }

    #[test]
    fn test_save_then_delete_shrinks_list() {
        let library = Library::in_memory();
        library.save(note("a")).unwrap();
        let saved = library.save(note("b")).unwrap();
        let before = library.list().len();

        library.delete(&saved.id).unwrap();

        let after = library.list();
        assert_eq!(after.len(), before - 1);
        assert!(after.iter().all(|a| a.id != saved.id));
    }

    #[test]
    fn test_formatter_metadata_round_trips() {
        let library = Library::in_memory();
        let saved = library
            .save(
                NewArtifact::new(ArtifactType::Formatter, "Referência: SILVA...", "SILVA, J.")
                    .with_metadata(json!({ "standard": "APA (7th Edition)" })),
            )
            .unwrap();

        let found = library.list_by_type(ArtifactType::Formatter);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, saved.id);
        assert_eq!(
            found[0].metadata,
            Some(json!({ "standard": "APA (7th Edition)" }))
        );
    }

    #[test]
    fn test_list_by_type_filters_exactly() {
        let library = Library::in_memory();
        library.save(note("orientação")).unwrap();
        library
            .save(NewArtifact::new(ArtifactType::Search, "busca", "texto"))
            .unwrap();

        assert_eq!(library.list_by_type(ArtifactType::Search).len(), 1);
        assert_eq!(library.list_by_type(ArtifactType::Advisor).len(), 1);
        assert!(library.list_by_type(ArtifactType::Project).is_empty());
    }

    #[test]
    fn test_get_finds_saved_artifact() {
        let library = Library::in_memory();
        let saved = library.save(note("x")).unwrap();

        assert_eq!(library.get(&saved.id), Some(saved));
        assert_eq!(library.get("missing"), None);
    }

    #[test]
    fn test_wire_format_uses_type_field() {
        let library = Library::in_memory();
        library.save(note("x")).unwrap();

        let raw = library.backend().get(LIBRARY_KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let entry = &value[0];

        assert_eq!(entry["type"], "advisor");
        assert!(entry.get("metadata").is_none());
        assert!(entry["date"].as_str().unwrap().contains('T'));
    }

    #[test]
    fn test_file_library_persists_across_instances() {
        let temp = assert_fs::TempDir::new().unwrap();
        let saved = Library::open(temp.path()).save(note("persistida")).unwrap();

        let reopened = Library::open(temp.path());
        assert_eq!(reopened.list(), vec![saved]);

        let raw = fs::read_to_string(temp.child("aurora_academic_library.json").path()).unwrap();
        assert!(raw.contains("persistida"));
    }

    #[test]
    fn test_corrupted_storage_reads_as_empty() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("aurora_academic_library.json")
            .write_str("{not json")
            .unwrap();

        let library = Library::open(temp.path());
        assert!(library.list().is_empty());

        library.save(note("recomeço")).unwrap();
        assert_eq!(library.list().len(), 1);
    }

    #[test]
    fn test_non_array_storage_reads_as_empty() {
        let backend = MemoryBackend::new();
        backend.set(LIBRARY_KEY, r#"{"id":"x"}"#).unwrap();

        assert!(Library::new(backend).list().is_empty());
    }

    #[test]
    fn test_unrecognised_entry_does_not_cost_saved_artifacts() {
        let backend = MemoryBackend::new();
        let seeded = json!([
            {
                "id": "keep-me",
                "type": "search",
                "title": "busca antiga",
                "content": "texto",
                "date": "2025-01-02T10:00:00Z"
            },
            {
                "id": "odd",
                "type": "synthesis",
                "title": "?",
                "content": "?",
                "date": "2025-01-01T10:00:00Z"
            }
        ]);
        backend.set(LIBRARY_KEY, &seeded.to_string()).unwrap();
        let library = Library::new(backend);

        let listed = library.list();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, "keep-me");

        let saved = library.save(note("nova")).unwrap();

        let ids: Vec<_> = library.list().into_iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![saved.id, "keep-me".to_string()]);

        let raw = library.backend().get(LIBRARY_KEY).unwrap().unwrap();
        let stored: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(stored.as_array().unwrap().len(), 3);
        assert_eq!(stored[2]["id"], "odd");
    }

    #[test]
    fn test_delete_keeps_unrecognised_entries() {
        let backend = MemoryBackend::new();
        backend
            .set(LIBRARY_KEY, r#"[{"id":"odd","type":"synthesis"}]"#)
            .unwrap();
        let library = Library::new(backend);
        let saved = library.save(note("x")).unwrap();

        library.delete(&saved.id).unwrap();

        let raw = library.backend().get(LIBRARY_KEY).unwrap().unwrap();
        assert_eq!(raw, r#"[{"id":"odd","type":"synthesis"}]"#);
    }

    struct UnreadableBackend {
        writes: Mutex<usize>,
    }

    impl KeyValueBackend for UnreadableBackend {
        fn get(&self, key: &str) -> Result<Option<String>> {
            Err(Error::io(
                key,
                std::io::Error::new(ErrorKind::PermissionDenied, "denied"),
            ))
        }

        fn set(&self, _key: &str, _value: &str) -> Result<()> {
            *self.writes.lock().unwrap() += 1;
            Ok(())
        }
    }

    #[test]
    fn test_unreadable_storage_is_never_overwritten() {
        let library = Library::new(UnreadableBackend {
            writes: Mutex::new(0),
        });

        assert!(library.list().is_empty());
        assert!(library.save(note("x")).unwrap_err().is_io());
        assert!(library.delete("any").unwrap_err().is_io());
        assert_eq!(*library.backend().writes.lock().unwrap(), 0);
    }

    #[test]
    fn test_missing_directory_is_created_on_save() {
        let temp = assert_fs::TempDir::new().unwrap();
        let dir = temp.child("nested").child("library");

        Library::open(dir.path()).save(note("x")).unwrap();

        assert!(dir.child("aurora_academic_library.json").path().exists());
    }

    #[test]
    fn test_artifact_type_ids() {
        for t in ArtifactType::all() {
            assert_eq!(ArtifactType::from_id(t.id()), Some(*t));
        }
        assert_eq!(ArtifactType::from_id("unknown"), None);
    }
}
