//! Loading of dev-stats JSON snapshots
//!
//! Snapshots are point-in-time dumps of server and client state,
//! written either as a single JSON object or as an array of them. A
//! path argument may name one file or a directory of `*.json` files.
//! One unparseable file is a warning and a skip, never a batch abort.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use tracing::warn;

/// Errors produced by [`load`]
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Error getting metadata for the snapshot path
    #[error("Failed to get metadata for snapshot path {path:?}: {source}")]
    Metadata {
        /// Snapshot path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: Box<std::io::Error>,
    },
    /// Error reading a snapshot file given directly
    #[error("Failed to read snapshot file {path:?}: {source}")]
    ReadFile {
        /// File path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: Box<std::io::Error>,
    },
    /// Error reading directory entries
    #[error("Failed to read directory entries from {path:?}: {source}")]
    ReadDir {
        /// Directory path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: Box<std::io::Error>,
    },
}

#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
/// State of one connected client at snapshot time. Unknown fields in
/// the document are ignored.
pub struct ClientState {
    /// Recent RTC latency observations, milliseconds.
    pub latency_history: Option<Vec<f64>>,
    /// Current adaptive buffer size, milliseconds.
    pub buffer_size_ms: Option<f64>,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
/// One point-in-time dump of server and client state.
pub struct Snapshot {
    /// Server wall clock at capture time, milliseconds.
    pub server_time: Option<f64>,
    /// Per-client state, when any clients were connected.
    pub clients: Option<Vec<ClientState>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
/// A snapshot document holds either one snapshot or a batch of them.
enum Document {
    Many(Vec<Snapshot>),
    One(Snapshot),
}

#[derive(Debug, Default)]
/// Result of loading one snapshot path.
pub struct SnapshotBatch {
    /// All loaded snapshots, in file order then in-document order.
    pub snapshots: Vec<Snapshot>,
    /// Files dropped because their content did not parse as JSON.
    pub skipped_files: u64,
}

/// Load snapshots from a file or a directory of `*.json` files.
///
/// Directory loads are non-recursive and visit files in sorted name
/// order so runs are reproducible. Each file handle is released as
/// soon as its content is read.
///
/// # Errors
///
/// Returns an error if the path or its directory listing cannot be
/// read. A file that reads but does not parse is skipped with a
/// warning and counted in [`SnapshotBatch::skipped_files`].
pub fn load(path: &Path) -> Result<SnapshotBatch, Error> {
    let metadata = fs::metadata(path).map_err(|source| Error::Metadata {
        path: path.to_path_buf(),
        source: Box::new(source),
    })?;

    let mut batch = SnapshotBatch::default();
    if metadata.is_dir() {
        let mut files = Vec::new();
        for entry in fs::read_dir(path).map_err(|source| Error::ReadDir {
            path: path.to_path_buf(),
            source: Box::new(source),
        })? {
            let entry = entry.map_err(|source| Error::ReadDir {
                path: path.to_path_buf(),
                source: Box::new(source),
            })?;
            let entry_path = entry.path();
            let is_json = entry_path.is_file()
                && entry_path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext == "json");
            if is_json {
                files.push(entry_path);
            }
        }
        files.sort();
        for file in files {
            match fs::read_to_string(&file) {
                Ok(contents) => load_document(&file, &contents, &mut batch),
                Err(error) => {
                    warn!("Skipping unreadable snapshot file {file:?}: {error}");
                    batch.skipped_files += 1;
                }
            }
        }
    } else {
        let contents = fs::read_to_string(path).map_err(|source| Error::ReadFile {
            path: path.to_path_buf(),
            source: Box::new(source),
        })?;
        load_document(path, &contents, &mut batch);
    }
    Ok(batch)
}

/// Parse one document's content into the batch, skipping on failure.
fn load_document(path: &Path, contents: &str, batch: &mut SnapshotBatch) {
    match serde_json::from_str::<Document>(contents) {
        Ok(Document::Many(snapshots)) => batch.snapshots.extend(snapshots),
        Ok(Document::One(snapshot)) => batch.snapshots.push(snapshot),
        Err(error) => {
            warn!("Error parsing snapshot JSON in {path:?}: {error}");
            batch.skipped_files += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn single_object_file_is_one_snapshot() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        write!(
            file,
            r#"{{"serverTime": 5000, "clients": [{{"latencyHistory": [10, 12], "bufferSizeMs": 40}}]}}"#
        )
        .expect("write fixture");

        let batch = load(file.path()).expect("load should succeed");
        assert_eq!(batch.snapshots.len(), 1);
        assert_eq!(batch.skipped_files, 0);
        let snapshot = &batch.snapshots[0];
        assert_eq!(snapshot.server_time, Some(5000.0));
        let clients = snapshot.clients.as_ref().expect("clients present");
        assert_eq!(clients[0].latency_history, Some(vec![10.0, 12.0]));
        assert_eq!(clients[0].buffer_size_ms, Some(40.0));
    }

    #[test]
    fn array_file_is_many_snapshots_in_order() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        write!(
            file,
            r#"[{{"serverTime": 1}}, {{"serverTime": 2}}, {{"serverTime": 3}}]"#
        )
        .expect("write fixture");

        let batch = load(file.path()).expect("load should succeed");
        let times: Vec<Option<f64>> = batch.snapshots.iter().map(|s| s.server_time).collect();
        assert_eq!(times, vec![Some(1.0), Some(2.0), Some(3.0)]);
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        write!(
            file,
            r#"{{"serverTime": 1, "mode": "rpsv", "clients": [{{"id": "c1", "bufferSizeMs": 30}}]}}"#
        )
        .expect("write fixture");

        let batch = load(file.path()).expect("load should succeed");
        assert_eq!(batch.snapshots.len(), 1);
    }

    #[test]
    fn directory_load_skips_malformed_files() {
        let dir = tempfile::tempdir().expect("create temp dir");
        fs::write(dir.path().join("01.json"), r#"{"serverTime": 1}"#).expect("write fixture");
        fs::write(dir.path().join("02.json"), "{definitely not json").expect("write fixture");
        fs::write(dir.path().join("03.json"), r#"[{"serverTime": 3}]"#).expect("write fixture");
        fs::write(dir.path().join("notes.txt"), "ignore me").expect("write fixture");

        let batch = load(dir.path()).expect("load should succeed");
        assert_eq!(batch.skipped_files, 1);
        let times: Vec<Option<f64>> = batch.snapshots.iter().map(|s| s.server_time).collect();
        assert_eq!(times, vec![Some(1.0), Some(3.0)]);
    }

    #[test]
    fn missing_path_is_an_error() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let result = load(&dir.path().join("absent.json"));
        assert!(matches!(result, Err(Error::Metadata { .. })));
    }

    #[test]
    fn empty_object_snapshot_is_all_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        write!(file, "{{}}").expect("write fixture");

        let batch = load(file.path()).expect("load should succeed");
        assert_eq!(batch.snapshots[0], Snapshot::default());
    }
}
