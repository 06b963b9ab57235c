//! On-disk corpus: one JSON file per definition.
//!
//! Records live under `<root>/<dir>/<file>.json`; the relative path is the
//! record's stable handle. Writes go through a temp file, fsync, and rename
//! so a record is replaced all-or-nothing.

use crate::definition::Definition;
use crate::store::Corpus;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Errors from corpus disk operations.
#[derive(Debug, thiserror::Error)]
pub enum CorpusError {
    #[error("{path}: I/O error: {message}")]
    Io { path: String, message: String },

    #[error("{path}: parse error: {message}")]
    Parse { path: String, message: String },

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("corrupted substrate: {0}")]
    Corrupt(String),
}

fn io_error(path: &Path, error: &std::io::Error) -> CorpusError {
    CorpusError::Io {
        path: path.display().to_string(),
        message: error.to_string(),
    }
}

/// Load every `*.json` record under the root. Dot-prefixed entries (the
/// corpus lock among them) are skipped. Paths are keyed relative to the
/// root with `/` separators on every platform.
pub fn load_corpus(root: impl AsRef<Path>) -> Result<Corpus, CorpusError> {
    let root = root.as_ref();
    let mut paths = Vec::new();
    collect_record_files(root, &mut paths)?;
    paths.sort();

    let mut corpus = Corpus::new();
    for path in paths {
        let bytes = fs::read(&path).map_err(|e| io_error(&path, &e))?;
        validate_substrate_bytes(&path, &bytes)?;
        let definition: Definition =
            serde_json::from_slice(&bytes).map_err(|e| CorpusError::Parse {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        let relative = relative_key(root, &path)?;
        corpus.insert(&relative, definition);
    }
    Ok(corpus)
}

fn collect_record_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), CorpusError> {
    let entries = fs::read_dir(dir).map_err(|e| io_error(dir, &e))?;
    for entry in entries {
        let entry = entry.map_err(|e| io_error(dir, &e))?;
        let name = entry.file_name();
        if name.to_string_lossy().starts_with('.') {
            continue;
        }
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| io_error(&path, &e))?;
        if file_type.is_dir() {
            collect_record_files(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "json") {
            out.push(path);
        }
    }
    Ok(())
}

fn relative_key(root: &Path, path: &Path) -> Result<String, CorpusError> {
    let relative = path.strip_prefix(root).map_err(|e| CorpusError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    let mut parts = Vec::new();
    for component in relative.components() {
        let part = component.as_os_str().to_str().ok_or_else(|| {
            CorpusError::Corrupt(format!("{}: non-UTF-8 path component", path.display()))
        })?;
        parts.push(part);
    }
    Ok(parts.join("/"))
}

/// Persist one definition atomically at its relative path.
pub fn save_definition(
    root: impl AsRef<Path>,
    relative: &str,
    definition: &Definition,
) -> Result<(), CorpusError> {
    let path = root.as_ref().join(relative);
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| io_error(parent, &e))?;
    }

    let mut payload = serde_json::to_string_pretty(definition)
        .map_err(|e| CorpusError::Serialize(e.to_string()))?;
    payload.push('\n');

    let tmp_path = tmp_write_path(&path);
    let write_result = (|| -> Result<(), CorpusError> {
        let file = File::create(&tmp_path).map_err(|e| io_error(&tmp_path, &e))?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(payload.as_bytes())
            .map_err(|e| io_error(&tmp_path, &e))?;
        writer.flush().map_err(|e| io_error(&tmp_path, &e))?;
        let file = writer.into_inner().map_err(|e| CorpusError::Io {
            path: tmp_path.display().to_string(),
            message: e.to_string(),
        })?;
        file.sync_all().map_err(|e| io_error(&tmp_path, &e))?;
        Ok(())
    })();

    if let Err(error) = write_result {
        let _ = fs::remove_file(&tmp_path);
        return Err(error);
    }

    fs::rename(&tmp_path, &path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        CorpusError::Io {
            path: format!("{} -> {}", tmp_path.display(), path.display()),
            message: e.to_string(),
        }
    })?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        let dir = File::open(parent).map_err(|e| io_error(parent, &e))?;
        dir.sync_all().map_err(|e| io_error(parent, &e))?;
    }

    Ok(())
}

/// Conventional location for a new record: kind directory, id with dots
/// flattened to hyphens.
pub fn suggested_relative_path(kind: &str, id: &str) -> String {
    let dir = kind.to_lowercase();
    let file = if id.is_empty() {
        "unnamed".to_string()
    } else {
        id.replace('.', "-")
    };
    format!("{dir}/{file}.json")
}

fn tmp_write_path(path: &Path) -> PathBuf {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let mut tmp: OsString = path.as_os_str().to_os_string();
    tmp.push(format!(".tmp.{}.{}", std::process::id(), unique));
    PathBuf::from(tmp)
}

fn validate_substrate_bytes(path: &Path, bytes: &[u8]) -> Result<(), CorpusError> {
    if bytes.contains(&0) {
        return Err(CorpusError::Corrupt(format!(
            "{}: contains NUL byte(s)",
            path.display()
        )));
    }
    if std::str::from_utf8(bytes).is_err() {
        return Err(CorpusError::Corrupt(format!(
            "{}: contains non-UTF-8 byte sequence(s)",
            path.display()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TempDirGuard(PathBuf);

    impl TempDirGuard {
        fn new(prefix: &str) -> Self {
            let unique = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .expect("clock should be after unix epoch")
                .as_nanos();
            let path = std::env::temp_dir().join(format!(
                "canonry-corpus-{prefix}-{}-{unique}",
                std::process::id()
            ));
            fs::create_dir_all(&path).expect("temp dir should create");
            Self(path)
        }

        fn path(&self) -> &Path {
            &self.0
        }
    }

    impl Drop for TempDirGuard {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.0);
        }
    }

    fn definition(kind: &str, id: &str) -> Definition {
        let mut definition = Definition::new(kind, "");
        definition.id = id.to_string();
        definition
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = TempDirGuard::new("round-trip");
        save_definition(
            dir.path(),
            "stat/max-health.json",
            &definition("Stat", "core.maxHealth"),
        )
        .expect("first save should succeed");
        save_definition(
            dir.path(),
            "unit/soldier.json",
            &definition("Unit", "unit.soldier"),
        )
        .expect("second save should succeed");

        let corpus = load_corpus(dir.path()).expect("corpus should load");
        assert_eq!(corpus.len(), 2);
        let loaded = corpus.get("stat/max-health.json").expect("record must exist");
        assert_eq!(loaded.id, "core.maxHealth");
        assert_eq!(loaded.path, "stat/max-health.json");
    }

    #[test]
    fn save_replaces_records_atomically() {
        let dir = TempDirGuard::new("atomic");
        let mut record = definition("Unit", "unit.soldier");
        save_definition(dir.path(), "unit/soldier.json", &record)
            .expect("first save should succeed");
        record.id = "unit.veteranSoldier".to_string();
        save_definition(dir.path(), "unit/soldier.json", &record)
            .expect("second save should succeed");

        let corpus = load_corpus(dir.path()).expect("corpus should load");
        assert_eq!(
            corpus.get("unit/soldier.json").map(|d| d.id.as_str()),
            Some("unit.veteranSoldier")
        );
    }

    #[test]
    fn load_rejects_nul_payload() {
        let dir = TempDirGuard::new("nul");
        let file = dir.path().join("bad.json");
        fs::write(&file, b"{\"kind\":\"Unit\",\"id\":\"x\"}\0garbage").expect("fixture write");
        match load_corpus(dir.path()) {
            Err(CorpusError::Corrupt(message)) => assert!(message.contains("NUL")),
            other => panic!("expected corrupt substrate error, got {other:?}"),
        }
    }

    #[test]
    fn load_rejects_non_utf8_payload() {
        let dir = TempDirGuard::new("non-utf8");
        let file = dir.path().join("bad.json");
        fs::write(&file, [0xff, 0xfe, 0xfd]).expect("fixture write");
        match load_corpus(dir.path()) {
            Err(CorpusError::Corrupt(message)) => assert!(message.contains("non-UTF-8")),
            other => panic!("expected corrupt substrate error, got {other:?}"),
        }
    }

    #[test]
    fn load_skips_dot_entries_and_non_json() {
        let dir = TempDirGuard::new("skips");
        fs::write(dir.path().join(".canonry.lock"), b"pid=1").expect("fixture write");
        fs::write(dir.path().join("notes.txt"), b"notes").expect("fixture write");
        save_definition(dir.path(), "unit/soldier.json", &definition("Unit", "unit.soldier"))
            .expect("save should succeed");
        let corpus = load_corpus(dir.path()).expect("corpus should load");
        assert_eq!(corpus.len(), 1);
    }

    #[test]
    fn load_of_missing_root_errors() {
        let dir = TempDirGuard::new("missing-root");
        let missing = dir.path().join("nope");
        assert!(matches!(load_corpus(&missing), Err(CorpusError::Io { .. })));
    }

    #[test]
    fn suggested_paths_flatten_ids() {
        assert_eq!(
            suggested_relative_path("Unit", "unit.heavySoldier"),
            "unit/unit-heavySoldier.json"
        );
        assert_eq!(suggested_relative_path("Stat", ""), "stat/unnamed.json");
    }
}
