use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::store::ArtifactStore;

#[derive(Serialize, Deserialize)]
struct PersistedArtifacts {
    #[serde(default)]
    summaries: Vec<String>,
    #[serde(default)]
    test_code: String,
    #[serde(default)]
    saved_at: String,
}

pub fn load(store: &mut ArtifactStore, session_id: &str) {
    load_from(store, &session_file(session_id));
}

pub fn save(store: &ArtifactStore, session_id: &str) -> Result<(), Error> {
    save_to(store, &session_file(session_id))
}

/// Logout removes the whole session file; artifacts never outlive the
/// session they were generated under.
pub fn remove(session_id: &str) {
    let _ = fs::remove_file(session_file(session_id));
}

fn load_from(store: &mut ArtifactStore, path: &Path) {
    let Ok(raw) = fs::read_to_string(path) else {
        return;
    };
    let Ok(saved) = serde_json::from_str::<PersistedArtifacts>(&raw) else {
        return;
    };
    store.restore(saved.summaries, saved.test_code);
}

fn save_to(store: &ArtifactStore, path: &Path) -> Result<(), Error> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(storage)?;
    }

    let payload = PersistedArtifacts {
        summaries: store.summaries().to_vec(),
        test_code: store.test_code().to_string(),
        saved_at: Utc::now().to_rfc3339(),
    };

    let text = serde_json::to_string_pretty(&payload).map_err(storage)?;
    fs::write(path, text).map_err(storage)
}

fn storage(e: impl std::fmt::Display) -> Error {
    Error::Storage(e.to_string())
}

fn session_file(session_id: &str) -> PathBuf {
    let mut base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    base.push("testloom");
    base.push("sessions");
    base.push(format!("{}.json", session_id));
    base
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn temp_file() -> PathBuf {
        std::env::temp_dir().join(format!("testloom-{}.json", Uuid::new_v4()))
    }

    #[test]
    fn artifacts_round_trip() {
        let path = temp_file();

        let mut store = ArtifactStore::new();
        store.append_summaries(0, vec!["Test add()".into(), "Test sub()".into()]);
        store.set_test_code(0, "test('adds', ...)".into());
        save_to(&store, &path).unwrap();

        let mut restored = ArtifactStore::new();
        load_from(&mut restored, &path);
        assert_eq!(restored.summaries(), store.summaries());
        assert_eq!(restored.test_code(), store.test_code());

        let _ = fs::remove_file(path);
    }

    #[test]
    fn missing_file_leaves_store_untouched() {
        let mut store = ArtifactStore::new();
        store.append_summaries(0, vec!["kept".into()]);

        load_from(&mut store, &temp_file());
        assert_eq!(store.summaries(), ["kept"]);
    }

    #[test]
    fn corrupt_file_is_ignored() {
        let path = temp_file();
        fs::write(&path, "not json at all").unwrap();

        let mut store = ArtifactStore::new();
        store.append_summaries(0, vec!["kept".into()]);
        load_from(&mut store, &path);
        assert_eq!(store.summaries(), ["kept"]);

        let _ = fs::remove_file(path);
    }
}
