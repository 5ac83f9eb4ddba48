// ============================================================
// Layer 6 — Model Config Store
// ============================================================
// Records the configuration of each run in one JSON file,
// keyed by a caller-chosen name:
//
//   {
//       "tiny-run": {
//           "hidden_size": 128,
//           ...
//           "execute_time": "2026-10-19 14:03:11",
//           "model_desc": "tiny encoder smoke test"
//       }
//   }
//
// Saving is read-modify-write: the whole file is loaded, the
// entry for `key` is replaced, and the file is rewritten with a
// 4-space indent. Non-ASCII text is written as-is.
//
// Failures are returned, never swallowed:
//   - save: unreadable or corrupt file, or a failed write → Err
//   - get:  missing, unreadable or corrupt file → Err
//           file fine but key absent             → Ok(empty map)
//
// Reference: serde_json docs (PrettyFormatter)

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use serde::Serialize;
use serde_json::{ser::PrettyFormatter, Map, Serializer, Value};

use crate::domain::traits::ModelConfigStore;
use crate::infra::logger::TIMESTAMP_FORMAT;

pub struct JsonConfigStore {
    path: PathBuf,
}

impl JsonConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the whole file. An empty file reads as `{}`.
    fn read_all(&self) -> Result<Map<String, Value>> {
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("Cannot read model configs from '{}'", self.path.display()))?;
        if text.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str(&text)
            .with_context(|| format!("'{}' is not valid JSON", self.path.display()))?
        {
            Value::Object(map) => Ok(map),
            _ => bail!("'{}' does not hold a JSON object", self.path.display()),
        }
    }

    fn write_all(&self, configs: &Map<String, Value>) -> Result<()> {
        let mut buf = Vec::new();
        let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
        configs.serialize(&mut ser)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create directory '{}'", parent.display()))?;
        }
        fs::write(&self.path, buf)
            .with_context(|| format!("Cannot write model configs to '{}'", self.path.display()))
    }
}

impl ModelConfigStore for JsonConfigStore {
    fn save(&self, key: &str, model_desc: &str, mut config: Map<String, Value>) -> Result<()> {
        let mut configs = if self.path.exists() {
            self.read_all()?
        } else {
            Map::new()
        };

        let now = chrono::Local::now().format(TIMESTAMP_FORMAT).to_string();
        config.insert("execute_time".into(), Value::String(now));
        config.insert("model_desc".into(), Value::String(model_desc.to_string()));
        configs.insert(key.to_string(), Value::Object(config));

        self.write_all(&configs)?;
        tracing::debug!("Saved model config '{}' to '{}'", key, self.path.display());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Map<String, Value>> {
        if !self.path.exists() {
            bail!("No model config file at '{}'", self.path.display());
        }

        match self.read_all()?.remove(key) {
            Some(Value::Object(entry)) => Ok(entry),
            Some(_) => bail!("Entry '{}' in '{}' is not a JSON object", key, self.path.display()),
            None => {
                tracing::debug!("No model config named '{}'", key);
                Ok(Map::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_save_then_get_stamps_metadata() {
        let dir   = tempfile::tempdir().unwrap();
        let store = JsonConfigStore::new(dir.path().join("configs.json"));

        store.save("run", "first run", config(json!({"hidden_size": 128}))).unwrap();
        let entry = store.get("run").unwrap();

        assert_eq!(entry["hidden_size"], json!(128));
        assert_eq!(entry["model_desc"], json!("first run"));
        let stamp = entry["execute_time"].as_str().unwrap();
        assert!(chrono::NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).is_ok());
    }

    #[test]
    fn test_save_overwrites_existing_key() {
        let dir   = tempfile::tempdir().unwrap();
        let store = JsonConfigStore::new(dir.path().join("configs.json"));

        store.save("run", "a", config(json!({"layers": 2}))).unwrap();
        store.save("other", "b", config(json!({"layers": 4}))).unwrap();
        store.save("run", "c", config(json!({"layers": 6}))).unwrap();

        let text = fs::read_to_string(store.path()).unwrap();
        assert_eq!(text.matches("\"run\"").count(), 1);
        assert!(text.contains("\n    \"other\": {"));
        assert_eq!(store.get("run").unwrap()["layers"], json!(6));
        assert_eq!(store.get("other").unwrap()["layers"], json!(4));
    }

    #[test]
    fn test_missing_key_is_empty() {
        let dir   = tempfile::tempdir().unwrap();
        let store = JsonConfigStore::new(dir.path().join("configs.json"));
        store.save("run", "a", Map::new()).unwrap();
        assert!(store.get("nope").unwrap().is_empty());
    }

    #[test]
    fn test_missing_or_corrupt_file_is_an_error() {
        let dir   = tempfile::tempdir().unwrap();
        let store = JsonConfigStore::new(dir.path().join("absent.json"));
        assert!(store.get("run").is_err());

        let path = dir.path().join("corrupt.json");
        fs::write(&path, "{ not json").unwrap();
        let store = JsonConfigStore::new(&path);
        assert!(store.get("run").is_err());
        assert!(store.save("run", "a", Map::new()).is_err());
    }

    #[test]
    fn test_empty_file_reads_as_empty_object() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.json");
        fs::write(&path, "").unwrap();

        let store = JsonConfigStore::new(&path);
        assert!(store.get("run").unwrap().is_empty());
        store.save("run", "a", Map::new()).unwrap();
        assert_eq!(store.get("run").unwrap()["model_desc"], json!("a"));
    }

    #[test]
    fn test_non_ascii_is_kept() {
        let dir   = tempfile::tempdir().unwrap();
        let store = JsonConfigStore::new(dir.path().join("configs.json"));
        store.save("run", "中文模型", Map::new()).unwrap();
        let text = fs::read_to_string(store.path()).unwrap();
        assert!(text.contains("中文模型"));
    }
}
