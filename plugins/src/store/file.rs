use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use sysmode_core::api::{ModeStore, StoreError};

/// Text file with one `SECTION.key=value` entry per line.
///
/// Blank lines, `#` comments and lines that are not entries are kept as-is
/// when the file is rewritten. Every write replaces the whole file through a
/// temp file in the same directory.
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

enum Line {
    Entry {
        section: String,
        key: String,
        value: String,
    },
    Other(String),
}

impl Line {
    fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return Line::Other(raw.to_string());
        }
        let Some((name, value)) = trimmed.split_once('=') else {
            return Line::Other(raw.to_string());
        };
        match name.trim().split_once('.') {
            Some((section, key)) if !section.is_empty() && !key.is_empty() => Line::Entry {
                section: section.to_string(),
                key: key.to_string(),
                value: value.trim().to_string(),
            },
            _ => Line::Other(raw.to_string()),
        }
    }

    fn matches(&self, section: &str, key: &str) -> bool {
        matches!(self, Line::Entry { section: s, key: k, .. } if s == section && k == key)
    }

    fn render(&self) -> String {
        match self {
            Line::Entry {
                section,
                key,
                value,
            } => format!("{section}.{key}={value}"),
            Line::Other(raw) => raw.clone(),
        }
    }
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, e: std::io::Error) -> StoreError {
        StoreError::io(self.path.display().to_string(), e)
    }

    fn read_lines(&self) -> Result<Vec<Line>, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(s) => Ok(s.lines().map(Line::parse).collect()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(self.io_err(e)),
        }
    }

    fn write_lines(&self, lines: &[Line]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
        }
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "store".to_string());
        let tmp = self
            .path
            .with_file_name(format!(".{file_name}.tmp-{}", std::process::id()));

        let mut body = String::new();
        for line in lines {
            body.push_str(&line.render());
            body.push('\n');
        }

        let mut file = fs::File::create(&tmp).map_err(|e| self.io_err(e))?;
        file.write_all(body.as_bytes())
            .and_then(|_| file.sync_all())
            .map_err(|e| self.io_err(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            self.io_err(e)
        })
    }
}

fn validate(section: &str, key: &str, value: &str) -> Result<(), StoreError> {
    let bad_name = |s: &str| s.is_empty() || s.contains(['\n', '\r', '=', '.']);
    if bad_name(section) || bad_name(key) {
        return Err(StoreError::Invalid(format!("bad name {section:?}.{key:?}")));
    }
    if value.contains(['\n', '\r']) {
        return Err(StoreError::Invalid(format!(
            "value for {section}.{key} spans lines"
        )));
    }
    Ok(())
}

impl ModeStore for FileStore {
    fn name(&self) -> &str {
        "file"
    }

    fn get(&self, section: &str, key: &str) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let lines = self.read_lines()?;
        Ok(lines.into_iter().rev().find_map(|line| match line {
            Line::Entry {
                section: s,
                key: k,
                value,
            } if s == section && k == key => Some(value),
            _ => None,
        }))
    }

    fn set(&self, section: &str, key: &str, value: &str) -> Result<(), StoreError> {
        validate(section, key, value)?;
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut lines = self.read_lines()?;
        let entry = Line::Entry {
            section: section.to_string(),
            key: key.to_string(),
            value: value.to_string(),
        };
        match lines.iter().position(|l| l.matches(section, key)) {
            Some(first) => {
                lines[first] = entry;
                let mut idx = 0;
                lines.retain(|l| {
                    let keep = idx <= first || !l.matches(section, key);
                    idx += 1;
                    keep
                });
            }
            None => lines.push(entry),
        }
        tracing::trace!(
            target: "sysmode.store",
            stage = "store.file.set",
            path = %self.path.display(),
            section = section,
            key = key
        );
        self.write_lines(&lines)
    }

    fn delete(&self, section: &str, key: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut lines = self.read_lines()?;
        let before = lines.len();
        lines.retain(|l| !l.matches(section, key));
        if lines.len() == before {
            return Ok(());
        }
        self.write_lines(&lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn store() -> (tempfile::TempDir, FileStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested").join("SystemMode.txt"));
        (dir, store)
    }

    #[test]
    fn test_missing_file_reads_empty() {
        let (_dir, store) = store();
        assert_eq!(store.get("DEVICE_OPTIMIZE", "currentstate").unwrap(), None);
        store.delete("DEVICE_OPTIMIZE", "currentstate").unwrap();
        assert!(!store.path().exists());
    }

    #[test]
    fn test_set_creates_file_and_replaces_value() {
        let (_dir, store) = store();
        store.set("DEVICE_OPTIMIZE", "currentstate", "VIDEO").unwrap();
        store.set("DEVICE_OPTIMIZE", "callsign", "a|b").unwrap();
        store.set("DEVICE_OPTIMIZE", "currentstate", "GAME").unwrap();

        let body = fs::read_to_string(store.path()).unwrap();
        assert_eq!(
            body,
            "DEVICE_OPTIMIZE.currentstate=GAME\nDEVICE_OPTIMIZE.callsign=a|b\n"
        );
        assert_eq!(
            store.get("DEVICE_OPTIMIZE", "currentstate").unwrap().as_deref(),
            Some("GAME")
        );
    }

    #[test]
    fn test_preserves_comments_and_collapses_duplicates() {
        let (_dir, store) = store();
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(
            store.path(),
            "# modes\nDEVICE_OPTIMIZE.callsign=org.rdk.Dummy\n\ngarbage line\nDEVICE_OPTIMIZE.callsign=other\n",
        )
        .unwrap();

        // last entry wins on read
        assert_eq!(
            store.get("DEVICE_OPTIMIZE", "callsign").unwrap().as_deref(),
            Some("other")
        );

        store.set("DEVICE_OPTIMIZE", "callsign", "x").unwrap();
        let body = fs::read_to_string(store.path()).unwrap();
        assert_eq!(body, "# modes\nDEVICE_OPTIMIZE.callsign=x\n\ngarbage line\n");

        store.delete("DEVICE_OPTIMIZE", "callsign").unwrap();
        let body = fs::read_to_string(store.path()).unwrap();
        assert_eq!(body, "# modes\n\ngarbage line\n");
    }

    #[test]
    fn test_rejects_values_that_break_the_format() {
        let (_dir, store) = store();
        assert!(matches!(
            store.set("DEVICE_OPTIMIZE", "currentstate", "GAME\nX.y=z"),
            Err(StoreError::Invalid(_))
        ));
        assert!(matches!(
            store.set("DEVICE.OPTIMIZE", "currentstate", "GAME"),
            Err(StoreError::Invalid(_))
        ));
        assert!(!store.path().exists());
    }

    #[test]
    fn test_reopen_sees_previous_writes() {
        let (_dir, store) = store();
        store.set("DEVICE_OPTIMIZE", "currentstate", "GAME").unwrap();
        let reopened = FileStore::new(store.path().to_path_buf());
        assert_eq!(
            reopened.get("DEVICE_OPTIMIZE", "currentstate").unwrap().as_deref(),
            Some("GAME")
        );
    }
}
