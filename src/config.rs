//! Comment-preserving store for OneDrive instance configuration files.
//!
//! The client's config is a line-oriented `key = "value"` file. Reads flatten it
//! into a map; writes re-walk the current file so comments, blank lines and
//! ordering survive, with entries re-emitted in canonical quoted form.
use std::{
    collections::HashSet,
    env,
    fs::{self, File, OpenOptions},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use fs2::FileExt;
use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::{
    constants::{COMMENT_MARKER, CONFIG_LOCK_SUFFIX, LOCK_DIR_NAME},
    error::ConfigStoreError,
};

/// Key/value view of a config file, in insertion order. New keys are appended in that order.
pub type ConfigValues = IndexMap<String, String>;

/// One physical line of a config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigLine {
    /// Comment, blank or unstructured line, kept verbatim.
    Opaque(String),
    /// A `key = value` assignment.
    Entry { key: String, value: String },
}

impl ConfigLine {
    fn parse(raw: &str) -> Self {
        let stripped = raw.trim();
        if stripped.is_empty() || stripped.starts_with(COMMENT_MARKER) {
            return Self::Opaque(raw.to_string());
        }

        match stripped.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => Self::Entry {
                key: key.trim().to_string(),
                value: unquote(value.trim()).to_string(),
            },
            _ => Self::Opaque(raw.to_string()),
        }
    }

    fn render(&self) -> String {
        match self {
            Self::Opaque(raw) => raw.clone(),
            Self::Entry { key, value } => format_entry(key, value),
        }
    }
}

fn unquote(value: &str) -> &str {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

fn format_entry(key: &str, value: &str) -> String {
    format!("{key} = \"{value}\"")
}

/// Ordered lines of one config file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigDocument {
    lines: Vec<ConfigLine>,
}

impl ConfigDocument {
    /// Parses file content line by line.
    pub fn parse(content: &str) -> Self {
        Self {
            lines: content.lines().map(ConfigLine::parse).collect(),
        }
    }

    /// Lines in file order.
    pub fn lines(&self) -> &[ConfigLine] {
        &self.lines
    }

    /// Flattens entries into a map; later duplicates win.
    pub fn values(&self) -> ConfigValues {
        let mut values = ConfigValues::new();
        for line in &self.lines {
            if let ConfigLine::Entry { key, value } = line {
                values.insert(key.clone(), value.clone());
            }
        }
        values
    }

    /// Builds the document that results from saving `values` over this one.
    ///
    /// Every entry whose key is in `values` takes the new value in place, even
    /// when the key repeats. Entries whose key is missing are dropped. Keys not
    /// seen in the file are appended in map order.
    pub fn merged(&self, values: &ConfigValues) -> Self {
        let mut handled: HashSet<&str> = HashSet::new();
        let mut lines = Vec::with_capacity(self.lines.len() + values.len());

        for line in &self.lines {
            match line {
                ConfigLine::Opaque(_) => lines.push(line.clone()),
                ConfigLine::Entry { key, .. } => {
                    if let Some((key, value)) = values.get_key_value(key) {
                        handled.insert(key.as_str());
                        lines.push(ConfigLine::Entry {
                            key: key.clone(),
                            value: value.clone(),
                        });
                    }
                }
            }
        }

        for (key, value) in values {
            if key.is_empty() || handled.contains(key.as_str()) {
                continue;
            }
            lines.push(ConfigLine::Entry {
                key: key.clone(),
                value: value.clone(),
            });
        }

        Self { lines }
    }

    /// Serializes the document, one line per entry with a trailing newline.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(&line.render());
            out.push('\n');
        }
        out
    }
}

/// Handle on one instance config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigStore {
    path: PathBuf,
    lock_dir: Option<PathBuf>,
}

impl ConfigStore {
    /// Creates a store for the file at `path`. Nothing is read until asked.
    ///
    /// Locks live under `$XDG_RUNTIME_DIR/drivux` when that is set, otherwise
    /// next to the config file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let lock_dir = env::var_os("XDG_RUNTIME_DIR")
            .filter(|dir| !dir.is_empty())
            .map(|dir| PathBuf::from(dir).join(LOCK_DIR_NAME));
        Self {
            path: path.into(),
            lock_dir,
        }
    }

    /// Keeps lock files in `dir` instead of the default location.
    pub fn with_lock_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.lock_dir = Some(dir.into());
        self
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<ConfigDocument, ConfigStoreError> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(ConfigDocument::parse(&content)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(ConfigDocument::default()),
            Err(source) => Err(ConfigStoreError::Read {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Parses the file into a map. A missing file is an empty map.
    pub fn read(&self) -> Result<ConfigValues, ConfigStoreError> {
        Ok(self.load()?.values())
    }

    /// Rewrites the file so it holds exactly `values`, preserving comments and order.
    pub fn write(&self, values: &ConfigValues) -> Result<(), ConfigStoreError> {
        let _lock = self.lock()?;
        self.write_unlocked(values)
    }

    /// Returns the value of `key`, or `default` when unset.
    pub fn get(&self, key: &str, default: &str) -> Result<String, ConfigStoreError> {
        Ok(self
            .read()?
            .shift_remove(key)
            .unwrap_or_else(|| default.to_string()))
    }

    /// Sets `key` to `value`. An empty key is ignored.
    pub fn set(&self, key: &str, value: &str) -> Result<(), ConfigStoreError> {
        if key.trim().is_empty() {
            debug!("Ignoring config set with empty key for {:?}", self.path);
            return Ok(());
        }

        let _lock = self.lock()?;
        let mut values = self.load()?.values();
        values.insert(key.trim().to_string(), value.to_string());
        self.write_unlocked(&values)
    }

    /// Removes `key` from the file. Removing an absent key still rewrites the file.
    pub fn remove(&self, key: &str) -> Result<(), ConfigStoreError> {
        let _lock = self.lock()?;
        let mut values = self.load()?.values();
        values.shift_remove(key);
        self.write_unlocked(&values)
    }

    fn write_unlocked(&self, values: &ConfigValues) -> Result<(), ConfigStoreError> {
        let content = self.load()?.merged(values).render();
        write_atomic(&self.resolved_path(), &content).map_err(|source| {
            ConfigStoreError::Write {
                path: self.path.clone(),
                source,
            }
        })?;
        debug!("Wrote {} keys to {:?}", values.len(), self.path);
        Ok(())
    }

    /// The file a write replaces. Symlinks are followed so the link survives.
    fn resolved_path(&self) -> PathBuf {
        if let Ok(target) = fs::canonicalize(&self.path) {
            return target;
        }
        match (self.path.parent(), self.path.file_name()) {
            (Some(parent), Some(name)) => fs::canonicalize(parent)
                .map(|parent| parent.join(name))
                .unwrap_or_else(|_| self.path.clone()),
            _ => self.path.clone(),
        }
    }

    fn lock_path(&self) -> PathBuf {
        let target = self.resolved_path();
        match &self.lock_dir {
            Some(dir) => dir.join(format!("{}{CONFIG_LOCK_SUFFIX}", escape_path(&target))),
            None => {
                let mut name = target
                    .file_name()
                    .map(|name| name.to_os_string())
                    .unwrap_or_default();
                name.push(CONFIG_LOCK_SUFFIX);
                target.with_file_name(name)
            }
        }
    }

    fn lock(&self) -> Result<ConfigLock, ConfigStoreError> {
        let lock_err = |source| ConfigStoreError::Lock {
            path: self.path.clone(),
            source,
        };

        let lock_path = self.lock_path();
        if let Some(parent) = lock_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(lock_err)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(lock_err)?;
        file.lock_exclusive().map_err(lock_err)?;
        Ok(ConfigLock { file })
    }
}

/// Flattens a path into one file name: `/home/u/.config/onedrive/config`
/// becomes `home%2Fu%2F.config%2Fonedrive%2Fconfig`.
fn escape_path(path: &Path) -> String {
    path.to_string_lossy()
        .trim_start_matches('/')
        .replace('%', "%25")
        .replace('/', "%2F")
}

struct ConfigLock {
    file: File,
}

impl Drop for ConfigLock {
    fn drop(&mut self) {
        if let Err(err) = FileExt::unlock(&self.file) {
            warn!("Failed to release config lock: {err}");
        }
    }
}

/// Replaces `path` with `content` via a temp file in the same directory.
fn write_atomic(path: &Path, content: &str) -> std::io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent)?;

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "config".to_string());
    let tmp_path = parent.join(format!(".{}.tmp.{}", file_name, std::process::id()));

    let permissions = fs::metadata(path).ok().map(|meta| meta.permissions());

    let result = (|| {
        let mut tmp = File::create(&tmp_path)?;
        tmp.write_all(content.as_bytes())?;
        tmp.sync_all()?;
        if let Some(permissions) = permissions {
            fs::set_permissions(&tmp_path, permissions)?;
        }
        fs::rename(&tmp_path, path)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

/// Reads the config file at `path`.
pub fn read(path: &Path) -> Result<ConfigValues, ConfigStoreError> {
    ConfigStore::new(path).read()
}

/// Rewrites the config file at `path` to hold `values`.
pub fn write(path: &Path, values: &ConfigValues) -> Result<(), ConfigStoreError> {
    ConfigStore::new(path).write(values)
}

/// Reads a single key from the config file at `path`.
pub fn get(path: &Path, key: &str, default: &str) -> Result<String, ConfigStoreError> {
    ConfigStore::new(path).get(key, default)
}

/// Sets a single key in the config file at `path`.
pub fn set(path: &Path, key: &str, value: &str) -> Result<(), ConfigStoreError> {
    ConfigStore::new(path).set(key, value)
}

/// Removes a single key from the config file at `path`.
pub fn remove(path: &Path, key: &str) -> Result<(), ConfigStoreError> {
    ConfigStore::new(path).remove(key)
}
