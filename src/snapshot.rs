//! Snapshot model and on-disk line format
//!
//! A snapshot file is UTF-8 text with one `<hex-hash> *<relative-path>` line per
//! file, lines joined by `\n` with no trailing newline. The recovery file uses
//! the same format.

use chrono::{DateTime, Local, TimeZone};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Suffix shared by snapshot files and diff result files
pub const SNAPSHOT_SUFFIX: &str = ".sha256";

/// Separator between the hash column and the path column
pub const FIELD_SEPARATOR: &str = " *";

/// Hash column value for a file that could not be read
pub const READ_ERROR_SENTINEL: &str = "-";

/// `strftime` pattern for snapshot identities
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

const IDENTITY_LEN: usize = 14;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("{source_name}:{line}: missing ' *' separator in {content:?}")]
    MalformedLine {
        source_name: String,
        line: usize,
        content: String,
    },

    #[error("'{0}' is not a 14-digit snapshot identity")]
    InvalidIdentity(String),
}

/// 14-digit `YYYYMMDDHHmmss` local timestamp naming a snapshot.
///
/// Fixed width and zero padding make lexicographic order chronological.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SnapshotId(String);

impl SnapshotId {
    /// Identity for the current local time
    pub fn now() -> Self {
        Self::from_datetime(&Local::now())
    }

    pub fn from_datetime<Tz: TimeZone>(at: &DateTime<Tz>) -> Self
    where
        Tz::Offset: fmt::Display,
    {
        Self(at.format(TIMESTAMP_FORMAT).to_string())
    }

    pub fn parse(raw: &str) -> Result<Self, SnapshotError> {
        if raw.len() == IDENTITY_LEN && raw.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(raw.to_string()))
        } else {
            Err(SnapshotError::InvalidIdentity(raw.to_string()))
        }
    }

    /// Parse a snapshot file name (`<identity>.sha256`); anything else is `None`
    pub fn from_file_name(name: &str) -> Option<Self> {
        name.strip_suffix(SNAPSHOT_SUFFIX)
            .and_then(|stem| Self::parse(stem).ok())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn file_name(&self) -> String {
        format!("{}{}", self.0, SNAPSHOT_SUFFIX)
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What is known about one file's content hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HashState {
    /// Lower-case hex SHA-256 digest
    Computed(String),
    /// Reading the file failed during the pass that produced this entry
    ReadError,
    /// Not hashed yet
    Pending,
}

impl HashState {
    pub fn hash(&self) -> Option<&str> {
        match self {
            HashState::Computed(hash) => Some(hash),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, HashState::Pending)
    }

    fn from_field(field: &str) -> Self {
        if field == READ_ERROR_SENTINEL {
            HashState::ReadError
        } else {
            HashState::Computed(field.to_string())
        }
    }

    fn as_field(&self) -> Option<&str> {
        match self {
            HashState::Computed(hash) => Some(hash),
            HashState::ReadError => Some(READ_ERROR_SENTINEL),
            HashState::Pending => None,
        }
    }
}

/// Ordered mapping from relative path to hash state.
///
/// Keeps insertion (walk) order for writing and a path index for lookups.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub identity: Option<SnapshotId>,
    entries: Vec<(String, HashState)>,
    index: HashMap<String, usize>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identity(mut self, identity: SnapshotId) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Insert or replace the state for `path`, keeping its original position
    pub fn insert(&mut self, path: impl Into<String>, state: HashState) {
        let path = path.into();
        match self.index.get(&path) {
            Some(&i) => self.entries[i].1 = state,
            None => {
                self.index.insert(path.clone(), self.entries.len());
                self.entries.push((path, state));
            }
        }
    }

    pub fn get(&self, path: &str) -> Option<&HashState> {
        self.index.get(path).map(|&i| &self.entries[i].1)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.index.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &HashState)> {
        self.entries.iter().map(|(path, state)| (path.as_str(), state))
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(path, _)| path.as_str())
    }

    /// Paths recorded as unreadable
    pub fn read_errors(&self) -> impl Iterator<Item = &str> {
        self.iter()
            .filter(|(_, state)| **state == HashState::ReadError)
            .map(|(path, _)| path)
    }

    /// Render in the on-disk line format. Pending entries are omitted.
    pub fn to_text(&self) -> String {
        render_lines(self.iter())
    }

    /// Parse the on-disk line format. `source_name` is only used in errors.
    pub fn parse(text: &str, source_name: &str) -> Result<Self, SnapshotError> {
        let mut snapshot = Snapshot::new();
        for (i, raw) in text.lines().enumerate() {
            let line = raw.strip_suffix('\r').unwrap_or(raw);
            let (hash, path) =
                line.split_once(FIELD_SEPARATOR)
                    .ok_or_else(|| SnapshotError::MalformedLine {
                        source_name: source_name.to_string(),
                        line: i + 1,
                        content: line.to_string(),
                    })?;
            snapshot.insert(path, HashState::from_field(hash));
        }
        Ok(snapshot)
    }
}

/// Render `(path, state)` pairs as snapshot lines, skipping pending entries
pub fn render_lines<'a, I>(entries: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a HashState)>,
{
    entries
        .into_iter()
        .filter_map(|(path, state)| {
            state
                .as_field()
                .map(|field| format!("{}{}{}", field, FIELD_SEPARATOR, path))
        })
        .collect::<Vec<_>>()
        .join("\n")
}
