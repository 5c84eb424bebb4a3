//! Ordered key/value store and INI file parsing.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::domain::{ConfigError, Result};

/// Ordered mapping of configuration keys to string values.
///
/// Keys are case-insensitive and stored lower-cased. Entries iterate in the
/// order they were first inserted; replacing a value keeps its position.
#[derive(Debug, Clone, Default)]
pub struct Store {
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

/// Classified INI line.
enum Line<'a> {
    Blank,
    Section(&'a str),
    Entry(&'a str, &'a str),
}

impl Store {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read and parse an INI file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text).map_err(|(line, content)| ConfigError::Parse {
            path: path.to_path_buf(),
            line,
            content,
        })
    }

    /// Parse INI text.
    ///
    /// On failure returns the 1-based line number and the offending text.
    pub fn parse(text: &str) -> std::result::Result<Self, (usize, String)> {
        let mut store = Self::new();
        let mut section = String::new();
        let mut pending = String::new();
        let mut start_line = 1;

        for (idx, raw) in text.lines().enumerate() {
            if pending.is_empty() {
                start_line = idx + 1;
            }
            let line = raw.trim();

            // Backslash continues the logical line
            if let Some(head) = line.strip_suffix('\\') {
                pending.push_str(head);
                continue;
            }
            pending.push_str(line);

            let logical = std::mem::take(&mut pending);
            store.apply_line(&logical, &mut section, start_line)?;
        }

        if !pending.is_empty() {
            store.apply_line(&pending, &mut section, start_line)?;
        }

        Ok(store)
    }

    fn apply_line(
        &mut self,
        line: &str,
        section: &mut String,
        line_no: usize,
    ) -> std::result::Result<(), (usize, String)> {
        match classify(line) {
            Some(Line::Blank) => {}
            Some(Line::Section(name)) => *section = name.to_ascii_lowercase(),
            Some(Line::Entry(key, value)) => {
                if section.is_empty() {
                    self.set(key, value);
                } else {
                    self.set(&format!("{section}:{key}"), value);
                }
            }
            None => return Err((line_no, line.to_string())),
        }
        Ok(())
    }

    /// Look up a key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.index
            .get(&normalize(key))
            .map(|&i| self.entries[i].1.as_str())
    }

    /// Whether the key has a value.
    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(&normalize(key))
    }

    /// Insert or replace a value.
    pub fn set(&mut self, key: &str, value: &str) {
        let key = normalize(key);
        if let Some(&i) = self.index.get(&key) {
            self.entries[i].1 = value.to_string();
        } else {
            self.index.insert(key.clone(), self.entries.len());
            self.entries.push((key, value.to_string()));
        }
    }

    /// Remove a key, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let i = self.index.remove(&normalize(key))?;
        let (_, value) = self.entries.remove(i);
        for slot in self.index.values_mut() {
            if *slot > i {
                *slot -= 1;
            }
        }
        Some(value)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Entry at a position in insertion order.
    pub(crate) fn entry_at(&self, i: usize) -> Option<(&str, &str)> {
        self.entries.get(i).map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl IntoIterator for Store {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

fn normalize(key: &str) -> String {
    key.to_ascii_lowercase()
}

fn classify(line: &str) -> Option<Line<'_>> {
    if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
        return Some(Line::Blank);
    }

    if let Some(rest) = line.strip_prefix('[') {
        let end = rest.find(']')?;
        let name = rest[..end].trim();
        return Some(Line::Section(name));
    }

    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some(Line::Entry(key, unquote(value.trim())))
}

/// Strip surrounding quotes, or an inline comment from an unquoted value.
fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(rest) = value.strip_prefix(quote) {
            if let Some(end) = rest.find(quote) {
                return &rest[..end];
            }
        }
    }
    match value.find([';', '#']) {
        Some(pos) => value[..pos].trim_end(),
        None => value,
    }
}
