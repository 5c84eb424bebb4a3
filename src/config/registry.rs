//! Layered configuration registry.

use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use parking_lot::{RwLock, RwLockReadGuard};
use tracing::{debug, error};

use super::store::Store;
use super::value::{parse_bool, parse_int};
use crate::domain::{ConfigError, Result};

/// Plain function usable as a defaults populator, handy for `init(None::<Populator>)`.
pub type Populator = fn(&ConfigRegistry) -> anyhow::Result<()>;

/// Key that may redirect `load` to a different configuration file.
pub const CONFIG_FILE_KEY: &str = "global:configFile";

#[derive(Debug, Default)]
struct Stores {
    initialized: bool,
    defaults: Option<Store>,
    overrides: Option<Store>,
    config: Option<Store>,
}

impl Stores {
    /// Create the defaults and overrides stores once.
    fn ensure_init(&mut self) {
        if !self.initialized {
            self.defaults = Some(Store::new());
            self.overrides = Some(Store::new());
            self.initialized = true;
        }
    }

    /// Store that holds real values: the loaded config, or overrides before load.
    fn primary(&self) -> Option<&Store> {
        self.config.as_ref().or(self.overrides.as_ref())
    }

    /// Lookup sources in precedence order.
    fn sources(&self) -> [Option<&Store>; 2] {
        [self.primary(), self.defaults.as_ref()]
    }

    fn resolve<'a>(&'a self, key: &str, default: Option<&'a str>) -> Option<&'a str> {
        self.sources()
            .into_iter()
            .flatten()
            .find_map(|store| store.get(key))
            .or(default)
    }
}

/// Configuration registry.
///
/// Values resolve in the order: loaded config (or overrides before the first
/// load), defaults, then the caller-supplied default. Writers are exclusive,
/// readers share the lock.
///
/// Reads are recursive, so a thread holding a [`SectionIter`] or running a
/// `for_each_in_section` callback may look values up again even while a
/// writer is queued.
#[derive(Debug, Default)]
pub struct ConfigRegistry {
    stores: RwLock<Stores>,
}

impl ConfigRegistry {
    /// Create an empty, uninitialized registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Initialize the defaults and overrides stores.
    ///
    /// Store creation happens once no matter how many callers race here. The
    /// populator runs after the lock is released and is expected to call
    /// [`ConfigRegistry::set_default`].
    pub fn init<F>(&self, populate: Option<F>) -> Result<()>
    where
        F: FnOnce(&ConfigRegistry) -> anyhow::Result<()>,
    {
        self.stores.write().ensure_init();

        if let Some(populate) = populate {
            populate(self).map_err(ConfigError::Populator)?;
        }
        Ok(())
    }

    /// Load the configuration file.
    ///
    /// The path is taken from `global:configFile` if set, otherwise
    /// `default_path`. On success the file replaces any previously loaded
    /// configuration and pending overrides are folded into it; on failure the
    /// registry is left untouched.
    pub fn load(&self, default_path: impl AsRef<Path>) -> Result<()> {
        let path = self
            .get(CONFIG_FILE_KEY, None)
            .map_or_else(|| default_path.as_ref().to_path_buf(), PathBuf::from);

        debug!("loading configuration file '{}'", path.display());
        let mut config = match Store::load(&path) {
            Ok(store) => store,
            Err(e) => {
                error!("{}", e);
                return Err(e);
            }
        };

        let folded = {
            let mut stores = self.stores.write();
            stores.ensure_init();
            let overrides = stores.overrides.take().unwrap_or_default();
            let folded = overrides.len();
            for (key, value) in overrides {
                config.set(&key, &value);
            }
            stores.config = Some(config);
            folded
        };
        // Logged after the write lock is released: a subscriber may read the registry
        if folded > 0 {
            debug!("applied {} configuration overrides", folded);
        }
        Ok(())
    }

    /// Set a value that wins over the configuration file.
    ///
    /// After the first successful load this writes straight into the loaded
    /// configuration.
    pub fn set_override(&self, key: &str, value: &str) {
        let mut stores = self.stores.write();
        stores.ensure_init();
        let Stores {
            overrides, config, ..
        } = &mut *stores;
        if let Some(store) = overrides.as_mut().or(config.as_mut()) {
            store.set(key, value);
        }
    }

    /// Set a fallback value used when nothing else provides the key.
    pub fn set_default(&self, key: &str, value: &str) {
        let mut stores = self.stores.write();
        stores.ensure_init();
        if let Some(defaults) = stores.defaults.as_mut() {
            defaults.set(key, value);
        } else if let Some(config) = stores.config.as_mut() {
            // Unreachable while defaults live as long as the registry. Kept so a
            // registry without defaults never clobbers real values.
            if !config.contains(key) {
                config.set(key, value);
            }
        }
    }

    /// Resolve a key, returning an owned copy of its value.
    pub fn get(&self, key: &str, default: Option<&str>) -> Option<String> {
        self.stores.read_recursive().resolve(key, default).map(str::to_string)
    }

    /// Run `f` on the resolved value while the read lock is held.
    pub fn with_value<R>(
        &self,
        key: &str,
        default: Option<&str>,
        f: impl FnOnce(Option<&str>) -> R,
    ) -> R {
        let stores = self.stores.read_recursive();
        f(stores.resolve(key, default))
    }

    /// Buffer size needed for the resolved value including a terminator, or 0.
    pub fn value_len(&self, key: &str, default: Option<&str>) -> usize {
        self.with_value(key, default, |v| v.map_or(0, |v| v.len() + 1))
    }

    /// Resolve a string value.
    pub fn get_string(&self, key: &str, default: &str) -> String {
        self.with_value(key, Some(default), |v| v.unwrap_or(default).to_string())
    }

    /// Resolve an integer value; non-numeric text yields 0.
    pub fn get_int(&self, key: &str, default: i64) -> i64 {
        self.with_value(key, None, |v| v.map_or(default, parse_int))
    }

    /// Resolve a boolean value.
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        self.with_value(key, None, |v| v.map_or(default, parse_bool))
    }

    /// Visit every `section:*` entry, or only `section:key` when `key` is given.
    ///
    /// The read lock is held for the whole traversal: `f` must not write to
    /// this registry. Returns the number of callbacks made, or
    /// [`ConfigError::IterationAborted`] if `f` breaks.
    pub fn for_each_in_section<F>(
        &self,
        section: &str,
        key: Option<&str>,
        mut f: F,
    ) -> Result<usize>
    where
        F: FnMut(&str, &str) -> ControlFlow<()>,
    {
        let stores = self.stores.read_recursive();
        let filter = SectionFilter::new(Some(section), key);
        visit(stores.primary(), &filter, &mut f)
    }

    /// Visit every entry of the primary store.
    pub fn for_each<F>(&self, mut f: F) -> Result<usize>
    where
        F: FnMut(&str, &str) -> ControlFlow<()>,
    {
        let stores = self.stores.read_recursive();
        visit(stores.primary(), &SectionFilter::new(None, None), &mut f)
    }

    /// Lazily iterate the entries of a section.
    ///
    /// The returned iterator holds the read lock until it is dropped, so
    /// writers block for its lifetime.
    pub fn section(&self, section: &str) -> SectionIter<'_> {
        SectionIter {
            stores: self.stores.read_recursive(),
            filter: SectionFilter::new(Some(section), None),
            pos: 0,
        }
    }

    /// Whether a configuration file has been loaded.
    pub fn is_loaded(&self) -> bool {
        self.stores.read_recursive().config.is_some()
    }
}

struct SectionFilter {
    prefix: Option<String>,
    key: Option<String>,
}

impl SectionFilter {
    fn new(section: Option<&str>, key: Option<&str>) -> Self {
        Self {
            prefix: section.map(|s| format!("{}:", s.to_ascii_lowercase())),
            key: key.map(str::to_ascii_lowercase),
        }
    }

    fn matches(&self, full_key: &str) -> bool {
        let Some(prefix) = &self.prefix else {
            return true;
        };
        match full_key.strip_prefix(prefix.as_str()) {
            Some(rest) => self.key.as_deref().map_or(true, |k| k == rest),
            None => false,
        }
    }
}

fn visit<F>(store: Option<&Store>, filter: &SectionFilter, f: &mut F) -> Result<usize>
where
    F: FnMut(&str, &str) -> ControlFlow<()>,
{
    let mut visited = 0;
    for (key, value) in store.into_iter().flat_map(|s| s.iter()) {
        if !filter.matches(key) {
            continue;
        }
        visited += 1;
        if f(key, value).is_break() {
            return Err(ConfigError::IterationAborted);
        }
    }
    Ok(visited)
}

/// Iterator over one section's entries, holding the registry read lock.
pub struct SectionIter<'a> {
    stores: RwLockReadGuard<'a, Stores>,
    filter: SectionFilter,
    pos: usize,
}

impl Iterator for SectionIter<'_> {
    type Item = (String, String);

    fn next(&mut self) -> Option<Self::Item> {
        let store = self.stores.primary()?;
        while let Some((key, value)) = store.entry_at(self.pos) {
            self.pos += 1;
            if self.filter.matches(key) {
                return Some((key.to_string(), value.to_string()));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn ini(text: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        file
    }

    fn ready() -> ConfigRegistry {
        let registry = ConfigRegistry::new();
        registry.init(None::<Populator>).unwrap();
        registry
    }

    #[test]
    fn test_override_beats_default_before_load() {
        let registry = ready();
        registry.set_default("app:port", "80");
        registry.set_override("app:port", "8080");
        registry.set_default("app:port", "81");
        assert_eq!(registry.get("app:port", Some("1")), Some("8080".to_string()));
    }

    #[test]
    fn test_caller_default_last() {
        let registry = ready();
        assert_eq!(registry.get("missing:key", None), None);
        assert_eq!(registry.get_string("missing:key", "fallback"), "fallback");
        assert_eq!(registry.value_len("missing:key", None), 0);
        assert_eq!(registry.value_len("missing:key", Some("abc")), 4);
    }

    #[test]
    fn test_load_precedence() {
        let registry = ready();
        registry.set_default("app:name", "default");
        registry.set_default("app:mode", "default");
        registry.set_default("app:only_default", "d");
        registry.set_override("app:name", "override");

        let file = ini("[app]\nname = file\nmode = file\n");
        registry.load(file.path()).unwrap();

        assert_eq!(registry.get_string("app:name", "x"), "override");
        assert_eq!(registry.get_string("app:mode", "x"), "file");
        assert_eq!(registry.get_string("app:only_default", "x"), "d");
        assert_eq!(registry.get_string("app:absent", "x"), "x");
        assert!(registry.is_loaded());
    }

    #[test]
    fn test_override_after_load_writes_config() {
        let registry = ready();
        let file = ini("[app]\nname = file\n");
        registry.load(file.path()).unwrap();
        registry.set_override("app:name", "late");
        assert_eq!(registry.get_string("app:name", "x"), "late");
    }

    #[test]
    fn test_reload_does_not_reapply_overrides() {
        let registry = ready();
        registry.set_override("app:a", "override");
        let first = ini("[app]\na = one\nb = one\n");
        let second = ini("[app]\na = two\n");

        registry.load(first.path()).unwrap();
        assert_eq!(registry.get_string("app:a", "x"), "override");

        registry.load(second.path()).unwrap();
        assert_eq!(registry.get_string("app:a", "x"), "two");
        assert_eq!(registry.get("app:b", None), None);
    }

    #[test]
    fn test_failed_load_keeps_state() {
        let registry = ready();
        registry.set_default("log:level", "debug");
        registry.set_override("app:x", "1");

        let err = registry.load("/nonexistent/daemon-support.ini").unwrap_err();
        assert!(err.is_load_error());
        assert_eq!(registry.get_string("log:level", "notice"), "debug");
        assert_eq!(registry.get_string("app:x", "0"), "1");
        assert!(!registry.is_loaded());

        let good = ini("[app]\ny = 2\n");
        registry.load(good.path()).unwrap();
        let bad = ini("[app]\nbroken line\n");
        let err = registry.load(bad.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { line: 2, .. }));
        assert_eq!(registry.get_string("app:y", "0"), "2");
        assert_eq!(registry.get_string("app:x", "0"), "1");
    }

    #[test]
    fn test_config_file_key_redirects_load() {
        let registry = ready();
        let real = ini("[app]\nsource = real\n");
        registry.set_override(CONFIG_FILE_KEY, &real.path().to_string_lossy());
        registry.load("/nonexistent/ignored.ini").unwrap();
        assert_eq!(registry.get_string("app:source", "x"), "real");
    }

    #[test]
    fn test_typed_getters() {
        let registry = ready();
        registry.set_override("n:num", "42");
        registry.set_override("n:junk", "abc");
        registry.set_override("b:yes", "yes");
        registry.set_override("b:no", "no");
        registry.set_override("b:empty", "");

        assert_eq!(registry.get_int("n:num", 7), 42);
        assert_eq!(registry.get_int("n:junk", 7), 0);
        assert_eq!(registry.get_int("n:absent", 7), 7);
        assert!(registry.get_bool("b:yes", false));
        assert!(!registry.get_bool("b:no", true));
        assert!(!registry.get_bool("b:empty", true));
        assert!(!registry.get_bool("b:absent", false));
        assert!(registry.get_bool("b:absent", true));
    }

    #[test]
    fn test_for_each_in_section() {
        let registry = ready();
        let file = ini("[log]\nstderr = 1\nsyslog = 0\nlevel = debug\n[logger]\nx = 1\n[app]\ny = 2\n");
        registry.load(file.path()).unwrap();

        let mut seen = Vec::new();
        let count = registry
            .for_each_in_section("log", None, |k, v| {
                seen.push((k.to_string(), v.to_string()));
                ControlFlow::Continue(())
            })
            .unwrap();
        assert_eq!(count, 3);
        let keys: Vec<_> = seen.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["log:stderr", "log:syslog", "log:level"]);

        let count = registry
            .for_each_in_section("log", Some("level"), |k, v| {
                assert_eq!((k, v), ("log:level", "debug"));
                ControlFlow::Continue(())
            })
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_for_each_in_section_aborts() {
        let registry = ready();
        registry.set_override("log:a", "1");
        registry.set_override("log:b", "2");
        registry.set_override("log:c", "3");

        let mut calls = 0;
        let result = registry.for_each_in_section("log", None, |_, _| {
            calls += 1;
            if calls == 2 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        assert!(matches!(result, Err(ConfigError::IterationAborted)));
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_for_each_all_keys() {
        let registry = ready();
        registry.set_override("a:x", "1");
        registry.set_override("b:y", "2");
        registry.set_default("c:z", "3");
        let count = registry.for_each(|_, _| ControlFlow::Continue(())).unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_section_iterator() {
        let registry = ready();
        registry.set_override("log:level", "info");
        registry.set_override("app:x", "1");
        registry.set_override("log:ident", "svc");

        let entries: Vec<_> = registry.section("log").collect();
        assert_eq!(
            entries,
            vec![
                ("log:level".to_string(), "info".to_string()),
                ("log:ident".to_string(), "svc".to_string()),
            ]
        );

        // Lock released once the iterator is gone
        let first = registry.section("log").next();
        assert!(first.is_some());
        registry.set_override("log:level", "debug");
        assert_eq!(registry.get_string("log:level", ""), "debug");
    }

    #[test]
    fn test_init_populator_failure() {
        let registry = ConfigRegistry::new();
        let err = registry
            .init(Some(|_: &ConfigRegistry| -> anyhow::Result<()> {
                anyhow::bail!("no defaults today")
            }))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Populator(_)));
    }

    #[test]
    fn test_repeated_init_keeps_values() {
        let registry = ready();
        registry.set_default("a:b", "c");
        registry.set_override("d:e", "f");
        registry
            .init(Some(|r: &ConfigRegistry| -> anyhow::Result<()> {
                r.set_default("g:h", "i");
                Ok(())
            }))
            .unwrap();
        assert_eq!(registry.get_string("a:b", ""), "c");
        assert_eq!(registry.get_string("d:e", ""), "f");
        assert_eq!(registry.get_string("g:h", ""), "i");
    }

    #[test]
    fn test_set_before_init() {
        let registry = ConfigRegistry::new();
        registry.set_override("a:b", "c");
        assert_eq!(registry.get_string("a:b", ""), "c");
    }
}
