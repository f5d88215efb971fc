//! # twowaysql-loader
//!
//! Filesystem loader for two-way SQL templates. Resolves logical paths
//! under a root directory, preferring a dialect-suffixed variant
//! (`find.oracle.sql` before `find.sql`), caches loaded text, and plugs
//! into the engine as its include resolver.
//!
//! ```rust,no_run
//! use twowaysql_core::{Bindings, Dialect, Engine};
//! use twowaysql_loader::TemplateLoader;
//!
//! let loader = TemplateLoader::new("sql");
//! let template = loader.load("users/find", Some(Dialect::Oracle)).unwrap();
//! let engine = Engine::new(Dialect::Oracle).with_resolver(loader);
//! let result = engine.parse(&template, &Bindings::new().bind("id", 1)).unwrap();
//! # let _ = result;
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tracing::debug;
use twowaysql_core::{Dialect, IncludeResolver, ParseError, Result};

/// Loads template text from a directory tree.
///
/// Resolution order for logical path `p` with dialect `d`:
/// `stem(p).{d}.sql`, then `stem(p).sql`, then `p` verbatim, where `stem`
/// strips a trailing `.sql` if present. A miss on every candidate is
/// [`ParseError::SqlFileNotFound`].
///
/// Loaded text is cached by resolved path; the cache is read-mostly and
/// safe to share across threads.
#[derive(Debug)]
pub struct TemplateLoader {
    root: PathBuf,
    cache: RwLock<HashMap<PathBuf, String>>,
}

impl TemplateLoader {
    /// Creates a loader rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the loader's root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Drops all cached template text.
    pub fn clear_cache(&self) {
        if let Ok(mut cache) = self.cache.write() {
            cache.clear();
        }
    }

    /// Loads the template behind a logical path.
    pub fn load(&self, logical: &str, dialect: Option<Dialect>) -> Result<String> {
        let stem = logical.strip_suffix(".sql").unwrap_or(logical);
        let mut candidates: Vec<PathBuf> = Vec::new();
        if let Some(dialect) = dialect {
            candidates.push(self.root.join(format!("{stem}.{}.sql", dialect.id())));
        }
        candidates.push(self.root.join(format!("{stem}.sql")));
        candidates.push(self.root.join(logical));

        for candidate in candidates {
            if let Some(text) = self.cached(&candidate) {
                debug!(path = %candidate.display(), "template cache hit");
                return Ok(text);
            }
            if candidate.is_file() {
                let text = fs::read_to_string(&candidate).map_err(|_| {
                    ParseError::SqlFileNotFound {
                        path: String::from(logical),
                    }
                })?;
                debug!(path = %candidate.display(), "template loaded");
                if let Ok(mut cache) = self.cache.write() {
                    cache.insert(candidate, text.clone());
                }
                return Ok(text);
            }
        }
        Err(ParseError::SqlFileNotFound {
            path: String::from(logical),
        })
    }

    fn cached(&self, path: &Path) -> Option<String> {
        self.cache.read().ok()?.get(path).cloned()
    }
}

impl IncludeResolver for TemplateLoader {
    fn resolve(&self, path: &str, dialect: Option<Dialect>) -> Result<String> {
        self.load(path, dialect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn fixture() -> (tempfile::TempDir, TemplateLoader) {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("users")).unwrap();
        fs::write(
            dir.path().join("users/find.sql"),
            "SELECT * FROM users WHERE id = /* $id */1\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("users/find.oracle.sql"),
            "SELECT /*+ INDEX(users pk) */ * FROM users WHERE id = /* $id */1\n",
        )
        .unwrap();
        let loader = TemplateLoader::new(dir.path());
        (dir, loader)
    }

    #[test]
    fn plain_path_resolves_generic_file() {
        let (_dir, loader) = fixture();
        let text = loader.load("users/find", None).unwrap();
        assert!(text.starts_with("SELECT * FROM users"));
    }

    #[test]
    fn dialect_variant_is_preferred() {
        let (_dir, loader) = fixture();
        let text = loader.load("users/find", Some(Dialect::Oracle)).unwrap();
        assert!(text.contains("INDEX(users pk)"));
    }

    #[test]
    fn dialect_without_variant_falls_back() {
        let (_dir, loader) = fixture();
        let text = loader.load("users/find", Some(Dialect::Mysql)).unwrap();
        assert!(text.starts_with("SELECT * FROM users"));
    }

    #[test]
    fn explicit_sql_extension_is_accepted() {
        let (_dir, loader) = fixture();
        let with_ext = loader.load("users/find.sql", Some(Dialect::Oracle)).unwrap();
        let without = loader.load("users/find", Some(Dialect::Oracle)).unwrap();
        assert_eq!(with_ext, without);
    }

    #[test]
    fn missing_template_is_a_hard_error() {
        let (_dir, loader) = fixture();
        let err = loader.load("users/none", None).unwrap_err();
        assert_eq!(
            err,
            ParseError::SqlFileNotFound {
                path: String::from("users/none")
            }
        );
    }

    #[test]
    fn cache_survives_file_deletion() {
        let (dir, loader) = fixture();
        let first = loader.load("users/find", None).unwrap();
        fs::remove_file(dir.path().join("users/find.sql")).unwrap();
        let second = loader.load("users/find", None).unwrap();
        assert_eq!(first, second);
        loader.clear_cache();
        assert!(loader.load("users/find", None).is_err());
    }

    #[test]
    fn loader_serves_engine_includes() {
        use twowaysql_core::{Bindings, Engine};
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("active.sql"),
            "AND active = /* $active */1\n",
        )
        .unwrap();
        let loader = TemplateLoader::new(dir.path());
        let engine = Engine::new(Dialect::Sqlite).with_resolver(loader);
        let result = engine
            .parse(
                "SELECT * FROM t WHERE a = /* $a */1\n/*%include \"active\"*/",
                &Bindings::new().bind("a", 1).bind("active", true),
            )
            .unwrap();
        assert_eq!(result.sql, "SELECT * FROM t WHERE a = ?\nAND active = ?");
    }
}
