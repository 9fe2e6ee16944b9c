//! Fixture discovery.
//!
//! Fixtures are `*.toml` files anywhere under a directory. Each is named by
//! its path relative to that directory with `/` separators, which is the
//! name ledger entries use.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{SpecError, SpecResult};
use crate::fixture::{parse_fixture, NarrativeFixture};

fn load_error(path: &Path, e: std::io::Error) -> SpecError {
    SpecError::Load {
        path: path.display().to_string(),
        message: e.to_string(),
    }
}

/// Read and parse one fixture file. Parse errors name the file stem.
pub fn load_fixture(path: &Path) -> SpecResult<NarrativeFixture> {
    let content = fs::read_to_string(path).map_err(|e| load_error(path, e))?;
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    parse_fixture(&stem, &content)
}

/// Every fixture under a directory, ordered by name.
#[derive(Debug, Clone, Default)]
pub struct FixtureSet {
    fixtures: BTreeMap<String, NarrativeFixture>,
}

impl FixtureSet {
    /// Walk `dir` for fixtures. A missing directory is an empty set.
    pub fn load(dir: &Path) -> SpecResult<Self> {
        let mut fixtures = BTreeMap::new();
        let mut pending: Vec<PathBuf> = vec![dir.to_path_buf()];
        while let Some(current) = pending.pop() {
            if !current.is_dir() {
                continue;
            }
            for entry in fs::read_dir(&current).map_err(|e| load_error(&current, e))? {
                let path = entry.map_err(|e| load_error(&current, e))?.path();
                if path.is_dir() {
                    pending.push(path);
                } else if path.extension().is_some_and(|e| e == "toml") {
                    let name = fixture_name(dir, &path);
                    fixtures.insert(name, load_fixture(&path)?);
                }
            }
        }
        Ok(Self { fixtures })
    }

    pub fn get(&self, name: &str) -> Option<&NarrativeFixture> {
        self.fixtures.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &NarrativeFixture)> {
        self.fixtures.iter().map(|(name, f)| (name.as_str(), f))
    }

    pub fn names(&self) -> Vec<&str> {
        self.fixtures.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.fixtures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixtures.is_empty()
    }

    /// Sentences across all fixtures.
    pub fn sentence_count(&self) -> usize {
        self.fixtures.values().map(|f| f.sentences.len()).sum()
    }
}

fn fixture_name(base: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(base).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fixtures_dir() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    #[test]
    fn bundled_fixtures_load_by_name() {
        let set = FixtureSet::load(&fixtures_dir()).unwrap();
        assert_eq!(
            set.names(),
            vec!["comparative.toml", "positioning.toml", "safety.toml"]
        );
        let comparative = set.get("comparative.toml").unwrap();
        assert_eq!(comparative.title.as_deref(), Some("Comparative narratives"));
        assert!(set.sentence_count() > set.len());
    }

    #[test]
    fn nested_fixtures_are_named_by_relative_path() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("payer")).unwrap();
        fs::write(
            dir.path().join("payer").join("access.toml"),
            "[[sentence]]\nid = \"one\"\ntext = \"DrugX versus DrugY.\"\n",
        )
        .unwrap();
        fs::write(dir.path().join("notes.md"), "not a fixture").unwrap();

        let set = FixtureSet::load(dir.path()).unwrap();
        assert_eq!(set.names(), vec!["payer/access.toml"]);
        assert!(set.get("payer/access.toml").unwrap().sentence("one").is_some());
    }

    #[test]
    fn missing_directory_is_empty() {
        let set = FixtureSet::load(Path::new("/nonexistent/fixtures")).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn missing_fixture_reports_the_path() {
        let err = load_fixture(Path::new("/nonexistent/fixture.toml")).unwrap_err();
        assert!(matches!(err, SpecError::Load { ref path, .. } if path.contains("fixture.toml")));
    }

    #[test]
    fn malformed_fixture_names_the_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("broken.toml"), "[[sentence]]\nid = 1\n").unwrap();
        let err = FixtureSet::load(dir.path()).unwrap_err();
        assert!(matches!(err, SpecError::Parse { ref fixture, .. } if fixture == "broken"));
    }
}
