//! On-disk cache of parsed commit tables.
//!
//! Entries are plain CSV files named after a sha256 digest of the repository
//! path, head revision and time bounds. A moved head yields a new key, so old
//! entries are never consulted again; they are also never deleted.

use crate::error::Result;
use crate::model::{CommitRecord, CommitTable, RevisionRange};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

const HEADER: &str = "added,removed,changed";
const CACHE_DIR_NAME: &str = "commit-size-distribution";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn derive(repository: &Path, head: &str, range: &RevisionRange) -> Self {
        let mut hasher = Sha256::new();
        update_field(&mut hasher, Some(repository.to_string_lossy().as_bytes()));
        update_field(&mut hasher, Some(head.trim().as_bytes()));
        update_field(&mut hasher, range.after.as_deref().map(str::as_bytes));
        update_field(&mut hasher, range.before.as_deref().map(str::as_bytes));
        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Length-prefixed so ("ab", "c") and ("a", "bc") differ, and None differs from "".
fn update_field(hasher: &mut Sha256, field: Option<&[u8]>) {
    match field {
        Some(bytes) => {
            hasher.update([1u8]);
            hasher.update((bytes.len() as u64).to_le_bytes());
            hasher.update(bytes);
        }
        None => hasher.update([0u8]),
    }
}

pub struct StatsCache {
    dir: PathBuf,
}

impl StatsCache {
    pub fn new<CP: AsRef<Path>, RP: AsRef<Path>>(cache_path: Option<CP>, repo_path: RP) -> Self {
        let base = match cache_path {
            Some(path) => path.as_ref().to_path_buf(),
            None => std::env::temp_dir().join(CACHE_DIR_NAME),
        };
        let repo_name = repo_path
            .as_ref()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "repository".to_string());
        Self {
            dir: base.join(repo_name),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!("{key}.csv"))
    }

    /// Returns the cached table for `key`, or runs `compute` and stores its result.
    ///
    /// Unreadable or malformed entries count as misses. Failing to persist is
    /// logged and otherwise ignored; only errors from `compute` propagate.
    pub fn get_or_compute<F>(&self, key: &CacheKey, compute: F) -> Result<CommitTable>
    where
        F: FnOnce() -> Result<CommitTable>,
    {
        let path = self.entry_path(key);
        match self.load(&path) {
            Some(table) => {
                log::info!("cache hit: {}", path.display());
                return Ok(table);
            }
            None => log::info!("cache miss: {}", path.display()),
        }
        self.recompute(key, compute)
    }

    /// Runs `compute` without consulting the existing entry, then overwrites it.
    pub fn recompute<F>(&self, key: &CacheKey, compute: F) -> Result<CommitTable>
    where
        F: FnOnce() -> Result<CommitTable>,
    {
        let path = self.entry_path(key);
        let table = compute()?;
        if let Err(e) = self.store(&path, &table) {
            log::warn!("failed to write cache entry {}: {e}", path.display());
        }
        Ok(table)
    }

    fn load(&self, path: &Path) -> Option<CommitTable> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                log::warn!("unreadable cache entry {}: {e}", path.display());
                return None;
            }
        };
        match decode(&content) {
            Ok(table) => Some(table),
            Err(reason) => {
                log::warn!("discarding corrupt cache entry {}: {reason}", path.display());
                None
            }
        }
    }

    fn store(&self, path: &Path, table: &CommitTable) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let tmp = self
            .dir
            .join(format!(".{}.{}.tmp", std::process::id(), unique_suffix()));
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(encode(table).as_bytes())?;
            file.sync_all()?;
        }
        if let Err(e) = fs::rename(&tmp, path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }
}

fn unique_suffix() -> u128 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default()
}

pub fn encode(table: &CommitTable) -> String {
    let mut out = String::with_capacity(HEADER.len() + 1 + table.len() * 12);
    out.push_str(HEADER);
    out.push('\n');
    for r in table.records() {
        out.push_str(&format!("{},{},{}\n", r.added, r.removed, r.changed));
    }
    out
}

pub fn decode(content: &str) -> std::result::Result<CommitTable, String> {
    let mut lines = content.lines();
    match lines.next() {
        Some(header) if header.trim() == HEADER => {}
        Some(other) => return Err(format!("unexpected header {other:?}")),
        None => return Err("empty file".to_string()),
    }

    let mut records = Vec::new();
    for (idx, line) in lines.enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let row = idx + 2;
        let fields: Vec<u64> = line
            .split(',')
            .map(|f| f.trim().parse::<u64>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| format!("row {row}: {e}"))?;
        let [added, removed, changed] = fields[..] else {
            return Err(format!("row {row}: expected 3 columns, found {}", fields.len()));
        };
        let record = CommitRecord::new(added, removed);
        if record.changed != changed {
            return Err(format!("row {row}: changed {changed} != {added} + {removed}"));
        }
        records.push(record);
    }
    Ok(CommitTable::new(records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::Cell;
    use tempfile::tempdir;

    fn sample() -> CommitTable {
        CommitTable::new(vec![
            CommitRecord::new(10, 2),
            CommitRecord::new(0, 0),
            CommitRecord::new(5, 0),
        ])
    }

    #[test]
    fn key_depends_on_every_field() {
        let repo = Path::new("/src/project");
        let base = CacheKey::derive(repo, "abc", &RevisionRange::new());
        assert_eq!(base, CacheKey::derive(repo, "abc", &RevisionRange::new()));
        assert_eq!(base.as_str().len(), 64);

        let others = [
            CacheKey::derive(Path::new("/src/other"), "abc", &RevisionRange::new()),
            CacheKey::derive(repo, "abd", &RevisionRange::new()),
            CacheKey::derive(repo, "abc", &RevisionRange::new().with_after("2020-01-01")),
            CacheKey::derive(repo, "abc", &RevisionRange::new().with_before("2020-01-01")),
            CacheKey::derive(repo, "abc", &RevisionRange::new().with_after("")),
        ];
        for other in &others {
            assert_ne!(&base, other);
        }
        // swapping after and before must not collide
        assert_ne!(
            CacheKey::derive(repo, "abc", &RevisionRange::new().with_after("x")),
            CacheKey::derive(repo, "abc", &RevisionRange::new().with_before("x")),
        );
    }

    #[test]
    fn head_trailing_newline_is_ignored() {
        let repo = Path::new("r");
        assert_eq!(
            CacheKey::derive(repo, "abc\n", &RevisionRange::new()),
            CacheKey::derive(repo, "abc", &RevisionRange::new())
        );
    }

    #[test]
    fn compute_runs_once() {
        let dir = tempdir().unwrap();
        let cache = StatsCache::new(Some(dir.path()), "/work/project");
        let key = CacheKey::derive(Path::new("/work/project"), "head", &RevisionRange::new());
        let calls = Cell::new(0);

        let first = cache
            .get_or_compute(&key, || {
                calls.set(calls.get() + 1);
                Ok(sample())
            })
            .unwrap();
        let second = cache
            .get_or_compute(&key, || {
                calls.set(calls.get() + 1);
                Ok(CommitTable::default())
            })
            .unwrap();

        assert_eq!(calls.get(), 1);
        assert_eq!(first, second);
        assert!(cache.entry_path(&key).starts_with(dir.path().join("project")));
    }

    #[test]
    fn recompute_ignores_and_replaces_entry() {
        let dir = tempdir().unwrap();
        let cache = StatsCache::new(Some(dir.path()), "repo");
        let key = CacheKey::derive(Path::new("repo"), "h", &RevisionRange::new());
        cache.get_or_compute(&key, || Ok(CommitTable::default())).unwrap();

        let fresh = cache.recompute(&key, || Ok(sample())).unwrap();
        assert_eq!(fresh, sample());
        let reread = cache
            .get_or_compute(&key, || panic!("entry should have been rewritten"))
            .unwrap();
        assert_eq!(reread, sample());
    }

    #[test]
    fn different_ranges_do_not_share_entries() {
        let dir = tempdir().unwrap();
        let cache = StatsCache::new(Some(dir.path()), "repo");
        let repo = Path::new("repo");
        let all = CacheKey::derive(repo, "h", &RevisionRange::new());
        let recent = CacheKey::derive(repo, "h", &RevisionRange::new().with_after("1 week ago"));

        cache.get_or_compute(&all, || Ok(sample())).unwrap();
        let got = cache
            .get_or_compute(&recent, || Ok(CommitTable::new(vec![CommitRecord::new(1, 1)])))
            .unwrap();
        assert_eq!(got.len(), 1);
    }

    #[test]
    fn corrupt_entry_is_recomputed_and_overwritten() {
        let dir = tempdir().unwrap();
        let cache = StatsCache::new(Some(dir.path()), "repo");
        let key = CacheKey::derive(Path::new("repo"), "h", &RevisionRange::new());
        fs::create_dir_all(cache.dir()).unwrap();
        fs::write(cache.entry_path(&key), "garbage\n1,2\n").unwrap();

        let table = cache.get_or_compute(&key, || Ok(sample())).unwrap();
        assert_eq!(table, sample());
        assert_eq!(fs::read_to_string(cache.entry_path(&key)).unwrap(), encode(&sample()));
    }

    #[test]
    fn compute_error_propagates_and_stores_nothing() {
        let dir = tempdir().unwrap();
        let cache = StatsCache::new(Some(dir.path()), "repo");
        let key = CacheKey::derive(Path::new("repo"), "h", &RevisionRange::new());
        let result = cache.get_or_compute(&key, || Err(crate::error::CommitSizeError::EmptyDistribution));
        assert!(result.is_err());
        assert!(!cache.entry_path(&key).exists());
    }

    #[test]
    fn unwritable_cache_still_returns_table() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "a file, not a directory").unwrap();
        let cache = StatsCache::new(Some(&blocker), "repo");
        let key = CacheKey::derive(Path::new("repo"), "h", &RevisionRange::new());
        assert_eq!(cache.get_or_compute(&key, || Ok(sample())).unwrap(), sample());
    }

    #[test]
    fn csv_layout() {
        assert_eq!(
            encode(&sample()),
            "added,removed,changed\n10,2,12\n0,0,0\n5,0,5\n"
        );
        assert_eq!(decode(&encode(&CommitTable::default())).unwrap(), CommitTable::default());
    }

    #[test]
    fn decode_rejects_inconsistent_rows() {
        assert!(decode("added,removed,changed\n1,1,3\n").is_err());
        assert!(decode("added,removed,changed\n1,-1,0\n").is_err());
        assert!(decode("added,removed,changed\n1,1\n").is_err());
        assert!(decode("").is_err());
    }
}
