use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, TryLockError};

use super::loader::load_file;
use super::model::Dataset;
use crate::error::DatasetLoadError;

// ---------------------------------------------------------------------------
// Load-once dataset cache
// ---------------------------------------------------------------------------

/// One cache key: empty until its file has been read.
type Slot = Arc<Mutex<Option<Arc<Dataset>>>>;

/// Loaded datasets keyed by file path.
///
/// An entry is filled on first access and kept until [`invalidate`] or
/// [`clear`] (or process exit).  Each path has its own slot lock, held
/// across that path's load: concurrent callers asking for the same path
/// read the file at most once and then share one immutable [`Dataset`],
/// while loads of other paths proceed in parallel.  The map lock is only
/// taken to look up a slot and is never held while a slot is locked.
/// Failed loads leave no entry behind.
///
/// [`invalidate`]: DatasetCache::invalidate
/// [`clear`]: DatasetCache::clear
#[derive(Debug, Default)]
pub struct DatasetCache {
    entries: Mutex<HashMap<PathBuf, Slot>>,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached dataset for `path`, loading it on first use.
    pub fn load(&self, path: &Path) -> Result<Arc<Dataset>, DatasetLoadError> {
        let key = cache_key(path);
        let slot = self.slot(&key);

        let mut loaded = lock_slot(&slot);
        if let Some(dataset) = loaded.as_ref() {
            log::debug!("Dataset cache hit for {}", key.display());
            return Ok(Arc::clone(dataset));
        }

        match load_file(path) {
            Ok(dataset) => {
                let dataset = Arc::new(dataset);
                *loaded = Some(Arc::clone(&dataset));
                Ok(dataset)
            }
            Err(err) => {
                drop(loaded);
                self.discard_empty(&key, &slot);
                Err(err)
            }
        }
    }

    /// Drop the entry for `path` so the next [`load`](Self::load) rereads
    /// the file.  Returns whether a loaded entry existed.
    pub fn invalidate(&self, path: &Path) -> bool {
        self.lock()
            .remove(&cache_key(path))
            .is_some_and(|slot| is_filled(&slot))
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of loaded entries.  Loads still in flight are not counted.
    pub fn len(&self) -> usize {
        self.lock().values().filter(|slot| is_filled(slot)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, key: &Path) -> Slot {
        let mut entries = self.lock();
        Arc::clone(entries.entry(key.to_path_buf()).or_default())
    }

    /// Remove `slot` after a failed load unless another caller has since
    /// replaced it or is loading into it.
    fn discard_empty(&self, key: &Path, slot: &Slot) {
        let mut entries = self.lock();
        let unused = entries.get(key).is_some_and(|current| {
            Arc::ptr_eq(current, slot) && matches!(current.try_lock().as_deref(), Ok(None))
        });
        if unused {
            entries.remove(key);
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, Slot>> {
        // Slots are only ever inserted or removed whole, so a poisoned map is
        // still consistent.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn lock_slot(slot: &Slot) -> MutexGuard<'_, Option<Arc<Dataset>>> {
    // A panicking loader never stores a partial dataset.
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Whether `slot` holds a dataset; a slot mid-load counts as empty.
fn is_filled(slot: &Slot) -> bool {
    match slot.try_lock() {
        Ok(loaded) => loaded.is_some(),
        Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner().is_some(),
        Err(TryLockError::WouldBlock) => false,
    }
}

/// Absolute form of `path` when it exists, so `./a.csv` and `a.csv` share
/// an entry.
fn cache_key(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// The process-wide cache behind [`load`].
pub fn global_cache() -> &'static DatasetCache {
    static CACHE: OnceLock<DatasetCache> = OnceLock::new();
    CACHE.get_or_init(DatasetCache::new)
}

/// Load `path` through the process-wide cache.
pub fn load(path: &Path) -> Result<Arc<Dataset>, DatasetLoadError> {
    global_cache().load(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn second_load_returns_same_allocation() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(dir.path(), "a.csv", "State,Severity\nCA,2\nTX,3\n");
        let cache = DatasetCache::new();

        let first = cache.load(&path).unwrap();
        // Rewriting the file must not be observed until invalidation.
        write_csv(dir.path(), "a.csv", "State,Severity\nCA,2\n");
        let second = cache.load(&path).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.len(), 2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn invalidate_forces_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(dir.path(), "a.csv", "State\nCA\nTX\n");
        let cache = DatasetCache::new();

        assert_eq!(cache.load(&path).unwrap().len(), 2);
        write_csv(dir.path(), "a.csv", "State\nCA\n");
        assert!(cache.invalidate(&path));
        assert_eq!(cache.load(&path).unwrap().len(), 1);
        assert!(!cache.invalidate(&dir.path().join("other.csv")));
    }

    #[test]
    fn failed_load_is_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.csv");
        let cache = DatasetCache::new();

        assert!(matches!(cache.load(&path), Err(DatasetLoadError::NotFound(_))));
        assert!(cache.is_empty());
    }

    #[test]
    fn load_of_one_path_does_not_wait_on_another() {
        let dir = tempfile::tempdir().unwrap();
        let busy = write_csv(dir.path(), "busy.csv", "State\nCA\n");
        let free = write_csv(dir.path(), "free.csv", "State\nTX\nNY\n");
        let cache = Arc::new(DatasetCache::new());

        // Stand in for a slow read of `busy` by holding its slot.
        let slot = cache.slot(&cache_key(&busy));
        let held = lock_slot(&slot);

        let (tx, rx) = std::sync::mpsc::channel();
        let worker = {
            let cache = Arc::clone(&cache);
            std::thread::spawn(move || tx.send(cache.load(&free).map(|ds| ds.len())).unwrap())
        };
        let loaded = rx.recv_timeout(std::time::Duration::from_secs(10));
        drop(held);
        worker.join().unwrap();

        assert_eq!(loaded.unwrap().unwrap(), 2);
        assert_eq!(cache.load(&busy).unwrap().len(), 1);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn concurrent_readers_share_one_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(dir.path(), "a.csv", "State\nCA\n");
        let cache = Arc::new(DatasetCache::new());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let path = path.clone();
                std::thread::spawn(move || cache.load(&path).unwrap())
            })
            .collect();
        let loaded: Vec<Arc<Dataset>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert!(loaded.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(cache.len(), 1);
    }
}
