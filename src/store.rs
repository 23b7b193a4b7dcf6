//! RocksDB-backed storage layer.
//!
//! Thin wrapper exposing point reads/writes, atomic multi-record batches and
//! prefix scans with resumable cursors. All higher-level record encoding
//! lives in `round_store`.

use rocksdb::{Direction, IteratorMode, Options, WriteBatch, DB};
use std::path::Path;
use std::sync::Arc;

/// Storage failures. `Corrupted` indicates an undecodable record; everything
/// else is a database-level error and therefore retryable.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] rocksdb::Error),

    #[error("corrupted record: {0}")]
    Corrupted(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Shared handle to the engine database.
#[derive(Clone)]
pub struct Store {
    db: Arc<DB>,
}

impl Store {
    /// Open (or create) the database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);

        let db = DB::open(&opts, path)?;
        Ok(Self { db: Arc::new(db) })
    }

    pub fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.db.get(key)?)
    }

    pub fn put(&self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        Ok(self.db.put(key, value)?)
    }

    pub fn delete(&self, key: &[u8]) -> StoreResult<()> {
        Ok(self.db.delete(key)?)
    }

    /// Write all `items` in one atomic batch. Either every record lands or
    /// none does; admission and settlement rely on this for their
    /// no-partial-effect guarantee.
    pub fn batch_write(&self, items: &[(Vec<u8>, Vec<u8>)]) -> StoreResult<()> {
        let mut batch = WriteBatch::default();
        for (key, value) in items {
            batch.put(key, value);
        }
        Ok(self.db.write(batch)?)
    }

    /// Scan up to `limit` key/value pairs under `prefix`, starting strictly
    /// after `cursor` when one is given. Returns raw pairs; callers keep the
    /// last key as the next cursor.
    pub fn scan_prefix(
        &self,
        prefix: &[u8],
        cursor: Option<&[u8]>,
        limit: usize,
    ) -> StoreResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let start: Vec<u8> = cursor.unwrap_or(prefix).to_vec();
        let skip_first = cursor.is_some();

        let mut rows = Vec::with_capacity(limit);
        let iter = self
            .db
            .iterator(IteratorMode::From(&start, Direction::Forward));

        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            if skip_first && key.as_ref() == start.as_slice() {
                continue;
            }
            rows.push((key.to_vec(), value.to_vec()));
            if rows.len() >= limit {
                break;
            }
        }

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_temp() -> (TempDir, Store) {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn test_put_get_delete() {
        let (_dir, store) = open_temp();
        store.put(b"k1", b"v1").unwrap();
        assert_eq!(store.get(b"k1").unwrap(), Some(b"v1".to_vec()));

        store.delete(b"k1").unwrap();
        assert_eq!(store.get(b"k1").unwrap(), None);
    }

    #[test]
    fn test_batch_write_is_atomic_at_read_time() {
        let (_dir, store) = open_temp();
        let items = vec![
            (b"a".to_vec(), b"1".to_vec()),
            (b"b".to_vec(), b"2".to_vec()),
            (b"c".to_vec(), b"3".to_vec()),
        ];
        store.batch_write(&items).unwrap();

        for (k, v) in &items {
            assert_eq!(store.get(k).unwrap().as_deref(), Some(v.as_slice()));
        }
    }

    #[test]
    fn test_scan_prefix_with_cursor() {
        let (_dir, store) = open_temp();
        for i in 0u8..5 {
            store.put(&[b'p', b':', i], &[i]).unwrap();
        }
        store.put(b"q:0", b"other").unwrap();

        let first = store.scan_prefix(b"p:", None, 2).unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].0, vec![b'p', b':', 0]);

        let cursor = first.last().unwrap().0.clone();
        let rest = store.scan_prefix(b"p:", Some(&cursor), 10).unwrap();
        assert_eq!(rest.len(), 3);
        assert_eq!(rest[0].0, vec![b'p', b':', 2]);
    }

    #[test]
    fn test_scan_prefix_stops_at_prefix_boundary() {
        let (_dir, store) = open_temp();
        store.put(b"p:1", b"a").unwrap();
        store.put(b"q:1", b"b").unwrap();

        let rows = store.scan_prefix(b"p:", None, 10).unwrap();
        assert_eq!(rows.len(), 1);
    }
}
