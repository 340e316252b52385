use crate::error::{LibrisError, Result, ServerError};
use libris_store_db::{OpenMode, StoreDb};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Opens SQLite connections on demand and keeps a few idle ones around.
///
/// Connections are never shared between requests. Two requests that touch
/// the same rows are serialized by SQLite's write lock, not by this type.
#[derive(Debug)]
pub struct Store {
    path: PathBuf,
    busy_timeout: Duration,
    max_idle: usize,
    idle: Mutex<Vec<StoreDb>>,
}

impl Store {
    /// Create the database file and schema if needed.
    pub fn open(path: &Path, busy_timeout: Duration, max_idle: usize) -> Result<Arc<Self>> {
        let db = StoreDb::open_with_timeout(path, OpenMode::Create, busy_timeout)?;
        log::info!(
            "database ready at {} (schema version {})",
            path.display(),
            db.schema_version()?
        );
        let store = Self {
            path: path.to_owned(),
            busy_timeout,
            max_idle,
            idle: Mutex::new(Vec::with_capacity(max_idle)),
        };
        store.checkin(db);
        Ok(Arc::new(store))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn checkout(&self) -> Result<StoreDb> {
        let cached = self
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop();
        match cached {
            Some(db) => Ok(db),
            None => Ok(StoreDb::open_with_timeout(
                &self.path,
                OpenMode::ReadWrite,
                self.busy_timeout,
            )?),
        }
    }

    fn checkin(&self, db: StoreDb) {
        let mut idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
        if idle.len() < self.max_idle {
            idle.push(db);
        }
    }

    /// Run a blocking database operation on the blocking thread pool.
    ///
    /// The connection goes back to the idle list unless the operation hit a
    /// storage failure.
    pub async fn db_operation<T, F>(self: &Arc<Self>, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut StoreDb) -> libris_store_db::Result<T> + Send + 'static,
    {
        let store = Arc::clone(self);
        tokio::task::spawn_blocking(move || {
            let mut db = store.checkout()?;
            let result = f(&mut db);
            match &result {
                Ok(_) => store.checkin(db),
                Err(e) if e.is_business() => store.checkin(db),
                Err(_) => {}
            }
            result.map_err(LibrisError::from)
        })
        .await
        .map_err(|e| ServerError::Task {
            reason: format!("Task join error: {e}"),
        })?
    }

    #[cfg(test)]
    fn idle_count(&self) -> usize {
        self.idle.lock().unwrap().len()
    }
}
