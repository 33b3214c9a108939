use geogrid_shared::models::{GridResult, Metrics, NewGridResult};
use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

const GRID_RESULTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("grid_results");

/// Failure talking to the grid result store. Callers treat it as opaque and
/// may retry.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] redb::Error),

    #[error("stored grid result is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

macro_rules! redb_error {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for RepositoryError {
                fn from(e: $ty) -> Self {
                    RepositoryError::Database(e.into())
                }
            }
        )*
    };
}

redb_error!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError
);

/// Grid result repository. Opened once at start-up and shared by `Arc`.
pub struct Storage {
    db: Database,
    path: PathBuf,
}

impl Storage {
    pub fn open(path: &Path) -> Result<Arc<Self>, RepositoryError> {
        let db = Database::create(path)?;

        // Ensure table exists
        let write_txn = db.begin_write()?;
        {
            write_txn.open_table(GRID_RESULTS_TABLE)?;
        }
        write_txn.commit()?;

        tracing::debug!(path = %path.display(), "opened grid result store");
        Ok(Arc::new(Storage {
            db,
            path: path.to_path_buf(),
        }))
    }

    /// Persist a finished run, assigning its id and creation time.
    pub fn save(
        &self,
        input: &NewGridResult,
        metrics: &Metrics,
    ) -> Result<GridResult, RepositoryError> {
        let result = GridResult {
            id: Uuid::new_v4(),
            business_info: input.business_info.clone(),
            search_term: input.search_term.clone(),
            created_at: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            grid_size: input.grid_size.clone(),
            grid_data: input.grid_data.clone(),
            metrics: metrics.clone(),
            google_region: input.google_region.clone(),
            distance_km: input.distance_km,
        };
        self.put(&result)?;
        Ok(result)
    }

    fn put(&self, result: &GridResult) -> Result<(), RepositoryError> {
        let json = serde_json::to_vec(result)?;
        let id_str = result.id.to_string();

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(GRID_RESULTS_TABLE)?;
            table.insert(id_str.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn get_by_id(&self, id: &str) -> Result<Option<GridResult>, RepositoryError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(GRID_RESULTS_TABLE)?;

        match table.get(id)? {
            Some(value) => {
                let mut result: GridResult = serde_json::from_slice(value.value())?;
                result.migrate();
                Ok(Some(result))
            }
            None => Ok(None),
        }
    }

    /// All stored runs, newest first.
    pub fn get_all(&self) -> Result<Vec<GridResult>, RepositoryError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(GRID_RESULTS_TABLE)?;

        let mut results = Vec::new();
        for entry in table.iter()? {
            let (key, value) = entry?;
            match serde_json::from_slice::<GridResult>(value.value()) {
                Ok(mut result) => {
                    result.migrate();
                    results.push(result);
                }
                Err(e) => {
                    tracing::warn!(id = key.value(), error = %e, "skipping unreadable grid result");
                }
            }
        }
        results.sort_by(|a, b| b.cmp_chronological(a));
        Ok(results)
    }

    pub fn delete(&self, id: &str) -> Result<bool, RepositoryError> {
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(GRID_RESULTS_TABLE)?;
            let result = table.remove(id)?;
            result.is_some()
        };
        write_txn.commit()?;
        Ok(removed)
    }

    pub fn count(&self) -> Result<u64, RepositoryError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(GRID_RESULTS_TABLE)?;
        Ok(table.len()?)
    }

    pub fn db_size_bytes(&self) -> Result<u64, RepositoryError> {
        Ok(std::fs::metadata(&self.path)?.len())
    }
}
