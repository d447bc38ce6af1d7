//! LMDB environment setup.

use std::path::Path;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use tcr_store::StoreError;

use crate::migration::Migrator;
use crate::read_view::ReadView;
use crate::write_batch::WriteBatch;
use crate::LmdbError;

/// Named databases a registry environment needs.
pub const DATABASE_NAMES: &[&str] = &[
    "listings",
    "ballots",
    "votes",
    "commitments",
    "queue",
    "balances",
    "meta",
];

/// Wraps the LMDB environment and all database handles.
pub struct LmdbEnvironment {
    env: Arc<Env>,
    pub(crate) listings_db: Database<Bytes, Bytes>,
    pub(crate) ballots_db: Database<Bytes, Bytes>,
    pub(crate) votes_db: Database<Bytes, Bytes>,
    pub(crate) commitments_db: Database<Bytes, Bytes>,
    pub(crate) queue_db: Database<Bytes, Bytes>,
    pub(crate) balances_db: Database<Bytes, Bytes>,
    pub(crate) meta_db: Database<Bytes, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given path, creating every
    /// registry database and running schema migrations.
    pub fn open(path: &Path, max_dbs: u32, map_size: usize) -> Result<Self, LmdbError> {
        if max_dbs < DATABASE_NAMES.len() as u32 {
            return Err(LmdbError::Heed(format!(
                "max_dbs {} is below the {} databases the registry needs",
                max_dbs,
                DATABASE_NAMES.len()
            )));
        }
        std::fs::create_dir_all(path)?;

        let mut options = EnvOpenOptions::new();
        options.map_size(map_size).max_dbs(max_dbs);
        // SAFETY: the registry opens each environment path once per process.
        let env = unsafe { options.open(path)? };

        let mut wtxn = env.write_txn()?;
        let listings_db = env.create_database(&mut wtxn, Some("listings"))?;
        let ballots_db = env.create_database(&mut wtxn, Some("ballots"))?;
        let votes_db = env.create_database(&mut wtxn, Some("votes"))?;
        let commitments_db = env.create_database(&mut wtxn, Some("commitments"))?;
        let queue_db = env.create_database(&mut wtxn, Some("queue"))?;
        let balances_db = env.create_database(&mut wtxn, Some("balances"))?;
        let meta_db = env.create_database(&mut wtxn, Some("meta"))?;
        wtxn.commit()?;

        let environment = Self {
            env: Arc::new(env),
            listings_db,
            ballots_db,
            votes_db,
            commitments_db,
            queue_db,
            balances_db,
            meta_db,
        };

        let batch = environment.write_batch()?;
        Migrator::run(&batch)?;
        batch.commit()?;

        tracing::debug!(path = %path.display(), map_size, "opened registry LMDB environment");
        Ok(environment)
    }

    pub fn env(&self) -> &Arc<Env> {
        &self.env
    }

    /// Begin a write batch. Dropping it without commit aborts every write.
    pub fn write_batch(&self) -> Result<WriteBatch<'_>, StoreError> {
        WriteBatch::new(self)
    }

    /// Open a read-only snapshot of the committed state.
    pub fn read_view(&self) -> Result<ReadView<'_>, StoreError> {
        ReadView::new(self)
    }
}
