//! Schema versioning for the registry database.
//!
//! The meta store records the layout version a database was written with.
//! Each entry in [`STEPS`] upgrades from one version to the next; opening an
//! environment applies them in order inside the same write batch that the
//! environment commits, so a failed upgrade leaves the file untouched.

use tcr_store::MetaStore;

use crate::LmdbError;

/// The schema version that the current code expects.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

type Step = fn(&dyn MetaStore) -> Result<(), LmdbError>;

/// `(from_version, description, upgrade)`.
const STEPS: &[(u32, &str, Step)] = &[(0, "initial registry layout", initial_layout)];

/// Version 0 is an empty file; the databases were created by the caller.
fn initial_layout(_meta: &dyn MetaStore) -> Result<(), LmdbError> {
    Ok(())
}

fn step_from(version: u32) -> Result<&'static (u32, &'static str, Step), LmdbError> {
    STEPS
        .iter()
        .find(|(from, _, _)| *from == version)
        .ok_or(LmdbError::MissingMigration(version))
}

pub struct Migrator;

impl Migrator {
    /// Bring the stored schema up to [`CURRENT_SCHEMA_VERSION`].
    ///
    /// A version above the current one was written by a newer binary and is
    /// refused.
    pub fn run(meta: &impl MetaStore) -> Result<(), LmdbError> {
        let stored = meta.schema_version()?;
        if stored > CURRENT_SCHEMA_VERSION {
            return Err(LmdbError::SchemaTooNew {
                found: stored,
                supported: CURRENT_SCHEMA_VERSION,
            });
        }
        if stored == CURRENT_SCHEMA_VERSION {
            tracing::debug!(version = stored, "registry schema is up to date");
            return Ok(());
        }

        let mut version = stored;
        while version < CURRENT_SCHEMA_VERSION {
            let (_, description, upgrade) = step_from(version)?;
            tracing::info!(from = version, to = version + 1, step = description, "upgrading schema");
            upgrade(meta)?;
            version += 1;
            meta.set_schema_version(version)?;
        }
        Ok(())
    }
}
