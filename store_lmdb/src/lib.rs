//! LMDB storage backend for the token-curated registry.
//!
//! Implements all storage traits from `tcr-store` using the `heed` LMDB bindings.
//! Each record family maps to one named database within a single environment,
//! and every mutation goes through a [`WriteBatch`] so that a whole block is
//! committed or aborted as one LMDB transaction. Queries go through a
//! [`ReadView`] instead, which never takes the writer lock.

pub mod environment;
pub mod error;
pub mod integrity;
pub mod keys;
pub mod migration;
mod read;
pub mod read_view;
pub mod write_batch;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use integrity::{check_data_dir, check_integrity, IntegrityReport};
pub use migration::{Migrator, CURRENT_SCHEMA_VERSION};
pub use read_view::ReadView;
pub use write_batch::WriteBatch;
