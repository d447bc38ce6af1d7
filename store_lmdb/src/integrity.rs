//! Startup integrity checks for the registry environment.
//!
//! Beyond confirming that every named database opens, the check decodes the
//! ballot records and walks the proposal queue, since a bad entry in either
//! would otherwise only surface when settlement reaches it.

use std::path::Path;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, RoTxn};

use tcr_types::Ballot;

use crate::environment::DATABASE_NAMES;
use crate::keys::queue_seq;
use crate::LmdbError;

#[derive(Debug, Default)]
pub struct IntegrityReport {
    /// Entry count per database, in [`DATABASE_NAMES`] order.
    pub entries: Vec<(&'static str, u64)>,
    pub total_entries: u64,
    pub errors: Vec<String>,
}

impl IntegrityReport {
    pub fn is_healthy(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn databases_checked(&self) -> usize {
        self.entries.len()
    }

    fn fail(&mut self, msg: String) {
        tracing::warn!(error = %msg, "integrity check failed");
        self.errors.push(msg);
    }
}

/// Count every registry database and validate ballot and queue records.
///
/// Problems are collected into the report; only a failure to start the read
/// transaction is returned as an error.
pub fn check_integrity(env: &Arc<Env>) -> Result<IntegrityReport, LmdbError> {
    let rtxn = env.read_txn()?;
    let mut report = IntegrityReport::default();

    for &name in DATABASE_NAMES {
        let db = match env.open_database::<Bytes, Bytes>(&rtxn, Some(name)) {
            Ok(Some(db)) => db,
            Ok(None) => {
                report.fail(format!("database '{}' is missing", name));
                continue;
            }
            Err(e) => {
                report.fail(format!("failed to open database '{}': {}", name, e));
                continue;
            }
        };

        match db.len(&rtxn) {
            Ok(count) => {
                report.entries.push((name, count));
                report.total_entries += count;
            }
            Err(e) => report.fail(format!("failed to count '{}': {}", name, e)),
        }

        match name {
            "ballots" => check_ballots(&rtxn, db, &mut report),
            "queue" => check_queue(&rtxn, db, &mut report),
            _ => {}
        }
    }

    Ok(report)
}

fn check_ballots(rtxn: &RoTxn<'_>, db: Database<Bytes, Bytes>, report: &mut IntegrityReport) {
    let iter = match db.iter(rtxn) {
        Ok(iter) => iter,
        Err(e) => return report.fail(format!("failed to scan ballots: {}", e)),
    };
    for entry in iter {
        let (key, val) = match entry {
            Ok(kv) => kv,
            Err(e) => return report.fail(format!("failed to scan ballots: {}", e)),
        };
        let id = String::from_utf8_lossy(key);
        match bincode::deserialize::<Ballot>(val) {
            Ok(ballot) if ballot.identifier != id => report.fail(format!(
                "ballot stored under '{}' names '{}'",
                id, ballot.identifier
            )),
            Ok(_) => {}
            Err(e) => report.fail(format!("ballot '{}' does not decode: {}", id, e)),
        }
    }
}

fn check_queue(rtxn: &RoTxn<'_>, db: Database<Bytes, Bytes>, report: &mut IntegrityReport) {
    let iter = match db.iter(rtxn) {
        Ok(iter) => iter,
        Err(e) => return report.fail(format!("failed to scan queue: {}", e)),
    };
    for entry in iter {
        let (key, val) = match entry {
            Ok(kv) => kv,
            Err(e) => return report.fail(format!("failed to scan queue: {}", e)),
        };
        if let Err(e) = queue_seq(key) {
            report.fail(format!("queue: {}", e));
        }
        if std::str::from_utf8(val).is_err() {
            report.fail(format!("queue entry {:?} is not an identifier", key));
        }
    }
}

/// Check that a data directory looks like an LMDB environment before opening.
///
/// A nonexistent directory is a fresh start. An existing directory without
/// `data.mdb` is treated as misconfiguration.
pub fn check_data_dir(path: &Path) -> Result<(), String> {
    if path.exists() && !path.join("data.mdb").exists() {
        return Err(format!(
            "{} exists but holds no data.mdb; refusing to treat it as a registry",
            path.display()
        ));
    }
    Ok(())
}
