//! Decoding reads shared by [`WriteBatch`](crate::WriteBatch) and
//! [`ReadView`](crate::ReadView). A write transaction derefs to a read
//! transaction, so both go through the same functions.

use heed::types::Bytes;
use heed::{Database, RoTxn};
use serde::de::DeserializeOwned;

use tcr_types::{Address, Amount, BlockHeight};

use crate::LmdbError;

pub(crate) const SCHEMA_VERSION_KEY: &str = "schema_version";
pub(crate) const LAST_HEIGHT_KEY: &str = "last_height";

pub(crate) type Db = Database<Bytes, Bytes>;

pub(crate) fn decode<T: DeserializeOwned>(bytes: &[u8], what: &str) -> Result<T, LmdbError> {
    bincode::deserialize(bytes).map_err(|e| LmdbError::Corruption(format!("{}: {}", what, e)))
}

pub(crate) fn decode_amount(bytes: &[u8], what: &str) -> Result<Amount, LmdbError> {
    let arr: [u8; 8] = bytes
        .try_into()
        .map_err(|_| LmdbError::Corruption(format!("{}: invalid amount length", what)))?;
    Ok(Amount::new(u64::from_be_bytes(arr)))
}

/// One bincode record, if present.
pub(crate) fn record<T: DeserializeOwned>(
    db: &Db,
    txn: &RoTxn<'_>,
    key: &[u8],
    what: &str,
) -> Result<Option<T>, LmdbError> {
    match db.get(txn, key)? {
        Some(bytes) => Ok(Some(decode(bytes, what)?)),
        None => Ok(None),
    }
}

/// Every bincode record of a database, in key order.
pub(crate) fn records<T: DeserializeOwned>(
    db: &Db,
    txn: &RoTxn<'_>,
    what: &str,
) -> Result<Vec<T>, LmdbError> {
    let mut out = Vec::new();
    for entry in db.iter(txn)? {
        let (_key, val) = entry?;
        out.push(decode(val, what)?);
    }
    Ok(out)
}

pub(crate) fn balance(db: &Db, txn: &RoTxn<'_>, address: &Address) -> Result<Amount, LmdbError> {
    match db.get(txn, address.as_str().as_bytes())? {
        Some(bytes) => decode_amount(bytes, "balance"),
        None => Ok(Amount::ZERO),
    }
}

/// Non-zero balances ordered by address.
pub(crate) fn balances(db: &Db, txn: &RoTxn<'_>) -> Result<Vec<(Address, Amount)>, LmdbError> {
    let mut out = Vec::new();
    for entry in db.iter(txn)? {
        let (key, val) = entry?;
        let raw = std::str::from_utf8(key)
            .map_err(|e| LmdbError::Corruption(format!("balance key: {}", e)))?;
        let address = Address::parse(raw).map_err(|e| LmdbError::Corruption(e.to_string()))?;
        let amount = decode_amount(val, "balance")?;
        if !amount.is_zero() {
            out.push((address, amount));
        }
    }
    Ok(out)
}

pub(crate) fn schema_version(meta: &Db, txn: &RoTxn<'_>) -> Result<u32, LmdbError> {
    match meta.get(txn, SCHEMA_VERSION_KEY.as_bytes())? {
        Some(bytes) => {
            let arr: [u8; 4] = bytes.try_into().map_err(|_| {
                LmdbError::Corruption("schema_version has unexpected byte length".into())
            })?;
            Ok(u32::from_le_bytes(arr))
        }
        None => Ok(0),
    }
}

pub(crate) fn last_height(meta: &Db, txn: &RoTxn<'_>) -> Result<Option<BlockHeight>, LmdbError> {
    match meta.get(txn, LAST_HEIGHT_KEY.as_bytes())? {
        Some(bytes) => {
            let arr: [u8; 8] = bytes.try_into().map_err(|_| {
                LmdbError::Corruption("last_height has unexpected byte length".into())
            })?;
            Ok(Some(BlockHeight::new(u64::from_be_bytes(arr))))
        }
        None => Ok(None),
    }
}
