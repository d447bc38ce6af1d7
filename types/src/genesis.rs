//! Genesis account entries.

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::amount::Amount;

/// An account and its starting `RegistryCoin` balance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisAccount {
    pub address: Address,
    pub coins: Amount,
}
