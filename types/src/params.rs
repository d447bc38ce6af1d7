//! Registry parameters, fixed when the chain is initialized.

use serde::{Deserialize, Serialize};

use crate::amount::Amount;
use crate::error::TcrError;

/// Basis-point denominator: 10_000 bps = 100%.
pub const BPS_DENOMINATOR: u32 = 10_000;

/// All registry parameters stored by every node.
///
/// Fractions (quorum, dispensation) are basis points so that reward
/// arithmetic stays in exact integers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryParams {
    /// Minimum bond a candidacy must post. Ballots whose bond has fallen
    /// below this value are removed when touched by a challenge.
    pub min_deposit: Amount,

    /// Length of the apply window in blocks.
    pub apply_stage: u64,

    /// Length of the commit window in blocks, counted from the challenge.
    pub commit_stage: u64,

    /// Length of the reveal window in blocks, counted from the end of commit.
    pub reveal_stage: u64,

    /// Share of the losing bond paid out as dividend (basis points).
    pub dispensation_bps: u32,

    /// Approve share of cast weight that must be strictly exceeded for an
    /// entry to be accepted (basis points).
    pub quorum_bps: u32,
}

impl RegistryParams {
    /// Check internal consistency.
    ///
    /// The apply window must cover a full commit + reveal round so that a
    /// challenged ballot never outlives later proposals by more than one round.
    pub fn validate(&self) -> Result<(), TcrError> {
        if self.min_deposit.is_zero() {
            return Err(TcrError::InvalidParams("min_deposit must be non-zero".into()));
        }
        if self.apply_stage == 0 || self.commit_stage == 0 || self.reveal_stage == 0 {
            return Err(TcrError::InvalidParams("stage lengths must be non-zero".into()));
        }
        let round = self
            .commit_stage
            .checked_add(self.reveal_stage)
            .ok_or_else(|| TcrError::InvalidParams("commit + reveal overflows".into()))?;
        if self.apply_stage < round {
            return Err(TcrError::InvalidParams(format!(
                "apply_stage {} is shorter than commit_stage + reveal_stage {}",
                self.apply_stage, round
            )));
        }
        if self.dispensation_bps > BPS_DENOMINATOR {
            return Err(TcrError::InvalidParams(format!(
                "dispensation_bps {} exceeds {}",
                self.dispensation_bps, BPS_DENOMINATOR
            )));
        }
        if self.quorum_bps > BPS_DENOMINATOR {
            return Err(TcrError::InvalidParams(format!(
                "quorum_bps {} exceeds {}",
                self.quorum_bps, BPS_DENOMINATOR
            )));
        }
        Ok(())
    }

    /// Dividend paid on `bond`: `floor(bond * dispensation)`.
    pub fn dividend(&self, bond: Amount) -> u128 {
        bond.raw() as u128 * self.dispensation_bps as u128 / BPS_DENOMINATOR as u128
    }

    /// Share of the dividend owed to a winning voter:
    /// `floor(power / pool * bond * dispensation)`, floored once.
    ///
    /// `power * bond` always fits in `u128`; it is split into
    /// `q * pool + r` so the basis-point scaling never overflows while
    /// `power <= pool`. Returns `None` only when that does not hold and the
    /// product escapes `u128`. An empty pool pays nothing.
    pub fn voter_dividend(&self, bond: Amount, power: Amount, pool: Amount) -> Option<u128> {
        let pool = pool.raw() as u128;
        if pool == 0 {
            return Some(0);
        }
        let bps = self.dispensation_bps as u128;
        let stake = power.raw() as u128 * bond.raw() as u128;
        let (q, r) = (stake / pool, stake % pool);
        let scaled = q.checked_mul(bps)?.checked_add(r * bps / pool)?;
        Some(scaled / BPS_DENOMINATOR as u128)
    }

    /// Whether `approve` out of `approve + deny` strictly exceeds the quorum.
    ///
    /// No cast weight never meets the quorum.
    pub fn quorum_reached(&self, approve: Amount, deny: Amount) -> bool {
        let total = approve.raw() as u128 + deny.raw() as u128;
        if total == 0 {
            return false;
        }
        approve.raw() as u128 * BPS_DENOMINATOR as u128 > self.quorum_bps as u128 * total
    }
}

impl Default for RegistryParams {
    fn default() -> Self {
        Self {
            min_deposit: Amount::new(100),
            apply_stage: 20,
            commit_stage: 10,
            reveal_stage: 10,
            dispensation_bps: 5000, // 50%
            quorum_bps: 5000,       // simple majority
        }
    }
}
