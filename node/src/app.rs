//! The registry host.
//!
//! [`RegistryApp`] owns the LMDB environment and the fixed parameters. Each
//! block runs inside one write batch: actions are delivered in order, then a
//! single settlement pass runs, then the batch commits. A backend failure at
//! any point drops the batch, so the block leaves no trace.

use tcr_registry::{MsgOutcome, RegistryMsg, Router, SettlementEngine, SettlementReport};
use tcr_store::{BalanceStore, ListingStore, MetaStore};
use tcr_store_lmdb::{check_data_dir, check_integrity, LmdbEnvironment};
use tcr_types::{Address, Amount, Ballot, BlockHeight, GenesisAccount, Listing, RegistryParams};

use crate::config::NodeConfig;
use crate::genesis::GenesisState;
use crate::NodeError;

/// What happened to one block.
#[derive(Debug)]
pub struct BlockResult {
    pub height: BlockHeight,
    /// Outcomes of accepted actions, in delivery order.
    pub applied: Vec<MsgOutcome>,
    /// Index and reason of every rejected action.
    pub rejected: Vec<(usize, String)>,
    pub settlement: Option<SettlementReport>,
}

pub struct RegistryApp {
    env: LmdbEnvironment,
    params: RegistryParams,
}

impl RegistryApp {
    /// Open (or create) the node's database and verify it.
    pub fn open(config: &NodeConfig) -> Result<Self, NodeError> {
        config.params.validate()?;
        check_data_dir(&config.data_dir).map_err(NodeError::Integrity)?;

        let env = LmdbEnvironment::open(&config.data_dir, config.max_dbs, config.map_size)?;
        let report = check_integrity(env.env())?;
        if !report.is_healthy() {
            return Err(NodeError::Integrity(report.errors.join("; ")));
        }
        tracing::info!(
            data_dir = %config.data_dir.display(),
            databases = report.databases_checked(),
            entries = report.total_entries,
            "registry database opened"
        );

        Ok(Self {
            env,
            params: config.params.clone(),
        })
    }

    pub fn params(&self) -> &RegistryParams {
        &self.params
    }

    /// Load genesis balances and listings. Only valid on an empty chain.
    pub fn init_chain(&self, genesis: &GenesisState) -> Result<(), NodeError> {
        genesis.validate()?;
        let batch = self.env.write_batch()?;
        if let Some(height) = batch.last_height()? {
            return Err(NodeError::AlreadyInitialized(height));
        }

        for GenesisAccount { address, coins } in &genesis.accounts {
            batch.credit(address, *coins)?;
        }
        for listing in &genesis.listings {
            batch.put_listing(listing)?;
        }
        batch.set_last_height(BlockHeight::GENESIS)?;
        batch.commit()?;

        tracing::info!(
            accounts = genesis.accounts.len(),
            listings = genesis.listings.len(),
            "chain initialized"
        );
        Ok(())
    }

    /// Apply one block: deliver every action, then run settlement.
    ///
    /// Rejected actions are recorded and skipped; they write nothing. Store
    /// failures abort the whole block.
    pub fn deliver_block(
        &self,
        height: BlockHeight,
        msgs: Vec<RegistryMsg>,
    ) -> Result<BlockResult, NodeError> {
        let batch = self.env.write_batch()?;
        let last = batch.last_height()?.ok_or(NodeError::NotInitialized)?;
        if height <= last {
            return Err(NodeError::HeightOutOfOrder { last, got: height });
        }

        let router = Router::new(&batch, self.params.clone());
        let mut applied = Vec::new();
        let mut rejected = Vec::new();
        for (index, msg) in msgs.into_iter().enumerate() {
            let kind = msg.kind();
            match router.deliver(height, msg) {
                Ok(outcome) => applied.push(outcome),
                Err(e) if e.is_rejection() => {
                    tracing::warn!(height = %height, index, kind, error = %e, "action rejected");
                    rejected.push((index, e.to_string()));
                }
                Err(e) => {
                    tracing::error!(height = %height, index, kind, error = %e, "block aborted");
                    return Err(e.into());
                }
            }
        }

        let settlement = SettlementEngine::new(&batch, self.params.clone())
            .settle(height)
            .map_err(|e| {
                tracing::error!(height = %height, error = %e, "settlement failed, block aborted");
                NodeError::from(e)
            })?;

        batch.set_last_height(height)?;
        batch.commit()?;

        tracing::debug!(
            height = %height,
            applied = applied.len(),
            rejected = rejected.len(),
            settled = settlement.is_some(),
            "block committed"
        );
        Ok(BlockResult {
            height,
            applied,
            rejected,
            settlement,
        })
    }

    /// Snapshot the settled state: balances and listings.
    ///
    /// Bonds and vote power escrowed in unresolved ballots are not account
    /// balances and are not part of the export.
    pub fn export_state(&self) -> Result<GenesisState, NodeError> {
        let view = self.env.read_view()?;
        let in_flight = view.ballot_count()?;
        if in_flight > 0 {
            tracing::warn!(
                ballots = in_flight,
                queued = view.queue_len()?,
                "exporting with unresolved ballots; their escrow is omitted"
            );
        }
        let accounts = view
            .iter_balances()?
            .into_iter()
            .map(|(address, coins)| GenesisAccount { address, coins })
            .collect();
        Ok(GenesisState {
            accounts,
            listings: view.iter_listings()?,
        })
    }

    pub fn last_height(&self) -> Result<Option<BlockHeight>, NodeError> {
        Ok(self.env.read_view()?.last_height()?)
    }

    pub fn balance(&self, address: &Address) -> Result<Amount, NodeError> {
        Ok(self.env.read_view()?.balance(address)?)
    }

    pub fn listing(&self, identifier: &str) -> Result<Option<Listing>, NodeError> {
        Ok(self.env.read_view()?.get_listing(identifier)?)
    }

    pub fn ballot(&self, identifier: &str) -> Result<Option<Ballot>, NodeError> {
        Ok(self.env.read_view()?.get_ballot(identifier)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tcr_types::Commitment;

    fn addr(name: &str) -> Address {
        Address::new(format!("tcr_{}", name))
    }

    fn config(dir: &std::path::Path) -> NodeConfig {
        NodeConfig {
            data_dir: dir.join("db"),
            map_size: 16 * 1024 * 1024,
            params: RegistryParams {
                min_deposit: Amount::new(10),
                apply_stage: 4,
                commit_stage: 2,
                reveal_stage: 2,
                dispensation_bps: 5000,
                quorum_bps: 5000,
            },
            ..NodeConfig::default()
        }
    }

    fn genesis() -> GenesisState {
        GenesisState {
            accounts: vec![
                GenesisAccount {
                    address: addr("alice"),
                    coins: Amount::new(500),
                },
                GenesisAccount {
                    address: addr("bob"),
                    coins: Amount::new(500),
                },
            ],
            listings: vec![Listing {
                identifier: "seed".into(),
                votes: Amount::ZERO,
            }],
        }
    }

    fn declare(identifier: &str) -> RegistryMsg {
        RegistryMsg::DeclareCandidacy {
            identifier: identifier.into(),
            owner: addr("alice"),
            bond: Amount::new(100),
        }
    }

    #[test]
    fn genesis_then_export_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let app = RegistryApp::open(&config(dir.path())).unwrap();
        app.init_chain(&genesis()).unwrap();
        assert_eq!(app.last_height().unwrap(), Some(BlockHeight::GENESIS));
        assert_eq!(app.export_state().unwrap(), genesis());
    }

    #[test]
    fn second_init_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let app = RegistryApp::open(&config(dir.path())).unwrap();
        app.init_chain(&genesis()).unwrap();
        assert!(matches!(
            app.init_chain(&genesis()),
            Err(NodeError::AlreadyInitialized(_))
        ));
    }

    #[test]
    fn blocks_require_init_and_increasing_heights() {
        let dir = tempfile::tempdir().unwrap();
        let app = RegistryApp::open(&config(dir.path())).unwrap();
        assert!(matches!(
            app.deliver_block(BlockHeight::new(1), Vec::new()),
            Err(NodeError::NotInitialized)
        ));

        app.init_chain(&genesis()).unwrap();
        app.deliver_block(BlockHeight::new(1), Vec::new()).unwrap();
        assert!(matches!(
            app.deliver_block(BlockHeight::new(1), Vec::new()),
            Err(NodeError::HeightOutOfOrder { .. })
        ));
    }

    #[test]
    fn rejected_action_does_not_stop_block() {
        let dir = tempfile::tempdir().unwrap();
        let app = RegistryApp::open(&config(dir.path())).unwrap();
        app.init_chain(&genesis()).unwrap();

        let result = app
            .deliver_block(BlockHeight::new(1), vec![declare("seed"), declare("new")])
            .unwrap();
        assert_eq!(result.rejected.len(), 1);
        assert_eq!(result.rejected[0].0, 0);
        assert_eq!(result.applied.len(), 1);
        assert_eq!(app.balance(&addr("alice")).unwrap(), Amount::new(400));
        assert!(app.ballot("new").unwrap().is_some());
    }

    #[test]
    fn oversized_identifier_is_rejected_without_aborting_block() {
        let dir = tempfile::tempdir().unwrap();
        let app = RegistryApp::open(&config(dir.path())).unwrap();
        app.init_chain(&genesis()).unwrap();

        let long = "x".repeat(600);
        let result = app
            .deliver_block(BlockHeight::new(1), vec![declare("good"), declare(&long)])
            .unwrap();
        assert_eq!(result.applied.len(), 1);
        assert_eq!(result.rejected.len(), 1);
        assert_eq!(result.rejected[0].0, 1);
        assert!(app.ballot("good").unwrap().is_some());
        assert_eq!(app.balance(&addr("alice")).unwrap(), Amount::new(400));

        let bob = addr("bob");
        let commit = RegistryMsg::Commit {
            identifier: long.clone(),
            commitment: Commitment::compute(&long, &bob, true, Amount::new(1), b"s"),
            voter: bob,
        };
        let result = app.deliver_block(BlockHeight::new(2), vec![commit]).unwrap();
        assert_eq!(result.rejected.len(), 1);
        assert_eq!(app.last_height().unwrap(), Some(BlockHeight::new(2)));
    }

    #[test]
    fn oversized_address_fails_to_decode() {
        let msg = serde_json::json!({
            "type": "commit",
            "identifier": "good",
            "voter": format!("tcr_{}", "v".repeat(600)),
            "commitment": "00".repeat(32),
        });
        assert!(serde_json::from_value::<RegistryMsg>(msg).is_err());
    }

    #[test]
    fn client_apply_window_cannot_stall_the_queue() {
        let dir = tempfile::tempdir().unwrap();
        let app = RegistryApp::open(&config(dir.path())).unwrap();
        app.init_chain(&genesis()).unwrap();

        let stalling = |identifier: &str, apply_len: u64| -> RegistryMsg {
            serde_json::from_value(serde_json::json!({
                "type": "declare_candidacy",
                "identifier": identifier,
                "owner": "tcr_alice",
                "bond": 100,
                "apply_len": apply_len,
            }))
            .unwrap()
        };
        let result = app
            .deliver_block(
                BlockHeight::new(1),
                vec![
                    stalling("max", u64::MAX),
                    stalling("far", u64::MAX - 10),
                    declare("normal"),
                ],
            )
            .unwrap();
        assert!(result.rejected.is_empty(), "{:?}", result.rejected);
        assert_eq!(
            app.ballot("far").unwrap().unwrap().end_apply_block_stamp,
            BlockHeight::new(5)
        );

        // apply_stage 4: all three are due at 5 and settle one per block.
        for height in 2..=8 {
            app.deliver_block(BlockHeight::new(height), Vec::new())
                .unwrap();
        }
        for identifier in ["max", "far", "normal"] {
            assert!(app.listing(identifier).unwrap().is_some(), "{}", identifier);
        }
    }

    #[test]
    fn challenged_ballot_settles_across_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let app = RegistryApp::open(&config(dir.path())).unwrap();
        app.init_chain(&genesis()).unwrap();

        let bob = addr("bob");
        let commitment = Commitment::compute("new", &bob, false, Amount::new(50), b"salt");
        let blocks: Vec<(u64, Vec<RegistryMsg>)> = vec![
            (1, vec![declare("new")]),
            (
                2,
                vec![RegistryMsg::Challenge {
                    identifier: "new".into(),
                    challenger: bob.clone(),
                    bond: Amount::new(100),
                }],
            ),
            (
                3,
                vec![RegistryMsg::Commit {
                    identifier: "new".into(),
                    voter: bob.clone(),
                    commitment,
                }],
            ),
            (
                4,
                vec![RegistryMsg::Reveal {
                    identifier: "new".into(),
                    voter: bob.clone(),
                    choice: false,
                    power: Amount::new(50),
                    salt: "salt".into(),
                }],
            ),
            (5, Vec::new()),
            (6, Vec::new()),
        ];

        let mut settled = None;
        for (height, msgs) in blocks {
            let result = app.deliver_block(BlockHeight::new(height), msgs).unwrap();
            assert!(result.rejected.is_empty(), "{:?}", result.rejected);
            if result.settlement.is_some() {
                settled = result.settlement;
            }
        }

        let report = settled.expect("ballot settled");
        assert_eq!(report.height, BlockHeight::new(6));
        assert!(app.listing("new").unwrap().is_none());
        // bob: 500 - 100 bond - 50 power + 150 award + 50 power + 50 dividend
        assert_eq!(app.balance(&bob).unwrap(), Amount::new(600));
        assert_eq!(app.balance(&addr("alice")).unwrap(), Amount::new(400));
    }

    #[test]
    fn state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let app = RegistryApp::open(&config(dir.path())).unwrap();
            app.init_chain(&genesis()).unwrap();
            app.deliver_block(BlockHeight::new(1), vec![declare("new")])
                .unwrap();
        }
        let app = RegistryApp::open(&config(dir.path())).unwrap();
        assert_eq!(app.last_height().unwrap(), Some(BlockHeight::new(1)));
        assert_eq!(app.balance(&addr("alice")).unwrap(), Amount::new(400));
    }
}
