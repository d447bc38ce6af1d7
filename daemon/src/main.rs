//! Registry daemon: entry point for running a token-curated registry node.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;

use tcr_node::{init_logging, load_blocks, GenesisState, NodeConfig, RegistryApp};
use tcr_types::{Address, Amount, BlockHeight, Commitment};

#[derive(Parser)]
#[command(name = "tcr-daemon", about = "Token-curated registry node daemon")]
struct Cli {
    /// Data directory for the LMDB environment.
    #[arg(long, env = "TCR_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log format: "human" or "json".
    #[arg(long, env = "TCR_LOG_FORMAT")]
    log_format: Option<String>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "TCR_LOG_LEVEL")]
    log_level: Option<String>,

    /// Path to a TOML configuration file. File settings are the base;
    /// CLI flags and env vars override them.
    #[arg(long, env = "TCR_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Initialize the chain from a genesis JSON file.
    Init {
        #[arg(long)]
        genesis: PathBuf,
    },
    /// Apply a JSON file of blocks, settling after each.
    Replay {
        #[arg(long)]
        blocks: PathBuf,
    },
    /// Write settled balances and listings as genesis JSON.
    Export {
        /// Output file; stdout when omitted.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Read registry state.
    Query {
        #[command(subcommand)]
        what: Query,
    },
    /// Compute the commitment a voter must publish before revealing.
    Commitment {
        #[arg(long)]
        identifier: String,
        #[arg(long)]
        voter: String,
        /// Approve the entry; omit to deny.
        #[arg(long)]
        choice: bool,
        #[arg(long)]
        power: u64,
        #[arg(long)]
        salt: String,
    },
}

#[derive(clap::Subcommand)]
enum Query {
    Balance { address: String },
    Listing { identifier: String },
    Ballot { identifier: String },
    Height,
}

fn load_config(cli: &Cli) -> anyhow::Result<NodeConfig> {
    let base = match &cli.config {
        Some(path) => {
            let path_str = path.to_str().context("config path is not valid UTF-8")?;
            NodeConfig::from_toml_file(path_str)
                .with_context(|| format!("loading config {}", path.display()))?
        }
        None => NodeConfig::default(),
    };
    let config = NodeConfig {
        data_dir: cli.data_dir.clone().unwrap_or(base.data_dir.clone()),
        log_format: cli.log_format.clone().unwrap_or(base.log_format.clone()),
        log_level: cli.log_level.clone().unwrap_or(base.log_level.clone()),
        ..base
    };
    config.validate()?;
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(config.log_format()?, &config.log_level)?;

    if let Command::Commitment {
        identifier,
        voter,
        choice,
        power,
        salt,
    } = &cli.command
    {
        let voter = Address::parse(voter.as_str())?;
        let commitment =
            Commitment::compute(identifier, &voter, *choice, Amount::new(*power), salt.as_bytes());
        println!("{}", commitment);
        return Ok(());
    }

    let app = RegistryApp::open(&config).context("opening registry database")?;

    match cli.command {
        Command::Init { genesis } => {
            let state = GenesisState::from_json_file(&genesis)
                .with_context(|| format!("reading genesis {}", genesis.display()))?;
            app.init_chain(&state)?;
        }
        Command::Replay { blocks } => {
            let blocks = load_blocks(&blocks)?;
            let count = blocks.len();
            let mut settled = 0usize;
            for block in blocks {
                let result = app
                    .deliver_block(block.height, block.msgs)
                    .with_context(|| format!("applying block {}", block.height))?;
                for (index, reason) in &result.rejected {
                    tracing::warn!(height = %result.height, index, reason = %reason, "rejected");
                }
                if let Some(report) = result.settlement {
                    settled += 1;
                    tracing::info!(
                        identifier = %report.identifier,
                        outcome = ?report.outcome,
                        credited = %report.total_credited(),
                        "settled"
                    );
                }
            }
            tracing::info!(
                blocks = count,
                settled,
                height = %app.last_height()?.unwrap_or(BlockHeight::GENESIS),
                "replay complete"
            );
        }
        Command::Export { out } => {
            let json = app.export_state()?.to_json_string()?;
            match out {
                Some(path) => std::fs::write(&path, json)
                    .with_context(|| format!("writing {}", path.display()))?,
                None => println!("{}", json),
            }
        }
        Command::Query { what } => match what {
            Query::Balance { address } => {
                let address = Address::parse(address)?;
                println!("{}", app.balance(&address)?);
            }
            Query::Listing { identifier } => {
                println!("{}", serde_json::to_string_pretty(&app.listing(&identifier)?)?);
            }
            Query::Ballot { identifier } => {
                println!("{}", serde_json::to_string_pretty(&app.ballot(&identifier)?)?);
            }
            Query::Height => match app.last_height()? {
                Some(height) => println!("{}", height),
                None => println!("uninitialized"),
            },
        },
        Command::Commitment { .. } => {}
    }

    Ok(())
}
