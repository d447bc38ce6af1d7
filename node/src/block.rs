//! Blocks of registry actions as fed to the host.

use serde::{Deserialize, Serialize};
use std::path::Path;

use tcr_registry::RegistryMsg;
use tcr_types::BlockHeight;

use crate::NodeError;

/// The actions included at one height.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub height: BlockHeight,
    #[serde(default)]
    pub msgs: Vec<RegistryMsg>,
}

/// Read a JSON array of blocks.
pub fn load_blocks(path: &Path) -> Result<Vec<Block>, NodeError> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| NodeError::Config(format!("{}: {}", path.display(), e)))
}
