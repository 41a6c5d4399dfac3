//! Chain-query collaborator seam.
//!
//! Balance lookups are network round-trips owned by an external chain
//! indexer; this core only consumes the result and treats it as advisory.

use crate::domain::SharedWallet;
use crate::foundation::{TetherError, WalletId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

pub type Result<T> = std::result::Result<T, TetherError>;

#[async_trait]
pub trait ChainQuery: Send + Sync {
    /// Aggregated confirmed balance of the wallet's multisig address set.
    async fn wallet_balance_sompi(&self, wallet: &SharedWallet) -> Result<u64>;
}

/// Placeholder for wiring paths that must never reach the chain.
pub struct UnimplementedChainQuery;

#[async_trait]
impl ChainQuery for UnimplementedChainQuery {
    async fn wallet_balance_sompi(&self, _wallet: &SharedWallet) -> Result<u64> {
        Err(TetherError::Unimplemented("chain query is not wired".to_string()))
    }
}

/// Test double serving balances from a fixed table.
pub struct StaticChainQuery {
    balances: Mutex<HashMap<WalletId, u64>>,
}

impl StaticChainQuery {
    pub fn new() -> Self {
        Self { balances: Mutex::new(HashMap::new()) }
    }

    pub fn set_balance(&self, wallet_id: WalletId, balance_sompi: u64) {
        if let Ok(mut balances) = self.balances.lock() {
            balances.insert(wallet_id, balance_sompi);
        }
    }
}

impl Default for StaticChainQuery {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChainQuery for StaticChainQuery {
    async fn wallet_balance_sompi(&self, wallet: &SharedWallet) -> Result<u64> {
        let balances = self
            .balances
            .lock()
            .map_err(|_| TetherError::StorageLockPoisoned { operation: "static chain query lock".to_string() })?;
        balances.get(&wallet.wallet_id).copied().ok_or_else(|| TetherError::NetworkError {
            operation: "wallet_balance".to_string(),
            details: format!("no balance entry for wallet {}", wallet.wallet_id),
        })
    }
}
