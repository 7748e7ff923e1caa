use reward_pool::{DecodeError, PoolError};
use thiserror::Error;

use crate::ledger::TransportError;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Wallet not found. Run 'reward-pool-cli wallet create' first")]
    WalletNotFound,

    #[error("Invalid cluster name: {0}. Valid options: devnet, mainnet-beta, localnet")]
    InvalidCluster(String),

    #[error("Reward mint not configured. Run 'reward-pool-cli config set-mint <MINT>' first")]
    RewardMintNotSet,

    #[error("Invalid public key: {0}")]
    InvalidPubkey(String),

    #[error("Reward pool not initialized for mint {0}")]
    PoolNotFound(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Failure of a façade operation.
///
/// `code` is the reward pool program error code when the failure came from
/// the program; `source` keeps the underlying transport error.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct ClientError {
    pub message: String,
    pub code: Option<u32>,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl ClientError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            source: None,
        }
    }

    pub fn from_transport(operation: &str, err: TransportError) -> Self {
        Self {
            message: format!("{} failed: {}", operation, err),
            code: err.code(),
            source: Some(Box::new(err)),
        }
    }

    /// Account data that could not be decoded on a read path
    pub fn from_decode(operation: &str, err: DecodeError) -> Self {
        Self {
            message: format!("{} failed: {}", operation, err),
            code: None,
            source: Some(Box::new(err)),
        }
    }

    pub fn transport(&self) -> Option<&TransportError> {
        self.source.as_ref()?.downcast_ref::<TransportError>()
    }

    /// Typed program error, when the host reported one
    pub fn pool_error(&self) -> Option<PoolError> {
        match self.transport() {
            Some(TransportError::ProgramRejected(e)) => Some(*e),
            _ => self.code.and_then(PoolError::from_code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reward_pool::ValidationError;
    use std::error::Error;

    #[test]
    fn test_wallet_not_found_error() {
        let err = CliError::WalletNotFound;
        assert_eq!(
            err.to_string(),
            "Wallet not found. Run 'reward-pool-cli wallet create' first"
        );
    }

    #[test]
    fn test_invalid_cluster_error() {
        let err = CliError::InvalidCluster("testnet".to_string());
        assert!(err.to_string().contains("testnet"));
        assert!(err.to_string().contains("localnet"));
    }

    #[test]
    fn test_reward_mint_not_set_error() {
        assert!(CliError::RewardMintNotSet.to_string().contains("set-mint"));
    }

    #[test]
    fn test_client_error_keeps_program_code() {
        let err = ClientError::from_transport(
            "withdraw_reward",
            TransportError::ProgramRejected(ValidationError::InvalidNonce.into()),
        );

        assert_eq!(err.code, Some(5));
        assert_eq!(err.pool_error(), Some(ValidationError::InvalidNonce.into()));
        assert!(err.to_string().contains("withdraw_reward"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_client_error_recovers_code_from_rpc() {
        let err = ClientError::from_transport(
            "pause_pool",
            TransportError::Rpc {
                message: "custom program error: 0x2".to_string(),
                code: Some(2),
            },
        );
        assert_eq!(err.pool_error(), Some(ValidationError::InvalidAuthority.into()));
    }

    #[test]
    fn test_client_error_without_source() {
        let err = ClientError::new("no pool");
        assert!(err.code.is_none());
        assert!(err.pool_error().is_none());
        assert!(err.source().is_none());
    }
}
