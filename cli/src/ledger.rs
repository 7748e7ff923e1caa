use async_trait::async_trait;
use reward_pool::PoolError;
use solana_client::client_error::ClientError as RpcClientError;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
    commitment_config::CommitmentConfig,
    instruction::{Instruction, InstructionError},
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    transaction::{Transaction, TransactionError},
};
use thiserror::Error;
use tracing::debug;

/// Failures reported by a ledger host
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Reward pool program rejected the instruction: {0}")]
    ProgramRejected(PoolError),

    #[error("Missing signature for {0}")]
    MissingSignature(Pubkey),

    #[error("Insufficient funds in token account {0}")]
    InsufficientFunds(Pubkey),

    #[error("Token account not found: {0}")]
    TokenAccountNotFound(Pubkey),

    #[error("Token account {0} is not owned by the transfer authority")]
    OwnerMismatch(Pubkey),

    #[error("Unsupported program: {0}")]
    UnsupportedProgram(Pubkey),

    #[error("RPC error: {message}")]
    Rpc { message: String, code: Option<u32> },

    #[error("Ledger unavailable: {0}")]
    Unavailable(String),
}

impl TransportError {
    /// Program error code, when the failure carries one
    pub fn code(&self) -> Option<u32> {
        match self {
            TransportError::ProgramRejected(e) => Some(e.code()),
            TransportError::Rpc { code, .. } => *code,
            _ => None,
        }
    }
}

/// A host that applies instruction batches atomically and serves account reads.
///
/// Either every instruction of a batch takes effect or none does.
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn apply_atomically(
        &self,
        instructions: &[Instruction],
        signers: &[&Keypair],
    ) -> Result<Signature, TransportError>;

    /// Raw account data, `None` if the account does not exist
    async fn read_account(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, TransportError>;
}

/// First account a batch expects to be signed, used to report a missing fee payer
pub(crate) fn first_required_signer(instructions: &[Instruction]) -> Pubkey {
    instructions
        .iter()
        .flat_map(|ix| ix.accounts.iter())
        .find(|meta| meta.is_signer)
        .map(|meta| meta.pubkey)
        .unwrap_or_default()
}

/// Submits batches as single transactions to a Solana-compatible RPC node.
pub struct RpcLedger {
    client: RpcClient,
    program_id: Pubkey,
}

impl RpcLedger {
    pub fn new(rpc_url: String, program_id: Pubkey) -> Self {
        Self {
            client: RpcClient::new_with_commitment(rpc_url, CommitmentConfig::confirmed()),
            program_id,
        }
    }

    /// Maps a failed submission back to the pool error when the reward pool
    /// instruction is the one that failed.
    fn map_error(&self, instructions: &[Instruction], err: RpcClientError) -> TransportError {
        if let Some(TransactionError::InstructionError(index, InstructionError::Custom(code))) =
            err.get_transaction_error()
        {
            let from_pool = instructions
                .get(index as usize)
                .map(|ix| ix.program_id == self.program_id)
                .unwrap_or(false);

            if from_pool {
                if let Some(pool_error) = PoolError::from_code(code) {
                    return TransportError::ProgramRejected(pool_error);
                }
            }
            return TransportError::Rpc {
                message: err.to_string(),
                code: Some(code),
            };
        }

        TransportError::Rpc {
            message: err.to_string(),
            code: None,
        }
    }
}

#[async_trait]
impl Ledger for RpcLedger {
    async fn apply_atomically(
        &self,
        instructions: &[Instruction],
        signers: &[&Keypair],
    ) -> Result<Signature, TransportError> {
        let payer = signers
            .first()
            .ok_or_else(|| TransportError::MissingSignature(first_required_signer(instructions)))?;

        let blockhash = self
            .client
            .get_latest_blockhash()
            .await
            .map_err(|e| self.map_error(instructions, e))?;

        let mut transaction = Transaction::new_with_payer(instructions, Some(&payer.pubkey()));
        transaction
            .try_sign(signers, blockhash)
            .map_err(|_| TransportError::MissingSignature(first_required_signer(instructions)))?;

        debug!(
            "Submitting {} instruction(s) signed by {}",
            instructions.len(),
            payer.pubkey()
        );

        self.client
            .send_and_confirm_transaction(&transaction)
            .await
            .map_err(|e| self.map_error(instructions, e))
    }

    async fn read_account(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, TransportError> {
        let response = self
            .client
            .get_account_with_commitment(address, CommitmentConfig::confirmed())
            .await
            .map_err(|e| self.map_error(&[], e))?;

        Ok(response.value.map(|account| account.data))
    }
}
