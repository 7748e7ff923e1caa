//! Client side of the reward pool: the async façade over a ledger host, the
//! hosts themselves and the operator CLI plumbing.

pub mod commands;
pub mod config;
pub mod contracts;
pub mod errors;
pub mod ledger;
pub mod local_ledger;
pub mod token_accounts;
pub mod wallet;

pub use contracts::RewardPoolClient;
pub use errors::{CliError, ClientError};
pub use ledger::{Ledger, RpcLedger, TransportError};
pub use local_ledger::LocalLedger;
pub use token_accounts::{AssociatedTokenService, TokenAccountService};
