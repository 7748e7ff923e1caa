pub mod records;
pub mod reward_pool;

pub use records::*;
pub use reward_pool::*;
