pub mod check_in;
pub mod clock;
pub mod daily;
pub mod events;
pub mod faucet;
pub mod mutation_log;
pub mod referral;
pub mod rules;
pub mod spin;
pub mod store;
pub mod upgrades;

// Re-export main components
pub use check_in::*;
pub use clock::*;
pub use daily::*;
pub use events::*;
pub use faucet::*;
pub use mutation_log::*;
pub use referral::*;
pub use rules::*;
pub use spin::*;
pub use store::*;
pub use upgrades::*;
