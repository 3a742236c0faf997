pub mod errors;
pub mod identity;
pub mod reward;
pub mod upgrade;
pub mod user;

// Re-export all types
pub use errors::*;
pub use identity::*;
pub use reward::*;
pub use upgrade::*;
pub use user::*;
