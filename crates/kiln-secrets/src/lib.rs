//! Secret providers for kiln.

pub mod chain;
pub mod providers;

pub use chain::ChainProvider;
pub use providers::{EnvProvider, FileProvider};
