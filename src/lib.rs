pub mod config;
pub mod error;
pub mod futex;
pub mod slot;
pub mod turns;

pub use config::Config;
pub use error::SyncError;
pub use slot::SlotFutex;
pub use turns::{bootstrap::run, Actor, TurnPair};
