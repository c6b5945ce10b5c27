//! Device backends for the alignment daemon.
//!
//! - `sim`: a deterministic two-endpoint link, always built.
//! - `koruza`: the real unit's RPC interface, behind the `hardware` feature.
pub mod error;
#[cfg(feature = "hardware")]
pub mod koruza;
pub mod protocol;
pub mod sim;

pub use error::UnitError;
#[cfg(feature = "hardware")]
pub use koruza::KoruzaUnit;
pub use sim::{SimConfig, SimUnit, SimulatedLink};
