// Domain models for probe values and the discovery snapshot

mod hardware;
mod network;
mod peripherals;
mod snapshot;
mod software;

pub use hardware::*;
pub use network::*;
pub use peripherals::*;
pub use snapshot::*;
pub use software::*;
