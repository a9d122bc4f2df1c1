//! Port interfaces for the application layer
//!
//! Ports define the contract between the workflow engines (use cases) and
//! infrastructure implementations. Timers, randomness, preview resources,
//! navigation and the hosted session backend are all reached through these
//! traits so the engines stay deterministic under test.

mod clock;
mod delay;
mod navigation;
mod preview;
mod profile;
mod random;
mod scheduler;
mod session;

pub use clock::ClockPort;
pub use delay::DelayPort;
pub use navigation::NavigatorPort;
pub use preview::PreviewResourcePort;
pub use profile::ProfileStorePort;
pub use random::RandomSourcePort;
pub use scheduler::{SchedulerPort, TimerCallback, TimerKey};
pub use session::SessionHolderPort;
