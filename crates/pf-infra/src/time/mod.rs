mod delay;
mod scheduler;
mod system_clock;

pub use delay::TokioDelay;
pub use scheduler::TokioScheduler;
pub use system_clock::SystemClock;
