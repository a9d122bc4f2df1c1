//! In-memory session holder and profile store, used when the hosted backend
//! is not configured and by the CLI demo.

mod memory;
mod profile_store;

pub use memory::InMemorySessionHolder;
pub use profile_store::InMemoryProfileStore;
