//! Adapters for the hosted auth (GoTrue) and database (PostgREST) service.

mod client;
mod profile_store;
mod session_holder;
mod wire;

pub use client::{SupabaseClient, CLIENT_INFO};
pub use profile_store::SupabaseProfileStore;
pub use session_holder::SupabaseSessionHolder;
