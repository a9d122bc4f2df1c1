//! PrintForge command-line shell: bootstrap and commands over the
//! `pf-app` use cases.

pub mod bootstrap;
pub mod commands;
