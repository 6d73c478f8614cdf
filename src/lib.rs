pub mod agent;
pub mod config;
pub mod errors;
pub mod guard;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod phases;
pub mod pipeline;
pub mod prompts;
pub mod server;
pub mod state;
pub mod tracker;
pub mod util;
pub mod vcs;
pub mod verify;

#[cfg(test)]
pub(crate) mod test_support;
