//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module   | Commands handled                  |
//! |----------|-----------------------------------|
//! | `phase`  | `Plan`, `Build`, `Test`, `Commit` |
//! | `run`    | `Run`, `Cycle`                    |
//! | `serve`  | `Serve`                           |
//! | `status` | `Status`                          |
//! | `config` | `Config`                          |
//!
//! Every command returns whether it succeeded; `main` maps that to the exit code.

pub mod config;
pub mod phase;
pub mod run;
pub mod serve;
pub mod status;

pub use config::cmd_config;
pub use phase::{cmd_build, cmd_commit, cmd_plan, cmd_test};
pub use run::{cmd_cycle, cmd_run};
pub use serve::cmd_serve;
pub use status::cmd_status;
