//! CLI command implementations.
//!
//! | Module    | Commands handled |
//! |-----------|------------------|
//! | `serve`   | `Serve`          |
//! | `trigger` | `Trigger`        |
//! | `config`  | `Config`         |

pub mod config;
pub mod serve;
pub mod trigger;

pub use config::cmd_config;
pub use serve::cmd_serve;
pub use trigger::cmd_trigger;
