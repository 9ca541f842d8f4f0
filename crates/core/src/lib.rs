// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! hjk-core: Core library for the headjack (hjk) CLI tool

pub mod branch;
pub mod id;
pub mod instance;
pub mod names;
pub mod quote;
pub mod time_fmt;

pub use branch::sanitize_branch;
pub use id::{parse_mux_name, InstanceId, SessionId, MUX_PREFIX};
pub use instance::{AgentKind, Instance, InstanceStatus, SessionKind, SessionRecord};
pub use names::random_session_name;
pub use quote::{sh_join, sh_quote};
pub use time_fmt::{format_elapsed, format_time_ago};
