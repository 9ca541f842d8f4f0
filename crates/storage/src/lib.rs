// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! hjk-storage: the durable instance catalog and the session log pipeline.

mod catalog;
pub mod logs;
mod reader;
mod tee;

pub use catalog::{Catalog, CatalogError, ListFilter, CURRENT_CATALOG_VERSION};
pub use logs::LogLayout;
pub use reader::{LogReader, DEFAULT_TAIL_LINES};
pub use tee::{SessionWriters, TeeWriter};
