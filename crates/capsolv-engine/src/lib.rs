pub mod backend;
pub mod detector;
pub mod gate;
pub mod locator;
pub mod resolver;

pub use capsolv_common::protocol;
pub use capsolv_common::relay;

use protocol::PageSnapshot;
use std::sync::Arc;

/// Shared handle to the live page model. Mutation sources update it before
/// emitting the matching [`detector::DetectorEvent`].
pub type PageHandle = Arc<tokio::sync::RwLock<PageSnapshot>>;

pub fn page_handle(page: PageSnapshot) -> PageHandle {
    Arc::new(tokio::sync::RwLock::new(page))
}
