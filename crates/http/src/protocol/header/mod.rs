//! Header storage shared by requests and responses.
//!
//! - [`HeaderStore`]: bounded case-insensitive table of [`HeaderSlot`]s
//! - [`HeaderRegistry`]: the read-only well-known header table and the
//!   [`HeaderAction`] each request header triggers

mod registry;
mod store;

pub use registry::HeaderAction;
pub use registry::HeaderRegistry;
pub use registry::WellKnown;
pub use store::HeaderSlot;
pub use store::HeaderStore;
pub use store::MAX_HEADERS_LIMIT;
