//! imSite Store
//!
//! The asynchronous boundary between the navigation core and the managed
//! data store that owns projects, instruments and membership rows.
//!
//! - [`ProjectStore`], [`InstrumentStore`], [`MembershipStore`]: the read and
//!   write operations the core relies on
//! - [`SiteStore`]: all three, implemented automatically
//! - [`MemoryStore`]: in-process implementation backed by a [`StoreSnapshot`]

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod error;
pub mod memory;
pub mod traits;

pub use error::StoreError;
pub use memory::{MemoryStore, StoreSnapshot};
pub use traits::{InstrumentStore, MembershipStore, ProjectStore, SiteStore};
