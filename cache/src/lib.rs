mod cache;
#[cfg(feature = "dashcache")]
mod dashcache;
mod key;
pub mod single_flight;
mod store;
mod tag;

pub use cache::{NO_TAGS, TaggedCache};
#[cfg(feature = "dashcache")]
pub use dashcache::DashStore;
pub use key::{CacheKey, NO_PARTS, derive_key};
pub use store::{CacheStore, CacheUnavailable};
pub use tag::{Tag, TagIndex, TagInvalidationError, tag_set_key};
