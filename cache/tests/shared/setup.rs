use std::sync::Arc;

use cache::{DashStore, TaggedCache};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub phone_number: String,
}

impl User {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            phone_number: format!("+100000{id:04}"),
        }
    }
}

pub fn cache() -> (Arc<DashStore>, TaggedCache<Arc<DashStore>>) {
    let store = Arc::new(DashStore::new());
    let cache = TaggedCache::new(Arc::clone(&store));
    (store, cache)
}
