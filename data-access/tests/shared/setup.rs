use std::sync::Arc;

use cache::{DashStore, TaggedCache};
use data_access::DataAccess;
use sqlx::sqlite::SqlitePoolOptions;

pub async fn data_access() -> (Arc<DashStore>, DataAccess<Arc<DashStore>>) {
    // a single connection, otherwise every pooled connection opens its own in-memory db
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("unable to connect to test db");

    sqlx::query(
        "CREATE TABLE users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            phone_number TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL
        )",
    )
    .execute(&pool)
    .await
    .expect("unable to create users table");

    let store = Arc::new(DashStore::new());
    let data_access = DataAccess::new(pool, TaggedCache::new(Arc::clone(&store)));

    (store, data_access)
}
