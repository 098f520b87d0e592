use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub phone_number: String,
    pub name: String,
}

impl From<(i64, String, String)> for User {
    fn from((id, phone_number, name): (i64, String, String)) -> Self {
        Self {
            id,
            phone_number,
            name,
        }
    }
}

pub async fn insert(
    pool: &SqlitePool,
    phone_number: &str,
    name: &str,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, (i64, String, String)>(
        "INSERT INTO users (phone_number, name) VALUES (?, ?) RETURNING id, phone_number, name",
    )
    .bind(phone_number)
    .bind(name)
    .fetch_one(pool)
    .await
    .map(User::from)
}

pub async fn by_phone_number(
    pool: &SqlitePool,
    phone_number: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, (i64, String, String)>(
        "SELECT id, phone_number, name FROM users WHERE phone_number = ?",
    )
    .bind(phone_number)
    .fetch_optional(pool)
    .await
    .map(|row| row.map(User::from))
}

pub async fn rename(
    pool: &SqlitePool,
    phone_number: &str,
    name: &str,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, (i64, String, String)>(
        "UPDATE users SET name = ? WHERE phone_number = ? RETURNING id, phone_number, name",
    )
    .bind(name)
    .bind(phone_number)
    .fetch_one(pool)
    .await
    .map(User::from)
}

pub fn key(phone_number: &str) -> cache::CacheKey {
    cache::derive_key(&format!("user:{phone_number}"), cache::NO_PARTS).unwrap()
}
