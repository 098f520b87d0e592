mod shared;

use cache::{CacheUnavailable, NO_TAGS, TaggedCache, tag_set_key};
use shared::{setup::cache, stores::ValueWritesRejected};

#[tokio::test]
async fn invalidated_tag_drops_its_keys() {
    let (_, cache) = cache();

    cache
        .write("user:123", r#"{"id":123}"#, 300, ["users"].as_slice())
        .await;
    assert!(cache.read("user:123").await.is_some());

    cache.invalidate_tag("users").await;

    assert_eq!(cache.read("user:123").await, None);
}

#[tokio::test]
async fn never_used_tag_invalidates_silently() {
    let (_, cache) = cache();

    cache.try_invalidate_tag("nobody-uses-this").await.unwrap();
    cache.try_invalidate_tag("nobody-uses-this").await.unwrap();
}

#[tokio::test]
async fn invalidation_removes_tag_set() {
    let (_, cache) = cache();
    cache.write("user:1", "{}", 300, ["users"].as_slice()).await;

    assert!(cache.exists(&tag_set_key("users")).await);

    cache.try_invalidate_tag("users").await.unwrap();

    assert!(!cache.exists(&tag_set_key("users")).await);
    assert!(cache.try_members("users").await.unwrap().is_empty());
}

#[tokio::test]
async fn only_tagged_keys_are_invalidated() {
    let (_, cache) = cache();
    cache.write("user:1", "{}", 300, ["users"].as_slice()).await;
    cache
        .write("course:1", "{}", 300, ["courses"].as_slice())
        .await;
    cache.write("untagged", "{}", 300, NO_TAGS).await;

    cache.invalidate_tag("users").await;

    assert_eq!(cache.read("user:1").await, None);
    assert!(cache.read("course:1").await.is_some());
    assert!(cache.read("untagged").await.is_some());
}

#[tokio::test]
async fn key_under_several_tags_goes_with_any_of_them() {
    let (_, cache) = cache();
    let tags = ["users".to_string(), "user:42".to_string()];
    cache.write("user:42:profile", "{}", 300, &tags).await;

    assert_eq!(cache.try_members("users").await.unwrap(), ["user:42:profile"]);
    assert_eq!(
        cache.try_members("user:42").await.unwrap(),
        ["user:42:profile"]
    );

    cache.invalidate_tag("user:42").await;

    assert_eq!(cache.read("user:42:profile").await, None);
    // the other tag still lists the key until it is invalidated itself
    assert_eq!(cache.try_members("users").await.unwrap(), ["user:42:profile"]);
}

#[tokio::test]
async fn tagging_is_idempotent() {
    let (_, cache) = cache();

    cache.write("user:1", "{}", 300, ["users"].as_slice()).await;
    cache.write("user:1", "{}", 300, ["users"].as_slice()).await;
    cache.write("user:2", "{}", 300, ["users"].as_slice()).await;

    let mut members = cache.try_members("users").await.unwrap();
    members.sort();
    assert_eq!(members, ["user:1", "user:2"]);
}

#[tokio::test]
async fn invalidate_tags_handles_each_tag() {
    let (_, cache) = cache();
    cache.write("user:1", "{}", 300, ["users"].as_slice()).await;
    cache
        .write("course:1", "{}", 300, ["courses"].as_slice())
        .await;
    cache.write("lesson:1", "{}", 300, ["lessons"].as_slice()).await;

    cache
        .try_invalidate_tags(&["users", "never-used", "courses"])
        .await
        .unwrap();

    assert_eq!(cache.read("user:1").await, None);
    assert_eq!(cache.read("course:1").await, None);
    assert!(cache.read("lesson:1").await.is_some());
}

#[tokio::test]
async fn deleted_key_stays_in_tag_set_until_invalidation() {
    let (_, cache) = cache();
    cache.write("user:1", "{}", 300, ["users"].as_slice()).await;

    cache.delete("user:1").await;

    assert_eq!(cache.read("user:1").await, None);
    assert_eq!(cache.try_members("users").await.unwrap(), ["user:1"]);

    cache.try_invalidate_tag("users").await.unwrap();
    assert!(cache.try_members("users").await.unwrap().is_empty());
}

#[tokio::test]
async fn expired_key_stays_in_tag_set_harmlessly() {
    let (_, cache) = cache();
    cache.write("user:1", "{}", 1, ["users"].as_slice()).await;

    tokio::time::sleep(std::time::Duration::from_millis(1100)).await;

    assert_eq!(cache.read("user:1").await, None);
    cache.try_invalidate_tag("users").await.unwrap();
}

#[tokio::test]
async fn failed_value_write_records_no_tags() {
    let cache = TaggedCache::new(ValueWritesRejected::default());

    assert!(matches!(
        cache
            .try_write("user:1", "{}", 300, ["users"].as_slice())
            .await,
        Err(CacheUnavailable::Rejected(_))
    ));
    cache.write("user:2", "{}", 300, ["users"].as_slice()).await;

    assert!(cache.try_members("users").await.unwrap().is_empty());
    assert!(!cache.exists(&tag_set_key("users")).await);
}
