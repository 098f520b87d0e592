use crate::store::{CacheStore, CacheUnavailable};

const TAG_PREFIX: &str = "tag:";

pub trait Tag {
    fn id(&self) -> &str;
}

impl Tag for str {
    fn id(&self) -> &str {
        self
    }
}

impl Tag for String {
    fn id(&self) -> &str {
        self.as_str()
    }
}

impl Tag for &str {
    fn id(&self) -> &str {
        self
    }
}

impl Tag for &String {
    fn id(&self) -> &str {
        self.as_str()
    }
}

/// The store key of the set holding every key tagged with `tag`.
pub fn tag_set_key<T: Tag + ?Sized>(tag: &T) -> String {
    format!("{}{}", TAG_PREFIX, tag.id())
}

/// Failures collected while invalidating several tags.
#[derive(thiserror::Error, Debug)]
#[error("unable to invalidate tags {:?}", .0.iter().map(|(tag, _)| tag).collect::<Vec<_>>())]
pub struct TagInvalidationError(pub Vec<(String, CacheUnavailable)>);

/// Keeps, per tag, the set of keys written under it.
pub struct TagIndex<S> {
    store: S,
}

impl<S: CacheStore> TagIndex<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn tag<T: Tag + ?Sized>(&self, tag: &T, key: &str) -> Result<(), CacheUnavailable> {
        self.store.set_add(&tag_set_key(tag), key).await
    }

    pub async fn members<T: Tag + ?Sized>(&self, tag: &T) -> Result<Vec<String>, CacheUnavailable> {
        self.store.set_members(&tag_set_key(tag)).await
    }

    /// Deletes every key tagged with `tag` and then the tag set itself.
    ///
    /// Invalidating a tag that was never used (or already invalidated) is a no-op.
    pub async fn invalidate_tag<T: Tag + ?Sized>(&self, tag: &T) -> Result<(), CacheUnavailable> {
        let set_key = tag_set_key(tag);
        let keys = self.store.set_members(&set_key).await?;

        if !keys.is_empty() {
            let _deleted = self.store.delete_many(&keys).await?;

            #[cfg(feature = "tracing")]
            tracing::debug!(
                "DEL :: {} of {} keys under tag {}",
                _deleted,
                keys.len(),
                tag.id()
            );
        }

        self.store
            .delete_many(std::slice::from_ref(&set_key))
            .await?;

        #[cfg(feature = "tracing")]
        tracing::debug!("DEL tag set :: {}", set_key);

        Ok(())
    }

    /// Invalidates each tag in order. A failing tag does not stop the rest;
    /// every failure is reported in the returned error.
    pub async fn invalidate_tags<T: Tag>(&self, tags: &[T]) -> Result<(), TagInvalidationError> {
        let mut failures = vec![];

        for tag in tags {
            if let Err(e) = self.invalidate_tag(tag).await {
                failures.push((tag.id().to_string(), e));
            }
        }

        match failures.is_empty() {
            true => Ok(()),
            false => Err(TagInvalidationError(failures)),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}
