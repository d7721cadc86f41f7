//! Community feed and memorial wall. Both are user-authored content and are
//! stored as necessary data, outside the consent gate.

use crate::error::CommunityError;
use crate::models::{Memorial, Post, User};
use crate::storage::{keys, StorageManager};
use chrono::{Duration, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

// Persisted list, read on first access and seeded when absent
struct Collection<T> {
    key: &'static str,
    storage: StorageManager,
    seed: fn() -> Vec<T>,
    items: Mutex<Option<Vec<T>>>,
}

impl<T> Collection<T>
where
    T: Clone + Serialize + DeserializeOwned + Send,
{
    fn new(key: &'static str, storage: StorageManager, seed: fn() -> Vec<T>) -> Self {
        Self {
            key,
            storage,
            seed,
            items: Mutex::new(None),
        }
    }

    async fn read(&self) -> Vec<T> {
        let mut slot = self.items.lock().await;
        self.loaded(&mut slot).await.clone()
    }

    /// Applies `f` and persists the result if it succeeds.
    async fn modify<R>(&self, f: impl FnOnce(&mut Vec<T>) -> Result<R, CommunityError>) -> Result<R, CommunityError> {
        let mut slot = self.items.lock().await;
        let items = self.loaded(&mut slot).await;
        let result = f(&mut *items)?;
        self.storage.set(self.key, items.as_slice()).await;
        Ok(result)
    }

    async fn loaded<'a>(&self, slot: &'a mut Option<Vec<T>>) -> &'a mut Vec<T> {
        if slot.is_none() {
            let stored: Option<Vec<T>> = self.storage.get(self.key, None).await;
            let items = match stored {
                Some(items) => items,
                None => {
                    let seeded = (self.seed)();
                    log::info!("Seeding \"{}\" with {} entries", self.key, seeded.len());
                    self.storage.set(self.key, &seeded).await;
                    seeded
                }
            };
            *slot = Some(items);
        }
        slot.get_or_insert_with(Vec::new)
    }
}

fn required(value: &str, field: &'static str) -> Result<String, CommunityError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CommunityError::Empty { field });
    }
    Ok(value.to_string())
}

pub struct CommunityFeed {
    posts: Collection<Post>,
}

impl CommunityFeed {
    pub fn new(storage: StorageManager) -> Self {
        Self {
            posts: Collection::new(keys::COMMUNITY_POSTS, storage, seed_posts),
        }
    }

    /// Newest first.
    pub async fn posts(&self) -> Vec<Post> {
        let mut posts = self.posts.read().await;
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        posts
    }

    pub async fn create_post(&self, author: Option<&User>, content: &str) -> Result<Post, CommunityError> {
        let author = author.ok_or(CommunityError::NotLoggedIn)?;
        let post = Post {
            id: Uuid::new_v4(),
            author_id: author.id,
            author_name: author.name.clone(),
            content: required(content, "Post")?,
            created_at: Utc::now(),
            likes: 0,
        };
        let created = post.clone();
        self.posts
            .modify(move |posts| {
                posts.push(post);
                Ok(())
            })
            .await?;
        log::info!("User {} created post {}", author.id, created.id);
        Ok(created)
    }

    pub async fn like_post(&self, post_id: Uuid) -> Result<u32, CommunityError> {
        self.posts
            .modify(|posts| {
                let post = posts
                    .iter_mut()
                    .find(|p| p.id == post_id)
                    .ok_or(CommunityError::PostNotFound(post_id))?;
                post.likes = post.likes.saturating_add(1);
                Ok(post.likes)
            })
            .await
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewMemorial {
    pub pet_name: String,
    pub owner_name: String,
    pub message: String,
    pub years: Option<String>,
}

pub struct MemorialWall {
    memorials: Collection<Memorial>,
}

impl MemorialWall {
    pub fn new(storage: StorageManager) -> Self {
        Self {
            memorials: Collection::new(keys::MEMORIALS, storage, seed_memorials),
        }
    }

    /// Newest first.
    pub async fn memorials(&self) -> Vec<Memorial> {
        let mut memorials = self.memorials.read().await;
        memorials.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        memorials
    }

    pub async fn add_memorial(&self, entry: NewMemorial) -> Result<Memorial, CommunityError> {
        let memorial = Memorial {
            id: Uuid::new_v4(),
            pet_name: required(&entry.pet_name, "Pet name")?,
            owner_name: required(&entry.owner_name, "Your name")?,
            message: required(&entry.message, "Message")?,
            years: entry.years.map(|y| y.trim().to_string()).filter(|y| !y.is_empty()),
            created_at: Utc::now(),
        };
        let created = memorial.clone();
        self.memorials
            .modify(move |memorials| {
                memorials.push(memorial);
                Ok(())
            })
            .await?;
        log::info!("Added memorial for {}", created.pet_name);
        Ok(created)
    }
}

fn seed_posts() -> Vec<Post> {
    let now = Utc::now();
    vec![
        Post {
            id: Uuid::new_v4(),
            author_id: 1,
            author_name: "Jane Doe".to_string(),
            content: "Buddy has settled in beautifully. Thank you PawHaven for bringing him to us!".to_string(),
            created_at: now - Duration::days(2),
            likes: 12,
        },
        Post {
            id: Uuid::new_v4(),
            author_id: 2,
            author_name: "John Smith".to_string(),
            content: "Volunteers needed this Saturday for the vaccination camp in Mirpur.".to_string(),
            created_at: now - Duration::days(1),
            likes: 5,
        },
    ]
}

fn seed_memorials() -> Vec<Memorial> {
    vec![Memorial {
        id: Uuid::new_v4(),
        pet_name: "Bagha".to_string(),
        owner_name: "Jane Doe".to_string(),
        message: "Fourteen years of muddy paws and endless loyalty. Run free, old friend.".to_string(),
        years: Some("2009 - 2023".to_string()),
        created_at: Utc::now() - Duration::days(30),
    }]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jane() -> User {
        User {
            id: 1,
            name: "Jane Doe".to_string(),
            email: "jane@example.com".to_string(),
        }
    }

    #[tokio::test]
    async fn posting_requires_login_and_content() {
        let feed = CommunityFeed::new(StorageManager::in_memory());
        assert_eq!(feed.create_post(None, "hello").await, Err(CommunityError::NotLoggedIn));
        assert_eq!(
            feed.create_post(Some(&jane()), "   ").await,
            Err(CommunityError::Empty { field: "Post" })
        );
    }

    #[tokio::test]
    async fn new_posts_are_listed_first_and_persisted() {
        let storage = StorageManager::in_memory();
        let feed = CommunityFeed::new(storage.clone());
        let post = feed.create_post(Some(&jane()), "Adopted a cat today!").await.unwrap();

        let posts = feed.posts().await;
        assert_eq!(posts[0].id, post.id);

        let reloaded = CommunityFeed::new(storage);
        assert_eq!(reloaded.posts().await.len(), posts.len());
    }

    #[tokio::test]
    async fn like_count_saturates() {
        let storage = StorageManager::in_memory();
        let post = Post {
            id: Uuid::new_v4(),
            author_id: 1,
            author_name: "Jane Doe".to_string(),
            content: "Everyone loves this one".to_string(),
            created_at: Utc::now(),
            likes: u32::MAX,
        };
        storage.set(keys::COMMUNITY_POSTS, &vec![post.clone()]).await;

        let feed = CommunityFeed::new(storage);
        assert_eq!(feed.like_post(post.id).await, Ok(u32::MAX));
    }

    #[tokio::test]
    async fn likes_increment_and_unknown_posts_error() {
        let feed = CommunityFeed::new(StorageManager::in_memory());
        let post = feed.create_post(Some(&jane()), "Hi all").await.unwrap();
        assert_eq!(feed.like_post(post.id).await, Ok(1));
        assert_eq!(feed.like_post(post.id).await, Ok(2));

        let missing = Uuid::new_v4();
        assert_eq!(feed.like_post(missing).await, Err(CommunityError::PostNotFound(missing)));
    }

    #[tokio::test]
    async fn memorial_validation_and_listing() {
        let wall = MemorialWall::new(StorageManager::in_memory());
        let err = wall
            .add_memorial(NewMemorial {
                pet_name: "Tommy".to_string(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err, CommunityError::Empty { field: "Your name" });

        let added = wall
            .add_memorial(NewMemorial {
                pet_name: "Tommy".to_string(),
                owner_name: "Rina".to_string(),
                message: "Forever in our hearts".to_string(),
                years: Some("  ".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(added.years, None);
        assert_eq!(wall.memorials().await[0].pet_name, "Tommy");
    }
}
