//! Identity/session store collaborator.
//!
//! The relay resolves credentials and late-joiner playback state through
//! this trait; how users are actually stored (JWT verification, a
//! database, a JSON file) is outside this crate.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::types::{PlaybackAction, UserId};

/// What the directory knows about a user.
#[derive(Debug, Clone)]
pub struct UserProfile {
    /// The user's identity
    pub id: UserId,
    /// The user's last known playback state, if any
    pub now_playing: Option<PlaybackAction>,
}

/// Resolves credentials and user profiles for the relay.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Validate a credential, returning the identity it proves.
    async fn verify_token(&self, token: &str) -> Option<UserId>;

    /// Look up a user by id.
    async fn lookup_user(&self, id: &UserId) -> Option<UserProfile>;
}

/// In-memory directory for tests and embedded deployments.
#[derive(Debug, Default)]
pub struct StaticDirectory {
    tokens: RwLock<HashMap<String, UserId>>,
    profiles: RwLock<HashMap<UserId, UserProfile>>,
}

impl StaticDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user reachable via `token`.
    pub async fn add_user(&self, token: impl Into<String>, id: UserId) {
        let profile = UserProfile {
            id: id.clone(),
            now_playing: None,
        };
        self.tokens.write().await.insert(token.into(), id.clone());
        self.profiles.write().await.insert(id, profile);
    }

    /// Record a user's current playback state.
    pub async fn set_now_playing(&self, id: &UserId, action: Option<PlaybackAction>) {
        if let Some(profile) = self.profiles.write().await.get_mut(id) {
            profile.now_playing = action;
        }
    }
}

#[async_trait]
impl UserDirectory for StaticDirectory {
    async fn verify_token(&self, token: &str) -> Option<UserId> {
        self.tokens.read().await.get(token).cloned()
    }

    async fn lookup_user(&self, id: &UserId) -> Option<UserProfile> {
        self.profiles.read().await.get(id).cloned()
    }
}
