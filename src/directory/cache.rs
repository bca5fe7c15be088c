//! Directory cache: once-populated users, channels and emoji plus a lazy bot index

use crate::directory::fallback::fallback_emoji;
use crate::directory::readiness::ReadinessGate;
use crate::directory::types::{
    ChannelDirectory, EmojiDirectory, EntityKind, UserDirectory, UserRecord,
};
use crate::error::Result;
use crate::slack::DirectoryService;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Cache statistics for monitoring
#[derive(Debug, Default, Clone)]
pub struct CacheStats {
    pub bot_hits: u64,
    pub bot_misses: u64,
    pub api_calls: u64,
    pub api_errors: u64,
}

/// In-memory directory of Slack entities
///
/// Each collection is swapped in whole by the refresh pipeline, so readers always
/// see a forward map and inverse index built from the same record list. Readers
/// get a cheap `Arc` snapshot and never hold the lock while working on it.
#[derive(Default)]
pub struct DirectoryCache {
    users: RwLock<Arc<UserDirectory>>,
    channels: RwLock<Arc<ChannelDirectory>>,
    emoji: RwLock<Arc<EmojiDirectory>>,

    readiness: ReadinessGate,

    /// bot ID -> resolved user ID
    bot_users: DashMap<String, String>,

    /// app ID -> resolved user ID
    app_users: DashMap<String, String>,

    /// Per-bot lock so concurrent misses for one bot trigger a single lookup
    bot_locks: DashMap<String, Arc<Mutex<()>>>,

    stats: RwLock<CacheStats>,
}

impl DirectoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn readiness(&self) -> &ReadinessGate {
        &self.readiness
    }

    pub fn is_ready(&self, kind: EntityKind) -> bool {
        self.readiness.is_ready(kind)
    }

    pub(crate) async fn publish_users(&self, dir: UserDirectory) {
        *self.users.write().await = Arc::new(dir);
        self.readiness.mark_ready(EntityKind::Users);
    }

    pub(crate) async fn publish_channels(&self, dir: ChannelDirectory) {
        *self.channels.write().await = Arc::new(dir);
        self.readiness.mark_ready(EntityKind::Channels);
    }

    pub(crate) async fn publish_emoji(&self, dir: EmojiDirectory) {
        *self.emoji.write().await = Arc::new(dir);
        self.readiness.mark_ready(EntityKind::Emoji);
    }

    /// Users snapshot, available once users are loaded
    pub async fn users(&self) -> Result<Arc<UserDirectory>> {
        self.readiness.check(EntityKind::Users)?;
        Ok(self.users.read().await.clone())
    }

    /// Channels snapshot; requires users too since DM names derive from them
    pub async fn channels(&self) -> Result<Arc<ChannelDirectory>> {
        self.readiness.check_users_and_channels()?;
        Ok(self.channels.read().await.clone())
    }

    pub async fn emoji(&self) -> Result<Arc<EmojiDirectory>> {
        self.readiness.check(EntityKind::Emoji)?;
        Ok(self.emoji.read().await.clone())
    }

    /// Workspace emoji when loaded, otherwise the built-in Unicode set
    pub async fn emoji_or_fallback(&self) -> Arc<EmojiDirectory> {
        if self.readiness.is_ready(EntityKind::Emoji) {
            self.emoji.read().await.clone()
        } else {
            fallback_emoji()
        }
    }

    /// Resolve `#name`, `@user` or a raw ID to a channel ID
    pub async fn resolve_channel_id(&self, name_or_id: &str) -> Result<Option<String>> {
        let channels = self.channels().await?;
        if let Some(channel) = channels.get(name_or_id) {
            return Ok(Some(channel.id.clone()));
        }
        Ok(channels.get_by_name(name_or_id).map(|c| c.id.clone()))
    }

    /// Resolve `@name`, `name` or a raw ID to a user ID
    pub async fn resolve_user_id(&self, name_or_id: &str) -> Result<Option<String>> {
        let users = self.users().await?;
        if users.contains(name_or_id) {
            return Ok(Some(name_or_id.to_string()));
        }
        Ok(users.get_by_name(name_or_id).map(|u| u.id.clone()))
    }

    /// Resolve a bot ID to a displayable user
    ///
    /// Looks in the local index first; on a miss asks the service for the bot and
    /// matches its user or app ID against loaded users. Bots with no matching user
    /// get a placeholder record, so every bot resolves to some identity once the
    /// lookup succeeds.
    pub async fn resolve_bot(
        &self,
        service: &dyn DirectoryService,
        bot_id: &str,
    ) -> Result<UserRecord> {
        self.readiness.check(EntityKind::Users)?;

        if let Some(user) = self.cached_bot(bot_id).await {
            self.stats.write().await.bot_hits += 1;
            return Ok(user);
        }

        let lock = self
            .bot_locks
            .entry(bot_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        // Another task may have resolved it while we waited
        if let Some(user) = self.cached_bot(bot_id).await {
            self.stats.write().await.bot_hits += 1;
            return Ok(user);
        }

        {
            let mut stats = self.stats.write().await;
            stats.bot_misses += 1;
            stats.api_calls += 1;
        }
        tracing::debug!(bot_id = %bot_id, "Bot cache miss, fetching from Slack API");

        let info = match service.bot_info(bot_id).await {
            Ok(info) => info,
            Err(e) => {
                self.stats.write().await.api_errors += 1;
                self.bot_locks.remove(bot_id);
                return Err(e);
            }
        };

        let users = self.users.read().await.clone();
        let matched = info
            .user_id
            .as_deref()
            .and_then(|id| users.get(id))
            .or_else(|| {
                let app_id = info.app_id.as_deref()?;
                match self.app_users.get(app_id).map(|id| id.value().clone()) {
                    Some(id) => users.get(&id),
                    None => users.find_by_app_id(app_id),
                }
            })
            .cloned();

        let user = match matched {
            Some(user) => user,
            None => {
                let mut placeholder = UserRecord::bot_placeholder(bot_id, &info.name);
                placeholder.app_id = info.app_id.clone();
                tracing::debug!(
                    bot_id = %bot_id,
                    bot = %info.name,
                    "No user for bot, using placeholder"
                );
                let mut guard = self.users.write().await;
                Arc::make_mut(&mut *guard).append(placeholder.clone());
                placeholder
            }
        };

        if let Some(app_id) = &info.app_id {
            self.app_users.insert(app_id.clone(), user.id.clone());
        }
        self.bot_users.insert(bot_id.to_string(), user.id.clone());
        self.bot_locks.remove(bot_id);

        tracing::info!(
            bot_id = %bot_id,
            user_id = %user.id,
            user = %user.name,
            "Resolved and cached bot identity"
        );
        Ok(user)
    }

    async fn cached_bot(&self, bot_id: &str) -> Option<UserRecord> {
        let user_id = self.bot_users.get(bot_id).map(|id| id.value().clone())?;
        self.users.read().await.get(&user_id).cloned()
    }

    /// Get cache statistics
    pub async fn get_stats(&self) -> CacheStats {
        self.stats.read().await.clone()
    }

    /// Current (users, channels, emoji) counts
    pub async fn cache_sizes(&self) -> (usize, usize, usize) {
        (
            self.users.read().await.len(),
            self.channels.read().await.len(),
            self.emoji.read().await.len(),
        )
    }

    /// Log cache statistics (for periodic monitoring)
    pub async fn log_stats(&self) {
        let stats = self.get_stats().await;
        let (users, channels, emoji) = self.cache_sizes().await;

        tracing::info!(
            users_cached = users,
            channels_cached = channels,
            emoji_cached = emoji,
            users_ready = self.is_ready(EntityKind::Users),
            channels_ready = self.is_ready(EntityKind::Channels),
            emoji_ready = self.is_ready(EntityKind::Emoji),
            bots_resolved = self.bot_users.len(),
            bot_hits = stats.bot_hits,
            bot_misses = stats.bot_misses,
            api_errors = stats.api_errors,
            "Directory cache statistics"
        );
    }
}
