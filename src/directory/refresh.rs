//! Startup refresh: load each directory from its snapshot, or fetch it from Slack

use crate::config::{CacheConfig, DirectoryOptions, RateLimitConfig};
use crate::directory::cache::DirectoryCache;
use crate::directory::fallback::fallback_emoji;
use crate::directory::snapshot::SnapshotStore;
use crate::directory::types::{
    ChannelDirectory, ChannelRecord, EmojiDirectory, EmojiRecord, EntityKind, UserDirectory,
    UserRecord,
};
use crate::error::{DirectoryError, Result};
use crate::logging::{Timer, log_error};
use crate::slack::{DirectoryService, TokenBucket};
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Users per `fetch_users` call during Slack Connect discovery
const CONNECT_BATCH_SIZE: usize = 30;

/// Where a directory's contents came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshSource {
    Snapshot,
    Remote,
    /// Built-in data served because the remote fetch failed
    Fallback,
}

#[derive(Debug, Clone)]
pub struct RefreshReport {
    pub entity: EntityKind,
    pub source: RefreshSource,
    pub count: usize,
    /// Remote calls made (0 when loaded from the snapshot)
    pub pages: usize,
    pub completed_at: DateTime<Utc>,
}

impl RefreshReport {
    fn new(entity: EntityKind, source: RefreshSource, count: usize, pages: usize) -> Self {
        Self {
            entity,
            source,
            count,
            pages,
            completed_at: Utc::now(),
        }
    }
}

/// Snapshot locations for the three entity types
#[derive(Debug, Clone)]
pub struct SnapshotStores {
    pub users: SnapshotStore,
    pub channels: SnapshotStore,
    pub emoji: SnapshotStore,
}

impl SnapshotStores {
    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            users: SnapshotStore::new(&config.users_path),
            channels: SnapshotStore::new(&config.channels_path),
            emoji: SnapshotStore::new(&config.emoji_path),
        }
    }
}

/// Populates a `DirectoryCache` once at startup
pub struct Refresher {
    service: Arc<dyn DirectoryService>,
    cache: Arc<DirectoryCache>,
    stores: SnapshotStores,
    limiter: TokenBucket,
    options: DirectoryOptions,
}

impl Refresher {
    pub fn new(
        service: Arc<dyn DirectoryService>,
        cache: Arc<DirectoryCache>,
        stores: SnapshotStores,
        rate_limit: &RateLimitConfig,
        options: DirectoryOptions,
    ) -> Self {
        Self {
            service,
            cache,
            stores,
            limiter: TokenBucket::new(rate_limit),
            options,
        }
    }

    /// Load users, then channels, then emoji
    ///
    /// Users and channels errors are returned; an emoji failure is logged and
    /// reported as a `Fallback` load while emoji readiness stays false.
    pub async fn warm_up(&self, cancel: &CancellationToken) -> Result<Vec<RefreshReport>> {
        let _timer = Timer::new("warm_up");
        let mut reports = vec![
            self.refresh_users(cancel).await?,
            self.refresh_channels(cancel).await?,
        ];

        if !self.options.load_emoji {
            tracing::info!("Emoji loading disabled, skipping");
            return Ok(reports);
        }

        match self.refresh_emoji(cancel).await {
            Ok(report) => reports.push(report),
            Err(e) => {
                log_error("refresh_emoji", &e);
                let fallback = fallback_emoji();
                tracing::warn!(
                    fallback_count = fallback.len(),
                    "Emoji unavailable, serving built-in set for lookups"
                );
                reports.push(RefreshReport::new(
                    EntityKind::Emoji,
                    RefreshSource::Fallback,
                    fallback.len(),
                    0,
                ));
            }
        }

        Ok(reports)
    }

    /// Wait for the limiter, then run one remote call unless cancelled first
    async fn guarded<T, F>(&self, cancel: &CancellationToken, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.limiter.acquire(cancel).await?;
        tokio::select! {
            _ = cancel.cancelled() => Err(DirectoryError::Cancelled),
            result = call => result,
        }
    }

    pub async fn refresh_users(&self, cancel: &CancellationToken) -> Result<RefreshReport> {
        let _timer = Timer::new("refresh_users");
        let entity = EntityKind::Users;

        match self.stores.users.load::<UserRecord>().await {
            Ok(records) => {
                let dir = UserDirectory::from_records(records);
                let count = dir.len();
                self.cache.publish_users(dir).await;
                tracing::info!(entity = %entity, count, "Loaded users from snapshot");
                return Ok(RefreshReport::new(entity, RefreshSource::Snapshot, count, 0));
            }
            Err(e) => {
                tracing::info!(error = %e, "Users snapshot unavailable, fetching from Slack");
            }
        }

        let mut dir = UserDirectory::default();
        let mut cursor: Option<String> = None;
        let mut pages = 0;
        loop {
            let page = self
                .guarded(cancel, self.service.list_users_page(cursor.as_deref()))
                .await
                .map_err(|e| fetch_error(entity, e))?;
            pages += 1;

            tracing::debug!(page = pages, count = page.items.len(), "Fetched users page");
            for user in page.items {
                dir.insert(user);
            }

            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        if self.options.include_slack_connect && self.service.capabilities().edge_bootstrap {
            pages += self.merge_slack_connect(&mut dir, cancel).await?;
        }

        let mut records = dir.to_records();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        self.save_snapshot(&self.stores.users, &records, entity).await;

        let count = dir.len();
        self.cache.publish_users(dir).await;
        tracing::info!(entity = %entity, count, pages, "Fetched users from Slack");
        Ok(RefreshReport::new(entity, RefreshSource::Remote, count, pages))
    }

    /// Add Slack Connect users seen in shared IMs but missing from `users.list`
    ///
    /// Returns the number of remote calls made. A failing bootstrap only skips the
    /// enrichment; a failing profile fetch fails the users refresh.
    async fn merge_slack_connect(
        &self,
        dir: &mut UserDirectory,
        cancel: &CancellationToken,
    ) -> Result<usize> {
        let bootstrap = match self.guarded(cancel, self.service.client_bootstrap()).await {
            Ok(bootstrap) => bootstrap,
            Err(DirectoryError::Cancelled) => return Err(DirectoryError::Cancelled),
            Err(e) => {
                tracing::warn!(error = %e, "Client bootstrap failed, skipping Slack Connect users");
                return Ok(1);
            }
        };

        let missing: Vec<String> = bootstrap
            .shared_im_users()
            .filter(|id| !dir.contains(id))
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut calls = 1;
        for batch in missing.chunks(CONNECT_BATCH_SIZE) {
            let users = self
                .guarded(cancel, self.service.fetch_users(batch))
                .await
                .map_err(|e| fetch_error(EntityKind::Users, e))?;
            calls += 1;
            for user in users {
                dir.insert(user);
            }
        }

        if !missing.is_empty() {
            tracing::info!(count = missing.len(), "Merged Slack Connect users");
        }
        Ok(calls)
    }

    pub async fn refresh_channels(&self, cancel: &CancellationToken) -> Result<RefreshReport> {
        let _timer = Timer::new("refresh_channels");
        let entity = EntityKind::Channels;

        match self.stores.channels.load::<ChannelRecord>().await {
            Ok(records) => {
                let dir = ChannelDirectory::from_records(records);
                let count = dir.len();
                self.cache.publish_channels(dir).await;
                tracing::info!(entity = %entity, count, "Loaded channels from snapshot");
                return Ok(RefreshReport::new(entity, RefreshSource::Snapshot, count, 0));
            }
            Err(e) => {
                tracing::info!(error = %e, "Channels snapshot unavailable, fetching from Slack");
            }
        }

        // DM and group DM names are derived from user names
        let users = self.cache.users().await?;

        let mut records: HashMap<String, ChannelRecord> = HashMap::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0;
        loop {
            let page = self
                .guarded(
                    cancel,
                    self.service
                        .list_channels_page(&self.options.channel_kinds, cursor.as_deref()),
                )
                .await
                .map_err(|e| fetch_error(entity, e))?;
            pages += 1;

            tracing::debug!(page = pages, count = page.items.len(), "Fetched channels page");
            for fields in page.items {
                let channel = ChannelRecord::from_fields(fields, &users);
                records.insert(channel.id.clone(), channel);
            }

            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        let mut records: Vec<ChannelRecord> = records.into_values().collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        self.save_snapshot(&self.stores.channels, &records, entity).await;

        let dir = ChannelDirectory::from_records(records);
        let count = dir.len();
        self.cache.publish_channels(dir).await;
        tracing::info!(entity = %entity, count, pages, "Fetched channels from Slack");
        Ok(RefreshReport::new(entity, RefreshSource::Remote, count, pages))
    }

    /// Workspace emoji merged over the built-in Unicode set
    pub async fn refresh_emoji(&self, cancel: &CancellationToken) -> Result<RefreshReport> {
        let _timer = Timer::new("refresh_emoji");
        let entity = EntityKind::Emoji;

        match self.stores.emoji.load::<EmojiRecord>().await {
            Ok(records) => {
                let dir = EmojiDirectory::from_records(records);
                let count = dir.len();
                self.cache.publish_emoji(dir).await;
                tracing::info!(entity = %entity, count, "Loaded emoji from snapshot");
                return Ok(RefreshReport::new(entity, RefreshSource::Snapshot, count, 0));
            }
            Err(e) => {
                tracing::info!(error = %e, "Emoji snapshot unavailable, fetching from Slack");
            }
        }

        let custom = self
            .guarded(cancel, self.service.list_emoji())
            .await
            .map_err(|e| fetch_error(entity, e))?;
        let custom_count = custom.len();

        let mut merged: HashMap<String, EmojiRecord> = fallback_emoji()
            .to_records()
            .into_iter()
            .map(|e| (e.name.clone(), e))
            .collect();
        for emoji in custom {
            merged.insert(emoji.name.clone(), emoji);
        }

        let mut records: Vec<EmojiRecord> = merged.into_values().collect();
        records.sort_by(|a, b| a.name.cmp(&b.name));
        self.save_snapshot(&self.stores.emoji, &records, entity).await;

        let dir = EmojiDirectory::from_records(records);
        let count = dir.len();
        self.cache.publish_emoji(dir).await;
        tracing::info!(entity = %entity, count, custom = custom_count, "Fetched emoji from Slack");
        Ok(RefreshReport::new(entity, RefreshSource::Remote, count, 1))
    }

    /// Best-effort snapshot write; failures are logged only
    async fn save_snapshot<T: serde::Serialize>(
        &self,
        store: &SnapshotStore,
        records: &[T],
        entity: EntityKind,
    ) {
        if let Err(e) = store.save(records).await {
            tracing::warn!(
                entity = %entity,
                path = %store.path().display(),
                error = %e,
                "Failed to write snapshot, continuing without it"
            );
        }
    }
}

fn fetch_error(entity: EntityKind, err: DirectoryError) -> DirectoryError {
    match err {
        DirectoryError::Cancelled => DirectoryError::Cancelled,
        other => DirectoryError::refresh(entity, other),
    }
}
