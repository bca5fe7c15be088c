//! In-memory `DirectoryService` with call counters for tests

use crate::directory::{ChannelFields, ChannelKind, EmojiRecord, UserRecord};
use crate::error::{DirectoryError, Result};
use crate::slack::service::DirectoryService;
use crate::slack::types::{BotInfo, Capabilities, ClientBootstrap, RemotePage};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CallCounts {
    pub list_users: usize,
    pub list_channels: usize,
    pub list_emoji: usize,
    pub fetch_users: usize,
    pub bootstrap: usize,
    pub bot_info: usize,
}

#[derive(Default)]
struct MockState {
    user_pages: Vec<Vec<UserRecord>>,
    channel_pages: Vec<Vec<ChannelFields>>,
    emoji: Option<Vec<EmojiRecord>>,
    fail_users: bool,
    fail_channels: bool,
    bootstrap: Option<ClientBootstrap>,
    profiles: HashMap<String, UserRecord>,
    fetch_batches: Vec<usize>,
    bots: HashMap<String, BotInfo>,
    capabilities: Capabilities,
}

#[derive(Default)]
pub struct MockDirectory {
    state: Mutex<MockState>,
    list_users: AtomicUsize,
    list_channels: AtomicUsize,
    list_emoji: AtomicUsize,
    fetch_users: AtomicUsize,
    bootstrap: AtomicUsize,
    bot_info: AtomicUsize,
}

impl MockDirectory {
    pub fn set_user_pages(&self, pages: Vec<Vec<UserRecord>>) {
        self.state.lock().unwrap().user_pages = pages;
    }

    pub fn set_channel_pages(&self, pages: Vec<Vec<ChannelFields>>) {
        self.state.lock().unwrap().channel_pages = pages;
    }

    /// `None` makes `list_emoji` fail
    pub fn set_emoji(&self, emoji: Option<Vec<EmojiRecord>>) {
        self.state.lock().unwrap().emoji = emoji;
    }

    pub fn fail_users(&self) {
        self.state.lock().unwrap().fail_users = true;
    }

    pub fn fail_channels(&self) {
        self.state.lock().unwrap().fail_channels = true;
    }

    /// Enables the edge capability; `None` makes the bootstrap call fail
    pub fn set_bootstrap(&self, bootstrap: Option<ClientBootstrap>) {
        let mut state = self.state.lock().unwrap();
        state.capabilities.edge_bootstrap = true;
        state.bootstrap = bootstrap;
    }

    pub fn add_profile(&self, user: UserRecord) {
        self.state
            .lock()
            .unwrap()
            .profiles
            .insert(user.id.clone(), user);
    }

    pub fn set_bot(&self, bot: BotInfo) {
        self.state.lock().unwrap().bots.insert(bot.id.clone(), bot);
    }

    /// Size of each `fetch_users` request, in call order
    pub fn fetch_batches(&self) -> Vec<usize> {
        self.state.lock().unwrap().fetch_batches.clone()
    }

    pub fn calls(&self) -> CallCounts {
        CallCounts {
            list_users: self.list_users.load(Ordering::SeqCst),
            list_channels: self.list_channels.load(Ordering::SeqCst),
            list_emoji: self.list_emoji.load(Ordering::SeqCst),
            fetch_users: self.fetch_users.load(Ordering::SeqCst),
            bootstrap: self.bootstrap.load(Ordering::SeqCst),
            bot_info: self.bot_info.load(Ordering::SeqCst),
        }
    }
}

fn page_index(cursor: Option<&str>) -> usize {
    cursor
        .and_then(|c| c.strip_prefix("page-"))
        .and_then(|n| n.parse().ok())
        .unwrap_or(0)
}

fn page_of<T: Clone>(pages: &[Vec<T>], cursor: Option<&str>) -> RemotePage<T> {
    let index = page_index(cursor);
    let items = pages.get(index).cloned().unwrap_or_default();
    let next = (index + 1 < pages.len()).then(|| format!("page-{}", index + 1));
    RemotePage::new(items, next)
}

#[async_trait]
impl DirectoryService for MockDirectory {
    fn capabilities(&self) -> Capabilities {
        self.state.lock().unwrap().capabilities
    }

    async fn list_users_page(&self, cursor: Option<&str>) -> Result<RemotePage<UserRecord>> {
        self.list_users.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().unwrap();
        if state.fail_users {
            return Err(DirectoryError::SlackApi("users.list: ratelimited".into()));
        }
        Ok(page_of(&state.user_pages, cursor))
    }

    async fn list_channels_page(
        &self,
        _kinds: &[ChannelKind],
        cursor: Option<&str>,
    ) -> Result<RemotePage<ChannelFields>> {
        self.list_channels.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().unwrap();
        if state.fail_channels {
            return Err(DirectoryError::SlackApi("conversations.list: fatal".into()));
        }
        Ok(page_of(&state.channel_pages, cursor))
    }

    async fn list_emoji(&self) -> Result<Vec<EmojiRecord>> {
        self.list_emoji.fetch_add(1, Ordering::SeqCst);
        self.state
            .lock()
            .unwrap()
            .emoji
            .clone()
            .ok_or_else(|| DirectoryError::SlackApi("emoji.list: connection reset".into()))
    }

    async fn fetch_users(&self, ids: &[String]) -> Result<Vec<UserRecord>> {
        self.fetch_users.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        state.fetch_batches.push(ids.len());
        Ok(ids
            .iter()
            .filter_map(|id| state.profiles.get(id).cloned())
            .collect())
    }

    async fn client_bootstrap(&self) -> Result<ClientBootstrap> {
        self.bootstrap.fetch_add(1, Ordering::SeqCst);
        self.state
            .lock()
            .unwrap()
            .bootstrap
            .clone()
            .ok_or_else(|| DirectoryError::SlackApi("client.userBoot: not_allowed".into()))
    }

    async fn bot_info(&self, bot_id: &str) -> Result<BotInfo> {
        self.bot_info.fetch_add(1, Ordering::SeqCst);
        // Give concurrent callers a chance to pile up on the same miss
        tokio::task::yield_now().await;
        self.state
            .lock()
            .unwrap()
            .bots
            .get(bot_id)
            .cloned()
            .ok_or_else(|| DirectoryError::SlackApi("bots.info: bot_not_found".into()))
    }
}
