//! Directory record types and their indexed collections

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// The three independently cached entity types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Users,
    Channels,
    Emoji,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Users => "users",
            EntityKind::Channels => "channels",
            EntityKind::Emoji => "emoji",
        };
        f.write_str(name)
    }
}

/// User record as cached and persisted in the users snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    /// User ID (e.g., U09JDBT2MCM)
    pub id: String,

    /// Username/handle (e.g., "john.doe")
    pub name: String,

    #[serde(default)]
    pub real_name: Option<String>,

    #[serde(default)]
    pub display_name: Option<String>,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub is_bot: bool,

    #[serde(default)]
    pub is_admin: bool,

    #[serde(default)]
    pub is_deleted: bool,

    /// Guest account (single- or multi-channel)
    #[serde(default)]
    pub is_restricted: bool,

    /// App ID for bot users, used to resolve `bots.info` results
    #[serde(default)]
    pub app_id: Option<String>,

    #[serde(default)]
    pub team_id: Option<String>,
}

impl UserRecord {
    /// Placeholder identity for a bot with no matching user
    pub fn bot_placeholder(bot_id: &str, bot_name: &str) -> Self {
        Self {
            id: bot_id.to_string(),
            name: bot_name.to_string(),
            real_name: Some(bot_name.to_string()),
            display_name: None,
            email: None,
            is_bot: true,
            is_admin: false,
            is_deleted: false,
            is_restricted: false,
            app_id: None,
            team_id: None,
        }
    }

    /// Get best available name for display
    pub fn best_name(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .or(self.real_name.as_deref().filter(|n| !n.is_empty()))
            .unwrap_or(&self.name)
    }
}

/// Conversation type, serialized with Slack's `types` parameter names
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    #[serde(rename = "public_channel")]
    Public,
    #[serde(rename = "private_channel")]
    Private,
    #[serde(rename = "im")]
    Im,
    #[serde(rename = "mpim")]
    Mpim,
}

impl ChannelKind {
    pub const ALL: [ChannelKind; 4] = [
        ChannelKind::Public,
        ChannelKind::Private,
        ChannelKind::Mpim,
        ChannelKind::Im,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::Public => "public_channel",
            ChannelKind::Private => "private_channel",
            ChannelKind::Im => "im",
            ChannelKind::Mpim => "mpim",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChannelKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "public_channel" => Ok(ChannelKind::Public),
            "private_channel" => Ok(ChannelKind::Private),
            "im" => Ok(ChannelKind::Im),
            "mpim" => Ok(ChannelKind::Mpim),
            other => Err(other.to_string()),
        }
    }
}

/// Channel record as cached and persisted in the channels snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelRecord {
    /// Channel ID (e.g., C09NU1KFXHT)
    pub id: String,

    /// Raw Slack name (without `#`); empty for IMs
    pub name: String,

    /// Derived human-facing name (`#general`, `@john.doe`, `@a, b, c`)
    pub display_name: String,

    pub kind: ChannelKind,

    #[serde(default)]
    pub topic: String,

    #[serde(default)]
    pub purpose: String,

    #[serde(default)]
    pub member_count: u64,

    #[serde(default)]
    pub is_private: bool,

    #[serde(default)]
    pub is_im: bool,

    #[serde(default)]
    pub is_mpim: bool,

    #[serde(default)]
    pub is_archived: bool,

    #[serde(default)]
    pub is_shared: bool,

    #[serde(default)]
    pub is_ext_shared: bool,

    /// Counterpart user for IMs
    #[serde(default)]
    pub user: Option<String>,
}

/// Raw channel fields before normalization
#[derive(Debug, Clone, Default)]
pub struct ChannelFields {
    pub id: String,
    pub name: String,
    pub topic: String,
    pub purpose: String,
    pub member_count: u64,
    pub is_private: bool,
    pub is_im: bool,
    pub is_mpim: bool,
    pub is_archived: bool,
    pub is_shared: bool,
    pub is_ext_shared: bool,
    pub user: Option<String>,
    pub members: Vec<String>,
}

static MPIM_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^mpdm-(.+)-\d+$").expect("valid mpim name pattern"));

impl ChannelRecord {
    /// Build a record from raw fields, deriving the display name from `users`
    ///
    /// IMs always end up with two members and no topic or purpose.
    pub fn from_fields(fields: ChannelFields, users: &UserDirectory) -> Self {
        let kind = if fields.is_im {
            ChannelKind::Im
        } else if fields.is_mpim {
            ChannelKind::Mpim
        } else if fields.is_private {
            ChannelKind::Private
        } else {
            ChannelKind::Public
        };

        let display_name = match kind {
            ChannelKind::Public | ChannelKind::Private => format!("#{}", fields.name),
            ChannelKind::Im => {
                let user = fields.user.as_deref().unwrap_or(&fields.id);
                format!("@{}", users.name_of(user).unwrap_or(user))
            }
            ChannelKind::Mpim => mpim_display_name(&fields, users),
        };

        let is_im = kind == ChannelKind::Im;
        Self {
            id: fields.id,
            name: fields.name,
            display_name,
            kind,
            topic: if is_im { String::new() } else { fields.topic },
            purpose: if is_im { String::new() } else { fields.purpose },
            member_count: if is_im { 2 } else { fields.member_count },
            is_private: fields.is_private || is_im || kind == ChannelKind::Mpim,
            is_im,
            is_mpim: kind == ChannelKind::Mpim,
            is_archived: fields.is_archived,
            is_shared: fields.is_shared,
            is_ext_shared: fields.is_ext_shared,
            user: fields.user,
        }
    }
}

fn mpim_display_name(fields: &ChannelFields, users: &UserDirectory) -> String {
    let names: Vec<String> = if !fields.members.is_empty() {
        fields
            .members
            .iter()
            .map(|id| users.name_of(id).unwrap_or(id).to_string())
            .collect()
    } else if let Some(caps) = MPIM_NAME.captures(&fields.name) {
        caps[1].split("--").map(str::to_string).collect()
    } else {
        return format!("@{}", fields.name);
    };
    format!("@{}", names.join(", "))
}

/// Emoji record: custom emoji carry an image URL, built-in ones the glyph itself
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmojiRecord {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub is_custom: bool,
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl EmojiRecord {
    pub fn unicode(name: &str, glyph: &str) -> Self {
        Self {
            name: name.to_string(),
            value: glyph.to_string(),
            is_custom: false,
            aliases: Vec::new(),
        }
    }
}

/// Users keyed by ID, with the inverse `name -> id` index
#[derive(Debug, Clone, Default)]
pub struct UserDirectory {
    by_id: HashMap<String, UserRecord>,
    id_by_name: HashMap<String, String>,
}

impl UserDirectory {
    /// Build both indexes from one record list; later duplicates win
    pub fn from_records(records: impl IntoIterator<Item = UserRecord>) -> Self {
        let mut dir = Self::default();
        for user in records {
            dir.insert(user);
        }
        dir
    }

    /// Insert or replace a user, keeping the inverse index in sync
    pub fn insert(&mut self, user: UserRecord) {
        if let Some(old) = self.by_id.get(&user.id) {
            if old.name != user.name && self.id_by_name.get(&old.name) == Some(&old.id) {
                self.id_by_name.remove(&old.name);
            }
        }
        self.id_by_name.insert(user.name.clone(), user.id.clone());
        self.by_id.insert(user.id.clone(), user);
    }

    /// Add a user without taking over a name another loaded user already holds
    ///
    /// The record is always reachable by ID; the name index only gains an entry
    /// when the name is free or already points at this ID.
    pub fn append(&mut self, user: UserRecord) {
        let name_taken = self
            .id_by_name
            .get(&user.name)
            .is_some_and(|id| *id != user.id && self.by_id.contains_key(id));
        if name_taken {
            self.by_id.insert(user.id.clone(), user);
        } else {
            self.insert(user);
        }
    }

    pub fn get(&self, id: &str) -> Option<&UserRecord> {
        self.by_id.get(id)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&UserRecord> {
        let name = name.strip_prefix('@').unwrap_or(name);
        self.id_by_name.get(name).and_then(|id| self.by_id.get(id))
    }

    pub fn find_by_app_id(&self, app_id: &str) -> Option<&UserRecord> {
        self.by_id
            .values()
            .find(|u| u.app_id.as_deref() == Some(app_id))
    }

    pub fn name_of(&self, id: &str) -> Option<&str> {
        self.by_id.get(id).map(|u| u.name.as_str())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Unordered iteration; sort before exposing
    pub fn iter(&self) -> impl Iterator<Item = &UserRecord> {
        self.by_id.values()
    }

    pub fn to_records(&self) -> Vec<UserRecord> {
        self.by_id.values().cloned().collect()
    }
}

/// Channels keyed by ID, with the inverse `display name -> id` index
#[derive(Debug, Clone, Default)]
pub struct ChannelDirectory {
    by_id: HashMap<String, ChannelRecord>,
    id_by_name: HashMap<String, String>,
}

impl ChannelDirectory {
    pub fn from_records(records: impl IntoIterator<Item = ChannelRecord>) -> Self {
        let mut by_id = HashMap::new();
        let mut id_by_name = HashMap::new();
        for channel in records {
            by_id.insert(channel.id.clone(), channel);
        }
        for channel in by_id.values() {
            id_by_name.insert(channel.display_name.clone(), channel.id.clone());
        }
        Self { by_id, id_by_name }
    }

    pub fn get(&self, id: &str) -> Option<&ChannelRecord> {
        self.by_id.get(id)
    }

    /// Look up by `#name`, `@user` or a bare channel name
    pub fn get_by_name(&self, name: &str) -> Option<&ChannelRecord> {
        let id = self
            .id_by_name
            .get(name)
            .or_else(|| self.id_by_name.get(&format!("#{}", name)))?;
        self.by_id.get(id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChannelRecord> {
        self.by_id.values()
    }

    pub fn to_records(&self) -> Vec<ChannelRecord> {
        self.by_id.values().cloned().collect()
    }
}

/// Emoji keyed by name
#[derive(Debug, Clone, Default)]
pub struct EmojiDirectory {
    by_name: HashMap<String, EmojiRecord>,
}

impl EmojiDirectory {
    pub fn from_records(records: impl IntoIterator<Item = EmojiRecord>) -> Self {
        Self {
            by_name: records.into_iter().map(|e| (e.name.clone(), e)).collect(),
        }
    }

    /// Find by name or alias, with or without surrounding colons
    pub fn get(&self, name: &str) -> Option<&EmojiRecord> {
        let name = name.trim_matches(':');
        self.by_name
            .get(name)
            .or_else(|| self.by_name.values().find(|e| e.aliases.iter().any(|a| a == name)))
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EmojiRecord> {
        self.by_name.values()
    }

    pub fn to_records(&self) -> Vec<EmojiRecord> {
        self.by_name.values().cloned().collect()
    }
}
