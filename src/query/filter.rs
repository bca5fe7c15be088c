//! Search, filter and sort stages run on full directory snapshots before paging

use crate::directory::{
    ChannelDirectory, ChannelKind, ChannelRecord, EmojiDirectory, EmojiRecord, UserDirectory,
    UserRecord,
};
use crate::query::cursor::PageOrder;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChannelSort {
    #[default]
    Id,
    Name,
    /// Member count, largest first
    Popularity,
}

impl FromStr for ChannelSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "id" => Ok(ChannelSort::Id),
            "name" => Ok(ChannelSort::Name),
            "popularity" => Ok(ChannelSort::Popularity),
            other => Err(format!("unknown channel sort: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UserFilter {
    /// Every user that is not deleted
    #[default]
    All,
    Humans,
    Bots,
    Admins,
    Guests,
    Deleted,
}

impl FromStr for UserFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "all" => Ok(UserFilter::All),
            "humans" => Ok(UserFilter::Humans),
            "bots" => Ok(UserFilter::Bots),
            "admins" => Ok(UserFilter::Admins),
            "guests" => Ok(UserFilter::Guests),
            "deleted" => Ok(UserFilter::Deleted),
            other => Err(format!("unknown user filter: {}", other)),
        }
    }
}

impl UserFilter {
    fn matches(&self, user: &UserRecord) -> bool {
        if *self == UserFilter::Deleted {
            return user.is_deleted;
        }
        if user.is_deleted {
            return false;
        }
        match self {
            UserFilter::All => true,
            UserFilter::Humans => !user.is_bot,
            UserFilter::Bots => user.is_bot,
            UserFilter::Admins => user.is_admin,
            UserFilter::Guests => user.is_restricted,
            UserFilter::Deleted => unreachable!("handled above"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UserSort {
    #[default]
    Id,
    Name,
}

impl FromStr for UserSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "id" => Ok(UserSort::Id),
            "name" => Ok(UserSort::Name),
            other => Err(format!("unknown user sort: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EmojiFilter {
    #[default]
    All,
    Custom,
    Unicode,
}

impl FromStr for EmojiFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "all" => Ok(EmojiFilter::All),
            "custom" => Ok(EmojiFilter::Custom),
            "unicode" => Ok(EmojiFilter::Unicode),
            other => Err(format!("unknown emoji filter: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChannelQuery {
    /// Case-insensitive substring of name, topic or purpose
    pub search: Option<String>,
    /// Empty means every kind
    pub kinds: Vec<ChannelKind>,
    pub min_members: Option<u64>,
    pub include_archived: bool,
    pub sort: ChannelSort,
    pub cursor: String,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct UserQuery {
    /// Case-insensitive substring of handle, names or email
    pub search: Option<String>,
    pub filter: UserFilter,
    pub sort: UserSort,
    pub cursor: String,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct EmojiQuery {
    /// Case-insensitive substring of name or aliases
    pub search: Option<String>,
    pub filter: EmojiFilter,
    pub cursor: String,
    pub limit: Option<i64>,
}

fn needle(search: &Option<String>) -> Option<String> {
    search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
}

fn contains(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

/// Matching channels in page order, plus the order `paginate` must apply
pub fn select_channels(
    dir: &ChannelDirectory,
    query: &ChannelQuery,
) -> (Vec<ChannelRecord>, PageOrder) {
    let needle = needle(&query.search);

    let mut selected: Vec<ChannelRecord> = dir
        .iter()
        .filter(|c| match &needle {
            Some(n) => {
                contains(&c.name, n)
                    || contains(&c.display_name, n)
                    || contains(&c.topic, n)
                    || contains(&c.purpose, n)
            }
            None => true,
        })
        .filter(|c| query.kinds.is_empty() || query.kinds.contains(&c.kind))
        .filter(|c| query.include_archived || !c.is_archived)
        .filter(|c| query.min_members.is_none_or(|min| c.member_count >= min))
        .cloned()
        .collect();

    let order = match query.sort {
        ChannelSort::Id => PageOrder::Default,
        ChannelSort::Name => {
            selected.sort_by(|a, b| {
                a.display_name
                    .to_lowercase()
                    .cmp(&b.display_name.to_lowercase())
                    .then_with(|| a.id.cmp(&b.id))
            });
            PageOrder::Preserve
        }
        ChannelSort::Popularity => {
            selected.sort_by(|a, b| {
                b.member_count
                    .cmp(&a.member_count)
                    .then_with(|| a.id.cmp(&b.id))
            });
            PageOrder::Preserve
        }
    };

    (selected, order)
}

pub fn select_users(dir: &UserDirectory, query: &UserQuery) -> (Vec<UserRecord>, PageOrder) {
    let needle = needle(&query.search);

    let mut selected: Vec<UserRecord> = dir
        .iter()
        .filter(|u| match &needle {
            Some(n) => {
                contains(&u.name, n)
                    || u.real_name.as_deref().is_some_and(|v| contains(v, n))
                    || u.display_name.as_deref().is_some_and(|v| contains(v, n))
                    || u.email.as_deref().is_some_and(|v| contains(v, n))
            }
            None => true,
        })
        .filter(|u| query.filter.matches(u))
        .cloned()
        .collect();

    let order = match query.sort {
        UserSort::Id => PageOrder::Default,
        UserSort::Name => {
            selected.sort_by(|a, b| {
                a.name
                    .to_lowercase()
                    .cmp(&b.name.to_lowercase())
                    .then_with(|| a.id.cmp(&b.id))
            });
            PageOrder::Preserve
        }
    };

    (selected, order)
}

pub fn select_emoji(dir: &EmojiDirectory, query: &EmojiQuery) -> (Vec<EmojiRecord>, PageOrder) {
    let needle = needle(&query.search);

    let selected = dir
        .iter()
        .filter(|e| match &needle {
            Some(n) => contains(&e.name, n) || e.aliases.iter().any(|a| contains(a, n)),
            None => true,
        })
        .filter(|e| match query.filter {
            EmojiFilter::All => true,
            EmojiFilter::Custom => e.is_custom,
            EmojiFilter::Unicode => !e.is_custom,
        })
        .cloned()
        .collect();

    (selected, PageOrder::Default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::types::tests::{channel, user};

    fn channels() -> ChannelDirectory {
        let mut archived = channel("C4", "old-launch", 50);
        archived.is_archived = true;
        let mut topical = channel("C3", "random", 8);
        topical.topic = "Deploy chatter".to_string();

        ChannelDirectory::from_records([
            channel("C1", "general", 120),
            channel("C2", "deploys", 15),
            topical,
            archived,
        ])
    }

    fn ids<T: crate::query::SortKey>(items: &[T]) -> Vec<&str> {
        items.iter().map(|i| i.sort_key()).collect()
    }

    #[test]
    fn test_search_matches_name_and_topic_case_insensitively() {
        let query = ChannelQuery {
            search: Some("DEPLOY".to_string()),
            ..Default::default()
        };
        let (mut selected, order) = select_channels(&channels(), &query);
        selected.sort_by(|a, b| a.id.cmp(&b.id));

        assert_eq!(ids(&selected), vec!["C2", "C3"]);
        assert_eq!(order, PageOrder::Default);
    }

    #[test]
    fn test_archived_excluded_unless_requested() {
        let (selected, _) = select_channels(&channels(), &ChannelQuery::default());
        assert_eq!(selected.len(), 3);

        let query = ChannelQuery {
            include_archived: true,
            ..Default::default()
        };
        let (selected, _) = select_channels(&channels(), &query);
        assert_eq!(selected.len(), 4);
    }

    #[test]
    fn test_popularity_with_threshold() {
        let query = ChannelQuery {
            min_members: Some(10),
            sort: ChannelSort::Popularity,
            include_archived: true,
            ..Default::default()
        };
        let (selected, order) = select_channels(&channels(), &query);

        assert_eq!(ids(&selected), vec!["C1", "C4", "C2"]);
        assert_eq!(order, PageOrder::Preserve);
    }

    #[test]
    fn test_kind_filter() {
        let mut private = channel("C9", "secret", 2);
        private.kind = ChannelKind::Private;
        let dir = ChannelDirectory::from_records([channel("C1", "general", 1), private]);

        let query = ChannelQuery {
            kinds: vec![ChannelKind::Private],
            ..Default::default()
        };
        let (selected, _) = select_channels(&dir, &query);
        assert_eq!(ids(&selected), vec!["C9"]);
    }

    #[test]
    fn test_user_filters() {
        let mut bot = user("U2", "ci-bot");
        bot.is_bot = true;
        let mut admin = user("U3", "root");
        admin.is_admin = true;
        let mut gone = user("U4", "former");
        gone.is_deleted = true;
        let mut guest = user("U5", "contractor");
        guest.is_restricted = true;
        let dir = UserDirectory::from_records([user("U1", "alice"), bot, admin, gone, guest]);

        let count = |filter| {
            select_users(
                &dir,
                &UserQuery {
                    filter,
                    ..Default::default()
                },
            )
            .0
            .len()
        };

        assert_eq!(count(UserFilter::All), 4);
        assert_eq!(count(UserFilter::Humans), 3);
        assert_eq!(count(UserFilter::Bots), 1);
        assert_eq!(count(UserFilter::Admins), 1);
        assert_eq!(count(UserFilter::Guests), 1);
        assert_eq!(count(UserFilter::Deleted), 1);
    }

    #[test]
    fn test_user_search_covers_real_name_and_email() {
        let mut u = user("U1", "jdoe");
        u.real_name = Some("Jane Doe".to_string());
        u.email = Some("jane@example.com".to_string());
        let dir = UserDirectory::from_records([u, user("U2", "bob")]);

        for term in ["jane", "EXAMPLE.com", "jdo"] {
            let query = UserQuery {
                search: Some(term.to_string()),
                ..Default::default()
            };
            assert_eq!(ids(&select_users(&dir, &query).0), vec!["U1"], "term {}", term);
        }
    }

    #[test]
    fn test_emoji_filter_and_alias_search() {
        let mut parrot = EmojiRecord::unicode("partyparrot", "https://e/pp.gif");
        parrot.is_custom = true;
        parrot.aliases.push("pp".to_string());
        let dir = EmojiDirectory::from_records([parrot, EmojiRecord::unicode("tada", "🎉")]);

        let custom = EmojiQuery {
            filter: EmojiFilter::Custom,
            ..Default::default()
        };
        assert_eq!(ids(&select_emoji(&dir, &custom).0), vec!["partyparrot"]);

        let by_alias = EmojiQuery {
            search: Some("PP".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&select_emoji(&dir, &by_alias).0), vec!["partyparrot"]);
    }

    #[test]
    fn test_parse_query_options() {
        assert_eq!("popularity".parse::<ChannelSort>(), Ok(ChannelSort::Popularity));
        assert_eq!("".parse::<UserFilter>(), Ok(UserFilter::All));
        assert_eq!("unicode".parse::<EmojiFilter>(), Ok(EmojiFilter::Unicode));
        assert!("loudest".parse::<ChannelSort>().is_err());
    }
}
