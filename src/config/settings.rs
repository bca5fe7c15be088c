use crate::directory::ChannelKind;
use crate::error::{DirectoryError, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Settings {
    pub slack: SlackConfig,
    pub cache: CacheConfig,
    pub rate_limit: RateLimitConfig,
    pub options: DirectoryOptions,
    pub paging: PagingConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingConfig {
    /// `LOG_FORMAT=json` switches to JSON lines
    pub json: bool,
}

#[derive(Debug, Clone)]
pub struct SlackConfig {
    pub token: String,
}

impl SlackConfig {
    /// User and browser-session tokens can call the edge `client.*` methods; bot tokens cannot
    pub fn supports_edge_api(&self) -> bool {
        self.token.starts_with("xoxp-") || self.token.starts_with("xoxc-")
    }
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub users_path: PathBuf,
    pub channels_path: PathBuf,
    pub emoji_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub requests_per_second: f64,
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        // Slack tier 2: ~20 requests per minute
        Self {
            requests_per_second: 0.33,
            burst: 3,
        }
    }
}

/// Feature toggles resolved once at startup and handed to each component
#[derive(Debug, Clone)]
pub struct DirectoryOptions {
    pub include_slack_connect: bool,
    pub load_emoji: bool,
    pub channel_kinds: Vec<ChannelKind>,
    pub refresh_timeout: Duration,
}

impl Default for DirectoryOptions {
    fn default() -> Self {
        Self {
            include_slack_connect: true,
            load_emoji: true,
            channel_kinds: ChannelKind::ALL.to_vec(),
            refresh_timeout: Duration::from_secs(600),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PagingConfig {
    pub default_page_size: usize,
    pub max_page_size: usize,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            default_page_size: 100,
            max_page_size: 1000,
        }
    }
}

pub fn load_settings() -> Result<Settings> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    Settings::from_lookup(|key| std::env::var(key).ok())
}

impl Settings {
    /// Build settings from an arbitrary key lookup (the process environment in production)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let slack = SlackConfig {
            token: lookup("SLACK_BOT_TOKEN")
                .filter(|t| !t.is_empty())
                .ok_or_else(|| DirectoryError::Config("SLACK_BOT_TOKEN not set".to_string()))?,
        };

        let cache_dir: PathBuf = lookup("SLACK_DIRECTORY_CACHE_DIR")
            .unwrap_or_else(|| {
                let home = lookup("HOME").unwrap_or_else(|| ".".to_string());
                format!("{}/.slack_directory", home)
            })
            .into();

        let cache = CacheConfig {
            users_path: lookup("SLACK_DIRECTORY_USERS_CACHE")
                .map(PathBuf::from)
                .unwrap_or_else(|| cache_dir.join("users_cache.json")),
            channels_path: lookup("SLACK_DIRECTORY_CHANNELS_CACHE")
                .map(PathBuf::from)
                .unwrap_or_else(|| cache_dir.join("channels_cache_v2.json")),
            emoji_path: lookup("SLACK_DIRECTORY_EMOJI_CACHE")
                .map(PathBuf::from)
                .unwrap_or_else(|| cache_dir.join("emoji_cache.json")),
        };

        let defaults = RateLimitConfig::default();
        let rate_limit = RateLimitConfig {
            requests_per_second: parse_or(
                &lookup,
                "SLACK_DIRECTORY_RATE_PER_SEC",
                defaults.requests_per_second,
            )?,
            burst: parse_or(&lookup, "SLACK_DIRECTORY_RATE_BURST", defaults.burst)?,
        };
        if rate_limit.requests_per_second <= 0.0 || rate_limit.burst == 0 {
            return Err(DirectoryError::Config(
                "Rate limit must allow at least one request".to_string(),
            ));
        }

        let channel_kinds = match lookup("SLACK_DIRECTORY_CHANNEL_TYPES") {
            Some(raw) => parse_channel_kinds(&raw)?,
            None => ChannelKind::ALL.to_vec(),
        };

        let options = DirectoryOptions {
            include_slack_connect: parse_or(&lookup, "SLACK_DIRECTORY_SLACK_CONNECT", true)?,
            load_emoji: parse_or(&lookup, "SLACK_DIRECTORY_EMOJI", true)?,
            channel_kinds,
            refresh_timeout: Duration::from_secs(parse_or(
                &lookup,
                "SLACK_DIRECTORY_REFRESH_TIMEOUT_SECS",
                600u64,
            )?),
        };

        let logging = LoggingConfig {
            json: lookup("LOG_FORMAT").is_some_and(|f| f.trim().eq_ignore_ascii_case("json")),
        };

        Ok(Settings {
            slack,
            cache,
            rate_limit,
            options,
            paging: PagingConfig::default(),
            logging,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| DirectoryError::Config(format!("Invalid {}", key))),
        None => Ok(default),
    }
}

fn parse_channel_kinds(raw: &str) -> Result<Vec<ChannelKind>> {
    let kinds = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<ChannelKind>()
                .map_err(|_| DirectoryError::Config(format!("Unknown channel type: {}", s)))
        })
        .collect::<Result<Vec<_>>>()?;

    if kinds.is_empty() {
        return Err(DirectoryError::Config(
            "SLACK_DIRECTORY_CHANNEL_TYPES is empty".to_string(),
        ));
    }
    Ok(kinds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_fall_back_to_home_cache_dir() {
        let settings =
            Settings::from_lookup(lookup_from(&[("SLACK_BOT_TOKEN", "xoxb-1"), ("HOME", "/h")]))
                .unwrap();

        assert_eq!(
            settings.cache.users_path,
            PathBuf::from("/h/.slack_directory/users_cache.json")
        );
        assert_eq!(
            settings.cache.channels_path,
            PathBuf::from("/h/.slack_directory/channels_cache_v2.json")
        );
        assert_eq!(settings.options.channel_kinds.len(), 4);
        assert!(settings.options.load_emoji);
        assert!(!settings.slack.supports_edge_api());
        assert_eq!(settings.paging.max_page_size, 1000);
        assert!(!settings.logging.json);
    }

    #[test]
    fn test_log_format_read_with_settings() {
        let settings = Settings::from_lookup(lookup_from(&[
            ("SLACK_BOT_TOKEN", "xoxb-1"),
            ("LOG_FORMAT", "JSON"),
        ]))
        .unwrap();
        assert!(settings.logging.json);

        let settings = Settings::from_lookup(lookup_from(&[
            ("SLACK_BOT_TOKEN", "xoxb-1"),
            ("LOG_FORMAT", "pretty"),
        ]))
        .unwrap();
        assert!(!settings.logging.json);
    }

    #[test]
    fn test_explicit_paths_and_flags() {
        let settings = Settings::from_lookup(lookup_from(&[
            ("SLACK_BOT_TOKEN", "xoxp-1"),
            ("SLACK_DIRECTORY_USERS_CACHE", "/tmp/u.json"),
            ("SLACK_DIRECTORY_CHANNEL_TYPES", "public_channel, im"),
            ("SLACK_DIRECTORY_EMOJI", "false"),
        ]))
        .unwrap();

        assert_eq!(settings.cache.users_path, PathBuf::from("/tmp/u.json"));
        assert_eq!(
            settings.options.channel_kinds,
            vec![ChannelKind::Public, ChannelKind::Im]
        );
        assert!(!settings.options.load_emoji);
        assert!(settings.slack.supports_edge_api());
    }

    #[test]
    fn test_missing_token_is_config_error() {
        let err = Settings::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, DirectoryError::Config(_)));
    }

    #[test]
    fn test_unknown_channel_type_rejected() {
        let err = Settings::from_lookup(lookup_from(&[
            ("SLACK_BOT_TOKEN", "xoxb-1"),
            ("SLACK_DIRECTORY_CHANNEL_TYPES", "public_channel,group"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("group"));
    }
}
