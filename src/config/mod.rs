mod settings;

pub use settings::{
    CacheConfig, DirectoryOptions, LoggingConfig, PagingConfig, RateLimitConfig, Settings, SlackConfig,
    load_settings,
};
