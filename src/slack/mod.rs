mod client;
#[cfg(test)]
pub(crate) mod mock;
mod ratelimit;
mod service;
mod types;

pub use client::SlackDirectory;
pub use ratelimit::TokenBucket;
pub use service::DirectoryService;
pub use types::{BootstrapIm, BotInfo, Capabilities, ClientBootstrap, RemotePage};
