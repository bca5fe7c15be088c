//! One-way readiness flags for each cached entity type

use crate::directory::types::EntityKind;
use crate::error::{DirectoryError, Result};
use std::sync::atomic::{AtomicBool, Ordering};

/// `NotReady -> Ready` per entity; there is no way back
#[derive(Debug, Default)]
pub struct ReadinessGate {
    users: AtomicBool,
    channels: AtomicBool,
    emoji: AtomicBool,
}

impl ReadinessGate {
    pub fn new() -> Self {
        Self::default()
    }

    fn flag(&self, kind: EntityKind) -> &AtomicBool {
        match kind {
            EntityKind::Users => &self.users,
            EntityKind::Channels => &self.channels,
            EntityKind::Emoji => &self.emoji,
        }
    }

    pub fn mark_ready(&self, kind: EntityKind) {
        if !self.flag(kind).swap(true, Ordering::AcqRel) {
            tracing::info!(entity = %kind, "Directory ready");
        }
    }

    pub fn is_ready(&self, kind: EntityKind) -> bool {
        self.flag(kind).load(Ordering::Acquire)
    }

    /// Fail with `NotReady(kind)` unless `kind` is ready
    pub fn check(&self, kind: EntityKind) -> Result<()> {
        if self.is_ready(kind) {
            Ok(())
        } else {
            Err(DirectoryError::NotReady(kind))
        }
    }

    /// Gate for operations that need both users and channels; reports users first
    pub fn check_users_and_channels(&self) -> Result<()> {
        self.check(EntityKind::Users)?;
        self.check(EntityKind::Channels)
    }
}
