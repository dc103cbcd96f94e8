//! Unified error handling for queuewarden.
//!
//! This module provides the error hierarchy for the coordination engine,
//! with automatic conversions and metric labeling.

use queuewarden_proto::{ChannelId, ItemId, MemberId, ProtoError, ScopeId};
use thiserror::Error;

// ============================================================================
// Platform Errors (upstream collaborator)
// ============================================================================

/// Failures reported by the upstream platform.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    #[error("item {item} not found in channel {channel}")]
    ItemNotFound { channel: ChannelId, item: ItemId },

    #[error("channel {0} not found")]
    ChannelNotFound(ChannelId),

    #[error("member {0} not found")]
    MemberNotFound(MemberId),

    #[error("scope {0} not found")]
    ScopeNotFound(ScopeId),

    #[error("access to channel {0} is forbidden")]
    Forbidden(ChannelId),

    #[error("platform unavailable: {0}")]
    Unavailable(String),
}

impl PlatformError {
    /// Not-found and forbidden lookups mean the reference is stale; the caller
    /// drops it and carries on.
    #[inline]
    pub fn is_stale(&self) -> bool {
        !matches!(self, Self::Unavailable(_))
    }
}

// ============================================================================
// Engine Errors
// ============================================================================

/// Errors surfaced by reconciliation and dispatch.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("platform error: {0}")]
    Platform(#[from] PlatformError),

    /// An annotation outside the fixed spectrum reached the engine.
    #[error(transparent)]
    UnknownAnnotation(#[from] ProtoError),
}

impl QueueError {
    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Platform(PlatformError::ItemNotFound { .. }) => "item_not_found",
            Self::Platform(PlatformError::ChannelNotFound(_)) => "channel_not_found",
            Self::Platform(PlatformError::MemberNotFound(_)) => "member_not_found",
            Self::Platform(PlatformError::ScopeNotFound(_)) => "scope_not_found",
            Self::Platform(PlatformError::Forbidden(_)) => "forbidden",
            Self::Platform(PlatformError::Unavailable(_)) => "platform_unavailable",
            Self::UnknownAnnotation(_) => "unknown_annotation",
        }
    }

    /// Whether this error only means a reference went stale.
    #[inline]
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Platform(e) if e.is_stale())
    }
}

/// Result type for engine operations.
pub type QueueResult<T> = Result<T, QueueError>;
