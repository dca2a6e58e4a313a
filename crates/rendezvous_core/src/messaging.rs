//! Party-to-party chat channel seam.
//!
//! Channel creation is a side effect of submitting a request and of
//! beginning a handoff; it never blocks the lifecycle transition it rides
//! on, so failures are logged and swallowed here.

use std::fmt;
use std::sync::Arc;

use bevy_ecs::prelude::Resource;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelId(pub String);

#[derive(Debug)]
pub struct ChannelError(pub String);

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Messaging backend as the engine sees it.
pub trait ChannelProvider: Send + Sync {
    fn get_or_create_channel(
        &self,
        party_a: &str,
        party_b: &str,
        context_id: &str,
        context_status: &str,
    ) -> Result<ChannelId, ChannelError>;
}

/// ECS resource wrapping a shared channel provider handle.
#[derive(Resource)]
pub struct ChannelProviderResource(pub Arc<dyn ChannelProvider>);

/// Default provider for sessions without a messaging backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopChannelProvider;

impl ChannelProvider for NoopChannelProvider {
    fn get_or_create_channel(
        &self,
        party_a: &str,
        party_b: &str,
        context_id: &str,
        _context_status: &str,
    ) -> Result<ChannelId, ChannelError> {
        Ok(ChannelId(format!("noop:{party_a}:{party_b}:{context_id}")))
    }
}

/// Fire the channel side effect without letting a failure escape.
pub fn open_channel(
    provider: &dyn ChannelProvider,
    party_a: &str,
    party_b: &str,
    context_id: &str,
    context_status: &str,
) {
    if let Err(err) =
        provider.get_or_create_channel(party_a, party_b, context_id, context_status)
    {
        tracing::warn!(%err, context_id, "channel creation failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RefusingProvider;

    impl ChannelProvider for RefusingProvider {
        fn get_or_create_channel(
            &self,
            _party_a: &str,
            _party_b: &str,
            _context_id: &str,
            _context_status: &str,
        ) -> Result<ChannelId, ChannelError> {
            Err(ChannelError("backend offline".to_string()))
        }
    }

    #[test]
    fn noop_provider_builds_a_deterministic_channel_id() {
        let id = NoopChannelProvider
            .get_or_create_channel("renter-1", "owner-1", "rental-1", "REQUESTED")
            .expect("channel");
        assert_eq!(id, ChannelId("noop:renter-1:owner-1:rental-1".to_string()));
    }

    #[test]
    fn open_channel_swallows_failures() {
        // Must not panic or propagate.
        open_channel(&RefusingProvider, "a", "b", "rental-1", "REQUESTED");
    }
}
