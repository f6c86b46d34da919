//! Requests other threads queue for the tick thread.

use crossbeam_channel::Sender;
use thiserror::Error;

/// Work that must run on the tick thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AdminRequest {
    /// Re-reads the configuration and every definition.
    Reload,
    /// Stops the running campaign.
    StopCampaign,
}

/// Raised when the engine behind a handle no longer exists.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("the engine has shut down")]
pub struct EngineGone;

/// Cloneable handle that queues [`AdminRequest`]s for the next tick.
#[derive(Clone, Debug)]
pub struct AdminHandle {
    sender: Sender<AdminRequest>,
}

impl AdminHandle {
    pub(crate) const fn new(sender: Sender<AdminRequest>) -> Self {
        Self { sender }
    }

    /// Queues a reload for the start of the next tick.
    pub fn request_reload(&self) -> Result<(), EngineGone> {
        self.send(AdminRequest::Reload)
    }

    /// Queues a campaign stop for the start of the next tick.
    pub fn request_stop(&self) -> Result<(), EngineGone> {
        self.send(AdminRequest::StopCampaign)
    }

    fn send(&self, request: AdminRequest) -> Result<(), EngineGone> {
        self.sender.send(request).map_err(|_| EngineGone)?;
        tracing::debug!(?request, "admin request queued");
        Ok(())
    }
}
