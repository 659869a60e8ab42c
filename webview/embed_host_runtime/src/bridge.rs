use crate::ContentFrame;
use crate::error::Result;
use crate::lifecycle::LifecycleGuard;
use crate::params::Params;
use crate::protocol::{self, FrameMessage, HostMessage};

/// Typed messaging with one mounted frame.
#[derive(Debug, Clone)]
pub struct Bridge {
    guard: LifecycleGuard,
    params: Params,
}

impl Bridge {
    pub fn new(guard: LifecycleGuard, params: Params) -> Self {
        Self { guard, params }
    }

    pub fn is_live(&self) -> bool {
        self.guard.is_live()
    }

    pub fn send<F: ContentFrame>(&self, frame: &mut F, message: &HostMessage) -> Result<()> {
        let script = protocol::post_message_script(message)?;
        frame.inject_script(self.guard.id(), &script)
    }

    /// Sends the handshake carrying the params this mount was primed with.
    pub fn send_init<F: ContentFrame>(&self, frame: &mut F) -> Result<()> {
        self.send(frame, &protocol::init_message(self.params.clone()))
    }

    /// Decodes an inbound payload, or `None` once the mount is revoked.
    pub fn receive(&self, raw: &str) -> Option<FrameMessage> {
        if !self.guard.is_live() {
            tracing::debug!(mount = %self.guard.id(), "dropping frame message after teardown");
            return None;
        }
        protocol::decode_frame_message(raw)
    }
}
