use crate::ContentFrame;
use crate::bridge::Bridge;
use crate::error::Result;
use crate::frame;
use crate::lifecycle::{MountId, MountScope};
use crate::params::{EmbedProps, Params, PrimingKey};
use crate::protocol::FrameMessage;
use crate::state_sync::{Snapshot, StateSync, has_posts};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedPhase {
    /// No priming response yet; nothing rendered.
    Unprimed,
    /// A fetch for the current params is outstanding and nothing is mounted.
    Priming,
    /// The priming response had no posts.
    PrimedEmpty,
    /// The frame is mounted.
    Rendered,
    /// The host tore the embed down; everything further is dropped.
    Unmounted,
}

/// Identifies one issued priming fetch. Only the latest ticket may settle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PrimingTicket(pub u64);

impl fmt::Display for PrimingTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// A fetch the caller must perform and report back through
/// [`EmbedController::on_priming_settled`].
#[derive(Debug, Clone, PartialEq)]
pub struct PrimingRequest {
    pub ticket: PrimingTicket,
    pub widget: String,
    pub params: Params,
}

struct Mount {
    scope: MountScope,
    bridge: Bridge,
}

struct PendingPriming {
    ticket: PrimingTicket,
    key: PrimingKey,
}

/// Orchestrates priming, the render decision and the frame mount.
pub struct EmbedController<F: ContentFrame> {
    frame: F,
    sync: StateSync,
    on_request_close: Box<dyn FnMut()>,
    props: Option<EmbedProps>,
    key: Option<PrimingKey>,
    pending: Option<PendingPriming>,
    mount: Option<Mount>,
    phase: EmbedPhase,
    next_ticket: u64,
    next_mount: u64,
}

impl<F: ContentFrame> EmbedController<F> {
    pub fn new<C>(frame: F, on_request_close: C) -> Self
    where
        C: FnMut() + 'static,
    {
        Self {
            frame,
            sync: StateSync::new(),
            on_request_close: Box::new(on_request_close),
            props: None,
            key: None,
            pending: None,
            mount: None,
            phase: EmbedPhase::Unprimed,
            next_ticket: 1,
            next_mount: 1,
        }
    }

    pub fn subscribe_state<S>(&mut self, subscriber: S)
    where
        S: FnMut(&Snapshot) + 'static,
    {
        self.sync.subscribe(subscriber);
    }

    pub fn phase(&self) -> EmbedPhase {
        self.phase
    }

    pub fn is_rendered(&self) -> bool {
        self.phase == EmbedPhase::Rendered
    }

    pub fn is_priming(&self) -> bool {
        self.pending.is_some()
    }

    pub fn mount_id(&self) -> Option<MountId> {
        self.mount.as_ref().map(|mount| mount.scope.id())
    }

    pub fn snapshot(&self) -> &Snapshot {
        self.sync.current()
    }

    /// Applies new props. Returns a priming request only when the widget or
    /// the params changed by value.
    pub fn set_props(&mut self, props: EmbedProps) -> Result<Option<PrimingRequest>> {
        props.validate()?;

        if self.phase == EmbedPhase::Unmounted {
            tracing::debug!("ignoring props after teardown");
            return Ok(None);
        }

        let key = props.priming_key();
        self.props = Some(props);

        if self.key.as_ref() == Some(&key) {
            return Ok(None);
        }

        let ticket = PrimingTicket(self.next_ticket);
        self.next_ticket += 1;

        if let Some(superseded) = self.pending.replace(PendingPriming {
            ticket,
            key: key.clone(),
        }) {
            tracing::debug!(
                superseded = %superseded.ticket,
                %ticket,
                "params changed while priming; superseding outstanding fetch"
            );
        }

        if self.mount.is_none() {
            self.phase = EmbedPhase::Priming;
        }

        tracing::info!(%ticket, widget = %key.widget, "issuing priming fetch");
        let request = PrimingRequest {
            ticket,
            widget: key.widget.clone(),
            params: key.params.clone(),
        };
        self.key = Some(key);
        Ok(Some(request))
    }

    pub fn on_priming_settled(&mut self, ticket: PrimingTicket, result: Result<Snapshot>) {
        if self.phase == EmbedPhase::Unmounted {
            tracing::debug!(%ticket, "dropping priming response after teardown");
            return;
        }

        let Some(pending) = self.pending.take_if(|pending| pending.ticket == ticket) else {
            tracing::warn!(%ticket, "discarding stale priming response");
            return;
        };

        let snapshot = match result {
            Ok(snapshot) => snapshot,
            Err(err) => {
                tracing::error!(
                    %ticket,
                    widget = %pending.key.widget,
                    error = %err,
                    "priming fetch failed; embed stays hidden"
                );
                if self.mount.is_none() {
                    self.phase = EmbedPhase::Unprimed;
                }
                return;
            }
        };

        if !has_posts(&snapshot) {
            tracing::info!(%ticket, "priming response has no posts; not rendering");
            self.unmount_frame();
            self.phase = EmbedPhase::PrimedEmpty;
            self.sync.replace(snapshot);
            return;
        }

        // Subscribers only see a rendering snapshot once the frame is up.
        match self.mount_frame(pending.key) {
            Ok(()) => self.sync.replace(snapshot),
            Err(err) => {
                tracing::error!(%ticket, error = %err, "failed to mount frame");
                self.unmount_frame();
                self.phase = EmbedPhase::Unprimed;
            }
        }
    }

    /// Frame load event: sends exactly one handshake to that mount.
    pub fn on_frame_load(&mut self, mount_id: MountId) {
        let Some(mount) = live_mount(&self.mount, mount_id) else {
            tracing::debug!(mount = %mount_id, "ignoring load event for inactive mount");
            return;
        };

        match mount.bridge.send_init(&mut self.frame) {
            Ok(()) => tracing::debug!(mount = %mount_id, "sent init handshake"),
            Err(err) => tracing::warn!(mount = %mount_id, error = %err, "failed to send init handshake"),
        }
    }

    pub fn on_frame_message(&mut self, mount_id: MountId, data: &str) {
        let Some(mount) = live_mount(&self.mount, mount_id) else {
            tracing::debug!(mount = %mount_id, "dropping message for inactive mount");
            return;
        };

        let Some(message) = mount.bridge.receive(data) else {
            return;
        };

        if message.is_close_request() {
            tracing::info!(mount = %mount_id, "frame requested close");
            (self.on_request_close)();
            return;
        }

        match message {
            FrameMessage::Request(other) => {
                tracing::debug!(mount = %mount_id, request = %other, "ignoring unknown request");
            }
            FrameMessage::State(snapshot) => self.sync.replace(snapshot),
            FrameMessage::PatchState(partial) => self.sync.patch(partial),
        }
    }

    /// Host teardown. Revokes the live mount; no message is sent to the frame.
    pub fn unmount(&mut self) {
        if self.phase == EmbedPhase::Unmounted {
            return;
        }
        self.pending = None;
        self.unmount_frame();
        self.phase = EmbedPhase::Unmounted;
        tracing::info!("embed torn down");
    }

    fn mount_frame(&mut self, key: PrimingKey) -> Result<()> {
        self.unmount_frame();

        let style = self.props.as_ref().and_then(|props| props.style.as_ref());
        let source = frame::build_frame_source(&key.widget, &key.params, style)?;

        let id = MountId(self.next_mount);
        self.next_mount += 1;
        let scope = MountScope::new(id);
        let bridge = Bridge::new(scope.guard(), key.params);

        self.frame.mount(id, &source)?;
        self.mount = Some(Mount { scope, bridge });
        self.phase = EmbedPhase::Rendered;
        tracing::info!(mount = %id, uri = %source.uri, "frame mounted");
        Ok(())
    }

    fn unmount_frame(&mut self) {
        if let Some(mount) = self.mount.take() {
            let id = mount.scope.id();
            mount.scope.revoke();
            self.frame.unmount(id);
            tracing::debug!(mount = %id, "frame unmounted");
        }
    }
}

fn live_mount(mount: &Option<Mount>, mount_id: MountId) -> Option<&Mount> {
    mount
        .as_ref()
        .filter(|mount| mount.scope.id() == mount_id && mount.bridge.is_live())
}
