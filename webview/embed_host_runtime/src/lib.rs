//! Host-side runtime for embedding a remote AnnounceKit widget in an isolated
//! content frame.
//!
//! The runtime primes widget data over HTTP, decides whether the frame is
//! rendered at all, and keeps a host-side snapshot of widget state in sync
//! with the messages the frame posts back. Rendering web content is left to a
//! [`ContentFrame`] adapter; [`shell`] provides one that talks to a native
//! webview shell over stdio.

pub mod bridge;
pub mod config;
pub mod controller;
pub mod error;
pub mod frame;
pub mod lifecycle;
pub mod logging;
pub mod params;
pub mod priming;
pub mod protocol;
pub mod shell;
pub mod state_sync;

use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender};
use std::thread;

pub use crate::controller::{EmbedController, EmbedPhase, PrimingRequest, PrimingTicket};
pub use crate::error::{EmbedError, Result};
pub use crate::frame::{BOOTSTRAP_SCRIPT, FrameOptions, FrameSource};
pub use crate::lifecycle::{LifecycleGuard, MountId, MountScope};
pub use crate::params::{EmbedProps, Identity, IdentityId, Params};
pub use crate::priming::{HttpPrimingClient, PrimingClient};
pub use crate::protocol::{FrameMessage, HostMessage};
pub use crate::state_sync::{Snapshot, StateSync};
pub use serde_json;

/// Rendering surface that can display web content, run injected script in
/// it, and report what the document posts back.
///
/// Load and message events are reported by the adapter's owner as
/// [`EmbedEvent::FrameLoaded`] and [`EmbedEvent::FrameMessage`], tagged with
/// the mount they came from.
pub trait ContentFrame {
    fn mount(&mut self, mount: MountId, source: &FrameSource) -> Result<()>;

    fn inject_script(&mut self, mount: MountId, script: &str) -> Result<()>;

    fn unmount(&mut self, mount: MountId);
}

/// Everything the embed reacts to, in the order the host observed it.
#[derive(Debug)]
pub enum EmbedEvent {
    Props(EmbedProps),
    PrimingSettled {
        ticket: PrimingTicket,
        result: Result<Snapshot>,
    },
    FrameLoaded {
        mount: MountId,
    },
    FrameMessage {
        mount: MountId,
        data: String,
    },
    Unmount,
}

/// Drives `controller` until an [`EmbedEvent::Unmount`] arrives or every
/// sender is gone. Priming fetches run on worker threads and settle back
/// through `tx`.
pub fn run_event_loop<F, P>(
    controller: &mut EmbedController<F>,
    client: Arc<P>,
    tx: Sender<EmbedEvent>,
    rx: Receiver<EmbedEvent>,
) where
    F: ContentFrame,
    P: PrimingClient + 'static,
{
    for event in rx {
        if !dispatch_event(controller, &client, &tx, event) {
            break;
        }
    }
}

fn dispatch_event<F, P>(
    controller: &mut EmbedController<F>,
    client: &Arc<P>,
    tx: &Sender<EmbedEvent>,
    event: EmbedEvent,
) -> bool
where
    F: ContentFrame,
    P: PrimingClient + 'static,
{
    match event {
        EmbedEvent::Props(props) => match controller.set_props(props) {
            Ok(Some(request)) => spawn_priming(client.clone(), tx.clone(), request),
            Ok(None) => {}
            Err(err) => tracing::warn!(error = %err, "rejecting embed props"),
        },
        EmbedEvent::PrimingSettled { ticket, result } => {
            controller.on_priming_settled(ticket, result);
        }
        EmbedEvent::FrameLoaded { mount } => controller.on_frame_load(mount),
        EmbedEvent::FrameMessage { mount, data } => controller.on_frame_message(mount, &data),
        EmbedEvent::Unmount => {
            controller.unmount();
            return false;
        }
    }

    true
}

fn spawn_priming<P>(client: Arc<P>, tx: Sender<EmbedEvent>, request: PrimingRequest)
where
    P: PrimingClient + 'static,
{
    thread::spawn(move || {
        let result = client.fetch(&request.widget, &request.params);
        if tx
            .send(EmbedEvent::PrimingSettled {
                ticket: request.ticket,
                result,
            })
            .is_err()
        {
            tracing::debug!(ticket = %request.ticket, "event loop gone before priming settled");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::mpsc;

    struct FixedPriming(serde_json::Value);

    impl PrimingClient for FixedPriming {
        fn fetch(&self, _widget: &str, _params: &Params) -> Result<Snapshot> {
            match &self.0 {
                serde_json::Value::Object(map) => Ok(map.clone()),
                _ => Err(EmbedError::Priming("not an object".to_string())),
            }
        }
    }

    /// Answers every mount with a load event and one state message, the way
    /// a webview would.
    struct EchoFrame {
        tx: Sender<EmbedEvent>,
        injected: Rc<RefCell<Vec<String>>>,
    }

    impl ContentFrame for EchoFrame {
        fn mount(&mut self, mount: MountId, _source: &FrameSource) -> Result<()> {
            self.tx
                .send(EmbedEvent::FrameLoaded { mount })
                .map_err(|err| EmbedError::Frame(err.to_string()))?;
            self.tx
                .send(EmbedEvent::FrameMessage {
                    mount,
                    data: r#"{"event":"L2R_PATCH_STATE","payload":{"unread":5}}"#.to_string(),
                })
                .map_err(|err| EmbedError::Frame(err.to_string()))?;
            self.tx
                .send(EmbedEvent::Unmount)
                .map_err(|err| EmbedError::Frame(err.to_string()))
        }

        fn inject_script(&mut self, _mount: MountId, script: &str) -> Result<()> {
            self.injected.borrow_mut().push(script.to_string());
            Ok(())
        }

        fn unmount(&mut self, _mount: MountId) {}
    }

    #[test]
    fn event_loop_primes_mounts_and_syncs() {
        let (tx, rx) = mpsc::channel();
        let injected = Rc::new(RefCell::new(Vec::new()));
        let frame = EchoFrame {
            tx: tx.clone(),
            injected: injected.clone(),
        };
        let mut controller = EmbedController::new(frame, || {});
        let client = Arc::new(FixedPriming(json!({"posts": [], "unread": 0})));

        tx.send(EmbedEvent::Props(EmbedProps::new("https://w")))
            .expect("queue props");
        run_event_loop(&mut controller, client, tx, rx);

        assert_eq!(controller.phase(), EmbedPhase::Unmounted);
        assert_eq!(controller.snapshot()["unread"], 5);
        assert_eq!(injected.borrow().len(), 1);
    }

    #[test]
    fn invalid_props_do_not_stop_the_loop() {
        let (tx, rx) = mpsc::channel();
        let injected = Rc::new(RefCell::new(Vec::new()));
        let frame = EchoFrame {
            tx: tx.clone(),
            injected,
        };
        let mut controller = EmbedController::new(frame, || {});
        let client = Arc::new(FixedPriming(json!({})));

        tx.send(EmbedEvent::Props(EmbedProps::new(""))).expect("queue props");
        tx.send(EmbedEvent::Unmount).expect("queue unmount");
        run_event_loop(&mut controller, client, tx, rx);

        assert_eq!(controller.phase(), EmbedPhase::Unmounted);
    }
}
