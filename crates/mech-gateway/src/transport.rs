//! Controller transport (spec.md §6): the Socket.IO channel between the
//! controller and the Overseer is named an external collaborator
//! (spec.md §1) and is represented here only as the interface contract
//! spec.md §6 describes — `send`, `try_recv`, `is_closed` — with no
//! network implementation. Two in-process implementations are provided:
//! a no-op sink for single-shot CLI runs, and a channel-backed transport
//! a future network layer could sit behind without touching `mech-core`.

use mech_core::StreamingEvent;
use tokio::sync::mpsc;

/// Inbound commands the controller can send (spec.md §6: `command:run`,
/// `process:command`, `process:terminate`).
#[derive(Debug, Clone)]
pub enum Inbound {
    Run { message: String },
    Command { name: String, payload: serde_json::Value },
    Terminate,
}

/// Everything the MECH driver needs from its transport: relay outbound
/// events, poll for inbound commands, and observe whether the channel has
/// closed (spec.md §5 "transport close terminates the loop at the next
/// iteration").
pub trait ControllerTransport: Send + Sync {
    fn send(&self, event: StreamingEvent);
    fn try_recv(&self) -> Option<Inbound>;
    fn is_closed(&self) -> bool;
}

/// Discards every outbound event and never yields an inbound command or a
/// closed signal — the transport a bare CLI `run` invocation uses, since
/// there is no controller on the other end.
pub struct NoopTransport;

impl ControllerTransport for NoopTransport {
    fn send(&self, _event: StreamingEvent) {}
    fn try_recv(&self) -> Option<Inbound> {
        None
    }
    fn is_closed(&self) -> bool {
        false
    }
}

/// A channel-backed transport: outbound events go out over an mpsc
/// sender, inbound commands arrive over an mpsc receiver. `is_closed`
/// reports true once the outbound receiver has been dropped.
pub struct ChannelTransport {
    outbound: mpsc::UnboundedSender<StreamingEvent>,
    inbound: parking_lot::Mutex<mpsc::UnboundedReceiver<Inbound>>,
}

impl ChannelTransport {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<StreamingEvent>, mpsc::UnboundedSender<Inbound>) {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        (Self { outbound: out_tx, inbound: parking_lot::Mutex::new(in_rx) }, out_rx, in_tx)
    }
}

impl ControllerTransport for ChannelTransport {
    fn send(&self, event: StreamingEvent) {
        let _ = self.outbound.send(event);
    }

    fn try_recv(&self) -> Option<Inbound> {
        self.inbound.lock().try_recv().ok()
    }

    fn is_closed(&self) -> bool {
        self.outbound.is_closed()
    }
}
