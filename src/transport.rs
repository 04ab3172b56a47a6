//! The one persistent connection to the game server.
//!
//! All callbacks (socket events, the tick, DOM input) run on the page's
//! single thread and never interleave mid-call, so `on_message` applies a
//! whole frame to the shared state before the scheduler can observe it.

use std::cell::{Cell, RefCell};

use tracing::{debug, info, warn};

use crate::error::ClientError;
use crate::protocol::{decode_frame, InboundMessage, OutboundRequest, PlayerId};
use crate::state::GameContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

/// Raw text-frame sink. In the browser this is a `WebSocket`.
pub trait Socket {
    fn send_text(&self, frame: &str) -> Result<(), ClientError>;
}

/// Where the input router hands finished requests.
pub trait RequestSink {
    fn send(&self, request: OutboundRequest);
}

type ChatHandler = Box<dyn FnMut(PlayerId, &str)>;
type LifecycleHandler = Box<dyn FnMut()>;

#[derive(Default)]
struct Handlers {
    chat: Option<ChatHandler>,
    connect: Option<LifecycleHandler>,
    disconnect: Option<LifecycleHandler>,
}

pub struct TransportChannel<S: Socket> {
    socket: S,
    state: Cell<ConnectionState>,
    context: GameContext,
    handlers: RefCell<Handlers>,
    greeting: Option<String>,
}

impl<S: Socket> TransportChannel<S> {
    /// Wraps a socket that has been created but not yet opened.
    pub fn open(socket: S, context: GameContext) -> Self {
        TransportChannel {
            socket,
            state: Cell::new(ConnectionState::Connecting),
            context,
            handlers: RefCell::new(Handlers::default()),
            greeting: None,
        }
    }

    pub fn with_greeting(mut self, greeting: Option<String>) -> Self {
        self.greeting = greeting;
        self
    }

    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    pub fn socket(&self) -> &S {
        &self.socket
    }

    pub fn on_chat(&self, handler: impl FnMut(PlayerId, &str) + 'static) {
        self.handlers.borrow_mut().chat = Some(Box::new(handler));
    }

    pub fn on_connect(&self, handler: impl FnMut() + 'static) {
        self.handlers.borrow_mut().connect = Some(Box::new(handler));
    }

    pub fn on_disconnect(&self, handler: impl FnMut() + 'static) {
        self.handlers.borrow_mut().disconnect = Some(Box::new(handler));
    }

    pub fn handle_open(&self) {
        if self.state.get() == ConnectionState::Closed {
            return;
        }
        self.state.set(ConnectionState::Open);
        info!("CONNECT");

        if let Some(greeting) = &self.greeting {
            self.transmit(greeting);
        }
        if let Some(handler) = self.handlers.borrow_mut().connect.as_mut() {
            handler();
        }
    }

    pub fn handle_close(&self) {
        if self.state.replace(ConnectionState::Closed) == ConnectionState::Closed {
            return;
        }
        info!("DISCONNECT");
        if let Some(handler) = self.handlers.borrow_mut().disconnect.as_mut() {
            handler();
        }
    }

    /// Serializes and transmits; anything but an open connection drops the
    /// request without telling the caller.
    pub fn send(&self, request: OutboundRequest) {
        if self.state.get() != ConnectionState::Open {
            debug!(kind = request.kind(), state = ?self.state.get(), "dropping request, socket not open");
            return;
        }
        match request.to_frame() {
            Ok(frame) => self.transmit(&frame),
            Err(e) => warn!("{}", e),
        }
    }

    fn transmit(&self, frame: &str) {
        if let Err(e) = self.socket.send_text(frame) {
            warn!("send failed: {}", e);
        }
    }

    /// Decodes one inbound frame and applies it. Undecodable frames are
    /// dropped and never reach the shared state.
    pub fn on_message(&self, raw: &str) {
        debug!("MESSAGE: {}", raw);
        let message = match decode_frame(raw) {
            Ok(message) => message,
            Err(e) => {
                debug!("dropping frame: {}", e);
                return;
            }
        };

        match message {
            InboundMessage::Chat(line) => {
                if let Some(handler) = self.handlers.borrow_mut().chat.as_mut() {
                    handler(line.id, &line.msg);
                }
            }
            InboundMessage::StateUpdate(update) => {
                self.context.borrow_mut().apply_update(update);
            }
            InboundMessage::TowerAck(ack) => {
                let mut state = self.context.borrow_mut();
                if let Some(cell) = ack.deleted_cell() {
                    state.remove_tower_at(cell);
                } else if ack.tower_accepted {
                    match ack.tower {
                        Some(tower) => state.record_tower(tower),
                        None => debug!("tower accepted without a tower snapshot"),
                    }
                } else {
                    info!(reason = ack.reason.as_deref().unwrap_or("unspecified"), "tower request rejected");
                }
            }
            InboundMessage::CreepAck(ack) => {
                if ack.accepted {
                    debug!(creep = ?ack.creep_id, "creep request accepted");
                } else {
                    info!(reason = ack.reason.as_deref().unwrap_or("unspecified"), "creep request rejected");
                }
            }
        }
    }
}

impl<S: Socket> RequestSink for TransportChannel<S> {
    fn send(&self, request: OutboundRequest) {
        TransportChannel::send(self, request);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::protocol::{Cell as GridCell, CreepEncoding, TowerIntent};
    use crate::state::new_context;
    use serde_json::{json, Value};
    use std::rc::Rc;

    /// Records every frame it is asked to send.
    #[derive(Default, Clone)]
    pub(crate) struct RecordingSocket {
        pub frames: Rc<RefCell<Vec<String>>>,
    }

    impl RecordingSocket {
        pub fn sent(&self) -> Vec<Value> {
            self.frames
                .borrow()
                .iter()
                .map(|frame| serde_json::from_str(frame).unwrap())
                .collect()
        }
    }

    impl Socket for RecordingSocket {
        fn send_text(&self, frame: &str) -> Result<(), ClientError> {
            self.frames.borrow_mut().push(frame.to_string());
            Ok(())
        }
    }

    struct FailingSocket;

    impl Socket for FailingSocket {
        fn send_text(&self, _frame: &str) -> Result<(), ClientError> {
            Err(ClientError::Socket("buffer full".into()))
        }
    }

    fn open_channel() -> (TransportChannel<RecordingSocket>, RecordingSocket, GameContext) {
        let socket = RecordingSocket::default();
        let context = new_context();
        let channel = TransportChannel::open(socket.clone(), context.clone());
        channel.handle_open();
        (channel, socket, context)
    }

    #[test]
    fn send_is_dropped_until_open() {
        let socket = RecordingSocket::default();
        let channel = TransportChannel::open(socket.clone(), new_context());
        assert_eq!(channel.state(), ConnectionState::Connecting);

        channel.send(OutboundRequest::chat(PlayerId(0), "early"));
        assert!(socket.frames.borrow().is_empty());

        channel.handle_open();
        channel.send(OutboundRequest::chat(PlayerId(0), "hi"));
        assert_eq!(socket.sent(), vec![json!({"type": "chat", "id": 0, "msg": "hi"})]);

        channel.handle_close();
        channel.send(OutboundRequest::chat(PlayerId(0), "late"));
        assert_eq!(socket.frames.borrow().len(), 1);
    }

    #[test]
    fn closed_channel_never_reopens() {
        let (channel, _, _) = open_channel();
        channel.handle_close();
        channel.handle_open();
        assert_eq!(channel.state(), ConnectionState::Closed);
    }

    #[test]
    fn greeting_goes_out_on_open() {
        let socket = RecordingSocket::default();
        let channel = TransportChannel::open(socket.clone(), new_context())
            .with_greeting(Some("hello".into()));
        channel.handle_open();
        assert_eq!(*socket.frames.borrow(), vec!["hello".to_string()]);
    }

    #[test]
    fn lifecycle_handlers_fire_once() {
        let (channel, _, _) = open_channel();
        let events = Rc::new(RefCell::new(Vec::new()));
        let log = events.clone();
        channel.on_disconnect(move || log.borrow_mut().push("down"));

        channel.handle_close();
        channel.handle_close();
        assert_eq!(*events.borrow(), vec!["down"]);
    }

    #[test]
    fn socket_errors_are_swallowed() {
        let channel = TransportChannel::open(FailingSocket, new_context());
        channel.handle_open();
        channel.send(OutboundRequest::tower(PlayerId(0), GridCell::new(0, 0), TowerIntent::Build(0)));
        assert_eq!(channel.state(), ConnectionState::Open);
    }

    #[test]
    fn malformed_frames_do_not_touch_state() {
        let (channel, _, context) = open_channel();
        let chats = Rc::new(RefCell::new(0));
        let count = chats.clone();
        channel.on_chat(move |_, _| *count.borrow_mut() += 1);

        for raw in [
            "",
            "{",
            "null",
            "42",
            r#""chat""#,
            r#"{"id":1,"msg":"no type"}"#,
            r#"{"type":null}"#,
            r#"{"type":"explode","creeps":[]}"#,
            r#"{"type":"gameUpdate","creeps":"lots"}"#,
            r#"{"type":"chat","id":1}"#,
        ] {
            channel.on_message(raw);
        }

        assert_eq!(context.borrow().revision(), 0);
        assert_eq!(*chats.borrow(), 0);
    }

    #[test]
    fn chat_is_forwarded_once_per_frame() {
        let (channel, _, context) = open_channel();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        channel.on_chat(move |id, text| log.borrow_mut().push((id, text.to_string())));

        channel.on_message(r#"{"type":"chat","id":2,"msg":"rush B"}"#);
        channel.on_message(r#"{"type":"chat","id":5,"msg":""}"#);

        assert_eq!(
            *seen.borrow(),
            vec![(PlayerId(2), "rush B".to_string()), (PlayerId(5), String::new())]
        );
        assert_eq!(context.borrow().revision(), 0);
    }

    #[test]
    fn chat_without_display_is_a_no_op() {
        let (channel, _, _) = open_channel();
        channel.on_message(r#"{"type":"chat","id":2,"msg":"anyone?"}"#);
    }

    #[test]
    fn state_update_applies_all_fields_at_once() {
        let (channel, _, context) = open_channel();
        channel.on_message(
            r#"{"type":"gameUpdate","playerState":{"lives":10},
                "creeps":[{"id":1,"x":1.0,"y":2.0}],"attacks":{"3":[1]}}"#,
        );

        let state = context.borrow();
        assert!(state.player_state().is_some());
        assert_eq!(state.creeps().map(|creeps| creeps.len()), Some(1));
        assert_eq!(state.attacks().map(|attacks| attacks.len()), Some(1));
    }

    #[test]
    fn tower_acks_maintain_registry() {
        let (channel, _, context) = open_channel();
        channel.on_message(
            r#"{"type":"tower_update","towerAccepted":"true","tower":{"id":8,"x":3,"y":4}}"#,
        );
        assert_eq!(
            context.borrow().tower_cell(crate::protocol::TowerId(8)),
            Some(GridCell::new(3, 4))
        );

        channel.on_message(r#"{"type":"tower_update","towerAccepted":"false","reason":"blocked"}"#);
        assert_eq!(context.borrow().towers().count(), 1);

        channel.on_message(r#"{"type":"tower_update","towerDeleted":true,"x":3,"y":4}"#);
        assert_eq!(context.borrow().towers().count(), 0);
    }

    #[test]
    fn creep_ack_is_informational() {
        let (channel, socket, context) = open_channel();
        channel.on_message(r#"{"type":"creepRequestAck","accepted":true,"creepID":1}"#);
        assert_eq!(context.borrow().revision(), 0);

        let sink: &dyn RequestSink = &channel;
        sink.send(OutboundRequest::creep(PlayerId(0), 1, CreepEncoding::Structured));
        assert_eq!(socket.frames.borrow().len(), 1);
    }
}
