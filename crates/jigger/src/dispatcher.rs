//! Routing decoded envelopes to handlers.
//!
//! The dispatcher is a table from [`MessageKind`] to handler, filled in
//! once before the client is built. The receive loop calls
//! [`MessageDispatcher::dispatch`] for every envelope, in arrival order,
//! and waits for the handler to return before decoding the next frame.
//! Handlers are therefore plain synchronous closures; anything slow
//! should be handed off to a channel.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use jigger_protocol::{Codec, Envelope, JsonCodec, Message, MessageKind, ProtocolError};

// ---------------------------------------------------------------------------
// Handler
// ---------------------------------------------------------------------------

/// Why a handler failed on one message.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// The payload didn't decode into the type the handler expects.
    #[error("payload decode failed: {0}")]
    Decode(#[from] ProtocolError),

    /// The handler reported its own failure.
    #[error("{0}")]
    Failed(String),

    /// The handler panicked. The panic was contained.
    #[error("handler panicked: {0}")]
    Panicked(String),
}

impl HandlerError {
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Something that consumes envelopes of one kind.
///
/// Implemented for every `Fn(&Envelope) -> Result<(), HandlerError>`
/// closure, which is how handlers are usually written.
pub trait Handler: Send + Sync + 'static {
    fn handle(&self, envelope: &Envelope) -> Result<(), HandlerError>;
}

impl<F> Handler for F
where
    F: Fn(&Envelope) -> Result<(), HandlerError> + Send + Sync + 'static,
{
    fn handle(&self, envelope: &Envelope) -> Result<(), HandlerError> {
        self(envelope)
    }
}

/// What [`MessageDispatcher::dispatch`] did with an envelope.
#[derive(Debug)]
pub enum Dispatch {
    Handled,
    /// No handler for the kind. The envelope was logged and dropped.
    Unhandled,
    Failed(HandlerError),
}

// ---------------------------------------------------------------------------
// MessageDispatcher
// ---------------------------------------------------------------------------

/// Handler table keyed by message kind.
///
/// One handler per kind. Registering a second handler for the same kind
/// replaces the first.
///
/// ```rust
/// use jigger::{HandlerError, MessageDispatcher};
/// use jigger::protocol::messages::DrawCardResponse;
///
/// let mut dispatcher = MessageDispatcher::new();
/// dispatcher.on(|resp: DrawCardResponse| {
///     if !resp.ret.is_ok() {
///         return Err(HandlerError::msg(format!("draw failed: {}", resp.ret)));
///     }
///     println!("drew {} cards", resp.cards.len());
///     Ok(())
/// });
/// ```
#[derive(Default)]
pub struct MessageDispatcher {
    handlers: HashMap<MessageKind, Box<dyn Handler>>,
    codec: JsonCodec,
}

impl MessageDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `handler` for `kind`, returning the handler it replaced.
    pub fn register(
        &mut self,
        kind: MessageKind,
        handler: impl Handler,
    ) -> Option<Box<dyn Handler>> {
        let previous = self.handlers.insert(kind, Box::new(handler));
        if previous.is_some() {
            tracing::debug!(%kind, "replaced existing handler");
        }
        previous
    }

    /// Installs a typed handler for `M::KIND`.
    ///
    /// The payload is decoded into `M` before `handler` runs; a payload
    /// that doesn't decode is reported as [`HandlerError::Decode`].
    pub fn on<M, F>(&mut self, handler: F) -> Option<Box<dyn Handler>>
    where
        M: Message,
        F: Fn(M) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        let codec = self.codec;
        self.register(M::KIND, move |envelope: &Envelope| -> Result<(), HandlerError> {
            let message: M = codec.decode(&envelope.payload)?;
            handler(message)
        })
    }

    /// Removes the handler for `kind`.
    pub fn unregister(&mut self, kind: MessageKind) -> Option<Box<dyn Handler>> {
        self.handlers.remove(&kind)
    }

    pub fn contains(&self, kind: MessageKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Runs the handler registered for `envelope.kind`.
    ///
    /// Never panics and never fails the caller: a missing handler, an
    /// error, or a panic are all folded into the returned [`Dispatch`].
    pub fn dispatch(&self, envelope: &Envelope) -> Dispatch {
        let Some(handler) = self.handlers.get(&envelope.kind) else {
            tracing::debug!(
                kind = %envelope.kind,
                seq = envelope.seq,
                "no handler registered, dropping message"
            );
            return Dispatch::Unhandled;
        };

        let result = panic::catch_unwind(AssertUnwindSafe(|| handler.handle(envelope)))
            .unwrap_or_else(|payload| Err(HandlerError::Panicked(panic_message(&*payload))));

        match result {
            Ok(()) => Dispatch::Handled,
            Err(error) => {
                tracing::warn!(
                    kind = %envelope.kind,
                    seq = envelope.seq,
                    %error,
                    "handler failed"
                );
                Dispatch::Failed(error)
            }
        }
    }
}

impl fmt::Debug for MessageDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.handlers.keys().copied().collect();
        kinds.sort();
        f.debug_struct("MessageDispatcher")
            .field("kinds", &kinds)
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use jigger_protocol::ClientId;
    use jigger_protocol::messages::{DrawCardResponse, ErrorCode};

    use super::*;

    fn envelope(kind: MessageKind, payload: Vec<u8>) -> Envelope {
        Envelope {
            client_id: ClientId::new("server"),
            seq: 1,
            kind,
            payload,
        }
    }

    fn counter_handler(counter: &Arc<AtomicUsize>) -> impl Handler {
        let counter = Arc::clone(counter);
        move |_: &Envelope| -> Result<(), HandlerError> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_dispatch_calls_registered_handler() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut dispatcher = MessageDispatcher::new();
        dispatcher.register(MessageKind::JOIN_ROOM_RESPONSE, counter_handler(&hits));

        let result = dispatcher.dispatch(&envelope(MessageKind::JOIN_ROOM_RESPONSE, vec![]));

        assert!(matches!(result, Dispatch::Handled));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unknown_kind_is_unhandled_not_error() {
        let dispatcher = MessageDispatcher::new();
        let result = dispatcher.dispatch(&envelope(MessageKind(999), vec![1, 2]));
        assert!(matches!(result, Dispatch::Unhandled));
    }

    #[test]
    fn test_register_is_last_write_wins() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let mut dispatcher = MessageDispatcher::new();

        assert!(dispatcher
            .register(MessageKind::LEAVE_ROOM_RESPONSE, counter_handler(&first))
            .is_none());
        assert!(dispatcher
            .register(MessageKind::LEAVE_ROOM_RESPONSE, counter_handler(&second))
            .is_some());
        dispatcher.dispatch(&envelope(MessageKind::LEAVE_ROOM_RESPONSE, vec![]));

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
        assert_eq!(dispatcher.len(), 1);
    }

    #[test]
    fn test_typed_handler_decodes_payload() {
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_in_handler = Arc::clone(&seen);
        let mut dispatcher = MessageDispatcher::new();
        dispatcher.on(move |resp: DrawCardResponse| {
            seen_in_handler.store(resp.cards.len(), Ordering::SeqCst);
            Ok(())
        });

        let payload = serde_json::to_vec(&DrawCardResponse {
            ret: ErrorCode::OK,
            cards: vec![Default::default(), Default::default()],
        })
        .unwrap();
        let result = dispatcher.dispatch(&envelope(MessageKind::DRAW_CARD_RESPONSE, payload));

        assert!(matches!(result, Dispatch::Handled));
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_typed_handler_reports_bad_payload() {
        let mut dispatcher = MessageDispatcher::new();
        dispatcher.on(|_: DrawCardResponse| Ok(()));

        let result =
            dispatcher.dispatch(&envelope(MessageKind::DRAW_CARD_RESPONSE, b"{oops".to_vec()));

        assert!(matches!(result, Dispatch::Failed(HandlerError::Decode(_))));
    }

    fn board_is_full(_: &Envelope) -> Result<(), HandlerError> {
        Err(HandlerError::msg("board is full"))
    }

    fn explode(_: &Envelope) -> Result<(), HandlerError> {
        panic!("boom")
    }

    #[test]
    fn test_handler_error_is_returned() {
        let mut dispatcher = MessageDispatcher::new();
        dispatcher.register(MessageKind::GAME_ACTION_RESPONSE, board_is_full);

        let result = dispatcher.dispatch(&envelope(MessageKind::GAME_ACTION_RESPONSE, vec![]));

        match result {
            Dispatch::Failed(HandlerError::Failed(msg)) => assert_eq!(msg, "board is full"),
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[test]
    fn test_panicking_handler_is_contained_and_next_kind_still_runs() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut dispatcher = MessageDispatcher::new();
        dispatcher.register(MessageKind::CREATE_ROOM_RESPONSE, explode);
        dispatcher.register(MessageKind::JOIN_ROOM_RESPONSE, counter_handler(&hits));

        let first = dispatcher.dispatch(&envelope(MessageKind::CREATE_ROOM_RESPONSE, vec![]));
        let second = dispatcher.dispatch(&envelope(MessageKind::JOIN_ROOM_RESPONSE, vec![]));

        match first {
            Dispatch::Failed(HandlerError::Panicked(msg)) => assert_eq!(msg, "boom"),
            other => panic!("expected Panicked, got {other:?}"),
        }
        assert!(matches!(second, Dispatch::Handled));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unregister_removes_handler() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut dispatcher = MessageDispatcher::new();
        dispatcher.register(MessageKind::JOIN_ROOM_RESPONSE, counter_handler(&hits));

        assert!(dispatcher.unregister(MessageKind::JOIN_ROOM_RESPONSE).is_some());
        assert!(!dispatcher.contains(MessageKind::JOIN_ROOM_RESPONSE));
        assert!(dispatcher.is_empty());
    }
}
