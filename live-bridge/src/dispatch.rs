//! Literal-address dispatch
//!
//! Inbound messages are routed by exact string match on the address. There
//! is no pattern matching: `/live/tempo` and `/live/*` are unrelated keys.
//! An address may carry several handlers; all of them run, in registration
//! order, and a failing handler never prevents the others from running.

use std::collections::HashMap;
use std::rc::Rc;

use live_model::SongRef;
use osc_codec::{decode, IntoOscArgs, OscMessage};
use tracing::{error, trace};

use crate::error::{DispatchError, HandlerError};
use crate::outbound::OutboundSender;

/// Result type for address handlers
pub type HandlerResult = std::result::Result<(), HandlerError>;

/// An address handler
pub type Handler = Rc<dyn Fn(&OscMessage, &mut HandlerContext) -> HandlerResult>;

/// What a handler may touch: the song and the reply channel
pub struct HandlerContext {
    pub song: SongRef,
    pub outbound: Rc<OutboundSender>,
}

impl HandlerContext {
    pub fn new(song: SongRef, outbound: Rc<OutboundSender>) -> Self {
        Self { song, outbound }
    }

    /// Send a reply to the configured reply endpoint
    pub fn reply(&self, address: &str, args: impl IntoOscArgs) -> bool {
        self.outbound.send(&OscMessage::new(address, args))
    }

    pub fn send(&self, message: &OscMessage) -> bool {
        self.outbound.send(message)
    }
}

impl std::fmt::Debug for HandlerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerContext")
            .field("outbound", &self.outbound)
            .finish()
    }
}

/// Counts from one [`DispatchTable::dispatch_datagram`] call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub messages: usize,
    pub handlers: usize,
    /// Messages whose address had no handler
    pub unhandled: usize,
    pub failures: usize,
}

impl DispatchOutcome {
    pub fn merge(&mut self, other: DispatchOutcome) {
        self.messages += other.messages;
        self.handlers += other.handlers;
        self.unhandled += other.unhandled;
        self.failures += other.failures;
    }
}

/// Address → ordered handler list
#[derive(Default)]
pub struct DispatchTable {
    handlers: HashMap<String, Vec<Handler>>,
}

impl DispatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `handler` to the list for `address`
    ///
    /// Registering twice for the same address is allowed; both run.
    pub fn register<F>(&mut self, address: impl Into<String>, handler: F)
    where
        F: Fn(&OscMessage, &mut HandlerContext) -> HandlerResult + 'static,
    {
        self.handlers
            .entry(address.into())
            .or_default()
            .push(Rc::new(handler));
    }

    /// Run every handler registered for the message's address
    ///
    /// Returns the number of handlers invoked. Handler errors are logged
    /// with the address and otherwise ignored.
    pub fn dispatch(&self, message: &OscMessage, ctx: &mut HandlerContext) -> usize {
        self.dispatch_counting(message, ctx).0
    }

    fn dispatch_counting(&self, message: &OscMessage, ctx: &mut HandlerContext) -> (usize, usize) {
        let Some(handlers) = self.handlers.get(&message.address) else {
            trace!(address = %message.address, "No handler");
            return (0, 0);
        };

        let mut failures = 0;
        for handler in handlers {
            if let Err(source) = handler(message, ctx) {
                failures += 1;
                let error = DispatchError::Handler {
                    address: message.address.clone(),
                    source,
                };
                error!(%error, message = %message, "Handler failed");
            }
        }
        (handlers.len(), failures)
    }

    /// Decode one datagram and dispatch each message it carries, in order
    ///
    /// A datagram that fails to decode dispatches nothing.
    pub fn dispatch_datagram(
        &self,
        data: &[u8],
        ctx: &mut HandlerContext,
    ) -> Result<DispatchOutcome, DispatchError> {
        let messages = decode(data)?;
        let mut outcome = DispatchOutcome {
            messages: messages.len(),
            ..DispatchOutcome::default()
        };
        for message in &messages {
            let (invoked, failures) = self.dispatch_counting(message, ctx);
            if invoked == 0 {
                outcome.unhandled += 1;
            }
            outcome.handlers += invoked;
            outcome.failures += failures;
        }
        Ok(outcome)
    }

    /// Registered addresses, sorted
    pub fn addresses(&self) -> Vec<&str> {
        let mut addresses: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        addresses.sort_unstable();
        addresses
    }

    pub fn handler_count(&self, address: &str) -> usize {
        self.handlers.get(address).map(Vec::len).unwrap_or(0)
    }

    pub fn contains(&self, address: &str) -> bool {
        self.handlers.contains_key(address)
    }

    /// Number of distinct addresses
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchTable")
            .field("addresses", &self.handlers.len())
            .finish()
    }
}
