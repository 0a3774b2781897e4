//! Inbound address handlers
//!
//! Each submodule registers a group of addresses. Handlers are thin: they
//! resolve indices, read or write the object graph and optionally reply.
//! Every address accepts a query form (no arguments, or a trailing literal
//! `"query"`) and/or a set form, chosen by argument count.

mod args;
mod clips;
mod devices;
mod mixer;
mod names;
mod transport;
mod utility;

use crate::dispatch::DispatchTable;

/// Register the whole handler catalogue
pub fn register_all(table: &mut DispatchTable) {
    transport::register(table);
    names::register(table);
    mixer::register(table);
    clips::register(table);
    devices::register(table);
    utility::register(table);
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;
    use std::rc::Rc;

    use live_model::memory::MemorySong;
    use live_model::SongRef;
    use osc_codec::{encode_message, IntoOscArgs, OscMessage};

    use crate::dispatch::{DispatchOutcome, DispatchTable, HandlerContext};
    use crate::outbound::OutboundSender;

    /// Full handler catalogue over an in-memory song, replies recorded
    pub struct Fixture {
        pub memory: Rc<MemorySong>,
        table: DispatchTable,
        outbound: Rc<OutboundSender>,
        ctx: RefCell<HandlerContext>,
    }

    impl Fixture {
        pub fn new(tracks: usize, scenes: usize) -> Self {
            let memory = MemorySong::with_layout(tracks, scenes);
            let song: SongRef = memory.clone();
            let outbound = Rc::new(OutboundSender::recording());
            let mut table = DispatchTable::new();
            super::register_all(&mut table);
            Self {
                memory,
                table,
                ctx: RefCell::new(HandlerContext::new(song, Rc::clone(&outbound))),
                outbound,
            }
        }

        /// Encode, decode and dispatch one message
        pub fn send(&self, address: &str, args: impl IntoOscArgs) -> DispatchOutcome {
            let bytes = encode_message(&OscMessage::new(address, args)).unwrap();
            self.table
                .dispatch_datagram(&bytes, &mut self.ctx.borrow_mut())
                .unwrap()
        }

        pub fn replies(&self) -> Vec<OscMessage> {
            self.outbound.take_recorded()
        }
    }
}
