#![no_std]

pub mod bytes;
pub mod decoder;
pub mod message;
pub mod output;
pub mod ring_queue;
pub mod router;
pub mod thru;

pub use bytes::{Channel, INVALID};
pub use decoder::{ByteStreamDecoder, DecodeSink, SysExSink};
pub use message::Message;
pub use output::{OutputChannel, Transmitter};
pub use ring_queue::{RingConsumer, RingProducer, RingQueue};
pub use router::{BindingTableFull, ChannelEventListener, ChannelRouter};
pub use thru::{RealtimeTransportListener, ThruPipeline, ThruProcessor, ThruReceiver, TraceSink};
