use core::sync::atomic::AtomicBool;
use core::sync::atomic::Ordering::Relaxed;

use crate::bytes;
use crate::decoder::{ByteStreamDecoder, DecodeSink, SysExSink};
use crate::message::Message;
use crate::output::Transmitter;
use crate::ring_queue::{RingConsumer, RingProducer, RingQueue};
use crate::router::ChannelRouter;

/** Transport level realtime events, delivered from the receive context.
  * Every method defaults to doing nothing; implementations override what
  * they need and must not block. */
pub trait RealtimeTransportListener: Send {
	fn start(&mut self) {}
	fn stop(&mut self) {}
	fn resume(&mut self) {}
	fn register_clock_pulse(&mut self, _timestamp: u32) {}
	fn sensing_input_received(&mut self, _timestamp: u32) {}
}

/** Observability hook on the processing half: sees every message drained
  * from the local queue, before any routing. */
pub trait TraceSink: Send {
	fn message_decoded(&mut self, message: Message);
}

/** Decoder, router, queues and thru flags wired together. The pipeline owns
  * the shared state; split() yields the two working halves:
  *
  * ThruReceiver runs in the byte receiving context, typically an interrupt
  * handler, and feeds the queues. ThruProcessor runs in the main loop; it
  * routes the received messages to the channel listeners and hands out what
  * has to go back on the wire.
  *
  * Soft thru (forwarding every received message to the output) and realtime
  * thru (forwarding realtime bytes immediately, ahead of the queues) both
  * default to enabled. */
pub struct ThruPipeline<const QUEUE_LEN: usize, const MAX_BINDINGS: usize> {
	local: RingQueue<Message, QUEUE_LEN>,
	forward: RingQueue<Message, QUEUE_LEN>,
	transmit: RingQueue<Message, QUEUE_LEN>,
	thru_enabled: AtomicBool,
	realtime_thru_enabled: AtomicBool,
}

impl<const QUEUE_LEN: usize, const MAX_BINDINGS: usize> ThruPipeline<QUEUE_LEN, MAX_BINDINGS> {
	pub fn new() -> ThruPipeline<QUEUE_LEN, MAX_BINDINGS> {
		ThruPipeline {
			local: RingQueue::new(),
			forward: RingQueue::new(),
			transmit: RingQueue::new(),
			thru_enabled: AtomicBool::new(true),
			realtime_thru_enabled: AtomicBool::new(true),
		}
	}

	pub fn split(&mut self) -> (ThruReceiver<'_, QUEUE_LEN>, ThruProcessor<'_, QUEUE_LEN, MAX_BINDINGS>) {
		let (local_producer, local_consumer) = self.local.split();
		let (forward_producer, forward_consumer) = self.forward.split();
		let receiver = ThruReceiver {
			decoder: ByteStreamDecoder::new(),
			local: local_producer,
			forward: forward_producer,
			thru_enabled: &self.thru_enabled,
			realtime_thru_enabled: &self.realtime_thru_enabled,
			realtime_listener: None,
			sysex_sink: None,
			transmitter: None,
		};
		let processor = ThruProcessor {
			local: local_consumer,
			forward: forward_consumer,
			transmit: &mut self.transmit,
			router: ChannelRouter::new(),
			trace_sink: None,
			thru_enabled: &self.thru_enabled,
			realtime_thru_enabled: &self.realtime_thru_enabled,
		};
		(receiver, processor)
	}
}

/** The receive half. Feed it raw bytes with their transport timestamps;
  * decoded messages land in the queues, realtime bytes reach the attached
  * listener and, with realtime thru enabled, go straight out through the
  * attached transmitter without queueing. */
pub struct ThruReceiver<'a, const QUEUE_LEN: usize> {
	decoder: ByteStreamDecoder,
	local: RingProducer<'a, Message, QUEUE_LEN>,
	forward: RingProducer<'a, Message, QUEUE_LEN>,
	thru_enabled: &'a AtomicBool,
	realtime_thru_enabled: &'a AtomicBool,
	realtime_listener: Option<&'a mut dyn RealtimeTransportListener>,
	sysex_sink: Option<&'a mut dyn SysExSink>,
	transmitter: Option<&'a mut dyn Transmitter>,
}

impl<'a, const QUEUE_LEN: usize> ThruReceiver<'a, QUEUE_LEN> {
	pub fn receive_byte(&mut self, byte: u8, timestamp: u32) {
		let mut sink = ReceiverSink {
			local: &mut self.local,
			forward: &mut self.forward,
			thru_enabled: self.thru_enabled,
			realtime_thru_enabled: self.realtime_thru_enabled,
			realtime_listener: &mut self.realtime_listener,
			sysex_sink: &mut self.sysex_sink,
			transmitter: &mut self.transmitter,
		};
		self.decoder.receive_byte(byte, timestamp, &mut sink);
	}

	/** Injects an already assembled message as if it had just been decoded:
	  * realtime messages take the immediate realtime path, everything else
	  * queues like a standard message. Invalid messages are dropped. */
	pub fn receive_message(&mut self, message: Message, timestamp: u32) {
		if !message.is_valid() {
			return;
		}
		let mut sink = ReceiverSink {
			local: &mut self.local,
			forward: &mut self.forward,
			thru_enabled: self.thru_enabled,
			realtime_thru_enabled: self.realtime_thru_enabled,
			realtime_listener: &mut self.realtime_listener,
			sysex_sink: &mut self.sysex_sink,
			transmitter: &mut self.transmitter,
		};
		if bytes::is_system_realtime(message.status()) {
			sink.realtime_message(message.status(), timestamp);
		}
		else {
			sink.standard_message(message);
		}
	}

	pub fn attach_realtime_listener(&mut self, listener: &'a mut dyn RealtimeTransportListener) {
		self.realtime_listener = Some(listener);
	}

	pub fn detach_realtime_listener(&mut self) {
		self.realtime_listener = None;
	}

	pub fn attach_sysex_sink(&mut self, sink: &'a mut dyn SysExSink) {
		self.sysex_sink = Some(sink);
	}

	pub fn detach_sysex_sink(&mut self) {
		self.sysex_sink = None;
	}

	/** The transmitter used for the immediate realtime thru forward. */
	pub fn attach_transmitter(&mut self, transmitter: &'a mut dyn Transmitter) {
		self.transmitter = Some(transmitter);
	}

	pub fn detach_transmitter(&mut self) {
		self.transmitter = None;
	}
}

struct ReceiverSink<'s, 'a, const QUEUE_LEN: usize> {
	local: &'s mut RingProducer<'a, Message, QUEUE_LEN>,
	forward: &'s mut RingProducer<'a, Message, QUEUE_LEN>,
	thru_enabled: &'a AtomicBool,
	realtime_thru_enabled: &'a AtomicBool,
	realtime_listener: &'s mut Option<&'a mut dyn RealtimeTransportListener>,
	sysex_sink: &'s mut Option<&'a mut dyn SysExSink>,
	transmitter: &'s mut Option<&'a mut dyn Transmitter>,
}

impl<const QUEUE_LEN: usize> DecodeSink for ReceiverSink<'_, '_, QUEUE_LEN> {
	fn standard_message(&mut self, message: Message) {
		self.local.push(message);
		if self.thru_enabled.load(Relaxed) {
			self.forward.push(message);
		}
	}

	fn realtime_message(&mut self, status: u8, timestamp: u32) {
		if self.realtime_thru_enabled.load(Relaxed) {
			if let Some(transmitter) = self.transmitter.as_mut() {
				// ahead of the queues, so realtime bytes are never
				// reordered behind buffered traffic
				transmitter.send_message(Message::from_status(status));
			}
		}
		if let Some(listener) = self.realtime_listener.as_mut() {
			match status {
				0xF8 => listener.register_clock_pulse(timestamp),
				0xFA => listener.start(),
				0xFB => listener.resume(),
				0xFC => listener.stop(),
				0xFE => listener.sensing_input_received(timestamp),
				_ => {}
			}
		}
	}

	fn sysex_status_changed(&mut self, terminated: bool, started: bool) {
		if let Some(sink) = self.sysex_sink.as_mut() {
			sink.sysex_status_changed(terminated, started);
		}
	}

	fn sysex_byte(&mut self, byte: u8) {
		if let Some(sink) = self.sysex_sink.as_mut() {
			sink.sysex_byte(byte);
		}
	}
}

/** The processing half, for the main loop. */
pub struct ThruProcessor<'a, const QUEUE_LEN: usize, const MAX_BINDINGS: usize> {
	local: RingConsumer<'a, Message, QUEUE_LEN>,
	forward: RingConsumer<'a, Message, QUEUE_LEN>,
	transmit: &'a mut RingQueue<Message, QUEUE_LEN>,
	router: ChannelRouter<'a, MAX_BINDINGS>,
	trace_sink: Option<&'a mut dyn TraceSink>,
	thru_enabled: &'a AtomicBool,
	realtime_thru_enabled: &'a AtomicBool,
}

impl<'a, const QUEUE_LEN: usize, const MAX_BINDINGS: usize> ThruProcessor<'a, QUEUE_LEN, MAX_BINDINGS> {
	/** Drains the local queue: every message goes to the trace sink first,
	  * channel voice messages then pass through the router. System common
	  * messages are not channel addressed and end at the trace hook. */
	pub fn process_messages(&mut self) {
		while self.local.available() != 0 {
			let message = self.local.pop();
			if let Some(trace) = self.trace_sink.as_mut() {
				trace.message_decoded(message);
			}
			if bytes::is_system_common(message.status()) {
				continue;
			}
			self.router.dispatch(message);
		}
	}

	/** The next message to put on the wire, at most one per call: forwarded
	  * thru traffic drains before locally generated output. Returns the
	  * invalid message when there is nothing to send. */
	pub fn next_message(&mut self) -> Message {
		if self.forward.available() != 0 {
			return self.forward.pop();
		}
		if self.transmit.available() != 0 {
			return self.transmit.pop();
		}
		return Message::invalid();
	}

	pub fn router(&mut self) -> &mut ChannelRouter<'a, MAX_BINDINGS> {
		&mut self.router
	}

	pub fn set_thru_enabled(&mut self, enabled: bool) {
		self.thru_enabled.store(enabled, Relaxed);
	}

	pub fn set_realtime_thru_enabled(&mut self, enabled: bool) {
		self.realtime_thru_enabled.store(enabled, Relaxed);
	}

	pub fn attach_trace_sink(&mut self, sink: &'a mut dyn TraceSink) {
		self.trace_sink = Some(sink);
	}

	pub fn detach_trace_sink(&mut self) {
		self.trace_sink = None;
	}
}

impl<const QUEUE_LEN: usize, const MAX_BINDINGS: usize> Transmitter for ThruProcessor<'_, QUEUE_LEN, MAX_BINDINGS> {
	/** Queues a locally generated message for transmission. */
	fn send_message(&mut self, message: Message) {
		self.transmit.push(message);
	}
}

#[cfg(test)]
mod tests {
	extern crate std;
	use super::*;
	use crate::bytes::{Channel, INVALID};
	use crate::router::ChannelEventListener;
	use std::vec;
	use std::vec::Vec;

	#[derive(Default)]
	struct CapturedOut {
		messages: Vec<Message>,
	}

	impl Transmitter for CapturedOut {
		fn send_message(&mut self, message: Message) {
			self.messages.push(message);
		}
	}

	#[derive(Default)]
	struct TransportEvents {
		clock_pulses: Vec<u32>,
		starts: u32,
		stops: u32,
		resumes: u32,
		sensing: Vec<u32>,
	}

	impl RealtimeTransportListener for TransportEvents {
		fn start(&mut self) {
			self.starts += 1;
		}
		fn stop(&mut self) {
			self.stops += 1;
		}
		fn resume(&mut self) {
			self.resumes += 1;
		}
		fn register_clock_pulse(&mut self, timestamp: u32) {
			self.clock_pulses.push(timestamp);
		}
		fn sensing_input_received(&mut self, timestamp: u32) {
			self.sensing.push(timestamp);
		}
	}

	#[derive(Default)]
	struct SysExLog {
		bytes: Vec<u8>,
		started: u32,
		terminated: u32,
	}

	impl SysExSink for SysExLog {
		fn sysex_status_changed(&mut self, terminated: bool, started: bool) {
			if terminated {
				self.terminated += 1;
			}
			if started {
				self.started += 1;
			}
		}
		fn sysex_byte(&mut self, byte: u8) {
			self.bytes.push(byte);
		}
	}

	#[derive(Default)]
	struct NoteLog {
		notes: Vec<(u8, u8, bool)>,
	}

	impl ChannelEventListener for NoteLog {
		fn note_event_received(&mut self, key: u8, velocity: u8, note_on: bool) {
			self.notes.push((key, velocity, note_on));
		}
		fn aftertouch_received(&mut self, _pressure: u8, _key: u8) {}
		fn control_change_received(&mut self, _number: u8, _value: u8) {}
		fn program_change_received(&mut self, _number: u8) {}
		fn pitch_bend_received(&mut self, _lsb: u8, _msb: u8) {}
	}

	#[derive(Default)]
	struct TraceLog {
		messages: Vec<Message>,
	}

	impl TraceSink for TraceLog {
		fn message_decoded(&mut self, message: Message) {
			self.messages.push(message);
		}
	}

	fn feed(receiver: &mut ThruReceiver<'_, 8>, input: &[u8]) {
		for (i, byte) in input.iter().enumerate() {
			receiver.receive_byte(*byte, i as u32);
		}
	}

	#[test]
	fn thru_forwards_standard_messages_by_default() {
		let mut pipeline: ThruPipeline<8, 2> = ThruPipeline::new();
		let (mut receiver, mut processor) = pipeline.split();
		feed(&mut receiver, &[0x90, 0x40, 0x7F]);
		assert!(processor.next_message() == Message::new(0x90, 0x40, 0x7F));
		assert!(processor.next_message() == Message::invalid());
	}

	#[test]
	fn thru_disabled_stops_forwarding_only() {
		let mut notes = NoteLog::default();
		let mut pipeline: ThruPipeline<8, 2> = ThruPipeline::new();
		{
			let (mut receiver, mut processor) = pipeline.split();
			processor.set_thru_enabled(false);
			processor.router().add_binding(Channel::Omni, &mut notes).unwrap();
			feed(&mut receiver, &[0x90, 0x40, 0x7F]);
			assert!(processor.next_message() == Message::invalid());
			processor.process_messages();
		}
		// local processing still saw the message
		assert!(notes.notes == vec![(0x40, 0x7F, true)]);
	}

	#[test]
	fn processes_channel_voice_through_the_router() {
		let mut notes = NoteLog::default();
		let mut pipeline: ThruPipeline<8, 2> = ThruPipeline::new();
		{
			let (mut receiver, mut processor) = pipeline.split();
			processor.router().add_binding(Channel::Omni, &mut notes).unwrap();
			feed(&mut receiver, &[0x92, 0x40, 0x7F, 0x41, 0x00]);
			processor.process_messages();
		}
		assert!(notes.notes == vec![(0x40, 0x7F, true), (0x41, 0x00, true)]);
	}

	#[test]
	fn realtime_bytes_bypass_the_queues() {
		let mut wire = CapturedOut::default();
		let mut transport = TransportEvents::default();
		let mut pipeline: ThruPipeline<8, 2> = ThruPipeline::new();
		{
			let (mut receiver, mut processor) = pipeline.split();
			receiver.attach_transmitter(&mut wire);
			receiver.attach_realtime_listener(&mut transport);
			feed(&mut receiver, &[0x90, 0x40, 0xF8, 0x7F, 0xFA, 0xFB, 0xFC, 0xFE]);
			// the interrupted note still assembles and gets forwarded
			assert!(processor.next_message() == Message::new(0x90, 0x40, 0x7F));
			assert!(processor.next_message() == Message::invalid());
		}
		let expected = vec![
			Message::from_status(0xF8),
			Message::from_status(0xFA),
			Message::from_status(0xFB),
			Message::from_status(0xFC),
			Message::from_status(0xFE),
		];
		assert!(wire.messages == expected, "got {:?}", wire.messages);
		assert!(transport.clock_pulses == vec![2]);
		assert!(transport.starts == 1);
		assert!(transport.resumes == 1);
		assert!(transport.stops == 1);
		assert!(transport.sensing == vec![7]);
	}

	#[test]
	fn realtime_thru_disabled_keeps_the_semantic_dispatch() {
		let mut wire = CapturedOut::default();
		let mut transport = TransportEvents::default();
		let mut pipeline: ThruPipeline<8, 2> = ThruPipeline::new();
		{
			let (mut receiver, mut processor) = pipeline.split();
			processor.set_realtime_thru_enabled(false);
			receiver.attach_transmitter(&mut wire);
			receiver.attach_realtime_listener(&mut transport);
			feed(&mut receiver, &[0xF8, 0xF8]);
		}
		assert!(wire.messages.is_empty());
		assert!(transport.clock_pulses == vec![0, 1]);
	}

	#[test]
	fn forwarded_traffic_drains_before_local_output() {
		let mut pipeline: ThruPipeline<8, 2> = ThruPipeline::new();
		let (mut receiver, mut processor) = pipeline.split();
		processor.send_message(Message::new(0xC0, 0x01, INVALID));
		feed(&mut receiver, &[0x90, 0x40, 0x7F]);
		assert!(processor.next_message() == Message::new(0x90, 0x40, 0x7F));
		assert!(processor.next_message() == Message::new(0xC0, 0x01, INVALID));
		assert!(processor.next_message() == Message::invalid());
	}

	#[test]
	fn sysex_streams_to_the_attached_sink() {
		let mut log = SysExLog::default();
		let mut pipeline: ThruPipeline<8, 2> = ThruPipeline::new();
		{
			let (mut receiver, _processor) = pipeline.split();
			receiver.attach_sysex_sink(&mut log);
			feed(&mut receiver, &[0xF0, 0x01, 0x02, 0xF8, 0x03, 0xF7]);
		}
		assert!(log.bytes == vec![0x01, 0x02, 0x03]);
		assert!(log.started == 1);
		assert!(log.terminated == 1);
	}

	#[test]
	fn system_common_skips_the_router_but_is_traced() {
		let mut trace = TraceLog::default();
		let mut notes = NoteLog::default();
		let mut pipeline: ThruPipeline<8, 2> = ThruPipeline::new();
		{
			let (mut receiver, mut processor) = pipeline.split();
			processor.attach_trace_sink(&mut trace);
			processor.router().add_binding(Channel::Omni, &mut notes).unwrap();
			feed(&mut receiver, &[0xF2, 0x13, 0x37, 0x90, 0x40, 0x7F]);
			processor.process_messages();
		}
		let expected = vec![
			Message::new(0xF2, 0x13, 0x37),
			Message::new(0x90, 0x40, 0x7F),
		];
		assert!(trace.messages == expected, "got {:?}", trace.messages);
		assert!(notes.notes == vec![(0x40, 0x7F, true)]);
	}

	#[test]
	fn injected_messages_follow_the_decoded_path() {
		let mut pipeline: ThruPipeline<8, 2> = ThruPipeline::new();
		let (mut receiver, mut processor) = pipeline.split();
		receiver.receive_message(Message::new(0x95, 0x11, 0x22), 0);
		receiver.receive_message(Message::invalid(), 1); // dropped at the door
		assert!(processor.next_message() == Message::new(0x95, 0x11, 0x22));
		assert!(processor.next_message() == Message::invalid());
	}

	#[test]
	fn injected_realtime_messages_take_the_realtime_path() {
		let mut wire = CapturedOut::default();
		let mut transport = TransportEvents::default();
		let mut pipeline: ThruPipeline<8, 2> = ThruPipeline::new();
		{
			let (mut receiver, mut processor) = pipeline.split();
			receiver.attach_transmitter(&mut wire);
			receiver.attach_realtime_listener(&mut transport);
			receiver.receive_message(Message::from_status(0xF8), 42);
			receiver.receive_message(Message::from_status(0xFA), 43);
			// forwarded ahead of the queues, so nothing is buffered
			assert!(processor.next_message() == Message::invalid());
		}
		let expected = vec![Message::from_status(0xF8), Message::from_status(0xFA)];
		assert!(wire.messages == expected, "got {:?}", wire.messages);
		assert!(transport.clock_pulses == vec![42]);
		assert!(transport.starts == 1);
	}

	#[test]
	fn overflow_drops_the_newest_message() {
		let mut pipeline: ThruPipeline<4, 2> = ThruPipeline::new();
		let (mut receiver, mut processor) = pipeline.split();
		for key in 0..5 {
			receiver.receive_message(Message::new(0x90, key, 0x40), key as u32);
		}
		// capacity 4 holds three messages, the rest was dropped
		assert!(processor.next_message() == Message::new(0x90, 0, 0x40));
		assert!(processor.next_message() == Message::new(0x90, 1, 0x40));
		assert!(processor.next_message() == Message::new(0x90, 2, 0x40));
		assert!(processor.next_message() == Message::invalid());
	}

	#[test]
	fn merges_forwarded_and_local_traffic() {
		let mut pipeline: ThruPipeline<8, 2> = ThruPipeline::new();
		let (mut receiver, mut processor) = pipeline.split();
		feed(&mut receiver, &[0x93, 0x3C, 0x50]);
		processor.send_message(Message::new(0xB3, 0x07, 0x30));
		feed(&mut receiver, &[0x93, 0x3C, 0x00]);
		assert!(processor.next_message() == Message::new(0x93, 0x3C, 0x50));
		assert!(processor.next_message() == Message::new(0x93, 0x3C, 0x00));
		assert!(processor.next_message() == Message::new(0xB3, 0x07, 0x30));
		assert!(processor.next_message() == Message::invalid());
	}

	#[test]
	fn detached_hooks_go_silent() {
		let mut wire = CapturedOut::default();
		let mut transport = TransportEvents::default();
		let mut log = SysExLog::default();
		let mut trace = TraceLog::default();
		let mut pipeline: ThruPipeline<8, 2> = ThruPipeline::new();
		{
			let (mut receiver, mut processor) = pipeline.split();
			receiver.attach_transmitter(&mut wire);
			receiver.attach_realtime_listener(&mut transport);
			receiver.attach_sysex_sink(&mut log);
			processor.attach_trace_sink(&mut trace);
			feed(&mut receiver, &[0xF8, 0xF0, 0x01, 0xF7, 0x90, 0x40, 0x7F]);
			processor.process_messages();
			receiver.detach_transmitter();
			receiver.detach_realtime_listener();
			receiver.detach_sysex_sink();
			processor.detach_trace_sink();
			feed(&mut receiver, &[0xF8, 0xF0, 0x02, 0xF7, 0x90, 0x41, 0x7F]);
			processor.process_messages();
		}
		// each hook saw the first pass only
		assert!(wire.messages == vec![Message::from_status(0xF8)]);
		assert!(transport.clock_pulses == vec![0]);
		assert!(log.bytes == vec![0x01]);
		assert!(log.terminated == 1);
		assert!(trace.messages == vec![Message::new(0x90, 0x40, 0x7F)]);
	}
}
