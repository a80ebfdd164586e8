use crate::bytes;
use crate::message::Message;

/** Everything the decoder can report, as one wiring trait. The thru
  * pipeline implements this internally; standalone decoder users implement
  * the callbacks they care about. */
pub trait DecodeSink {
	/** A completely assembled non-realtime message. */
	fn standard_message(&mut self, message: Message);
	/** A realtime status byte with its arrival timestamp, delivered the
	  * moment it comes in. */
	fn realtime_message(&mut self, status: u8, timestamp: u32);
	/** `terminated` reports a previously open sysex transfer being closed,
	  * `started` a fresh 0xF0. */
	fn sysex_status_changed(&mut self, terminated: bool, started: bool);
	fn sysex_byte(&mut self, byte: u8);
}

/** A sysex consumer attachable to the receive half of the pipeline. Payload
  * storage is the implementation's business, nothing is buffered upstream. */
pub trait SysExSink: Send {
	fn sysex_status_changed(&mut self, terminated: bool, started: bool);
	fn sysex_byte(&mut self, byte: u8);
}

/** The byte stream state machine. Bytes go in one at a time, messages and
  * events come out through the sink. Four fields of state, no buffering
  * beyond one pending data byte, cheap enough for an interrupt handler.
  *
  * Running status is honored: after a complete channel voice message the
  * status byte may be omitted. Realtime bytes pass through transparently,
  * even in the middle of another message or a sysex transfer. Stray data
  * bytes without a preceding status are dropped. */
pub struct ByteStreamDecoder {
	running_status: u8, // 0 = none seen yet
	pending_first: u8,
	awaiting_second: bool,
	sysex_in_progress: bool,
}

impl ByteStreamDecoder {
	pub const fn new() -> ByteStreamDecoder {
		ByteStreamDecoder {
			running_status: 0,
			pending_first: bytes::INVALID,
			awaiting_second: false,
			sysex_in_progress: false,
		}
	}

	pub fn receive_byte<S: DecodeSink>(&mut self, byte: u8, timestamp: u32, sink: &mut S) {
		if bytes::is_status_byte(byte) {
			self.process_status_byte(byte, timestamp, sink);
		}
		else {
			self.process_data_byte(byte, sink);
		}
	}

	fn process_status_byte<S: DecodeSink>(&mut self, byte: u8, timestamp: u32, sink: &mut S) {
		if bytes::is_system_realtime(byte) {
			// realtime bytes may interrupt anything, even a sysex
			// transfer, without touching the decoder state
			sink.realtime_message(byte, timestamp);
			return;
		}
		if byte == 0xF0 {
			self.sysex_in_progress = true;
			sink.sysex_status_changed(false, true);
			return;
		}
		// any other status byte ends an open sysex transfer, 0xF7 included
		let sysex_was_open = self.sysex_in_progress;
		self.sysex_in_progress = false;
		self.running_status = byte;
		self.awaiting_second = false;
		if sysex_was_open {
			sink.sysex_status_changed(true, false);
		}
		if byte == 0xF6 {
			// tune request is complete without data bytes
			sink.standard_message(Message::from_status(byte));
		}
	}

	fn process_data_byte<S: DecodeSink>(&mut self, byte: u8, sink: &mut S) {
		debug_assert!(self.running_status == 0 || bytes::is_status_byte(self.running_status));
		debug_assert!(!bytes::is_system_realtime(self.running_status));
		if self.sysex_in_progress {
			sink.sysex_byte(byte);
			return;
		}
		if self.awaiting_second {
			self.awaiting_second = false;
			sink.standard_message(Message::new(self.running_status, self.pending_first, byte));
			if self.running_status == 0xF2 {
				// song position pointer does not establish running status
				self.running_status = 0;
			}
			return;
		}
		if self.running_status == 0 {
			return; // joined mid-stream, wait for the next status byte
		}
		match bytes::status_code(self.running_status) {
			0x80 | 0x90 | 0xA0 | 0xB0 | 0xE0 => {
				// two data byte families
				self.pending_first = byte;
				self.awaiting_second = true;
			}
			0xC0 | 0xD0 => {
				// one data byte, running status stays in effect
				sink.standard_message(Message::new(self.running_status, byte, bytes::INVALID));
			}
			_ => match self.running_status {
				0xF2 => {
					self.pending_first = byte;
					self.awaiting_second = true;
				}
				0xF1 | 0xF3 => {
					// one data byte, system common never continues
					sink.standard_message(Message::new(self.running_status, byte, bytes::INVALID));
					self.running_status = 0;
				}
				_ => {} // no message family takes data here, drop the byte
			},
		}
	}
}
