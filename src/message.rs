use crate::bytes::{self, Channel, INVALID};

/** One decoded MIDI message: a status byte plus up to two data bytes, packed
  * into four bytes and always passed by value. Data bytes a message does not
  * use hold the invalid marker. The reserved byte is kept at zero so that
  * equality only ever depends on the wire content. */
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Message {
	status: u8,
	data: [u8; 2],
	reserved: u8,
}

impl Message {
	pub const fn new(status: u8, data0: u8, data1: u8) -> Message {
		Message {
			status,
			data: [data0, data1],
			reserved: 0,
		}
	}

	/** A message without data bytes (tune request, realtime). */
	pub const fn from_status(status: u8) -> Message {
		Message::new(status, INVALID, INVALID)
	}

	pub const fn invalid() -> Message {
		Message::from_status(INVALID)
	}

	pub fn status(&self) -> u8 {
		self.status
	}

	/** Reads one of the two data bytes; the index is masked, so even indices
	  * yield the first byte and odd ones the second. */
	pub fn data_byte(&self, index: u8) -> u8 {
		self.data[(index & 1) as usize]
	}

	pub fn first_data_byte(&self) -> u8 {
		self.data[0]
	}

	pub fn second_data_byte(&self) -> u8 {
		self.data[1]
	}

	pub fn is_valid(&self) -> bool {
		bytes::is_valid(self.status)
	}

	/** Returns a copy with the channel nibble replaced. Messages that are
	  * not channel voice come back unchanged; a channel that cannot go on
	  * the wire invalidates the status instead. */
	pub fn with_channel(self, channel: Channel) -> Message {
		if !bytes::is_channel_voice(self.status) {
			return self;
		}
		let status = match channel {
			Channel::Ch(n) if n <= 15 => bytes::set_low_nibble(self.status, n),
			_ => INVALID,
		};
		Message { status, ..self }
	}

	/** Writes the message in wire order into `data`, skipping the data bytes
	  * the message does not carry. Returns the number of bytes written, 0
	  * for an invalid message. */
	pub fn serialize(&self, data: &mut [u8; 3]) -> usize {
		if !self.is_valid() {
			return 0;
		}
		let mut written = 0;
		for byte in [self.status, self.data[0], self.data[1]].iter() {
			if bytes::is_valid(*byte) {
				data[written] = *byte;
				written += 1;
			}
		}
		return written;
	}
}

impl Default for Message {
	fn default() -> Message {
		Message::invalid()
	}
}
