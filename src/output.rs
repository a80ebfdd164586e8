use crate::bytes::{self, Channel};
use crate::message::Message;

/** Anything that accepts a complete message for transmission. The thru
  * pipeline's processing half implements this by queueing; a transport
  * implements it by serializing onto the wire. */
pub trait Transmitter: Send {
	fn send_message(&mut self, message: Message);
}

/** Builds channel voice messages for one fixed channel and forwards them to
  * the attached transmitter. Also usable as a transmitter itself: anything
  * sent through it gets its channel rewritten, which allows chaining. */
pub struct OutputChannel<'a> {
	transmitter: Option<&'a mut dyn Transmitter>,
	channel: Channel,
}

impl<'a> OutputChannel<'a> {
	pub fn new(channel: Channel) -> OutputChannel<'a> {
		OutputChannel {
			transmitter: None,
			channel,
		}
	}

	pub fn attach_transmitter(&mut self, transmitter: &'a mut dyn Transmitter) {
		self.transmitter = Some(transmitter);
	}

	pub fn detach_transmitter(&mut self) {
		self.transmitter = None;
	}

	pub fn channel(&self) -> Channel {
		self.channel
	}

	pub fn send_control_change(&mut self, number: u8, value: u8) {
		let status = bytes::status_for_channel(0xB0, self.channel);
		self.transmit(Message::new(status, number, value));
	}

	pub fn send_program_change(&mut self, number: u8) {
		let status = bytes::status_for_channel(0xC0, self.channel);
		self.transmit(Message::new(status, number, bytes::INVALID));
	}

	fn transmit(&mut self, message: Message) {
		if !message.is_valid() {
			return; // the bound channel cannot go on the wire
		}
		if let Some(transmitter) = self.transmitter.as_mut() {
			transmitter.send_message(message);
		}
	}
}

impl Transmitter for OutputChannel<'_> {
	fn send_message(&mut self, message: Message) {
		if !bytes::is_channel_voice(message.status()) {
			return;
		}
		self.transmit(message.with_channel(self.channel));
	}
}
