use heapless::Vec;

use crate::bytes::{self, Channel};
use crate::message::Message;

/** Receives the decoded channel voice events for one binding. All values
  * are raw 7 bit wire data; no musical interpretation happens on this side
  * of the boundary. */
pub trait ChannelEventListener: Send {
	fn note_event_received(&mut self, key: u8, velocity: u8, note_on: bool);
	/** Pressure for a single key, or for the whole channel, in which case
	  * `key` holds the invalid marker. */
	fn aftertouch_received(&mut self, pressure: u8, key: u8);
	fn control_change_received(&mut self, number: u8, value: u8);
	fn program_change_received(&mut self, number: u8);
	fn pitch_bend_received(&mut self, lsb: u8, msb: u8);
}

/** The binding table is at capacity. */
#[derive(Debug)]
pub struct BindingTableFull;

struct Binding<'a> {
	channel: Channel,
	listener: Option<&'a mut dyn ChannelEventListener>,
}

/** An ordered table of (channel filter, listener) bindings. dispatch hands
  * each message to every binding whose filter matches, in binding order; a
  * message may reach several listeners, or none.
  *
  * Bindings are mutable slots: the listener can be detached and reattached
  * and the channel filter reassigned at any time. A vacant binding matches
  * as usual but delivers nothing. */
pub struct ChannelRouter<'a, const MAX_BINDINGS: usize> {
	bindings: Vec<Binding<'a>, MAX_BINDINGS>,
}

impl<'a, const MAX_BINDINGS: usize> ChannelRouter<'a, MAX_BINDINGS> {
	pub fn new() -> ChannelRouter<'a, MAX_BINDINGS> {
		ChannelRouter {
			bindings: Vec::new(),
		}
	}

	/** Appends a binding and returns its index. Bindings are never removed,
	  * so the index stays valid for the life of the router. */
	pub fn add_binding(&mut self, channel: Channel, listener: &'a mut dyn ChannelEventListener) -> Result<usize, BindingTableFull> {
		self.bindings.push(Binding { channel, listener: Some(listener) }).map_err(|_| BindingTableFull)?;
		return Ok(self.bindings.len() - 1);
	}

	pub fn binding_count(&self) -> usize {
		self.bindings.len()
	}

	fn binding_mut(&mut self, index: usize) -> Option<&mut Binding<'a>> {
		debug_assert!(index < self.bindings.len());
		self.bindings.get_mut(index)
	}

	pub fn attach_listener(&mut self, index: usize, listener: &'a mut dyn ChannelEventListener) {
		if let Some(binding) = self.binding_mut(index) {
			binding.listener = Some(listener);
		}
	}

	pub fn detach_listener(&mut self, index: usize) {
		if let Some(binding) = self.binding_mut(index) {
			binding.listener = None;
		}
	}

	pub fn set_binding_channel(&mut self, index: usize, channel: Channel) {
		if let Some(binding) = self.binding_mut(index) {
			binding.channel = channel;
		}
	}

	pub fn dispatch(&mut self, message: Message) {
		if !message.is_valid() {
			return;
		}
		let status = message.status();
		let first = message.first_data_byte();
		let second = message.second_data_byte();
		for binding in self.bindings.iter_mut() {
			if !bytes::matches_channel(status, binding.channel) {
				continue;
			}
			let listener = match binding.listener.as_mut() {
				Some(listener) => listener,
				None => continue, // vacant slot
			};
			match bytes::status_code(status) {
				0x80 => listener.note_event_received(first, second, false),
				0x90 => listener.note_event_received(first, second, true),
				0xA0 => listener.aftertouch_received(second, first), // pressure is the second byte
				0xB0 => listener.control_change_received(first, second),
				0xC0 => listener.program_change_received(first),
				0xD0 => listener.aftertouch_received(first, bytes::INVALID),
				0xE0 => listener.pitch_bend_received(first, second),
				_ => {}
			}
		}
	}
}
