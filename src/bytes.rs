/** Wire level MIDI: a byte with the high bit set is a status byte, one with
  * the high bit clear is a data byte. 0xFD is unassigned by the protocol and
  * never occurs in a real transmission; it doubles as the "invalid / not
  * present" marker throughout this crate. */
pub const INVALID: u8 = 0xFD;

/** A channel binding. Ch holds a wire channel 0..=15; Omni matches every
  * channel on input but cannot go on the wire; None matches nothing. */
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum Channel {
	Ch(u8),
	Omni,
	None,
}

pub fn is_data_byte(byte: u8) -> bool {
	return byte & 0x80 == 0;
}

pub fn is_status_byte(byte: u8) -> bool {
	return byte & 0x80 != 0;
}

pub fn is_valid(byte: u8) -> bool {
	return byte != INVALID;
}

pub fn is_system_common(byte: u8) -> bool {
	return byte >= 0xF0;
}

pub fn is_system_realtime(byte: u8) -> bool {
	return byte >= 0xF8;
}

pub fn is_channel_voice(byte: u8) -> bool {
	return byte >= 0x80 && byte < 0xF0;
}

pub fn low_nibble(byte: u8) -> u8 {
	return byte & 0x0F;
}

pub fn set_low_nibble(byte: u8, nibble: u8) -> u8 {
	return (byte & 0xF0) | (nibble & 0x0F);
}

/** The message family of a status byte, i.e. 0x90 for any note on. */
pub fn status_code(byte: u8) -> u8 {
	return byte & 0xF0;
}

pub fn channel_of(byte: u8) -> Channel {
	if is_channel_voice(byte) {
		return Channel::Ch(low_nibble(byte));
	}
	return Channel::None;
}

/** Whether a status byte is addressed to `target`. Statuses that carry no
  * channel (system messages, data bytes) match nothing, not even Omni. */
pub fn matches_channel(status: u8, target: Channel) -> bool {
	let channel = channel_of(status);
	if channel == Channel::None {
		return false;
	}
	if target == Channel::Omni {
		return true;
	}
	return channel == target;
}

/** Builds a channel voice status byte from a family code and a channel.
  * Yields the invalid marker when the channel cannot appear on the wire or
  * the code is not channel voice. */
pub fn status_for_channel(code: u8, channel: Channel) -> u8 {
	match channel {
		Channel::Ch(n) if n <= 15 && is_channel_voice(code) => status_code(code) | n,
		_ => INVALID,
	}
}

/** Joins two 7 bit data bytes into one 14 bit value, as used by pitch bend
  * and song position pointer. */
pub fn concat_14bit(lsb: u8, msb: u8) -> u16 {
	return ((msb as u16 & 0x7F) << 7) | (lsb as u16 & 0x7F);
}
