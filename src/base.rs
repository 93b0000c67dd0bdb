// Copyright (c) 2019 Parity Technologies (UK) Ltd.
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

//! A websocket [base] frame header decoder and accompanying codec.
//!
//! [`decode_header`] and [`unmask`] are pure functions over byte slices.
//! [`Codec`] builds on them to cut complete frames off the front of an
//! accumulating receive buffer and to enforce protocol conformance.
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-------+-+-------------+-------------------------------+
//! |F|R|R|R| opcode|M| Payload len |    Extended payload length    |
//! |I|S|S|S|  (4)  |A|     (7)     |             (16/64)           |
//! |N|V|V|V|       |S|             |   (if payload len==126/127)   |
//! | |1|2|3|       |K|             |                               |
//! +-+-+-+-+-------+-+-------------+ - - - - - - - - - - - - - - - +
//! |     Extended payload length continued, if payload len == 127  |
//! + - - - - - - - - - - - - - - - +-------------------------------+
//! |                               |Masking-key, if MASK set to 1  |
//! +-------------------------------+-------------------------------+
//! | Masking-key (continued)       |          Payload Data         |
//! +-------------------------------- - - - - - - - - - - - - - - - +
//! ```
//!
//! [base]: https://tools.ietf.org/html/rfc6455#section-5.2

use bytes::{Buf, BufMut, BytesMut};
use log::trace;
use std::{convert::TryFrom, fmt};

/// Max. size of a control frame payload.
pub const MAX_CTRL_BODY_SIZE: u64 = 125;

/// Default upper bound of a single frame's payload length.
pub const DEFAULT_MAX_DATA_SIZE: usize = 16 * 1024 * 1024;

// OpCode /////////////////////////////////////////////////////////////////////////////////////////

/// Operation codes defined in [RFC6455](https://tools.ietf.org/html/rfc6455#section-5.2).
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub enum OpCode {
	/// Indicates a continuation frame of a fragmented message.
	Continue,
	/// Indicates a text data frame.
	Text,
	/// Indicates a binary data frame.
	Binary,
	/// Indicates a close control frame.
	Close,
	/// Indicates a ping control frame.
	Ping,
	/// Indicates a pong control frame.
	Pong,
	/// A reserved op code, carrying its 4-bit value.
	Reserved(u8),
}

impl OpCode {
	/// Is this a control opcode?
	pub fn is_control(self) -> bool {
		matches!(self, OpCode::Close | OpCode::Ping | OpCode::Pong)
	}

	/// Is this opcode reserved?
	pub fn is_reserved(self) -> bool {
		matches!(self, OpCode::Reserved(_))
	}
}

impl fmt::Display for OpCode {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			OpCode::Continue => f.write_str("Continue"),
			OpCode::Text => f.write_str("Text"),
			OpCode::Binary => f.write_str("Binary"),
			OpCode::Close => f.write_str("Close"),
			OpCode::Ping => f.write_str("Ping"),
			OpCode::Pong => f.write_str("Pong"),
			OpCode::Reserved(n) => write!(f, "Reserved({})", n),
		}
	}
}

/// Error returned by `OpCode::try_from` if a value does not fit into 4 bits.
#[derive(Debug)]
pub struct UnknownOpCode(());

impl fmt::Display for UnknownOpCode {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.write_str("unknown opcode")
	}
}

impl std::error::Error for UnknownOpCode {}

impl TryFrom<u8> for OpCode {
	type Error = UnknownOpCode;

	fn try_from(val: u8) -> Result<OpCode, Self::Error> {
		if val > 0x0F {
			return Err(UnknownOpCode(()));
		}
		Ok(OpCode::from_nibble(val))
	}
}

impl OpCode {
	/// Map the low 4 bits of `val` to an opcode.
	fn from_nibble(val: u8) -> OpCode {
		match val & 0x0F {
			0 => OpCode::Continue,
			1 => OpCode::Text,
			2 => OpCode::Binary,
			8 => OpCode::Close,
			9 => OpCode::Ping,
			10 => OpCode::Pong,
			n => OpCode::Reserved(n),
		}
	}
}

impl From<OpCode> for u8 {
	fn from(opcode: OpCode) -> u8 {
		match opcode {
			OpCode::Continue => 0,
			OpCode::Text => 1,
			OpCode::Binary => 2,
			OpCode::Close => 8,
			OpCode::Ping => 9,
			OpCode::Pong => 10,
			OpCode::Reserved(n) => n,
		}
	}
}

// Header /////////////////////////////////////////////////////////////////////////////////////////

/// A websocket base frame header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
	fin: bool,
	rsv1: bool,
	rsv2: bool,
	rsv3: bool,
	masked: bool,
	opcode: OpCode,
	/// Only meaningful if `masked` is set, all zeroes otherwise.
	mask: [u8; 4],
	payload_len: u64,
}

impl Header {
	/// Create a new frame header with a given [`OpCode`].
	pub fn new(oc: OpCode) -> Self {
		Header { fin: true, rsv1: false, rsv2: false, rsv3: false, masked: false, opcode: oc, mask: [0; 4], payload_len: 0 }
	}

	/// Is the `fin` flag set?
	pub fn is_fin(&self) -> bool {
		self.fin
	}

	/// Set the `fin` flag.
	pub fn set_fin(&mut self, fin: bool) -> &mut Self {
		self.fin = fin;
		self
	}

	/// Is the `rsv1` flag set?
	pub fn is_rsv1(&self) -> bool {
		self.rsv1
	}

	/// Set the `rsv1` flag.
	pub fn set_rsv1(&mut self, rsv1: bool) -> &mut Self {
		self.rsv1 = rsv1;
		self
	}

	/// Is the `rsv2` flag set?
	pub fn is_rsv2(&self) -> bool {
		self.rsv2
	}

	/// Set the `rsv2` flag.
	pub fn set_rsv2(&mut self, rsv2: bool) -> &mut Self {
		self.rsv2 = rsv2;
		self
	}

	/// Is the `rsv3` flag set?
	pub fn is_rsv3(&self) -> bool {
		self.rsv3
	}

	/// Set the `rsv3` flag.
	pub fn set_rsv3(&mut self, rsv3: bool) -> &mut Self {
		self.rsv3 = rsv3;
		self
	}

	/// Is the `masked` flag set?
	pub fn is_masked(&self) -> bool {
		self.masked
	}

	/// Set the `masked` flag.
	pub fn set_masked(&mut self, masked: bool) -> &mut Self {
		self.masked = masked;
		self
	}

	/// Get the `opcode`.
	pub fn opcode(&self) -> OpCode {
		self.opcode
	}

	/// Set the `opcode`
	pub fn set_opcode(&mut self, opcode: OpCode) -> &mut Self {
		self.opcode = opcode;
		self
	}

	/// Get the masking key.
	pub fn mask(&self) -> [u8; 4] {
		self.mask
	}

	/// Set the masking key.
	pub fn set_mask(&mut self, mask: [u8; 4]) -> &mut Self {
		self.mask = mask;
		self
	}

	/// Get the payload length.
	pub fn payload_len(&self) -> u64 {
		self.payload_len
	}

	/// Set the payload length.
	pub fn set_payload_len(&mut self, len: u64) -> &mut Self {
		self.payload_len = len;
		self
	}
}

impl fmt::Display for Header {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(
			f,
			"fin: {}, rsv1: {}, rsv2: {}, rsv3: {}, opcode: {}, masked: {}, payload_len: {}, mask: {:02x?}",
			self.fin, self.rsv1, self.rsv2, self.rsv3, self.opcode, self.masked, self.payload_len, self.mask
		)
	}
}

// Decoding ///////////////////////////////////////////////////////////////////////////////////////

/// If the payload length byte is 126, the following two bytes represent the
/// actual payload length.
const TWO_EXT: u8 = 126;

/// If the payload length byte is 127, the following eight bytes represent
/// the actual payload length.
const EIGHT_EXT: u8 = 127;

/// Decode the frame header at the start of `data`.
///
/// Returns the header and its size in bytes, i.e. the offset of the first
/// payload byte within `data`. Nothing beyond the header is inspected and no
/// protocol conformance checks are applied (see [`Codec`] for those).
pub fn decode_header(data: &[u8]) -> Result<(Header, usize), Error> {
	if data.len() < 2 {
		return Err(Error::FrameTooShort);
	}

	let first = data[0];
	let second = data[1];

	let mut header = Header::new(OpCode::from_nibble(first));
	header
		.set_fin(first & 0x80 != 0)
		.set_rsv1(first & 0x40 != 0)
		.set_rsv2(first & 0x20 != 0)
		.set_rsv3(first & 0x10 != 0)
		.set_masked(second & 0x80 != 0);

	let mut offset = 2;

	let len = match second & 0x7F {
		TWO_EXT => {
			if data.len() < 4 {
				return Err(Error::ExtendedLengthTruncated(TWO_EXT));
			}
			offset += 2;
			u64::from(u16::from_be_bytes([data[2], data[3]]))
		}
		EIGHT_EXT => {
			if data.len() < 10 {
				return Err(Error::ExtendedLengthTruncated(EIGHT_EXT));
			}
			let mut bytes = [0; 8];
			bytes.copy_from_slice(&data[2..10]);
			offset += 8;
			u64::from_be_bytes(bytes)
		}
		n => u64::from(n),
	};
	header.set_payload_len(len);

	if header.is_masked() {
		if data.len() < offset + 4 {
			return Err(Error::MaskingKeyTruncated);
		}
		header.set_mask([data[offset], data[offset + 1], data[offset + 2], data[offset + 3]]);
		offset += 4;
	}

	Ok((header, offset))
}

/// Return a copy of `data` with the masking `key` applied.
///
/// Masking is an involution: applying the same key twice yields the input.
pub fn unmask(data: &[u8], key: [u8; 4]) -> Vec<u8> {
	data.iter().zip(key.iter().cycle()).map(|(byte, k)| byte ^ k).collect()
}

/// Apply the masking `key` to `buf` in place.
pub fn apply_mask(buf: &mut [u8], key: [u8; 4]) {
	for (byte, &k) in buf.iter_mut().zip(key.iter().cycle()) {
		*byte ^= k;
	}
}

// Encoding ///////////////////////////////////////////////////////////////////////////////////////

/// Append the wire representation of `header` to `buf`.
///
/// The shortest length encoding able to represent `payload_len` is used.
pub fn encode_header(header: &Header, buf: &mut BytesMut) {
	buf.reserve(14);

	let mut first_byte = 0_u8;
	if header.is_fin() {
		first_byte |= 0x80
	}
	if header.is_rsv1() {
		first_byte |= 0x40
	}
	if header.is_rsv2() {
		first_byte |= 0x20
	}
	if header.is_rsv3() {
		first_byte |= 0x10
	}
	first_byte |= u8::from(header.opcode()) & 0x0F;
	buf.put_u8(first_byte);

	let mut second_byte = 0_u8;
	if header.is_masked() {
		second_byte |= 0x80
	}

	let len = header.payload_len();
	if len < u64::from(TWO_EXT) {
		buf.put_u8(second_byte | len as u8);
	} else if len <= u64::from(u16::MAX) {
		buf.put_u8(second_byte | TWO_EXT);
		buf.put_u16(len as u16);
	} else {
		buf.put_u8(second_byte | EIGHT_EXT);
		buf.put_u64(len);
	}

	if header.is_masked() {
		buf.extend_from_slice(&header.mask())
	}
}

// Frame codec ////////////////////////////////////////////////////////////////////////////////////

/// How strictly incoming frames are checked against RFC 6455.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conformance {
	/// Reject unmasked client frames, reserved bits and opcodes, fragmented
	/// control frames and control frames with payloads over 125 bytes.
	Strict,
	/// Accept any frame whose header can be decoded.
	Lenient,
}

impl Default for Conformance {
	fn default() -> Self {
		Conformance::Strict
	}
}

/// Codec cutting complete, unmasked frames off an accumulating buffer.
#[derive(Debug, Clone)]
pub struct Codec {
	conformance: Conformance,
	max_data_size: usize,
}

impl Default for Codec {
	fn default() -> Self {
		Codec::new()
	}
}

impl Codec {
	/// Create a strict codec with the default maximum payload size.
	pub fn new() -> Self {
		Codec { conformance: Conformance::Strict, max_data_size: DEFAULT_MAX_DATA_SIZE }
	}

	/// Get the conformance policy.
	pub fn conformance(&self) -> Conformance {
		self.conformance
	}

	/// Set the conformance policy.
	pub fn set_conformance(&mut self, c: Conformance) -> &mut Self {
		self.conformance = c;
		self
	}

	/// Get the maximum payload size of a single frame.
	pub fn max_data_size(&self) -> usize {
		self.max_data_size
	}

	/// Set the maximum payload size of a single frame.
	///
	/// Frames declaring a larger payload are rejected as soon as their
	/// header has been decoded.
	pub fn set_max_data_size(&mut self, size: usize) -> &mut Self {
		self.max_data_size = size;
		self
	}

	/// Try to decode one frame from the front of `buf`.
	///
	/// Returns `Ok(None)` if `buf` does not yet hold a complete frame, in
	/// which case `buf` is left untouched. Otherwise the frame's bytes are
	/// removed from `buf` and the header is returned together with the
	/// unmasked payload.
	pub fn decode(&self, buf: &mut BytesMut) -> Result<Option<(Header, BytesMut)>, Error> {
		let (header, header_size) = match decode_header(&buf[..]) {
			Ok(h) => h,
			Err(e) if e.is_incomplete() => return Ok(None),
			Err(e) => return Err(e),
		};

		if self.conformance == Conformance::Strict {
			check_conformance(&header)?
		}

		if header.payload_len() > self.max_data_size as u64 {
			return Err(Error::PayloadTooLarge { actual: header.payload_len(), maximum: self.max_data_size as u64 });
		}

		let too_large = || Error::PayloadTooLarge { actual: header.payload_len(), maximum: self.max_data_size as u64 };
		let len = usize::try_from(header.payload_len()).map_err(|_| too_large())?;
		let frame_size = header_size.checked_add(len).ok_or_else(too_large)?;
		if buf.len() < frame_size {
			buf.reserve(frame_size - buf.len());
			return Ok(None);
		}

		trace!("decoded header: {}", header);

		buf.advance(header_size);
		let mut payload = buf.split_to(len);
		if header.is_masked() {
			apply_mask(&mut payload, header.mask())
		}

		Ok(Some((header, payload)))
	}
}

fn check_conformance(header: &Header) -> Result<(), Error> {
	if header.is_rsv1() || header.is_rsv2() || header.is_rsv3() {
		return Err(Error::ReservedBitsSet);
	}
	if !header.is_masked() {
		return Err(Error::UnmaskedClientFrame);
	}
	if header.opcode().is_reserved() {
		return Err(Error::ReservedOpCode);
	}
	if header.opcode().is_control() {
		if !header.is_fin() {
			return Err(Error::FragmentedControl);
		}
		if header.payload_len() > MAX_CTRL_BODY_SIZE {
			return Err(Error::InvalidControlFrameLen);
		}
	}
	Ok(())
}

// Codec error type ///////////////////////////////////////////////////////////////////////////////

/// Error cases while decoding base frames.
#[derive(Debug)]
pub enum Error {
	/// Less than the two mandatory header bytes are available.
	FrameTooShort,
	/// The 16-bit (126) or 64-bit (127) extended length is not fully available.
	ExtendedLengthTruncated(u8),
	/// The four byte masking key is not fully available.
	MaskingKeyTruncated,
	/// A reserved opcode has been received.
	ReservedOpCode,
	/// One of the rsv bits is set but no extension has been negotiated.
	ReservedBitsSet,
	/// A client frame arrived without a masking key.
	UnmaskedClientFrame,
	/// A control frame with the `fin` flag cleared.
	FragmentedControl,
	/// A control frame with a payload larger than 125 bytes.
	InvalidControlFrameLen,
	/// The declared payload length exceeds the configured maximum.
	PayloadTooLarge {
		/// The declared payload length.
		actual: u64,
		/// The configured maximum.
		maximum: u64,
	},
}

impl Error {
	/// Does this error only signal that more bytes are needed?
	pub fn is_incomplete(&self) -> bool {
		matches!(self, Error::FrameTooShort | Error::ExtendedLengthTruncated(_) | Error::MaskingKeyTruncated)
	}
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Error::FrameTooShort => f.write_str("data too short for frame header"),
			Error::ExtendedLengthTruncated(code) => {
				write!(f, "data too short for extended payload length (length code {})", code)
			}
			Error::MaskingKeyTruncated => f.write_str("data too short for masking key"),
			Error::ReservedOpCode => f.write_str("reserved opcode"),
			Error::ReservedBitsSet => f.write_str("reserved bits set without negotiated extension"),
			Error::UnmaskedClientFrame => f.write_str("client frame is not masked"),
			Error::FragmentedControl => f.write_str("fragmented control frame"),
			Error::InvalidControlFrameLen => f.write_str("invalid control frame (len > 125)"),
			Error::PayloadTooLarge { actual, maximum } => {
				write!(f, "payload too large: len = {}, maximum = {}", actual, maximum)
			}
		}
	}
}

impl std::error::Error for Error {}

// Tests //////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
	use super::{apply_mask, decode_header, encode_header, unmask, Codec, Conformance, Error, Header, OpCode};
	use assert_matches::assert_matches;
	use bytes::BytesMut;
	use quickcheck::quickcheck;

	const KEY: [u8; 4] = [0x37, 0xfa, 0x21, 0x3d];

	fn masked_frame(first: u8, payload: &[u8]) -> BytesMut {
		assert!(payload.len() < 126);
		let mut buf = BytesMut::new();
		buf.extend_from_slice(&[first, 0x80 | payload.len() as u8]);
		buf.extend_from_slice(&KEY);
		buf.extend_from_slice(&unmask(payload, KEY));
		buf
	}

	#[test]
	fn decode_unmasked_short_frame() {
		let data = [0x81, 0x05, b'H', b'e', b'l', b'l', b'o'];
		let (header, size) = decode_header(&data).unwrap();
		assert!(header.is_fin());
		assert!(!header.is_rsv1() && !header.is_rsv2() && !header.is_rsv3());
		assert_eq!(OpCode::Text, header.opcode());
		assert!(!header.is_masked());
		assert_eq!(5, header.payload_len());
		assert_eq!([0_u8; 4], header.mask());
		assert_eq!(2, size);
		assert_eq!(b"Hello", &data[size..size + 5]);
	}

	#[test]
	fn decode_masked_frame() {
		let data = masked_frame(0x81, b"Hello");
		let (header, size) = decode_header(&data).unwrap();
		assert!(header.is_masked());
		assert_eq!(5, header.payload_len());
		assert_eq!(KEY, header.mask());
		assert_eq!(6, size);
		assert_eq!(b"Hello".to_vec(), unmask(&data[size..], header.mask()));
	}

	#[test]
	fn decode_two_byte_length() {
		let (header, size) = decode_header(&[0x82, 0x7E, 0x00, 0x7E]).unwrap();
		assert_eq!(OpCode::Binary, header.opcode());
		assert_eq!(126, header.payload_len());
		assert_eq!(4, size);
	}

	#[test]
	fn decode_eight_byte_length() {
		let data = [0x82, 0x7F, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x2A];
		let (header, size) = decode_header(&data).unwrap();
		assert_eq!(0x0001_0000_002A, header.payload_len());
		assert_eq!(10, size);
	}

	#[test]
	fn decode_masked_eight_byte_length() {
		let data = [0x82, 0xFF, 0, 0, 0, 0, 0, 0, 0x01, 0x00, 1, 2, 3, 4];
		let (header, size) = decode_header(&data).unwrap();
		assert_eq!(256, header.payload_len());
		assert_eq!([1_u8, 2, 3, 4], header.mask());
		assert_eq!(14, size);
	}

	#[test]
	fn decode_truncated() {
		assert_matches!(decode_header(&[]), Err(Error::FrameTooShort));
		assert_matches!(decode_header(&[0x81]), Err(Error::FrameTooShort));
		assert_matches!(decode_header(&[0x81, 0x7E, 0x00]), Err(Error::ExtendedLengthTruncated(126)));
		assert_matches!(decode_header(&[0x81, 0x7F, 1, 2, 3, 4, 5, 6, 7]), Err(Error::ExtendedLengthTruncated(127)));
		assert_matches!(decode_header(&[0x81, 0x85, 1, 2, 3]), Err(Error::MaskingKeyTruncated));
		assert_matches!(decode_header(&[0x81, 0xFE, 0x00, 0x7E, 1, 2]), Err(Error::MaskingKeyTruncated));
	}

	#[test]
	fn decode_reserved_opcode_without_checks() {
		let (header, _) = decode_header(&[0x83, 0x00]).unwrap();
		assert_eq!(OpCode::Reserved(3), header.opcode());
		assert_eq!(3, u8::from(header.opcode()));
	}

	#[test]
	fn unmask_empty() {
		assert!(unmask(&[], KEY).is_empty())
	}

	#[test]
	fn unmask_is_involution() {
		fn prop(payload: Vec<u8>, key: u32) -> bool {
			let key = key.to_be_bytes();
			let masked = unmask(&payload, key);
			let mut in_place = masked.clone();
			apply_mask(&mut in_place, key);
			unmask(&masked, key) == payload && in_place == payload
		}
		quickcheck(prop as fn(Vec<u8>, u32) -> bool)
	}

	#[test]
	fn decode_header_is_total() {
		fn prop(data: Vec<u8>) -> bool {
			match decode_header(&data) {
				Ok((header, size)) => {
					let expected = 2
						+ match data[1] & 0x7F {
							126 => 2,
							127 => 8,
							_ => 0,
						} + if header.is_masked() { 4 } else { 0 };
					size == expected && size <= data.len()
				}
				Err(e) => e.is_incomplete(),
			}
		}
		quickcheck(prop as fn(Vec<u8>) -> bool)
	}

	#[test]
	fn codec_waits_for_complete_frame() {
		let codec = Codec::new();
		let frame = masked_frame(0x81, b"Hello");
		for end in 0..frame.len() {
			let mut buf = BytesMut::from(&frame[..end]);
			assert_matches!(codec.decode(&mut buf), Ok(None));
			assert_eq!(end, buf.len());
		}
		let mut buf = frame.clone();
		let (header, payload) = codec.decode(&mut buf).unwrap().unwrap();
		assert_eq!(OpCode::Text, header.opcode());
		assert_eq!(&b"Hello"[..], &payload[..]);
		assert!(buf.is_empty());
	}

	#[test]
	fn codec_decodes_consecutive_frames() {
		let codec = Codec::new();
		let mut buf = masked_frame(0x01, b"Hel");
		buf.extend_from_slice(&masked_frame(0x80, b"lo"));
		buf.extend_from_slice(&[0x89]);

		let (first, payload) = codec.decode(&mut buf).unwrap().unwrap();
		assert!(!first.is_fin());
		assert_eq!(&b"Hel"[..], &payload[..]);

		let (second, payload) = codec.decode(&mut buf).unwrap().unwrap();
		assert!(second.is_fin());
		assert_eq!(OpCode::Continue, second.opcode());
		assert_eq!(&b"lo"[..], &payload[..]);

		assert_matches!(codec.decode(&mut buf), Ok(None));
		assert_eq!(&[0x89_u8][..], &buf[..]);
	}

	#[test]
	fn strict_codec_rejects_nonconforming_frames() {
		let codec = Codec::new();
		let decode = |mut buf: BytesMut| codec.decode(&mut buf);

		assert_matches!(decode(BytesMut::from(&[0x81, 0x00][..])), Err(Error::UnmaskedClientFrame));
		for rsv in [0x40_u8, 0x20, 0x10] {
			assert_matches!(decode(masked_frame(0x81 | rsv, b"")), Err(Error::ReservedBitsSet));
		}
		for res in [3_u8, 4, 5, 6, 7, 11, 12, 13, 14, 15] {
			assert_matches!(decode(masked_frame(0x80 | res, b"")), Err(Error::ReservedOpCode));
		}
		for ctrl in [8_u8, 9, 10] {
			assert_matches!(decode(masked_frame(ctrl, b"")), Err(Error::FragmentedControl));
		}
		let mut long_ping = BytesMut::from(&[0x89, 0xFE, 0x00, 0x7E][..]);
		long_ping.extend_from_slice(&KEY);
		assert_matches!(decode(long_ping), Err(Error::InvalidControlFrameLen));
	}

	#[test]
	fn lenient_codec_accepts_unmasked_frames() {
		let mut codec = Codec::new();
		codec.set_conformance(Conformance::Lenient);
		let mut buf = BytesMut::from(&[0xC1, 0x02, b'h', b'i'][..]);
		let (header, payload) = codec.decode(&mut buf).unwrap().unwrap();
		assert!(header.is_rsv1());
		assert!(!header.is_masked());
		assert_eq!(&b"hi"[..], &payload[..]);
	}

	#[test]
	fn codec_rejects_oversized_payload_before_buffering() {
		let mut codec = Codec::new();
		codec.set_max_data_size(1024);
		let mut buf = BytesMut::from(&[0x82, 0xFE, 0x04, 0x01][..]);
		buf.extend_from_slice(&KEY);
		assert_matches!(codec.decode(&mut buf), Err(Error::PayloadTooLarge { actual: 1025, maximum: 1024 }));
	}

	#[test]
	fn codec_rejects_frame_size_overflow() {
		let mut codec = Codec::new();
		codec.set_max_data_size(usize::MAX);
		let mut buf = BytesMut::from(&[0x82, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 1, 2, 3, 4][..]);
		assert_matches!(codec.decode(&mut buf), Err(Error::PayloadTooLarge { actual: u64::MAX, .. }));
		assert_eq!(14, buf.len());
	}

	#[test]
	fn opcode_conversions() {
		for val in 0..=15_u8 {
			assert_eq!(val, u8::from(OpCode::try_from(val).unwrap()));
		}
		assert_matches!(OpCode::try_from(16), Err(_));
		let (header, _) = decode_header(&[0x8A, 0x00]).unwrap();
		assert_eq!(OpCode::Pong, header.opcode());
	}

	#[test]
	fn encode_uses_shortest_length() {
		let mut header = Header::new(OpCode::Pong);
		let mut buf = BytesMut::new();

		header.set_payload_len(125);
		encode_header(&header, &mut buf);
		assert_eq!(&[0x8A_u8, 125][..], &buf[..]);

		buf.clear();
		header.set_payload_len(126);
		encode_header(&header, &mut buf);
		assert_eq!(&[0x8A_u8, 0x7E, 0x00, 0x7E][..], &buf[..]);

		buf.clear();
		header.set_opcode(OpCode::Binary).set_payload_len(0x1_0000);
		encode_header(&header, &mut buf);
		assert_eq!(&[0x82_u8, 0x7F, 0, 0, 0, 0, 0, 1, 0, 0][..], &buf[..]);
		assert_eq!((header, 10), decode_header(&buf).unwrap());
	}
}
