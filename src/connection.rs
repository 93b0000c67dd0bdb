// Copyright (c) 2019 Parity Technologies (UK) Ltd.
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

//! The receiving side of an upgraded websocket connection.
//!
//! A [`Receiver`] owns the socket exclusively. It reads raw bytes into an
//! accumulating buffer, cuts frames off its front with [`base::Codec`],
//! reassembles fragmented messages and answers PING and CLOSE frames on its
//! own.

use crate::base::{self, Conformance, Header, OpCode};
use crate::data::Data;
use bytes::BytesMut;
use futures::prelude::*;
use log::{debug, trace};
use std::{fmt, io};

/// Max. number of bytes requested from the socket per read.
pub const READ_BLOCK_SIZE: usize = 1024;

/// Default upper bound of a reassembled message.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Close code for a normal closure.
const NORMAL_CLOSURE: u16 = 1000;

/// Close code for a protocol error.
const PROTOCOL_ERROR: u16 = 1002;

/// Close code for data inconsistent with the message type, e.g. non UTF-8 text.
const INVALID_PAYLOAD_DATA: u16 = 1007;

/// Configures and creates a [`Receiver`].
#[derive(Debug)]
pub struct Builder<T> {
	socket: T,
	codec: base::Codec,
	buffer: BytesMut,
	max_message_size: usize,
}

impl<T: AsyncRead + AsyncWrite + Unpin> Builder<T> {
	/// Create a new `Builder` from the given socket.
	pub fn new(socket: T) -> Self {
		Builder { socket, codec: base::Codec::new(), buffer: BytesMut::new(), max_message_size: DEFAULT_MAX_MESSAGE_SIZE }
	}

	/// Set a custom buffer to use, e.g. bytes read past a handshake request.
	pub fn set_buffer(&mut self, b: BytesMut) -> &mut Self {
		self.buffer = b;
		self
	}

	/// Set how strictly incoming frames are checked.
	pub fn set_conformance(&mut self, c: Conformance) -> &mut Self {
		self.codec.set_conformance(c);
		self
	}

	/// Set the maximum size of a single websocket frame payload.
	pub fn set_max_data_size(&mut self, size: usize) -> &mut Self {
		self.codec.set_max_data_size(size);
		self
	}

	/// Set the maximum size of a complete message, which may span several frames.
	pub fn set_max_message_size(&mut self, size: usize) -> &mut Self {
		self.max_message_size = size;
		self
	}

	/// Create a configured [`Receiver`].
	pub fn finish(self) -> Receiver<T> {
		Receiver {
			socket: self.socket,
			codec: self.codec,
			buffer: self.buffer,
			max_message_size: self.max_message_size,
			state: State::Idle,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
	/// Awaiting the first frame of a message.
	Idle,
	/// Fragments of a text or binary message (given by the opcode) have been
	/// received and we expect CONTINUE or control frames.
	Accumulating(OpCode),
	/// Terminal state, the socket has been released.
	Closed,
}

/// Receives websocket messages from the remote end.
#[derive(Debug)]
pub struct Receiver<T> {
	socket: T,
	codec: base::Codec,
	buffer: BytesMut,
	max_message_size: usize,
	state: State,
}

impl<T: AsyncRead + AsyncWrite + Unpin> Receiver<T> {
	/// Receive the next text or binary message.
	///
	/// The message payload is appended to `message`. PING frames are
	/// answered and PONG frames discarded while waiting. Receiving a CLOSE
	/// frame answers it and returns [`Error::Closed`], as does the remote
	/// closing the stream. Every error is terminal: the socket is closed and
	/// subsequent calls return [`Error::Closed`].
	pub async fn receive_data(&mut self, message: &mut Vec<u8>) -> Result<Data, Error> {
		if self.state == State::Closed {
			return Err(Error::Closed);
		}
		let result = self.receive(message).await;
		if let Err(e) = &result {
			match e {
				Error::Closed => debug!("connection closed"),
				e => debug!("connection error: {}", e),
			}
			self.state = State::Closed;
			let _ = self.socket.close().await;
		}
		result
	}

	/// Send a CLOSE frame with a normal closure code and release the socket.
	pub async fn close(&mut self) -> Result<(), Error> {
		if self.state == State::Closed {
			return Ok(());
		}
		self.state = State::Closed;
		self.send_frame(OpCode::Close, &NORMAL_CLOSURE.to_be_bytes()).await?;
		self.socket.close().await?;
		Ok(())
	}

	async fn receive(&mut self, message: &mut Vec<u8>) -> Result<Data, Error> {
		let start = message.len();
		loop {
			let (header, payload) = self.next_frame().await?;
			match (header.opcode(), self.state) {
				(OpCode::Text, State::Idle) | (OpCode::Binary, State::Idle) => {
					self.append(message, start, &payload)?;
					if header.is_fin() {
						return Ok(data(header.opcode(), message.len() - start));
					}
					self.state = State::Accumulating(header.opcode())
				}
				(OpCode::Continue, State::Accumulating(opcode)) => {
					self.append(message, start, &payload)?;
					if header.is_fin() {
						self.state = State::Idle;
						return Ok(data(opcode, message.len() - start));
					}
				}
				(OpCode::Text, _) | (OpCode::Binary, _) | (OpCode::Continue, _) => {
					debug!("unexpected opcode: {}", header.opcode());
					return Err(Error::UnexpectedOpCode(header.opcode()));
				}
				(OpCode::Ping, _) => {
					trace!("answering ping with {} bytes", payload.len());
					self.send_frame(OpCode::Pong, &payload).await?
				}
				(OpCode::Pong, _) => trace!("unexpected pong; ignoring"),
				(OpCode::Close, _) => {
					let answer = close_answer(&payload);
					match answer {
						Some(code) => self.send_frame(OpCode::Close, &code.to_be_bytes()).await?,
						None => self.send_frame(OpCode::Close, &[]).await?,
					}
					return Err(Error::Closed);
				}
				(OpCode::Reserved(n), _) => debug!("ignoring frame with reserved opcode {}", n),
			}
		}
	}

	/// Read until the buffer holds a complete frame and cut it off.
	async fn next_frame(&mut self) -> Result<(Header, BytesMut), Error> {
		let mut block = [0; READ_BLOCK_SIZE];
		loop {
			if let Some(frame) = self.codec.decode(&mut self.buffer)? {
				return Ok(frame);
			}
			let n = self.socket.read(&mut block).await?;
			if n == 0 {
				if !self.buffer.is_empty() {
					debug!("stream ended with {} bytes of an incomplete frame", self.buffer.len());
				}
				return Err(Error::Closed);
			}
			trace!("read {} bytes", n);
			self.buffer.extend_from_slice(&block[..n]);
		}
	}

	fn append(&self, message: &mut Vec<u8>, start: usize, payload: &[u8]) -> Result<(), Error> {
		let current = message.len() - start + payload.len();
		if current > self.max_message_size {
			return Err(Error::MessageTooLarge { current, maximum: self.max_message_size });
		}
		message.extend_from_slice(payload);
		Ok(())
	}

	async fn send_frame(&mut self, opcode: OpCode, payload: &[u8]) -> Result<(), Error> {
		let mut header = Header::new(opcode);
		header.set_payload_len(payload.len() as u64);
		let mut buf = BytesMut::with_capacity(14 + payload.len());
		base::encode_header(&header, &mut buf);
		buf.extend_from_slice(payload);
		self.socket.write_all(&buf).await?;
		self.socket.flush().await?;
		Ok(())
	}
}

fn data(opcode: OpCode, len: usize) -> Data {
	if opcode == OpCode::Text {
		Data::Text(len)
	} else {
		Data::Binary(len)
	}
}

/// The close code to answer a CLOSE frame with, `None` if it carried none.
fn close_answer(data: &[u8]) -> Option<u16> {
	match data {
		[] => {
			debug!("received close frame");
			None
		}
		[_] => Some(PROTOCOL_ERROR),
		[hi, lo, reason @ ..] => {
			let code = u16::from_be_bytes([*hi, *lo]);
			let reason = match std::str::from_utf8(reason) {
				Ok(r) => r,
				Err(_) => return Some(INVALID_PAYLOAD_DATA),
			};
			debug!("received close frame; code = {}; reason = {}", code, reason);
			match code {
				1000..=1003 | 1007..=1011 | 1015 | 3000..=4999 => Some(code), // acceptable codes
				_ => Some(PROTOCOL_ERROR),
			}
		}
	}
}

// Connection error type //////////////////////////////////////////////////////////////////////////

/// Connection error cases.
#[derive(Debug)]
pub enum Error {
	/// Reading from or writing to the socket failed.
	Io(io::Error),
	/// The base codec errored.
	Codec(base::Error),
	/// An unexpected opcode was encountered.
	UnexpectedOpCode(OpCode),
	/// A reassembled message exceeds the configured maximum.
	MessageTooLarge {
		/// Size of the message so far.
		current: usize,
		/// The configured maximum.
		maximum: usize,
	},
	/// The connection is closed.
	Closed,
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Error::Io(e) => write!(f, "i/o error: {}", e),
			Error::Codec(e) => write!(f, "codec error: {}", e),
			Error::UnexpectedOpCode(c) => write!(f, "unexpected opcode: {}", c),
			Error::MessageTooLarge { current, maximum } => {
				write!(f, "message too large: len >= {}, maximum = {}", current, maximum)
			}
			Error::Closed => f.write_str("connection closed"),
		}
	}
}

impl std::error::Error for Error {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			Error::Io(e) => Some(e),
			Error::Codec(e) => Some(e),
			Error::UnexpectedOpCode(_) | Error::MessageTooLarge { .. } | Error::Closed => None,
		}
	}
}

impl From<io::Error> for Error {
	fn from(e: io::Error) -> Self {
		if e.kind() == io::ErrorKind::UnexpectedEof {
			Error::Closed
		} else {
			Error::Io(e)
		}
	}
}

impl From<base::Error> for Error {
	fn from(e: base::Error) -> Self {
		Error::Codec(e)
	}
}

#[cfg(test)]
mod tests {
	use super::close_answer;

	#[test]
	fn close_answers() {
		assert_eq!(None, close_answer(&[]));
		assert_eq!(Some(1002), close_answer(&[0x03]));
		assert_eq!(Some(1000), close_answer(&[0x03, 0xE8]));
		assert_eq!(Some(1001), close_answer(b"\x03\xE9going away"));
		assert_eq!(Some(4000), close_answer(&[0x0F, 0xA0]));
		assert_eq!(Some(1002), close_answer(&[0x03, 0xEC])); // 1004 is reserved
		assert_eq!(Some(1007), close_answer(&[0x03, 0xE8, 0xFF, 0xFE]));
		assert_eq!(Some(1007), close_answer(&[0x03, 0xEC, 0xC3]));
	}
}
