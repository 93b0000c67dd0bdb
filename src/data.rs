// Copyright (c) 2019 Parity Technologies (UK) Ltd.
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

//! Types describing messages handed out by a [`Receiver`](crate::Receiver).

/// Type and length of a message received from the remote end.
///
/// The payload itself is appended to the buffer passed to
/// [`Receiver::receive_data`](crate::connection::Receiver::receive_data).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Data {
	/// Textual data (number of bytes).
	Text(usize),
	/// Binary data (number of bytes).
	Binary(usize),
}

impl Data {
	/// Is this text data?
	pub fn is_text(&self) -> bool {
		matches!(self, Data::Text(_))
	}

	/// Is this binary data?
	pub fn is_binary(&self) -> bool {
		matches!(self, Data::Binary(_))
	}

	/// The length of data (number of bytes).
	pub fn len(&self) -> usize {
		match self {
			Data::Text(n) | Data::Binary(n) => *n,
		}
	}

	/// Is the message empty?
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}
