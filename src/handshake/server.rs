// Copyright (c) 2019 Parity Technologies (UK) Ltd.
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

//! Websocket server [handshake] performed directly on a socket.
//!
//! [handshake]: https://tools.ietf.org/html/rfc6455#section-4

use super::{validate_request, ClientRequest, Error, MAX_NUM_HEADERS};
use crate::{
	connection::{self, Builder},
	Parsing,
};
use bytes::BytesMut;
use futures::prelude::*;
use http::StatusCode;
use log::{debug, trace};

const BLOCK_SIZE: usize = 8192;

/// Upper bound of a handshake request's size.
const MAX_REQUEST_SIZE: usize = 64 * 1024;

/// Websocket handshake server.
#[derive(Debug)]
pub struct Server<T> {
	socket: T,
	/// Encoding/decoding buffer.
	buffer: BytesMut,
}

impl<T: AsyncRead + AsyncWrite + Unpin> Server<T> {
	/// Create a new server handshake.
	pub fn new(socket: T) -> Self {
		Server { socket, buffer: BytesMut::new() }
	}

	/// Await an incoming client handshake request.
	pub async fn receive_request(&mut self) -> Result<ClientRequest, Error> {
		self.buffer.clear();
		let mut block = [0; BLOCK_SIZE];
		loop {
			let n = self.socket.read(&mut block).await?;
			if n == 0 {
				return Err(Error::Io(std::io::ErrorKind::UnexpectedEof.into()));
			}
			trace!("read {} bytes", n);
			self.buffer.extend_from_slice(&block[..n]);
			if let Parsing::Done { value, offset } = self.decode_request()? {
				let _ = self.buffer.split_to(offset);
				return Ok(value);
			}
			if self.buffer.len() > MAX_REQUEST_SIZE {
				return Err(Error::Http("handshake request too large".into()));
			}
		}
	}

	/// Respond to the client.
	pub async fn send_response(&mut self, r: &Response<'_>) -> Result<(), Error> {
		let mut buf = BytesMut::new();
		encode_response(r, &mut buf);
		self.socket.write_all(&buf).await?;
		self.socket.flush().await?;
		Ok(())
	}

	/// Turn this handshake into a [`connection::Builder`].
	///
	/// Bytes which arrived after the handshake request are handed over to
	/// the connection.
	pub fn into_builder(self) -> Builder<T> {
		let mut builder = connection::Builder::new(self.socket);
		builder.set_buffer(self.buffer);
		builder
	}

	// Decode client handshake request.
	fn decode_request(&self) -> Result<Parsing<ClientRequest>, Error> {
		let mut header_buf = [httparse::EMPTY_HEADER; MAX_NUM_HEADERS];
		let mut request = httparse::Request::new(&mut header_buf);

		let offset = match request.parse(&self.buffer) {
			Ok(httparse::Status::Complete(off)) => off,
			Ok(httparse::Status::Partial) => return Ok(Parsing::NeedMore(())),
			Err(e) => return Err(Error::Http(Box::new(e))),
		};

		if request.version != Some(1) {
			return Err(Error::UnsupportedHttpVersion);
		}

		let method = request.method.unwrap_or_default();
		let headers = request.headers.iter().map(|h| (h.name, h.value));
		let client_request = validate_request(method, headers)?;
		debug!("{} {} upgrade request accepted", method, request.path.unwrap_or("/"));

		Ok(Parsing::Done { value: client_request, offset })
	}
}

/// Handshake response the server sends back to the client.
#[derive(Debug)]
pub enum Response<'a> {
	/// The server accepts the handshake request.
	Accept {
		/// The `Sec-WebSocket-Key` of the client request.
		key: &'a [u8],
	},
	/// The server rejects the handshake request.
	Reject {
		/// HTTP response status code.
		status_code: u16,
	},
}

// Encode server handshake response.
fn encode_response(response: &Response<'_>, buf: &mut BytesMut) {
	match response {
		Response::Accept { key } => {
			buf.extend_from_slice(b"HTTP/1.1 101 Switching Protocols");
			buf.extend_from_slice(b"\r\nUpgrade: websocket\r\nConnection: Upgrade");
			buf.extend_from_slice(b"\r\nSec-WebSocket-Accept: ");
			buf.extend_from_slice(super::generate_accept_key(key).as_bytes());
			buf.extend_from_slice(b"\r\n\r\n")
		}
		Response::Reject { status_code } => {
			buf.extend_from_slice(b"HTTP/1.1 ");
			let s = StatusCode::from_u16(*status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
			buf.extend_from_slice(s.as_str().as_bytes());
			buf.extend_from_slice(b" ");
			buf.extend_from_slice(s.canonical_reason().unwrap_or("N/A").as_bytes());
			buf.extend_from_slice(b"\r\nContent-Length: 0\r\n\r\n")
		}
	}
}
