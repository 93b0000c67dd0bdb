// Copyright (c) 2019 Parity Technologies (UK) Ltd.
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

//! Websocket server [handshake].
//!
//! Two entry points share the same request validation: [`http`] works on
//! requests already parsed by an HTTP server (e.g. hyper), [`server`] reads
//! the request straight off a socket.
//!
//! [handshake]: https://tools.ietf.org/html/rfc6455#section-4

pub mod http;
pub mod server;

use base64::Engine;
use sha1::{Digest, Sha1};
use smallvec::SmallVec;
use std::{fmt, io};

/// Defined in RFC6455 and used to generate the `Sec-WebSocket-Accept` header
/// in the server handshake response.
pub const KEY: &[u8] = b"258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

// How many HTTP headers do we support during parsing?
const MAX_NUM_HEADERS: usize = 32;

const UPGRADE: &str = "Upgrade";
const CONNECTION: &str = "Connection";
const SEC_WEBSOCKET_KEY: &str = "Sec-WebSocket-Key";

/// Compute the `Sec-WebSocket-Accept` value for a client's `Sec-WebSocket-Key`.
pub fn generate_accept_key(key: &[u8]) -> String {
	let mut digest = Sha1::new();
	digest.update(key);
	digest.update(KEY);
	base64::engine::general_purpose::STANDARD.encode(digest.finalize())
}

/// Client handshake request which passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientRequest {
	ws_key: SmallVec<[u8; 32]>,
}

impl ClientRequest {
	/// A reference to the nonce.
	pub fn key(&self) -> &[u8] {
		&self.ws_key
	}

	/// The `Sec-WebSocket-Accept` value answering this request.
	pub fn accept_key(&self) -> String {
		generate_accept_key(&self.ws_key)
	}
}

/// Validate method and upgrade headers of a client request.
///
/// `headers` yields `(name, value)` pairs in the order they were received.
fn validate_request<'h, I>(method: &str, headers: I) -> Result<ClientRequest, Error>
where
	I: Iterator<Item = (&'h str, &'h [u8])> + Clone,
{
	if method != "GET" {
		return Err(Error::InvalidRequestMethod);
	}

	with_first_header(headers.clone(), UPGRADE, |value| {
		if trim(value).eq_ignore_ascii_case(b"websocket") {
			Ok(())
		} else {
			Err(Error::UnexpectedHeader(UPGRADE.into()))
		}
	})?;

	with_first_header(headers.clone(), CONNECTION, |value| {
		if contains_token(value, b"upgrade") {
			Ok(())
		} else {
			Err(Error::UnexpectedHeader(CONNECTION.into()))
		}
	})?;

	let ws_key = with_first_header(headers, SEC_WEBSOCKET_KEY, |k| Ok(SmallVec::from_slice(k)))?;

	Ok(ClientRequest { ws_key })
}

/// Pick the first header with the given name and apply the given closure to it.
fn with_first_header<'h, I, F, R>(mut headers: I, name: &str, f: F) -> Result<R, Error>
where
	I: Iterator<Item = (&'h str, &'h [u8])>,
	F: FnOnce(&'h [u8]) -> Result<R, Error>,
{
	if let Some((_, value)) = headers.find(|(n, _)| n.eq_ignore_ascii_case(name)) {
		f(value)
	} else {
		Err(Error::HeaderNotFound(name.into()))
	}
}

/// Check if a comma separated header value contains the given token.
fn contains_token(value: &[u8], token: &[u8]) -> bool {
	value.split(|&c| c == b',').any(|x| trim(x).eq_ignore_ascii_case(token))
}

fn trim(x: &[u8]) -> &[u8] {
	let from = match x.iter().position(|x| !x.is_ascii_whitespace()) {
		Some(i) => i,
		None => return &[],
	};
	let to = x.iter().rposition(|x| !x.is_ascii_whitespace()).unwrap_or(from);
	&x[from..=to]
}

// Handshake error type ///////////////////////////////////////////////////////////////////////////

/// Enumeration of possible handshake errors.
///
/// Every variant means the upgrade request is rejected and the connection
/// is never taken over.
#[derive(Debug)]
pub enum Error {
	/// An I/O error has been encountered.
	Io(io::Error),
	/// An HTTP version =/= 1.1 was encountered.
	UnsupportedHttpVersion,
	/// The handshake request was not a GET request.
	InvalidRequestMethod,
	/// An HTTP header has not been present.
	HeaderNotFound(String),
	/// An HTTP header value was not expected.
	UnexpectedHeader(String),
	/// The HTTP entity could not be parsed successfully.
	Http(Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Error::Io(e) => write!(f, "i/o error: {}", e),
			Error::Http(e) => write!(f, "http parser error: {}", e),
			Error::HeaderNotFound(n) => write!(f, "header {} not found", n),
			Error::UnexpectedHeader(n) => write!(f, "header {} had unexpected value", n),
			Error::UnsupportedHttpVersion => f.write_str("http version was not 1.1"),
			Error::InvalidRequestMethod => f.write_str("handshake not a GET request"),
		}
	}
}

impl std::error::Error for Error {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			Error::Io(e) => Some(e),
			Error::Http(e) => Some(&**e),
			Error::HeaderNotFound(_)
			| Error::UnexpectedHeader(_)
			| Error::UnsupportedHttpVersion
			| Error::InvalidRequestMethod => None,
		}
	}
}

impl From<io::Error> for Error {
	fn from(e: io::Error) -> Self {
		Error::Io(e)
	}
}
