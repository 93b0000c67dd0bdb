// Copyright (c) 2019 Parity Technologies (UK) Ltd.
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

//! Server side of the [RFC6455][rfc6455] websocket protocol on top of a
//! byte stream taken over from an HTTP connection.
//!
//! The crate is organised in three layers:
//!
//! - [`handshake`] validates upgrade requests and computes the
//!   `Sec-WebSocket-Accept` response header,
//! - [`base`] decodes frame headers and removes the payload masking,
//! - [`connection`] drives both over the upgraded stream, reassembling
//!   fragmented messages and answering control frames.
//!
//! A server accepting a connection on a plain socket looks like this:
//!
//! ```no_run
//! # use futures::io::{AsyncRead, AsyncWrite};
//! # async fn doc<T: AsyncRead + AsyncWrite + Unpin>(socket: T) -> Result<(), wsgate::BoxedError> {
//! use wsgate::handshake::server::{Response, Server};
//!
//! let mut server = Server::new(socket);
//! let key = match server.receive_request().await {
//!     Ok(request) => request.key().to_vec(),
//!     Err(e) => {
//!         server.send_response(&Response::Reject { status_code: 400 }).await?;
//!         return Err(e.into())
//!     }
//! };
//! server.send_response(&Response::Accept { key: &key }).await?;
//!
//! let mut receiver = server.into_builder().finish();
//! let mut message = Vec::new();
//! let data = receiver.receive_data(&mut message).await?;
//! assert_eq!(data.len(), message.len());
//! # Ok(())
//! # }
//! ```
//!
//! [rfc6455]: https://tools.ietf.org/html/rfc6455

#![deny(missing_docs)]

pub mod base;
pub mod connection;
pub mod data;
pub mod handshake;


pub use connection::{Builder, Receiver};
pub use data::Data;

/// A parsing result.
#[derive(Debug, Clone)]
pub(crate) enum Parsing<T, N = ()> {
	/// Parsing completed.
	Done {
		/// The parsed value.
		value: T,
		/// The offset into the byte slice that has been consumed.
		offset: usize,
	},
	/// Parsing is incomplete and needs more data.
	NeedMore(N),
}

/// Boxed error type used at application boundaries.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;
