// Copyright (c) 2021 Parity Technologies (UK) Ltd.
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

/*!
Negotiate a websocket upgrade of an [`http::Request`] which has already been
parsed by an HTTP server. Take a look at `src/main.rs` to see this used
together with hyper.
*/

use super::{validate_request, ClientRequest, Error, MAX_NUM_HEADERS};
use http::{header, HeaderValue, Response, StatusCode};
use smallvec::SmallVec;

/// Handed back on a successful call to [`negotiate_upgrade`].
#[derive(Debug)]
pub struct Negotiation {
	request: ClientRequest,
}

impl Negotiation {
	/// The validated client request.
	pub fn request(&self) -> &ClientRequest {
		&self.request
	}

	/// Generate the `101 Switching Protocols` response completing the
	/// upgrade negotiation.
	pub fn into_response(self) -> Response<()> {
		let mut response = Response::new(());
		*response.status_mut() = StatusCode::SWITCHING_PROTOCOLS;
		let headers = response.headers_mut();
		headers.insert(header::UPGRADE, HeaderValue::from_static("websocket"));
		headers.insert(header::CONNECTION, HeaderValue::from_static("Upgrade"));
		// A base64 string is always a valid header value.
		if let Ok(v) = HeaderValue::from_str(&self.request.accept_key()) {
			headers.insert(header::SEC_WEBSOCKET_ACCEPT, v);
		}
		response
	}
}

/// Validate the provided [`http::Request`] as a websocket upgrade request.
pub fn negotiate_upgrade<B>(req: &http::Request<B>) -> Result<Negotiation, Error> {
	if req.version() != http::Version::HTTP_11 {
		return Err(Error::UnsupportedHttpVersion);
	}
	let headers: SmallVec<[(&str, &[u8]); MAX_NUM_HEADERS]> =
		req.headers().iter().map(|(name, value)| (name.as_str(), value.as_bytes())).collect();
	let request = validate_request(req.method().as_str(), headers.iter().copied())?;
	Ok(Negotiation { request })
}

/// Check if a request looks like a websocket upgrade request.
pub fn is_upgrade_request<B>(request: &http::Request<B>) -> bool {
	negotiate_upgrade(request).is_ok()
}

/// A `400 Bad Request` response without any of the negotiation headers.
pub fn reject() -> Response<()> {
	let mut response = Response::new(());
	*response.status_mut() = StatusCode::BAD_REQUEST;
	response
}
