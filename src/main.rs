// Copyright (c) 2021 Parity Technologies (UK) Ltd.
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

// HTTP traffic is handled with hyper and websocket connections with wsgate, on
// the same port: `GET /` serves `index.html` from the working directory and
// `GET /ws` upgrades to a websocket whose messages are logged.
//
// Start with `RUST_LOG=info cargo run --features server-bin`, navigate to
// localhost:8080 and, in the browser JS console, run:
//
// ```
// var socket = new WebSocket("ws://localhost:8080/ws");
// socket.onopen = function() { socket.send("Hello!") };
// ```

use std::{io, net::SocketAddr};

use http_body_util::Full;
use hyper::{
	body::{Bytes, Incoming},
	header::{self, HeaderValue},
	server::conn::http1,
	service::service_fn,
	Request, Response, StatusCode,
};
use hyper_util::rt::TokioIo;
use tokio_util::compat::TokioAsyncReadCompatExt;
use wsgate::{
	connection,
	handshake::http::{negotiate_upgrade, reject},
	BoxedError, Data,
};

type FullBody = Full<Bytes>;

const ADDRESS: ([u8; 4], u16) = ([127, 0, 0, 1], 8080);

const INDEX: &str = "index.html";

#[tokio::main]
async fn main() -> Result<(), BoxedError> {
	env_logger::init();

	let addr: SocketAddr = ADDRESS.into();
	let listener = tokio::net::TcpListener::bind(addr).await?;

	log::info!("Listening on http://{}", listener.local_addr()?);

	loop {
		let stream = match listener.accept().await {
			Ok((stream, addr)) => {
				log::debug!("Accepting new connection: {addr}");
				stream
			}
			Err(e) => {
				log::error!("Accepting new connection failed: {e}");
				continue;
			}
		};

		tokio::spawn(async move {
			let io = TokioIo::new(stream);
			let conn = http1::Builder::new().serve_connection(io, service_fn(handler));

			// Enable upgrades on the connection for the websocket upgrades to work.
			let conn = conn.with_upgrades();

			if let Err(err) = conn.await {
				log::error!("HTTP connection failed {err}");
			}
		});
	}
}

/// Route incoming HTTP requests.
async fn handler(req: Request<Incoming>) -> Result<Response<FullBody>, BoxedError> {
	let path = req.uri().path().to_owned();
	match path.as_str() {
		"/" => serve_index().await,
		"/ws" => Ok(upgrade(req)),
		_ => Ok(with_status(StatusCode::NOT_FOUND)),
	}
}

async fn serve_index() -> Result<Response<FullBody>, BoxedError> {
	match tokio::fs::read(INDEX).await {
		Ok(contents) => {
			let mut response = Response::new(FullBody::from(contents));
			response.headers_mut().insert(header::CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"));
			Ok(response)
		}
		Err(e) if e.kind() == io::ErrorKind::NotFound => {
			log::warn!("{} not found", INDEX);
			Ok(with_status(StatusCode::NOT_FOUND))
		}
		Err(e) => Err(e.into()),
	}
}

fn with_status(status: StatusCode) -> Response<FullBody> {
	let mut response = Response::new(FullBody::default());
	*response.status_mut() = status;
	response
}

/// Answer the upgrade request and, if accepted, spawn a task taking over the stream.
fn upgrade(req: Request<Incoming>) -> Response<FullBody> {
	match negotiate_upgrade(&req) {
		Ok(negotiation) => {
			let response = negotiation.into_response();
			// Awaiting the upgrade won't succeed until the response has been
			// handed back to hyper, so this must run on a separate task.
			tokio::spawn(async move {
				if let Err(e) = log_messages(req).await {
					log::error!("Websocket connection failed: {}", e);
				}
			});
			response.map(|()| FullBody::default())
		}
		Err(e) => {
			log::warn!("Not a websocket handshake: {}", e);
			reject().map(|()| FullBody::default())
		}
	}
}

/// Take over the upgraded stream and log every message received on it.
async fn log_messages(req: Request<Incoming>) -> Result<(), BoxedError> {
	let stream = match hyper::upgrade::on(req).await {
		Ok(stream) => stream,
		Err(e) => {
			log::error!("Stream takeover failed: {}", e);
			return Ok(());
		}
	};
	let io = TokioIo::new(stream);
	let mut receiver = connection::Builder::new(io.compat()).finish();

	let mut message = Vec::new();
	loop {
		message.clear();
		match receiver.receive_data(&mut message).await {
			Ok(Data::Text(n)) => log::info!("Received text ({} bytes): {}", n, String::from_utf8_lossy(&message)),
			Ok(Data::Binary(n)) => log::info!("Received binary ({} bytes): {:02x?}", n, message),
			Err(connection::Error::Closed) => break,
			Err(e) => return Err(e.into()),
		}
	}

	log::debug!("Websocket connection closed");
	Ok(())
}
