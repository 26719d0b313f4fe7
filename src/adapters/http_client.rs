//! Blocking HTTP transport for the agent.
//!
//! One [`CommandTransport::take_command`] call is one
//! `POST <server>/api/take_command` with `{"host": ...}`, bounded by the
//! configured timeout.  The response body is returned exactly as received;
//! the reconciler decides whether it is a valid command.

use std::time::Duration;

use log::debug;
use serde::Serialize;

use crate::app::ports::{CommandTransport, TransportError};

pub struct HttpTransport {
    client: reqwest::blocking::Client,
    url: String,
}

#[derive(Serialize)]
struct TakeCommandBody<'a> {
    host: &'a str,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

impl CommandTransport for HttpTransport {
    fn take_command(&mut self, host: &str) -> Result<String, TransportError> {
        let response = self
            .client
            .post(&self.url)
            .json(&TakeCommandBody { host })
            .send()
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }
        let body = response
            .text()
            .map_err(|e| TransportError::Body(e.to_string()))?;
        debug!("HttpTransport: {} -> {body:?}", self.url);
        Ok(body)
    }
}

fn classify(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_connect() {
        TransportError::Connect(e.to_string())
    } else {
        TransportError::Request(e.to_string())
    }
}
