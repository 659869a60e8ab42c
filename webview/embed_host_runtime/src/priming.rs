use crate::error::{EmbedError, Result};
use crate::params::Params;
use crate::state_sync::Snapshot;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde_json::Value;
use std::time::Duration;

pub const PRIMING_PATH: &str = "/data.json";

/// Performs the out-of-band fetch that decides whether the frame renders.
pub trait PrimingClient: Send + Sync {
    fn fetch(&self, widget: &str, params: &Params) -> Result<Snapshot>;
}

pub fn priming_url(widget: &str) -> String {
    format!("{widget}{PRIMING_PATH}")
}

/// Blocking HTTP priming client; run it off the event loop thread.
pub struct HttpPrimingClient {
    client: reqwest::blocking::Client,
}

impl HttpPrimingClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl PrimingClient for HttpPrimingClient {
    fn fetch(&self, widget: &str, params: &Params) -> Result<Snapshot> {
        let url = priming_url(widget);
        let body = serde_json::to_vec(params)?;

        let response = self
            .client
            .post(&url)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()?
            .error_for_status()?;

        let text = response.text()?;
        snapshot_from_body(&text)
    }
}

pub fn snapshot_from_body(body: &str) -> Result<Snapshot> {
    match serde_json::from_str::<Value>(body)? {
        Value::Object(map) => Ok(map),
        other => Err(EmbedError::Priming(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
