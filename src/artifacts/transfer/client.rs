//! Smart-HTTP push client
//!
//! Talks the receive-pack side of the smart HTTP protocol: discover the
//! remote's refs with a GET, then POST one update command and a pack, and
//! read the remote's report-status verdict.
//!
//! Transient network failures (connect errors, timeouts) are retried up to a
//! configured budget with the same request. Protocol violations and explicit
//! remote rejections are never retried.

use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::transfer::pkt_line::{self, Packet};
use crate::errors::TransferError;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::time::Duration;

pub const SERVICE: &str = "git-receive-pack";

/// Capabilities requested alongside the update command.
pub const CAPABILITIES: &str = "report-status agent=grit/0.1";

const RECEIVE_PACK_CONTENT_TYPE: &str = "application/x-git-receive-pack-request";

/// Basic-auth credentials for the remote.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: Option<String>,
}

/// The remote's verdict on a ref update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportStatus {
    /// The remote acknowledged the update with an `ok` line.
    Accepted,
    /// The remote returned a success status but no explicit `ok` marker.
    AmbiguousSuccess,
}

pub struct PushClient {
    url: String,
    http: reqwest::Client,
    credentials: Option<Credentials>,
    retries: u32,
}

impl PushClient {
    pub fn new(
        url: &str,
        credentials: Option<Credentials>,
        timeout: Duration,
        retries: u32,
    ) -> Result<Self, TransferError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(PushClient {
            url: url.trim_end_matches('/').to_string(),
            http,
            credentials,
            retries,
        })
    }

    /// `GET <url>/info/refs?service=git-receive-pack`
    ///
    /// Returns the remote's refname-to-digest map. Refs absent from the map
    /// do not exist on the remote.
    pub async fn discover_refs(&self) -> Result<BTreeMap<String, ObjectId>, TransferError> {
        let url = format!("{}/info/refs?service={SERVICE}", self.url);

        let response = self
            .with_retries("ref discovery", || {
                self.authenticated(self.http.get(&url)).send()
            })
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::Protocol(format!(
                "ref discovery failed with HTTP {status}"
            )));
        }

        let body = response.bytes().await?;
        parse_ref_advertisement(&body)
    }

    /// `POST <url>/git-receive-pack`
    ///
    /// Sends one update command for `refname` plus the pack, and returns the
    /// remote's report-status verdict.
    pub async fn send_pack(
        &self,
        refname: &str,
        old: &ObjectId,
        new: &ObjectId,
        pack: Bytes,
    ) -> Result<ReportStatus, TransferError> {
        let url = format!("{}/{SERVICE}", self.url);
        let body = build_push_body(old, new, refname, &pack);

        let response = self
            .with_retries("pack upload", || {
                self.authenticated(self.http.post(&url))
                    .header(reqwest::header::CONTENT_TYPE, RECEIVE_PACK_CONTENT_TYPE)
                    .body(body.clone())
                    .send()
            })
            .await?;

        let status = response.status();
        if !status.is_success() {
            let reason = response.text().await.unwrap_or_default();
            return Err(TransferError::Rejected(format!("HTTP {status}: {reason}")));
        }

        let report = response.bytes().await?;
        let verdict = parse_report_status(&report)?;
        if verdict == ReportStatus::AmbiguousSuccess {
            tracing::warn!(refname, "remote reported success without an ok marker");
        }

        Ok(verdict)
    }

    fn authenticated(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.credentials {
            Some(credentials) => {
                request.basic_auth(&credentials.username, credentials.password.as_deref())
            }
            None => request,
        }
    }

    /// Run a request, retrying connect failures and timeouts with the same
    /// request up to the retry budget.
    async fn with_retries<F, Fut>(
        &self,
        operation: &str,
        request: F,
    ) -> Result<reqwest::Response, TransferError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<reqwest::Response, reqwest::Error>>,
    {
        let mut attempt = 0;
        loop {
            match request().await {
                Ok(response) => return Ok(response),
                Err(err) if attempt < self.retries && (err.is_connect() || err.is_timeout()) => {
                    attempt += 1;
                    tracing::warn!(
                        operation,
                        attempt,
                        retries = self.retries,
                        error = %err,
                        "transient network failure, retrying"
                    );
                }
                Err(err) => return Err(TransferError::Network(err)),
            }
        }
    }
}

/// The complete push request body: one framed update command, a flush, then
/// the raw pack bytes with no further framing.
fn build_push_body(old: &ObjectId, new: &ObjectId, refname: &str, pack: &[u8]) -> Bytes {
    let command = format!("{old} {new} {refname}\0{CAPABILITIES}");

    let mut body = Vec::with_capacity(command.len() + pack.len() + 8);
    body.extend_from_slice(&pkt_line::encode(command.as_bytes()));
    body.extend_from_slice(&pkt_line::encode(b""));
    body.extend_from_slice(pack);
    Bytes::from(body)
}

/// Parse a ref advertisement into a refname-to-digest map.
///
/// The first line must announce the expected service. The placeholder line
/// an empty remote sends (`<zero-digest> capabilities^{}`) advertises
/// capabilities only and names no ref.
fn parse_ref_advertisement(body: &[u8]) -> Result<BTreeMap<String, ObjectId>, TransferError> {
    let mut cursor = 0;

    let service_line = match pkt_line::read_packet(body, &mut cursor)? {
        Some(Packet::Line(line)) => line,
        _ => {
            return Err(TransferError::Protocol(
                "ref advertisement is missing its service header".to_string(),
            ));
        }
    };
    let expected = format!("# service={SERVICE}");
    if service_line.strip_suffix(b"\n").unwrap_or(&service_line) != expected.as_bytes() {
        return Err(TransferError::Protocol(format!(
            "unexpected service announcement: {:?}",
            String::from_utf8_lossy(&service_line)
        )));
    }

    let mut refs = BTreeMap::new();
    while let Some(packet) = pkt_line::read_packet(body, &mut cursor)? {
        let Packet::Line(line) = packet else {
            continue;
        };

        let line = line.strip_suffix(b"\n").unwrap_or(&line);
        // capability flags after the first NUL are advisory, drop them
        let line = match line.iter().position(|&b| b == b'\0') {
            Some(nul) => &line[..nul],
            None => line,
        };
        let line = String::from_utf8_lossy(line);

        let (hash, refname) = line.split_once(' ').ok_or_else(|| {
            TransferError::Protocol(format!("malformed ref line: {line:?}"))
        })?;
        if refname == "capabilities^{}" {
            continue;
        }

        let oid = ObjectId::try_parse(hash.to_string())
            .map_err(|_| TransferError::Protocol(format!("malformed ref digest: {hash:?}")))?;
        refs.insert(refname.to_string(), oid);
    }

    Ok(refs)
}

/// Parse a report-status response.
///
/// `ng` lines are rejections carrying the server's reason. `ok` lines are
/// acceptance. A response with neither marker is an ambiguous success.
fn parse_report_status(body: &[u8]) -> Result<ReportStatus, TransferError> {
    let mut cursor = 0;
    let mut saw_ok = false;

    while let Some(packet) = pkt_line::read_packet(body, &mut cursor)? {
        let Packet::Line(line) = packet else {
            break;
        };
        let line = String::from_utf8_lossy(line.strip_suffix(b"\n").unwrap_or(&line)).to_string();

        if let Some(reason) = line.strip_prefix("ng ") {
            return Err(TransferError::Rejected(reason.to_string()));
        }
        if line.starts_with("ok ") {
            saw_ok = true;
        }
    }

    if saw_ok {
        Ok(ReportStatus::Accepted)
    } else {
        Ok(ReportStatus::AmbiguousSuccess)
    }
}
