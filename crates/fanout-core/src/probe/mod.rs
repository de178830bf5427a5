//! HTTP HEAD probing.
//!
//! Uses the curl crate (libcurl) to issue one HEAD request per attempt and
//! reports failures in the vocabulary the retry classifier understands, so a
//! probe can run directly under the retry driver.

mod batch;
mod parse;

pub use batch::{probe_all, ProbeRecord, ProbeReport};

use anyhow::{Context, Result};
use serde::Serialize;
use std::str;

use crate::config::ProbeConfig;
use crate::retry::{Fault, HttpStatusError, NetFault};

/// Result of a successful HEAD request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeResponse {
    /// Final HTTP status (2xx) after redirects.
    pub status: u16,
    /// Size in bytes, if the final response sent `Content-Length`.
    pub content_length: Option<u64>,
}

/// Performs a HEAD request against `url`.
///
/// Follows redirects. Runs in the current thread; call from `spawn_blocking`
/// if used from async code.
pub fn head(url: &str, cfg: &ProbeConfig) -> Result<ProbeResponse> {
    check_url(url)?;

    let mut headers: Vec<String> = Vec::new();
    let mut easy = curl::easy::Easy::new();
    easy.url(url)
        .map_err(|e| anyhow::Error::new(Fault::BadRequest).context(format!("invalid URL {}: {}", url, e)))?;
    easy.nobody(true)?;
    easy.follow_location(true)?;
    easy.connect_timeout(cfg.connect_timeout())?;
    easy.timeout(cfg.timeout())?;

    {
        let mut transfer = easy.transfer();
        transfer.header_function(|data| {
            if let Ok(s) = str::from_utf8(data) {
                headers.push(s.trim_end().to_string());
            }
            true
        })?;
        transfer.perform().map_err(|e| transport_error(url, e))?;
    }

    let code = easy.response_code().context("no response code")?;
    let status = u16::try_from(code).context("response code out of range")?;
    if !(200..300).contains(&status) {
        return Err(anyhow::Error::new(HttpStatusError::new(status)).context(format!("HEAD {}", url)));
    }

    Ok(ProbeResponse {
        status,
        content_length: parse::content_length(&headers),
    })
}

/// Only absolute http(s) URLs are probed; anything else is the caller's mistake.
fn check_url(raw: &str) -> Result<()> {
    let parsed = url::Url::parse(raw)
        .map_err(|e| anyhow::Error::new(Fault::BadRequest).context(format!("invalid URL {}: {}", raw, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(anyhow::Error::new(Fault::BadRequest)
            .context(format!("unsupported scheme {:?} in {}", other, raw))),
    }
}

/// Map a libcurl failure onto network flags the classifier can judge.
fn transport_error(url: &str, e: curl::Error) -> anyhow::Error {
    let message = format!("HEAD {}: {}", url, e);
    if e.is_operation_timedout() {
        return NetFault::timeout(message).into();
    }
    if e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_send_error()
        || e.is_recv_error()
        || e.is_got_nothing()
        || e.is_partial_file()
    {
        return NetFault::temporary(message).into();
    }
    anyhow::Error::new(e).context(format!("HEAD {} failed", url))
}
