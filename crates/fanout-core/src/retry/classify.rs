//! Classify operation errors into retry policy error kinds.
//!
//! Rules are checked in a fixed order and each rule looks through the whole
//! error chain, so a tag added as context deep in the chain still counts.

use std::io;

use super::error::{Fault, HttpStatusError, NetFault, RetryError};
use super::policy::ErrorKind;

/// Classify an error. First match wins:
/// semantic timeout/temporary tag, bad-request tag, network flags, HTTP status.
pub fn classify(err: &anyhow::Error) -> ErrorKind {
    let chain = Chain::new(err);

    for fault in chain.find::<Fault>() {
        match fault {
            Fault::Timeout => return ErrorKind::Timeout,
            Fault::Temporary => return ErrorKind::Temporary,
            Fault::BadRequest => {}
        }
    }
    if chain.find::<Fault>().any(|f| *f == Fault::BadRequest) {
        return ErrorKind::BadRequest;
    }
    if let Some(nf) = chain.find::<NetFault>().next() {
        return ErrorKind::Network {
            timeout: nf.timeout,
            temporary: nf.temporary,
        };
    }
    if let Some(kind) = chain.find::<io::Error>().find_map(classify_io_error) {
        return kind;
    }
    if let Some(he) = chain.find::<HttpStatusError>().next() {
        return classify_http_status(he.status);
    }
    ErrorKind::Other
}

/// Whether `err` is worth another attempt. Pure; suitable as the retry predicate.
pub fn is_retryable(err: &anyhow::Error) -> bool {
    classify(err).is_retryable()
}

/// Classify an HTTP status code for retry decisions.
pub fn classify_http_status(code: u16) -> ErrorKind {
    match code {
        429 => ErrorKind::Throttled,
        500..=599 => ErrorKind::Http5xx(code),
        _ => ErrorKind::Http(code),
    }
}

/// Map transport-level io errors onto network flags. `None` for kinds that say
/// nothing about transience (not found, permission, invalid data, ...).
pub fn classify_io_error(e: &io::Error) -> Option<ErrorKind> {
    match e.kind() {
        io::ErrorKind::TimedOut => Some(ErrorKind::Network {
            timeout: true,
            temporary: false,
        }),
        io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::ConnectionRefused
        | io::ErrorKind::Interrupted
        | io::ErrorKind::WouldBlock
        | io::ErrorKind::UnexpectedEof => Some(ErrorKind::Network {
            timeout: false,
            temporary: true,
        }),
        _ => None,
    }
}

/// Every error reachable from `err`: context layers, `source()` links, and the
/// last failure inside any exhausted retry in the chain, so a retry used as an
/// operation (in another retry or a pool task) is judged by what it gave up on.
struct Chain<'a> {
    roots: Vec<&'a anyhow::Error>,
    links: Vec<&'a (dyn std::error::Error + 'static)>,
}

impl<'a> Chain<'a> {
    fn new(err: &'a anyhow::Error) -> Self {
        let mut roots = vec![err];
        let mut links = Vec::new();
        let mut next = 0;
        while let Some(root) = roots.get(next).copied() {
            for e in root.chain() {
                links.push(e);
                if let Some(RetryError::Operation { source, .. }) = e.downcast_ref::<RetryError>() {
                    roots.push(source);
                }
            }
            next += 1;
        }
        Self { roots, links }
    }

    /// All values of type `T`, outermost first. Context layers are only
    /// visible through `anyhow::Error::downcast_ref`, hence the two passes.
    fn find<T>(&self) -> impl Iterator<Item = &'a T> + '_
    where
        T: std::error::Error + Send + Sync + 'static,
    {
        self.roots
            .iter()
            .filter_map(|r| r.downcast_ref::<T>())
            .chain(self.links.iter().filter_map(|e| e.downcast_ref::<T>()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn semantic_tags() {
        assert_eq!(classify(&Fault::Timeout.into()), ErrorKind::Timeout);
        assert_eq!(classify(&Fault::Temporary.into()), ErrorKind::Temporary);
        assert_eq!(classify(&Fault::BadRequest.into()), ErrorKind::BadRequest);
        assert!(is_retryable(&Fault::Timeout.into()));
        assert!(is_retryable(&Fault::Temporary.into()));
        assert!(!is_retryable(&Fault::BadRequest.into()));
    }

    #[test]
    fn tags_are_found_through_context() {
        let err = anyhow::Error::new(Fault::Temporary).context("lookup backend");
        assert!(is_retryable(&err));
        let err = anyhow::Error::new(Fault::BadRequest).context("validate query");
        assert!(!is_retryable(&err));
    }

    #[test]
    fn retryable_tag_beats_bad_request() {
        let err = anyhow::Error::new(Fault::BadRequest).context(Fault::Timeout);
        assert_eq!(classify(&err), ErrorKind::Timeout);
    }

    #[test]
    fn bad_request_beats_http_5xx() {
        let err = anyhow::Error::new(HttpStatusError::new(502)).context(Fault::BadRequest);
        assert_eq!(classify(&err), ErrorKind::BadRequest);
    }

    #[test]
    fn network_flags() {
        assert!(is_retryable(&NetFault::temporary("net temp").into()));
        assert!(is_retryable(&NetFault::timeout("net timeout").into()));
        let neither = NetFault {
            message: "tls handshake".into(),
            timeout: false,
            temporary: false,
        };
        assert!(!is_retryable(&neither.into()));
    }

    #[test]
    fn io_error_kinds() {
        let timed_out = io::Error::new(io::ErrorKind::TimedOut, "read");
        assert!(is_retryable(&timed_out.into()));
        let reset = io::Error::new(io::ErrorKind::ConnectionReset, "peer");
        assert!(is_retryable(&reset.into()));
        let missing = io::Error::new(io::ErrorKind::NotFound, "gone");
        assert_eq!(classify(&missing.into()), ErrorKind::Other);
    }

    #[test]
    fn http_statuses() {
        assert!(is_retryable(&HttpStatusError::new(502).into()));
        assert!(is_retryable(&HttpStatusError::new(429).into()));
        assert!(!is_retryable(&HttpStatusError::new(400).into()));
        assert!(!is_retryable(&HttpStatusError::new(404).into()));
        assert_eq!(classify_http_status(429), ErrorKind::Throttled);
        assert_eq!(classify_http_status(500), ErrorKind::Http5xx(500));
        assert_eq!(classify_http_status(599), ErrorKind::Http5xx(599));
        assert_eq!(classify_http_status(600), ErrorKind::Http(600));
    }

    #[test]
    fn unknown_errors_are_not_retried() {
        assert_eq!(classify(&anyhow::anyhow!("boom")), ErrorKind::Other);
        assert!(!is_retryable(&anyhow::anyhow!("boom")));
    }

    #[test]
    fn exhausted_retry_is_judged_by_last_failure() {
        let inner = RetryError::Operation {
            attempts: 3,
            source: anyhow::Error::new(HttpStatusError::new(503)).context("GET /a"),
        };
        let err = anyhow::Error::new(inner).context("item 4");
        assert_eq!(classify(&err), ErrorKind::Http5xx(503));
    }

    #[test]
    fn idempotent() {
        let err: anyhow::Error = Err::<(), _>(Fault::Temporary)
            .context("first")
            .unwrap_err();
        let first = is_retryable(&err);
        let second = is_retryable(&err);
        assert_eq!(first, second);
        assert_eq!(classify(&err), classify(&err));
    }
}
