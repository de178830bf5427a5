//! Parse HTTP response header lines collected during a HEAD transfer.

/// Content-Length of the final response. With redirects followed, curl reports
/// the headers of every hop; a status line starts a new block.
pub(crate) fn content_length(lines: &[String]) -> Option<u64> {
    let mut content_length = None;
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with("HTTP/") {
            content_length = None;
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse::<u64>().ok();
            }
        }
    }
    content_length
}
