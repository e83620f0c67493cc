//! HTTP status code tables: status → error kind, status → reason phrase.

use super::kind::ErrorKind;

/// Statuses with an explicit kind mapping (everything else falls into a range rule).
pub const STATUS_TABLE: [(u16, ErrorKind); 10] = [
    (400, ErrorKind::Validation),
    (401, ErrorKind::Authentication),
    (403, ErrorKind::Authorization),
    (404, ErrorKind::NotFound),
    (408, ErrorKind::Timeout),
    (429, ErrorKind::RateLimit),
    (500, ErrorKind::Server),
    (502, ErrorKind::Server),
    (503, ErrorKind::Server),
    (504, ErrorKind::Timeout),
];

/// Classify an HTTP status code.
pub fn kind_for_status(code: u16) -> ErrorKind {
    match code {
        400 => ErrorKind::Validation,
        401 => ErrorKind::Authentication,
        403 => ErrorKind::Authorization,
        404 => ErrorKind::NotFound,
        408 | 504 => ErrorKind::Timeout,
        429 => ErrorKind::RateLimit,
        500 | 502 | 503 => ErrorKind::Server,
        400..=499 => ErrorKind::Client,
        500..=599 => ErrorKind::Server,
        _ => ErrorKind::Unknown,
    }
}

/// Standard reason phrase for a status code, if it is one we know.
pub fn status_label(code: u16) -> Option<&'static str> {
    let label = match code {
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad Request",
        401 => "Unauthorized",
        402 => "Payment Required",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        406 => "Not Acceptable",
        408 => "Request Timeout",
        409 => "Conflict",
        410 => "Gone",
        411 => "Length Required",
        412 => "Precondition Failed",
        413 => "Payload Too Large",
        415 => "Unsupported Media Type",
        418 => "I'm a teapot",
        422 => "Unprocessable Entity",
        423 => "Locked",
        425 => "Too Early",
        428 => "Precondition Required",
        429 => "Too Many Requests",
        431 => "Request Header Fields Too Large",
        451 => "Unavailable For Legal Reasons",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        505 => "HTTP Version Not Supported",
        507 => "Insufficient Storage",
        511 => "Network Authentication Required",
        _ => return None,
    };
    Some(label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_table_matches_classifier() {
        for (code, kind) in STATUS_TABLE {
            assert_eq!(kind_for_status(code), kind, "status {code}");
        }
    }

    #[test]
    fn other_4xx_are_client() {
        assert_eq!(kind_for_status(409), ErrorKind::Client);
        assert_eq!(kind_for_status(422), ErrorKind::Client);
        assert_eq!(kind_for_status(499), ErrorKind::Client);
    }

    #[test]
    fn other_5xx_are_server() {
        assert_eq!(kind_for_status(501), ErrorKind::Server);
        assert_eq!(kind_for_status(599), ErrorKind::Server);
    }

    #[test]
    fn unmapped_is_unknown() {
        assert_eq!(kind_for_status(0), ErrorKind::Unknown);
        assert_eq!(kind_for_status(200), ErrorKind::Unknown);
        assert_eq!(kind_for_status(302), ErrorKind::Unknown);
        assert_eq!(kind_for_status(600), ErrorKind::Unknown);
    }

    #[test]
    fn labels() {
        assert_eq!(status_label(404), Some("Not Found"));
        assert_eq!(status_label(503), Some("Service Unavailable"));
        assert_eq!(status_label(299), None);
    }
}
