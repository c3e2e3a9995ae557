//! Response status, a `(code, message)` pair.

use std::borrow::Cow;
use std::fmt;

use http::StatusCode;

/// An HTTP response status line value.
///
/// The well-known statuses are associated constants; handlers can build any
/// other pair with [`Status::custom`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Status {
    code: u16,
    message: Cow<'static, str>,
}

macro_rules! status_catalog {
    (
        $(
            $(#[$doc:meta])*
            $code:literal $id:ident $msg:literal;
        )*
    ) => {
        impl Status {
            $(
                $(#[$doc])*
                pub const $id: Status = Status::new($code, $msg);
            )*

            /// Looks a code up in the built-in catalog.
            pub fn from_catalog(code: u16) -> Option<Status> {
                match code {
                    $(
                        $code => Some(Self::$id),
                    )*
                    _ => None,
                }
            }
        }
    };
}

status_catalog! {
    // 1xx informational
    100 CONTINUE "Continue";

    // 2xx success
    200 OK "OK";
    201 CREATED "Created";
    202 ACCEPTED "Accepted";
    204 NO_CONTENT "No Content";
    206 PARTIAL_CONTENT "Partial Content";

    // 3xx redirection
    301 MOVED_PERMANENTLY "Moved Permanently";
    302 FOUND "Found";
    303 SEE_OTHER "See Other";
    304 NOT_MODIFIED "Not Modified";

    // 4xx client errors
    400 BAD_REQUEST "Bad Request";
    401 UNAUTHORIZED "Unauthorized";
    403 FORBIDDEN "Forbidden";
    404 NOT_FOUND "Not Found";
    405 METHOD_NOT_ALLOWED "Method Not Allowed";
    /// Sent when a request body is larger than the configured limit.
    413 PAYLOAD_TOO_LARGE "Payload Too Large";
    416 RANGE_NOT_SATISFIABLE "Range Not Satisfiable";

    // 5xx server errors
    500 INTERNAL_SERVER_ERROR "Internal Server Error";
    501 NOT_IMPLEMENTED "Not Implemented";
    502 BAD_GATEWAY "Bad Gateway";
    503 SERVICE_UNAVAILABLE "Service Unavailable";
    504 GATEWAY_TIMEOUT "Gateway Timeout";
}

impl Status {
    const fn new(code: u16, message: &'static str) -> Self {
        Self { code, message: Cow::Borrowed(message) }
    }

    /// A status outside the catalog, e.g. `Status::custom(299, "Fine")`.
    pub fn custom(code: u16, message: impl Into<Cow<'static, str>>) -> Self {
        Self { code, message: message.into() }
    }

    #[inline]
    pub fn code(&self) -> u16 {
        self.code
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[inline]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }

    /// Whether the pair can go on a status line: a three digit code and a
    /// reason phrase of `HTAB / SP / VCHAR / obs-text`.
    pub fn is_valid(&self) -> bool {
        (100..=999).contains(&self.code)
            && self.message.bytes().all(|b| matches!(b, b'\t' | b' ' | 0x21..=0x7e | 0x80..=0xff))
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::OK
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.message)
    }
}

impl From<StatusCode> for Status {
    fn from(code: StatusCode) -> Self {
        match Status::from_catalog(code.as_u16()) {
            Some(status) => status,
            None => Status::custom(code.as_u16(), code.canonical_reason().unwrap_or("Unknown")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_lookup() {
        assert_eq!(Status::from_catalog(404), Some(Status::NOT_FOUND));
        assert_eq!(Status::from_catalog(416).unwrap().message(), "Range Not Satisfiable");
        assert_eq!(Status::from_catalog(418), None);
    }

    #[test]
    fn custom_pair() {
        let status = Status::custom(299, String::from("Mostly Fine"));
        assert_eq!(status.code(), 299);
        assert_eq!(status.message(), "Mostly Fine");
        assert_eq!(status.to_string(), "299 Mostly Fine");
        assert!(status.is_success());
    }

    #[test]
    fn status_line_validity() {
        assert!(Status::NOT_FOUND.is_valid());
        assert!(Status::custom(599, "Caf\u{e9} Closed").is_valid());

        assert!(!Status::custom(200, "OK\r\nSet-Cookie: a=b").is_valid());
        assert!(!Status::custom(42, "Too Short").is_valid());
        assert!(!Status::custom(1000, "Too Long").is_valid());
    }

    #[test]
    fn from_status_code() {
        assert_eq!(Status::from(StatusCode::GATEWAY_TIMEOUT), Status::GATEWAY_TIMEOUT);

        let teapot = Status::from(StatusCode::IM_A_TEAPOT);
        assert_eq!(teapot.code(), 418);
        assert_eq!(teapot.message(), "I'm a teapot");
    }
}
