use http::Version;

/// Whether the connection is reused after the current exchange.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum ConnectionMode {
    #[default]
    KeepAlive,
    Close,
}

impl ConnectionMode {
    /// Interprets a `Connection` header value.
    ///
    /// Only a case-insensitive `keep-alive` keeps the connection open, any
    /// other value closes it.
    pub fn from_header_value(value: &[u8]) -> Self {
        if value.eq_ignore_ascii_case(b"keep-alive") { Self::KeepAlive } else { Self::Close }
    }

    #[inline]
    pub fn is_keep_alive(self) -> bool {
        matches!(self, Self::KeepAlive)
    }

    /// The `Connection` header value announcing this mode.
    pub fn as_header_value(self) -> &'static str {
        match self {
            Self::KeepAlive => "keep-alive",
            Self::Close => "close",
        }
    }
}

/// Resolves the digits after `HTTP/` in a request line.
pub(crate) fn resolve_version(digits: &[u8]) -> Option<Version> {
    match digits {
        b"1.1" => Some(Version::HTTP_11),
        b"1.0" => Some(Version::HTTP_10),
        b"0.9" => Some(Version::HTTP_09),
        _ => None,
    }
}

/// The digits written after `HTTP/` in a status line.
pub(crate) fn version_str(version: Version) -> &'static str {
    match version {
        Version::HTTP_10 => "1.0",
        Version::HTTP_09 => "0.9",
        _ => "1.1",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_header_value() {
        assert_eq!(ConnectionMode::from_header_value(b"Keep-Alive"), ConnectionMode::KeepAlive);
        assert_eq!(ConnectionMode::from_header_value(b"close"), ConnectionMode::Close);
        assert_eq!(ConnectionMode::from_header_value(b"upgrade"), ConnectionMode::Close);
    }

    #[test]
    fn versions() {
        assert_eq!(resolve_version(b"1.1"), Some(Version::HTTP_11));
        assert_eq!(resolve_version(b"0.9"), Some(Version::HTTP_09));
        assert_eq!(resolve_version(b"2.0"), None);
        assert_eq!(resolve_version(b"1."), None);

        assert_eq!(version_str(Version::HTTP_10), "1.0");
        assert_eq!(version_str(Version::HTTP_2), "1.1");
    }
}
