//! Process-wide table of well-known header names.
//!
//! The registry is built once and never mutated afterwards, every connection
//! reads the same instance. Call [`HeaderRegistry::init`] before accepting
//! connections to pay the construction cost up front.

use std::collections::HashMap;

use http::HeaderName;
use http::header;
use once_cell::sync::Lazy;

/// Header names longer than this are never well-known.
const MAX_KNOWN_NAME_LEN: usize = 64;

/// Side effect a well-known request header has on the request being parsed.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum HeaderAction {
    /// Stored under its canonical key, nothing else.
    Record,
    SetContentLength,
    SetHost,
    SetConnectionMode,
}

/// A registry entry: the canonical key plus its side effect.
#[derive(Debug, Clone)]
pub struct WellKnown {
    pub name: HeaderName,
    pub action: HeaderAction,
}

#[derive(Debug)]
pub struct HeaderRegistry {
    by_name: HashMap<String, WellKnown>,
}

static REGISTRY: Lazy<HeaderRegistry> = Lazy::new(HeaderRegistry::build);

impl HeaderRegistry {
    /// The shared registry, built on first access.
    pub fn global() -> &'static HeaderRegistry {
        &REGISTRY
    }

    /// Builds the shared registry eagerly.
    pub fn init() {
        Lazy::force(&REGISTRY);
    }

    /// Finds a well-known header, comparing names case-insensitively.
    pub fn lookup(&self, name: &[u8]) -> Option<&WellKnown> {
        if name.len() > MAX_KNOWN_NAME_LEN {
            return None;
        }
        let mut lower = [0u8; MAX_KNOWN_NAME_LEN];
        let lower = &mut lower[..name.len()];
        for (dst, src) in lower.iter_mut().zip(name) {
            *dst = src.to_ascii_lowercase();
        }
        let lower = std::str::from_utf8(lower).ok()?;
        self.by_name.get(lower)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    fn build() -> Self {
        let by_name = STANDARD_HEADERS
            .iter()
            .map(|(name, action)| (name.as_str().to_owned(), WellKnown { name: name.clone(), action: *action }))
            .collect();
        Self { by_name }
    }
}

const STANDARD_HEADERS: [(HeaderName, HeaderAction); 75] = [
    (header::ACCEPT, HeaderAction::Record),
    (header::ACCEPT_CHARSET, HeaderAction::Record),
    (HeaderName::from_static("accept-datetime"), HeaderAction::Record),
    (header::ACCEPT_ENCODING, HeaderAction::Record),
    (header::ACCEPT_LANGUAGE, HeaderAction::Record),
    (header::ACCEPT_RANGES, HeaderAction::Record),
    (header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderAction::Record),
    (header::AGE, HeaderAction::Record),
    (header::ALLOW, HeaderAction::Record),
    (header::AUTHORIZATION, HeaderAction::Record),
    (header::CACHE_CONTROL, HeaderAction::Record),
    (header::CONNECTION, HeaderAction::SetConnectionMode),
    (header::CONTENT_DISPOSITION, HeaderAction::Record),
    (header::CONTENT_ENCODING, HeaderAction::Record),
    (header::CONTENT_LANGUAGE, HeaderAction::Record),
    (header::CONTENT_LENGTH, HeaderAction::SetContentLength),
    (header::CONTENT_LOCATION, HeaderAction::Record),
    (HeaderName::from_static("content-md5"), HeaderAction::Record),
    (header::CONTENT_RANGE, HeaderAction::Record),
    (header::CONTENT_SECURITY_POLICY, HeaderAction::Record),
    (header::CONTENT_TYPE, HeaderAction::Record),
    (header::COOKIE, HeaderAction::Record),
    (header::DNT, HeaderAction::Record),
    (header::DATE, HeaderAction::Record),
    (header::ETAG, HeaderAction::Record),
    (header::EXPECT, HeaderAction::Record),
    (header::EXPIRES, HeaderAction::Record),
    (header::FROM, HeaderAction::Record),
    (HeaderName::from_static("front-end-https"), HeaderAction::Record),
    (header::HOST, HeaderAction::SetHost),
    (header::IF_MATCH, HeaderAction::Record),
    (header::IF_MODIFIED_SINCE, HeaderAction::Record),
    (header::IF_NONE_MATCH, HeaderAction::Record),
    (header::IF_RANGE, HeaderAction::Record),
    (header::IF_UNMODIFIED_SINCE, HeaderAction::Record),
    (header::LAST_MODIFIED, HeaderAction::Record),
    (header::LINK, HeaderAction::Record),
    (header::LOCATION, HeaderAction::Record),
    (header::MAX_FORWARDS, HeaderAction::Record),
    (header::ORIGIN, HeaderAction::Record),
    (HeaderName::from_static("p3p"), HeaderAction::Record),
    (header::PRAGMA, HeaderAction::Record),
    (header::PROXY_AUTHENTICATE, HeaderAction::Record),
    (header::PROXY_AUTHORIZATION, HeaderAction::Record),
    (HeaderName::from_static("proxy-connection"), HeaderAction::Record),
    (header::RANGE, HeaderAction::Record),
    (header::REFERER, HeaderAction::Record),
    (header::REFRESH, HeaderAction::Record),
    (header::RETRY_AFTER, HeaderAction::Record),
    (header::SERVER, HeaderAction::Record),
    (header::SET_COOKIE, HeaderAction::Record),
    (HeaderName::from_static("status"), HeaderAction::Record),
    (header::STRICT_TRANSPORT_SECURITY, HeaderAction::Record),
    (header::TE, HeaderAction::Record),
    (header::TRAILER, HeaderAction::Record),
    (header::TRANSFER_ENCODING, HeaderAction::Record),
    (header::UPGRADE, HeaderAction::Record),
    (header::USER_AGENT, HeaderAction::Record),
    (header::VARY, HeaderAction::Record),
    (header::VIA, HeaderAction::Record),
    (header::WWW_AUTHENTICATE, HeaderAction::Record),
    (header::WARNING, HeaderAction::Record),
    (HeaderName::from_static("x-att-deviceid"), HeaderAction::Record),
    (HeaderName::from_static("x-content-security-policy"), HeaderAction::Record),
    (header::X_CONTENT_TYPE_OPTIONS, HeaderAction::Record),
    (HeaderName::from_static("x-forwarded-for"), HeaderAction::Record),
    (HeaderName::from_static("x-forwarded-proto"), HeaderAction::Record),
    (header::X_FRAME_OPTIONS, HeaderAction::Record),
    (HeaderName::from_static("x-powered-by"), HeaderAction::Record),
    (HeaderName::from_static("x-requested-with"), HeaderAction::Record),
    (HeaderName::from_static("x-wap-profile"), HeaderAction::Record),
    (HeaderName::from_static("x-webkit-csp"), HeaderAction::Record),
    (header::X_XSS_PROTECTION, HeaderAction::Record),
    (HeaderName::from_static("x-ua-compatible"), HeaderAction::Record),
    (HeaderName::from_static("keep-alive"), HeaderAction::Record),
];
