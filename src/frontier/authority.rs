//! Authority extraction for crawl URLs
//!
//! A URL is split into its authority (scheme, host and port) and the
//! path-query that is queued on the authority's host entry.

use std::fmt;
use url::Url;

use super::error::{FrontierError, FrontierResult};

/// Scheme + host + port identifying a crawl target
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Authority {
    scheme: String,
    host: String,
    port: u16,
    origin: String,
}

impl Authority {
    /// Parse an authority from a URL or a bare origin such as `http://a.com`
    pub fn parse(input: &str) -> FrontierResult<Self> {
        let (authority, _) = split_url(input)?;
        Ok(authority)
    }

    fn from_url(url: &Url, raw: &str) -> FrontierResult<Self> {
        let scheme = url.scheme();
        if scheme != "http" && scheme != "https" {
            return Err(FrontierError::invalid_url(
                raw,
                format!("unsupported scheme '{scheme}'"),
            ));
        }

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| FrontierError::invalid_url(raw, "missing host"))?;

        let port = url
            .port_or_known_default()
            .ok_or_else(|| FrontierError::invalid_url(raw, "missing port"))?;

        Ok(Self {
            scheme: scheme.to_string(),
            host: host.to_string(),
            port,
            origin: url.origin().ascii_serialization(),
        })
    }

    /// Serialized form used as the registry key, e.g. `https://a.com:8443`
    pub fn as_str(&self) -> &str {
        &self.origin
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Build the absolute URL for a path-query on this authority
    pub fn join(&self, path_query: &str) -> String {
        format!("{}{}", self.origin, path_query)
    }
}

impl fmt::Display for Authority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.origin)
    }
}

/// Split a URL into its authority and path-query
///
/// The fragment is dropped and an empty path becomes `/`.
///
/// # Examples
///
/// ```
/// use baram_frontier::frontier::authority::split_url;
///
/// let (authority, path_query) = split_url("http://a.com/news?id=7#top").unwrap();
/// assert_eq!(authority.as_str(), "http://a.com");
/// assert_eq!(path_query, "/news?id=7");
/// ```
pub fn split_url(raw: &str) -> FrontierResult<(Authority, String)> {
    let url = Url::parse(raw.trim()).map_err(|e| FrontierError::invalid_url(raw, e.to_string()))?;
    let authority = Authority::from_url(&url, raw)?;

    let mut path_query = url.path().to_string();
    if path_query.is_empty() {
        path_query.push('/');
    }
    if let Some(query) = url.query() {
        path_query.push('?');
        path_query.push_str(query);
    }

    Ok((authority, path_query))
}
