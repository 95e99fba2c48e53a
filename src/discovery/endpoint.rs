//! Endpoint parsing.
//!
//! # Responsibilities
//! - Turn raw registry endpoint strings into structured addresses
//! - Reject malformed or unusable endpoints with a typed error
//!
//! # Design Decisions
//! - `rest://` is the registry's name for a plain HTTP transport
//! - TLS endpoints are rejected: the outbound client speaks plain HTTP only
//! - Port is mandatory unless the scheme has a well-known default

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use axum::http::Uri;
use url::{Host, Url};

/// Error returned when a raw endpoint string cannot become an [`Endpoint`].
#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    #[error("invalid endpoint url: {0}")]
    Url(#[from] url::ParseError),

    #[error("unsupported endpoint scheme `{0}`")]
    UnsupportedScheme(String),

    #[error("tls endpoints are not supported")]
    TlsUnsupported,

    #[error("endpoint has no host")]
    MissingHost,

    #[error("endpoint has no port")]
    MissingPort,
}

/// Transport scheme advertised by a registry endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointScheme {
    /// `http://host:port`
    Http,
    /// `rest://host:port`, the registry's plain HTTP transport.
    Rest,
}

impl EndpointScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointScheme::Http => "http",
            EndpointScheme::Rest => "rest",
        }
    }
}

/// Host part of an endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EndpointHost {
    Domain(String),
    Ipv4(Ipv4Addr),
    Ipv6(Ipv6Addr),
}

impl fmt::Display for EndpointHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointHost::Domain(d) => f.write_str(d),
            EndpointHost::Ipv4(ip) => write!(f, "{}", ip),
            EndpointHost::Ipv6(ip) => write!(f, "[{}]", ip),
        }
    }
}

/// A parsed network address of one live service instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    scheme: EndpointScheme,
    host: EndpointHost,
    port: u16,
}

impl Endpoint {
    /// Parse a raw endpoint string such as `rest://10.0.0.4:8080?sslEnabled=false`.
    pub fn parse(raw: &str) -> Result<Self, EndpointError> {
        let url = Url::parse(raw.trim())?;

        let scheme = match url.scheme() {
            "http" => EndpointScheme::Http,
            "rest" => EndpointScheme::Rest,
            "https" => return Err(EndpointError::TlsUnsupported),
            other => return Err(EndpointError::UnsupportedScheme(other.to_string())),
        };

        let ssl_enabled = url
            .query_pairs()
            .any(|(k, v)| k == "sslEnabled" && v.eq_ignore_ascii_case("true"));
        if ssl_enabled {
            return Err(EndpointError::TlsUnsupported);
        }

        // Non-special schemes such as `rest` get opaque hosts, so IPv4 shows up as a domain.
        let host = match url.host() {
            Some(Host::Domain(d)) if !d.is_empty() => match d.parse::<Ipv4Addr>() {
                Ok(ip) => EndpointHost::Ipv4(ip),
                Err(_) => EndpointHost::Domain(d.to_ascii_lowercase()),
            },
            Some(Host::Ipv4(ip)) => EndpointHost::Ipv4(ip),
            Some(Host::Ipv6(ip)) => EndpointHost::Ipv6(ip),
            _ => return Err(EndpointError::MissingHost),
        };

        let port = url.port_or_known_default().ok_or(EndpointError::MissingPort)?;

        Ok(Self { scheme, host, port })
    }

    pub fn scheme(&self) -> EndpointScheme {
        self.scheme
    }

    pub fn host(&self) -> &EndpointHost {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `host:port`, suitable for a URI authority or a `Host` header.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Absolute outbound URI for a forward path (which may carry a query).
    pub fn uri_for(&self, path_and_query: &str) -> Result<Uri, axum::http::Error> {
        let uri = Uri::builder()
            .scheme("http")
            .authority(self.authority())
            .path_and_query(path_and_query)
            .build()?;
        Ok(uri)
    }
}

impl FromStr for Endpoint {
    type Err = EndpointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Endpoint::parse(s)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme.as_str(), self.authority())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rest_endpoint_with_query() {
        let ep = Endpoint::parse("rest://10.0.0.4:8080?sslEnabled=false").unwrap();
        assert_eq!(ep.scheme(), EndpointScheme::Rest);
        assert_eq!(ep.host(), &EndpointHost::Ipv4(Ipv4Addr::new(10, 0, 0, 4)));
        assert_eq!(ep.port(), 8080);
        assert_eq!(ep.authority(), "10.0.0.4:8080");
    }

    #[test]
    fn http_scheme_defaults_port() {
        let ep: Endpoint = "http://backend.local".parse().unwrap();
        assert_eq!(ep.port(), 80);
        assert_eq!(ep.authority(), "backend.local:80");
    }

    #[test]
    fn ipv6_authority_is_bracketed() {
        let ep = Endpoint::parse("rest://[::1]:9000").unwrap();
        assert_eq!(ep.authority(), "[::1]:9000");
        assert_eq!(ep.to_string(), "rest://[::1]:9000");
    }

    #[test]
    fn rejects_malformed_strings() {
        assert!(matches!(Endpoint::parse("not a url"), Err(EndpointError::Url(_))));
        assert!(matches!(Endpoint::parse("rest://host-without-port"), Err(EndpointError::MissingPort)));
        assert!(matches!(
            Endpoint::parse("highway://10.0.0.1:7070"),
            Err(EndpointError::UnsupportedScheme(s)) if s == "highway"
        ));
        assert!(matches!(Endpoint::parse("https://10.0.0.1:443"), Err(EndpointError::TlsUnsupported)));
        assert!(matches!(
            Endpoint::parse("rest://10.0.0.1:8443?sslEnabled=true"),
            Err(EndpointError::TlsUnsupported)
        ));
    }

    #[test]
    fn builds_outbound_uri() {
        let ep = Endpoint::parse("rest://127.0.0.1:3000").unwrap();
        let uri = ep.uri_for("/api/items?page=2").unwrap();
        assert_eq!(uri.to_string(), "http://127.0.0.1:3000/api/items?page=2");
    }
}
