//! Dispatch path parsing.
//!
//! # Responsibilities
//! - Recognize `/{prefix}/{service}/{rest...}`
//! - Extract the service name and the path forwarded to the backend
//!
//! # Design Decisions
//! - Pure string handling, no regex
//! - An empty service segment is passed through; the dispatcher treats it as unknown
//! - `/{prefix}/{service}` without a trailing slash does not match

/// Where an inbound request should be dispatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchTarget {
    /// Raw service segment; may be empty.
    pub service: String,
    /// `"/" + rest`.
    pub forward_path: String,
}

/// Parses dispatch paths under a fixed prefix.
#[derive(Debug, Clone)]
pub struct PathRouter {
    /// Normalized as `/{prefix}/`.
    prefix: String,
}

impl PathRouter {
    /// `prefix` may be given with or without surrounding slashes (`ui`, `/ui/`).
    pub fn new(prefix: &str) -> Self {
        let trimmed = prefix.trim_matches('/');
        let prefix = if trimmed.is_empty() {
            "/".to_string()
        } else {
            format!("/{}/", trimmed)
        };
        Self { prefix }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Match a request path, returning `None` when it is not a dispatch path.
    pub fn route(&self, path: &str) -> Option<DispatchTarget> {
        let remainder = path.strip_prefix(&self.prefix)?;
        let (service, rest) = remainder.split_once('/')?;

        Some(DispatchTarget {
            service: service.to_string(),
            forward_path: format!("/{}", rest),
        })
    }
}

impl Default for PathRouter {
    fn default() -> Self {
        Self::new("ui")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(service: &str, forward_path: &str) -> Option<DispatchTarget> {
        Some(DispatchTarget {
            service: service.into(),
            forward_path: forward_path.into(),
        })
    }

    #[test]
    fn extracts_service_and_forward_path() {
        let router = PathRouter::default();
        assert_eq!(router.route("/ui/S/rest"), target("S", "/rest"));
        assert_eq!(router.route("/ui/orders/api/v1/items"), target("orders", "/api/v1/items"));
    }

    #[test]
    fn empty_rest_forwards_root() {
        let router = PathRouter::default();
        assert_eq!(router.route("/ui/orders/"), target("orders", "/"));
    }

    #[test]
    fn empty_service_is_passed_through() {
        let router = PathRouter::default();
        assert_eq!(router.route("/ui//index.html"), target("", "/index.html"));
    }

    #[test]
    fn non_dispatch_paths_do_not_match() {
        let router = PathRouter::default();
        assert_eq!(router.route("/"), None);
        assert_eq!(router.route("/ui"), None);
        assert_eq!(router.route("/ui/orders"), None);
        assert_eq!(router.route("/api/orders/x"), None);
        assert_eq!(router.route("/uix/orders/x"), None);
    }

    #[test]
    fn prefix_is_normalized() {
        assert_eq!(PathRouter::new("/gateway/").prefix(), "/gateway/");
        assert_eq!(PathRouter::new("gateway").route("/gateway/a/b"), target("a", "/b"));
        assert_eq!(PathRouter::new("edge/ui").route("/edge/ui/a/"), target("a", "/"));
    }
}
