//! Container image references: `[host[:port]/][namespace/]repository[:tag]`.

use super::errors::RefError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A parsed image reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    /// Registry host
    pub host: Option<String>,
    /// Registry port
    pub port: Option<u16>,
    /// Namespace path between host and repository
    pub namespace: Option<String>,
    /// Repository name
    pub repository: String,
    /// Tag
    pub tag: Option<String>,
}

impl FromStr for ImageRef {
    type Err = RefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || RefError::InvalidImageRef(s.to_string());
        let mut parts: Vec<&str> = s.split('/').collect();
        let image = parts.pop().ok_or_else(invalid)?;
        let (repository, tag) = match image.split_once(':') {
            Some((repository, tag)) => (repository, Some(tag.to_string())),
            None => (image, None),
        };
        if repository.is_empty() || parts.iter().any(|p| p.is_empty()) {
            return Err(invalid());
        }

        let (host, port) = if parts.len() >= 2 {
            let host = parts.remove(0);
            match host.split_once(':') {
                Some((host, port)) => {
                    let port = port.parse::<u16>().map_err(|_| invalid())?;
                    (Some(host.to_string()), Some(port))
                }
                None => (Some(host.to_string()), None),
            }
        } else {
            (None, None)
        };
        let namespace = (!parts.is_empty()).then(|| parts.join("/"));

        Ok(Self {
            host,
            port,
            namespace,
            repository: repository.to_string(),
            tag,
        })
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(host) = &self.host {
            f.write_str(host)?;
            if let Some(port) = self.port {
                write!(f, ":{port}")?;
            }
            f.write_str("/")?;
        }
        if let Some(namespace) = &self.namespace {
            write!(f, "{namespace}/")?;
        }
        f.write_str(&self.repository)?;
        if let Some(tag) = &self.tag {
            write!(f, ":{tag}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_full() {
        let image: ImageRef = "registry.example.com:5000/namespace/repo:tag".parse().unwrap();
        assert_eq!(image.host.as_deref(), Some("registry.example.com"));
        assert_eq!(image.port, Some(5000));
        assert_eq!(image.namespace.as_deref(), Some("namespace"));
        assert_eq!(image.repository, "repo");
        assert_eq!(image.tag.as_deref(), Some("tag"));
    }

    #[test]
    fn test_parse_without_tag() {
        let image: ImageRef = "registry.example.com:5000/namespace/repo".parse().unwrap();
        assert_eq!(image.host.as_deref(), Some("registry.example.com"));
        assert_eq!(image.repository, "repo");
        assert_eq!(image.tag, None);
    }

    #[test]
    fn test_parse_library_image() {
        let image: ImageRef = "php:8.0-fpm".parse().unwrap();
        assert_eq!(image.host, None);
        assert_eq!(image.port, None);
        assert_eq!(image.namespace, None);
        assert_eq!(image.repository, "php");
        assert_eq!(image.tag.as_deref(), Some("8.0-fpm"));
    }

    #[test]
    fn test_parse_nested_namespace() {
        let image: ImageRef = "ghcr.io/org/team/php-ext-redis:6.0.2-8.3-bookworm".parse().unwrap();
        assert_eq!(image.host.as_deref(), Some("ghcr.io"));
        assert_eq!(image.namespace.as_deref(), Some("org/team"));
        assert_eq!(image.to_string(), "ghcr.io/org/team/php-ext-redis:6.0.2-8.3-bookworm");
    }

    #[test]
    fn test_parse_invalid() {
        assert!("".parse::<ImageRef>().is_err());
        assert!("host:port/ns/repo".parse::<ImageRef>().is_err());
        assert!("ns//repo".parse::<ImageRef>().is_err());
    }
}
