use dashmap::DashSet;
use log::info;
use thiserror::Error;
use url::Url;

use std::sync::Arc;

/// Errors that can occur while registering peers
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Invalid node address: {0}")]
    InvalidAddress(String),
}

/// Set of known peer locations, stored as `host:port`
///
/// Entries are only ever added. Cloning shares the same set.
#[derive(Debug, Clone, Default)]
pub struct NodeRegistry {
    nodes: Arc<DashSet<String>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a peer from a full URL or a bare `host:port`
    ///
    /// Scheme and path are discarded; equivalent addresses collapse to one entry.
    ///
    /// # Returns
    ///
    /// The normalized `host:port` that was stored
    pub fn register(&self, address: &str) -> Result<String, RegistryError> {
        let location = parse_location(address)?;

        if self.nodes.insert(location.clone()) {
            info!("Registered peer node {}", location);
        }

        Ok(location)
    }

    /// Registers every address, or none if any of them is invalid
    ///
    /// # Returns
    ///
    /// The normalized locations, in input order
    pub fn register_all(&self, addresses: &[String]) -> Result<Vec<String>, RegistryError> {
        let locations = addresses
            .iter()
            .map(|address| parse_location(address))
            .collect::<Result<Vec<_>, _>>()?;

        for location in &locations {
            if self.nodes.insert(location.clone()) {
                info!("Registered peer node {}", location);
            }
        }

        Ok(locations)
    }

    /// Gets every known peer, sorted
    pub fn nodes(&self) -> Vec<String> {
        let mut nodes: Vec<String> = self.nodes.iter().map(|n| n.key().clone()).collect();
        nodes.sort();
        nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Extracts the `host:port` component of an address
fn parse_location(address: &str) -> Result<String, RegistryError> {
    let trimmed = address.trim();
    let invalid = || RegistryError::InvalidAddress(address.to_string());

    // Bare `host:port` parses as a URL with `host` as its scheme.
    let url = if trimmed.contains("://") {
        Url::parse(trimmed).map_err(|_| invalid())?
    } else {
        Url::parse(&format!("http://{}", trimmed)).map_err(|_| invalid())?
    };

    let host = url.host_str().filter(|h| !h.is_empty()).ok_or_else(invalid)?;

    Ok(match url.port_or_known_default() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_strips_scheme_and_path() {
        let registry = NodeRegistry::new();

        assert_eq!(registry.register("http://127.0.0.1:5000").unwrap(), "127.0.0.1:5000");
        assert_eq!(registry.register("http://127.0.0.1:5002/chain?x=1").unwrap(), "127.0.0.1:5002");
        assert_eq!(registry.nodes(), vec!["127.0.0.1:5000", "127.0.0.1:5002"]);
    }

    #[test]
    fn test_register_bare_location() {
        let registry = NodeRegistry::new();

        assert_eq!(registry.register("192.168.0.5:5000").unwrap(), "192.168.0.5:5000");
        assert_eq!(registry.register("localhost:5001").unwrap(), "localhost:5001");
    }

    #[test]
    fn test_register_deduplicates() {
        let registry = NodeRegistry::new();

        registry.register("http://node-a:5000").unwrap();
        registry.register("http://node-a:5000/").unwrap();
        registry.register("node-a:5000").unwrap();
        registry.register("HTTP://NODE-A:5000/api").unwrap();

        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_fills_default_port() {
        let registry = NodeRegistry::new();

        assert_eq!(registry.register("http://example.com").unwrap(), "example.com:80");
        assert_eq!(registry.register("example.com:80").unwrap(), "example.com:80");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_rejects_missing_host() {
        let registry = NodeRegistry::new();

        assert!(registry.register("").is_err());
        assert!(registry.register("http://").is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_register_all_is_all_or_nothing() {
        let registry = NodeRegistry::new();
        let addresses = vec!["http://10.0.0.1:5000".to_string(), "http://".to_string()];

        assert!(registry.register_all(&addresses).is_err());
        assert!(registry.is_empty());

        let addresses = vec!["http://10.0.0.1:5000".to_string(), "10.0.0.2:5000".to_string()];
        assert_eq!(registry.register_all(&addresses).unwrap().len(), 2);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_clones_share_nodes() {
        let registry = NodeRegistry::new();
        let clone = registry.clone();

        clone.register("http://10.0.0.1:5000").unwrap();

        assert_eq!(registry.nodes(), vec!["10.0.0.1:5000"]);
    }
}
