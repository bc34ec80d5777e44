//! Endpoint naming: `//{host}:{port}/Remote{Name}`.

use crate::error::RegistryError;
use std::fmt;
use std::str::FromStr;
use url::Url;

/// Reserved export name of a node's core object
pub const CORE_NAME: &str = "NATS";

/// Prefix placed in front of every export name in the path segment
pub const OBJECT_PREFIX: &str = "Remote";

// `url` needs a scheme to parse a network-path reference.
const PARSE_SCHEME: &str = "simlink:";

/// Fully qualified name of an exported object
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EndpointName {
    host: String,
    port: u16,
    name: String,
}

/// Check that an export name can appear in an endpoint path.
pub fn validate_name(name: &str) -> Result<(), RegistryError> {
    if name.is_empty() || name.contains('/') || name.chars().any(char::is_whitespace) {
        return Err(RegistryError::InvalidName(name.to_string()));
    }
    Ok(())
}

impl EndpointName {
    /// Build an endpoint name, validating the export name
    pub fn new(host: impl Into<String>, port: u16, name: &str) -> Result<Self, RegistryError> {
        validate_name(name)?;
        Ok(Self {
            host: host.into(),
            port,
            name: name.to_string(),
        })
    }

    /// Endpoint of the reserved core object on a node
    pub fn core(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            name: CORE_NAME.to_string(),
        }
    }

    /// Same host and port, different export name
    pub fn sibling(&self, name: &str) -> Result<Self, RegistryError> {
        Self::new(self.host.clone(), self.port, name)
    }

    /// Host part
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Port part
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Export name without the `Remote` prefix
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path segment, e.g. `RemoteWeather`
    pub fn object_name(&self) -> String {
        format!("{}{}", OBJECT_PREFIX, self.name)
    }

    /// True for the reserved core export
    pub fn is_core(&self) -> bool {
        self.name == CORE_NAME
    }
}

impl fmt::Display for EndpointName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "//[{}]:{}/{}{}", self.host, self.port, OBJECT_PREFIX, self.name)
        } else {
            write!(f, "//{}:{}/{}{}", self.host, self.port, OBJECT_PREFIX, self.name)
        }
    }
}

impl FromStr for EndpointName {
    type Err = RegistryError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| RegistryError::InvalidEndpoint {
            endpoint: raw.to_string(),
            reason: reason.to_string(),
        };

        if !raw.starts_with("//") {
            return Err(invalid("must start with '//'"));
        }
        let url = Url::parse(&format!("{}{}", PARSE_SCHEME, raw))
            .map_err(|e| invalid(&e.to_string()))?;

        let host = url.host_str().ok_or_else(|| invalid("missing host"))?;
        let host = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);
        let port = url.port().ok_or_else(|| invalid("missing port"))?;
        let name = url
            .path()
            .strip_prefix('/')
            .and_then(|p| p.strip_prefix(OBJECT_PREFIX))
            .ok_or_else(|| invalid("path must be /Remote{Name}"))?;

        Self::new(host, port, name).map_err(|_| invalid("invalid export name"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_and_parses() {
        let endpoint = EndpointName::new("10.1.2.3", 2017, "Weather").unwrap();
        let text = endpoint.to_string();
        assert_eq!(text, "//10.1.2.3:2017/RemoteWeather");
        assert_eq!(text.parse::<EndpointName>().unwrap(), endpoint);
        assert_eq!(endpoint.object_name(), "RemoteWeather");

        let v6 = EndpointName::new("::1", 2017, "NATS").unwrap();
        let text = v6.to_string();
        assert_eq!(text, "//[::1]:2017/RemoteNATS");
        let parsed = text.parse::<EndpointName>().unwrap();
        assert_eq!(parsed.host(), "::1");
        assert_eq!(parsed, v6);
    }

    #[test]
    fn core_endpoint_uses_reserved_name() {
        let endpoint = EndpointName::core("127.0.0.1", 2020);
        assert!(endpoint.is_core());
        assert_eq!(endpoint.to_string(), "//127.0.0.1:2020/RemoteNATS");
    }

    #[test]
    fn rejects_malformed_endpoints() {
        for raw in [
            "10.1.2.3:2017/RemoteWeather",
            "//10.1.2.3/RemoteWeather",
            "//10.1.2.3:2017/Weather",
            "//10.1.2.3:2017/Remote",
            "//10.1.2.3:2017/RemoteA/B",
        ] {
            assert!(raw.parse::<EndpointName>().is_err(), "{raw} should fail");
        }
    }

    #[test]
    fn validates_names() {
        assert!(validate_name("Controller").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("a/b").is_err());
        assert!(validate_name("a b").is_err());
    }
}
