//! HTTP proxy settings shared by every SDK client

use crate::aws::error::ConfigurationError;
use aws_smithy_runtime::client::http::hyper_014::HyperClientBuilder;
use aws_smithy_runtime_api::client::http::SharedHttpClient;
use hyper::client::HttpConnector;
use hyper::Uri;
use hyper_proxy::{Intercept, Proxy, ProxyConnector};
use hyper_tls::HttpsConnector;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A proxying HTTPS connector for hyper.
pub type Connector = ProxyConnector<HttpsConnector<HttpConnector>>;

/// Outbound HTTP proxy (host, port)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    host: String,
    port: u16,
}

impl ProxyConfig {
    /// Build a proxy from raw job parameters.
    ///
    /// Returns `Ok(None)` when the host is missing or blank, or the port is
    /// not positive. Ports above 65535 are rejected.
    pub fn from_parts(host: Option<&str>, port: i32) -> Result<Option<Self>, ConfigurationError> {
        let host = match host.map(str::trim) {
            Some(h) if !h.is_empty() => h,
            _ => return Ok(None),
        };
        if port <= 0 {
            return Ok(None);
        }

        let port = u16::try_from(port).map_err(|_| ConfigurationError::InvalidProxy {
            host: host.to_string(),
            port,
            reason: "port out of range".to_string(),
        })?;

        Ok(Some(Self {
            host: host.to_string(),
            port,
        }))
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Proxy URI as understood by hyper
    pub fn uri(&self) -> Result<Uri, ConfigurationError> {
        format!("http://{}:{}", self.host, self.port)
            .parse()
            .map_err(|e: hyper::http::uri::InvalidUri| ConfigurationError::InvalidProxy {
                host: self.host.clone(),
                port: i32::from(self.port),
                reason: e.to_string(),
            })
    }

    /// Create a connector that tunnels every request through this proxy.
    pub fn connector(&self) -> Result<Connector, ConfigurationError> {
        let proxy = Proxy::new(Intercept::All, self.uri()?);
        ProxyConnector::from_proxy(HttpsConnector::new(), proxy)
            .map_err(ConfigurationError::ProxyConnector)
    }
}

impl fmt::Display for ProxyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// HTTP client for the SDK honouring the given proxy.
///
/// `None` means the SDK's default client is used.
pub fn http_client(proxy: Option<&ProxyConfig>) -> Result<Option<SharedHttpClient>, ConfigurationError> {
    let Some(proxy) = proxy else {
        return Ok(None);
    };

    tracing::debug!("Routing AWS traffic through proxy {}", proxy);
    let connector = proxy.connector()?;
    Ok(Some(HyperClientBuilder::new().build(connector)))
}
