//! Dynamic routing configuration.
//!
//! # Data Flow
//! ```text
//! Backend adapter (file, memory, ...)
//!     → Configuration snapshot (one per provider)
//!     → merge engine (merge/)
//!     → merged Configuration
//!     → sink (routing engine, file, ...)
//! ```
//!
//! # Design Decisions
//! - Four independent planes: HTTP, TCP, UDP, TLS
//! - Every resource collection is an ordered map keyed by resource name,
//!   so serialization (and therefore fingerprinting) is deterministic
//! - A plane left out of a provider snapshot is `None` and contributes nothing
//! - Snapshots are plain values; nothing downstream mutates a provider's copy

pub mod http;
pub mod tcp;
pub mod tls;
pub mod udp;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub use http::HttpConfiguration;
pub use tcp::TcpConfiguration;
pub use tls::TlsConfiguration;
pub use udp::UdpConfiguration;

/// A complete routing configuration, as produced by one provider or by a merge pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http: Option<HttpConfiguration>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tcp: Option<TcpConfiguration>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub udp: Option<UdpConfiguration>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsConfiguration>,
}

impl Configuration {
    /// A configuration with every plane present and every collection empty.
    pub fn empty() -> Self {
        Self {
            http: Some(HttpConfiguration::default()),
            tcp: Some(TcpConfiguration::default()),
            udp: Some(UdpConfiguration::default()),
            tls: Some(TlsConfiguration::default()),
        }
    }

    pub fn http_mut(&mut self) -> &mut HttpConfiguration {
        self.http.get_or_insert_with(Default::default)
    }

    pub fn tcp_mut(&mut self) -> &mut TcpConfiguration {
        self.tcp.get_or_insert_with(Default::default)
    }

    pub fn udp_mut(&mut self) -> &mut UdpConfiguration {
        self.udp.get_or_insert_with(Default::default)
    }

    pub fn tls_mut(&mut self) -> &mut TlsConfiguration {
        self.tls.get_or_insert_with(Default::default)
    }

    /// Total number of resources across all planes.
    pub fn resource_count(&self) -> usize {
        self.http.as_ref().map_or(0, HttpConfiguration::len)
            + self.tcp.as_ref().map_or(0, TcpConfiguration::len)
            + self.udp.as_ref().map_or(0, UdpConfiguration::len)
            + self.tls.as_ref().map_or(0, TlsConfiguration::len)
    }

    /// True when no plane holds any resource.
    pub fn is_empty(&self) -> bool {
        self.http.as_ref().map_or(true, HttpConfiguration::is_empty)
            && self.tcp.as_ref().map_or(true, TcpConfiguration::is_empty)
            && self.udp.as_ref().map_or(true, UdpConfiguration::is_empty)
            && self.tls.as_ref().map_or(true, TlsConfiguration::is_empty)
    }

    /// Content hash (hex SHA-256 of the JSON form).
    ///
    /// Two configurations with equal content always share a fingerprint, no
    /// matter how or when they were built.
    pub fn fingerprint(&self) -> String {
        // All maps are string-keyed, so serialization cannot fail.
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        hex::encode(Sha256::digest(&bytes))
    }
}
