//! TLS plane resources.

use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsConfiguration {
    /// Certificates keyed by name.
    pub certificates: BTreeMap<String, CertAndStores>,
    pub options: BTreeMap<String, TlsOptions>,
    pub stores: BTreeMap<String, Store>,
}

impl TlsConfiguration {
    pub fn len(&self) -> usize {
        self.certificates.len() + self.options.len() + self.stores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Certificate material plus the stores it is attached to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CertAndStores {
    pub cert_file: String,
    pub key_file: String,
    pub stores: Vec<String>,
}

impl CertAndStores {
    pub fn new(cert_file: &str, key_file: &str, stores: &[&str]) -> Self {
        Self {
            cert_file: cert_file.to_string(),
            key_file: key_file.to_string(),
            stores: stores.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Same certificate and key, regardless of store attachments.
    pub fn same_material(&self, other: &Self) -> bool {
        self.cert_file == other.cert_file && self.key_file == other.key_file
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsOptions {
    pub min_version: Option<String>,
    pub max_version: Option<String>,
    pub cipher_suites: Vec<String>,
    pub sni_strict: bool,
    pub alpn_protocols: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Store {
    pub default_certificate: Option<Certificate>,
    pub default_generated_cert: Option<GeneratedCert>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Certificate {
    pub cert_file: String,
    pub key_file: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratedCert {
    pub resolver: String,
    pub domain: Option<Domain>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Domain {
    pub main: String,
    pub sans: Vec<String>,
}
