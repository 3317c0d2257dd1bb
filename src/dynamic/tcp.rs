//! TCP plane resources.

use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TcpConfiguration {
    pub routers: BTreeMap<String, TcpRouter>,
    pub services: BTreeMap<String, TcpService>,
    pub middlewares: BTreeMap<String, TcpMiddleware>,
    pub servers_transports: BTreeMap<String, TcpServersTransport>,
}

impl TcpConfiguration {
    pub fn len(&self) -> usize {
        self.routers.len()
            + self.services.len()
            + self.middlewares.len()
            + self.servers_transports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TcpRouter {
    pub entry_points: Vec<String>,
    pub middlewares: Vec<String>,
    pub service: String,
    pub rule: String,
    pub priority: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls: Option<TcpRouterTls>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TcpRouterTls {
    pub passthrough: bool,
    pub options: Option<String>,
    pub cert_resolver: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TcpService {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_balancer: Option<TcpServersLoadBalancer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weighted: Option<TcpWeightedRoundRobin>,
}

impl TcpService {
    pub fn with_servers(addresses: &[&str]) -> Self {
        Self {
            load_balancer: Some(TcpServersLoadBalancer {
                servers: addresses
                    .iter()
                    .map(|address| TcpServer {
                        address: address.to_string(),
                        tls: false,
                    })
                    .collect(),
                ..Default::default()
            }),
            weighted: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TcpServersLoadBalancer {
    pub servers: Vec<TcpServer>,
    pub servers_transport: Option<String>,
    pub proxy_protocol: Option<ProxyProtocol>,
}

impl TcpServersLoadBalancer {
    pub fn mergeable(&self, other: &Self) -> bool {
        let Self {
            servers: _,
            servers_transport,
            proxy_protocol,
        } = self;

        *servers_transport == other.servers_transport && *proxy_protocol == other.proxy_protocol
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TcpServer {
    pub address: String,
    pub tls: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyProtocol {
    pub version: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TcpWeightedRoundRobin {
    pub services: Vec<TcpWeightedService>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TcpWeightedService {
    pub name: String,
    pub weight: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TcpMiddleware {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_allow_list: Option<TcpIpAllowList>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_flight_conn: Option<TcpInFlightConn>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TcpIpAllowList {
    pub source_range: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TcpInFlightConn {
    pub amount: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TcpServersTransport {
    pub dial_timeout: Option<String>,
    pub dial_keep_alive: Option<String>,
    pub termination_delay: Option<String>,
    pub tls: Option<TcpClientTls>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TcpClientTls {
    pub server_name: Option<String>,
    pub insecure_skip_verify: bool,
    pub root_cas: Vec<String>,
}
