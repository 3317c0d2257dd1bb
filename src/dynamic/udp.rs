//! UDP plane resources.

use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UdpConfiguration {
    pub routers: BTreeMap<String, UdpRouter>,
    pub services: BTreeMap<String, UdpService>,
}

impl UdpConfiguration {
    pub fn len(&self) -> usize {
        self.routers.len() + self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UdpRouter {
    pub entry_points: Vec<String>,
    pub service: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UdpService {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_balancer: Option<UdpServersLoadBalancer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weighted: Option<UdpWeightedRoundRobin>,
}

impl UdpService {
    pub fn with_servers(addresses: &[&str]) -> Self {
        Self {
            load_balancer: Some(UdpServersLoadBalancer {
                servers: addresses
                    .iter()
                    .map(|address| UdpServer {
                        address: address.to_string(),
                    })
                    .collect(),
            }),
            weighted: None,
        }
    }
}

/// UDP load balancers carry nothing but servers, so any two are mergeable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UdpServersLoadBalancer {
    pub servers: Vec<UdpServer>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UdpServer {
    pub address: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UdpWeightedRoundRobin {
    pub services: Vec<UdpWeightedService>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UdpWeightedService {
    pub name: String,
    pub weight: Option<u32>,
}
