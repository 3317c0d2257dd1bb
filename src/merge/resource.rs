//! Mergeable resource contract.
//!
//! # Responsibilities
//! - Define how two same-keyed values from different providers combine
//! - Union server lists of load-balanced services
//! - Union store attachments of identical certificates
//!
//! # Design Decisions
//! - Capability is a trait method with a default of `Unsupported`;
//!   unsupported types fall back to structural equality
//! - A merge-capable type handed an incompatible variant reports `Conflict`
//! - Compatibility is checked before any mutation

use crate::dynamic::http::{self, ServersLoadBalancer};
use crate::dynamic::tcp::{self, TcpServersLoadBalancer};
use crate::dynamic::tls::{self, CertAndStores};
use crate::dynamic::udp::{self, UdpServersLoadBalancer};

/// Outcome of an absorption attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Absorb {
    /// `self` now holds the combination of both values.
    Merged,
    /// The values cannot be reconciled.
    Conflict,
    /// This type has no merge capability; compare for equality instead.
    Unsupported,
}

/// A value stored in a resource collection.
pub trait Resource: Clone + PartialEq {
    /// Absorb `other`, a same-keyed value from another provider.
    fn absorb(&mut self, _other: &Self) -> Absorb {
        Absorb::Unsupported
    }
}

/// Resolve a duplicate key: absorb when supported, else require equality.
pub fn try_merge<T: Resource>(existing: &mut T, incoming: &T) -> bool {
    match existing.absorb(incoming) {
        Absorb::Merged => true,
        Absorb::Conflict => false,
        Absorb::Unsupported => *existing == *incoming,
    }
}

/// Append items from `incoming` whose key is not already present in `target`.
fn union_by<T, K, F>(target: &mut Vec<T>, incoming: &[T], key: F)
where
    T: Clone,
    K: PartialEq + ?Sized,
    F: Fn(&T) -> &K,
{
    for item in incoming {
        if !target.iter().any(|existing| key(existing) == key(item)) {
            target.push(item.clone());
        }
    }
}

impl Resource for http::Router {}
impl Resource for http::Middleware {}
impl Resource for http::ServersTransport {}

impl Resource for http::Service {
    fn absorb(&mut self, other: &Self) -> Absorb {
        if *self == *other {
            return Absorb::Merged;
        }
        let Some(incoming) = other.only_load_balancer() else {
            return Absorb::Conflict;
        };
        if self.only_load_balancer().is_none() {
            return Absorb::Conflict;
        }
        match self.load_balancer.as_mut() {
            Some(lb) => lb.absorb(incoming),
            None => Absorb::Conflict,
        }
    }
}

impl Resource for ServersLoadBalancer {
    fn absorb(&mut self, other: &Self) -> Absorb {
        if !self.mergeable(other) {
            return Absorb::Conflict;
        }
        union_by(&mut self.servers, &other.servers, |s| s.url.as_str());
        Absorb::Merged
    }
}

impl Resource for tcp::TcpRouter {}
impl Resource for tcp::TcpMiddleware {}
impl Resource for tcp::TcpServersTransport {}

impl Resource for tcp::TcpService {
    fn absorb(&mut self, other: &Self) -> Absorb {
        if *self == *other {
            return Absorb::Merged;
        }
        match (self, other) {
            (
                tcp::TcpService {
                    load_balancer: Some(lb),
                    weighted: None,
                },
                tcp::TcpService {
                    load_balancer: Some(incoming),
                    weighted: None,
                },
            ) => lb.absorb(incoming),
            _ => Absorb::Conflict,
        }
    }
}

impl Resource for TcpServersLoadBalancer {
    fn absorb(&mut self, other: &Self) -> Absorb {
        if !self.mergeable(other) {
            return Absorb::Conflict;
        }
        union_by(&mut self.servers, &other.servers, |s| s.address.as_str());
        Absorb::Merged
    }
}

impl Resource for udp::UdpRouter {}

impl Resource for udp::UdpService {
    fn absorb(&mut self, other: &Self) -> Absorb {
        if *self == *other {
            return Absorb::Merged;
        }
        match (self, other) {
            (
                udp::UdpService {
                    load_balancer: Some(lb),
                    weighted: None,
                },
                udp::UdpService {
                    load_balancer: Some(incoming),
                    weighted: None,
                },
            ) => lb.absorb(incoming),
            _ => Absorb::Conflict,
        }
    }
}

impl Resource for UdpServersLoadBalancer {
    fn absorb(&mut self, other: &Self) -> Absorb {
        union_by(&mut self.servers, &other.servers, |s| s.address.as_str());
        Absorb::Merged
    }
}

impl Resource for CertAndStores {
    fn absorb(&mut self, other: &Self) -> Absorb {
        if !self.same_material(other) {
            return Absorb::Conflict;
        }
        union_by(&mut self.stores, &other.stores, |s| s.as_str());
        Absorb::Merged
    }
}

impl Resource for tls::TlsOptions {}
impl Resource for tls::Store {}
