use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use std::{
    fmt::Display,
    net::{AddrParseError, IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr},
    str::FromStr,
};

/// An IP address wrapper carrying the helpers the p2p and address-manager
/// layers need (loopback/publicity checks, prefix bucketing).
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug, PartialOrd, Ord, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct IpAddress(pub IpAddr);

impl IpAddress {
    pub fn new(ip: IpAddr) -> Self {
        Self(ip)
    }

    pub fn is_loopback(&self) -> bool {
        self.0.is_loopback()
    }

    pub fn is_unspecified(&self) -> bool {
        self.0.is_unspecified()
    }

    pub fn is_publicly_routable(&self) -> bool {
        if self.is_loopback() || self.is_unspecified() {
            return false;
        }
        match self.0 {
            IpAddr::V4(ip) => !(ip.is_private() || ip.is_link_local() || ip.is_broadcast() || ip.is_documentation()),
            IpAddr::V6(_) => true,
        }
    }

    /// Returns a coarse network-group key: /16 for IPv4, /32 for IPv6.
    /// Used by the address manager for sybil-resistant bucketing.
    pub fn prefix_bytes(&self) -> Vec<u8> {
        match self.0 {
            IpAddr::V4(ip) => ip.octets()[..2].to_vec(),
            IpAddr::V6(ip) => ip.octets()[..4].to_vec(),
        }
    }
}

impl From<IpAddr> for IpAddress {
    fn from(ip: IpAddr) -> Self {
        Self(ip)
    }
}

impl From<Ipv4Addr> for IpAddress {
    fn from(value: Ipv4Addr) -> Self {
        Self(value.into())
    }
}

impl From<Ipv6Addr> for IpAddress {
    fn from(value: Ipv6Addr) -> Self {
        Self(value.into())
    }
}

impl From<IpAddress> for IpAddr {
    fn from(ip: IpAddress) -> Self {
        ip.0
    }
}

impl FromStr for IpAddress {
    type Err = AddrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IpAddr::from_str(s).map(IpAddress)
    }
}

impl Display for IpAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A network address (IP + port)
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug, PartialOrd, Ord, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct NetAddress {
    pub ip: IpAddress,
    pub port: u16,
}

impl NetAddress {
    pub fn new(ip: IpAddress, port: u16) -> Self {
        Self { ip, port }
    }
}

impl From<SocketAddr> for NetAddress {
    fn from(value: SocketAddr) -> Self {
        Self::new(value.ip().into(), value.port())
    }
}

impl From<NetAddress> for SocketAddr {
    fn from(value: NetAddress) -> Self {
        Self::new(value.ip.0, value.port)
    }
}

impl FromStr for NetAddress {
    type Err = AddrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SocketAddr::from_str(s).map(NetAddress::from)
    }
}

impl Display for NetAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        SocketAddr::from(*self).fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_net_address_from_str() {
        let addr: NetAddress = "127.0.0.1:16111".parse().unwrap();
        assert_eq!(addr.port, 16111);
        assert!(addr.ip.is_loopback());
        assert_eq!(addr.to_string(), "127.0.0.1:16111");
    }

    #[test]
    fn test_prefix_bytes() {
        let a: IpAddress = "203.0.113.7".parse().unwrap();
        let b: IpAddress = "203.0.250.9".parse().unwrap();
        assert_eq!(a.prefix_bytes(), b.prefix_bytes());
    }
}
