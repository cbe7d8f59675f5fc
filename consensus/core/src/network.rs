use kaspad_addresses::Prefix;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid network name {0}")]
pub struct NetworkTypeError(String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkType {
    Mainnet,
    Testnet,
    Devnet,
    Simnet,
}

impl NetworkType {
    pub fn default_p2p_port(&self) -> u16 {
        match self {
            NetworkType::Mainnet => 16111,
            NetworkType::Testnet => 16211,
            NetworkType::Simnet => 16511,
            NetworkType::Devnet => 16611,
        }
    }

    pub fn default_rpc_port(&self) -> u16 {
        match self {
            NetworkType::Mainnet => 16110,
            NetworkType::Testnet => 16210,
            NetworkType::Simnet => 16510,
            NetworkType::Devnet => 16610,
        }
    }

    /// The 32-bit wire magic prepended to every p2p message frame
    pub fn magic(&self) -> u32 {
        match self {
            NetworkType::Mainnet => 0x3ddcf71d,
            NetworkType::Testnet => 0xddb8af8f,
            NetworkType::Simnet => 0x374dcf1c,
            NetworkType::Devnet => 0x732d87e1,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            NetworkType::Mainnet => "kaspa-mainnet",
            NetworkType::Testnet => "kaspa-testnet",
            NetworkType::Simnet => "kaspa-simnet",
            NetworkType::Devnet => "kaspa-devnet",
        }
    }
}

impl From<NetworkType> for Prefix {
    fn from(network_type: NetworkType) -> Self {
        match network_type {
            NetworkType::Mainnet => Prefix::Mainnet,
            NetworkType::Testnet => Prefix::Testnet,
            NetworkType::Simnet => Prefix::Simnet,
            NetworkType::Devnet => Prefix::Devnet,
        }
    }
}

impl Display for NetworkType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NetworkType::Mainnet => "mainnet",
            NetworkType::Testnet => "testnet",
            NetworkType::Simnet => "simnet",
            NetworkType::Devnet => "devnet",
        };
        f.write_str(s)
    }
}

impl FromStr for NetworkType {
    type Err = NetworkTypeError;

    fn from_str(network_type: &str) -> Result<Self, Self::Err> {
        match network_type {
            "mainnet" => Ok(NetworkType::Mainnet),
            "testnet" => Ok(NetworkType::Testnet),
            "simnet" => Ok(NetworkType::Simnet),
            "devnet" => Ok(NetworkType::Devnet),
            _ => Err(NetworkTypeError(network_type.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_magics_are_distinct() {
        let magics: HashSet<u32> =
            [NetworkType::Mainnet, NetworkType::Testnet, NetworkType::Simnet, NetworkType::Devnet].iter().map(|n| n.magic()).collect();
        assert_eq!(magics.len(), 4);
    }

    #[test]
    fn test_name_round_trip() {
        for net in [NetworkType::Mainnet, NetworkType::Testnet, NetworkType::Simnet, NetworkType::Devnet] {
            assert_eq!(net, net.to_string().parse().unwrap());
        }
    }
}
