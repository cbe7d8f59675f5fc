use clap::Parser;
use kaspad_consensus_core::network::NetworkType;
use kaspad_utils::networking::NetAddress;
use std::path::PathBuf;

/// Kaspad full-node command line arguments
#[derive(Parser, Debug, Clone)]
#[command(name = "kaspad", version, about = "The Kaspa BlockDAG full node")]
pub struct Args {
    /// Directory holding the databases, flat files and logs
    #[arg(long = "appdir")]
    pub appdir: Option<PathBuf>,

    /// The p2p listen address
    #[arg(long = "listen")]
    pub listen: Option<NetAddress>,

    /// The RPC listen address (consumed by the transport collaborator)
    #[arg(long = "rpclisten")]
    pub rpclisten: Option<NetAddress>,

    /// RPC username
    #[arg(long = "rpcuser")]
    pub rpcuser: Option<String>,

    /// RPC password
    #[arg(long = "rpcpass")]
    pub rpcpass: Option<String>,

    /// Disable TLS on the RPC transport
    #[arg(long = "notls", default_value_t = false)]
    pub notls: bool,

    /// Use the simulation test network
    #[arg(long = "simnet", default_value_t = false)]
    pub simnet: bool,

    /// Use the test network
    #[arg(long = "testnet", default_value_t = false)]
    pub testnet: bool,

    /// Use the development test network
    #[arg(long = "devnet", default_value_t = false)]
    pub devnet: bool,

    /// Connect only to the specified peers at startup
    #[arg(long = "connect")]
    pub connect: Vec<NetAddress>,

    /// Add peers to connect with at startup
    #[arg(long = "addpeer")]
    pub add_peers: Vec<NetAddress>,

    /// The address block rewards are paid to when producing templates
    #[arg(long = "miningaddr")]
    pub mining_addr: Option<String>,

    /// Maximum transaction mass allowed in a block template
    #[arg(long = "blockmaxmass")]
    pub block_max_mass: Option<u64>,

    /// Minimum relay fee rate in sompi per kilogram
    #[arg(long = "minrelaytxfee")]
    pub min_relay_tx_fee: Option<u64>,

    /// Maximum number of orphan transactions held in the mempool
    #[arg(long = "maxorphantx")]
    pub max_orphan_tx: Option<u64>,

    /// Maintain a full transaction acceptance index
    #[arg(long = "acceptanceindex", default_value_t = false)]
    pub acceptance_index: bool,
}

impl Args {
    pub fn network(&self) -> NetworkType {
        match (self.simnet, self.testnet, self.devnet) {
            (true, _, _) => NetworkType::Simnet,
            (_, true, _) => NetworkType::Testnet,
            (_, _, true) => NetworkType::Devnet,
            _ => NetworkType::Mainnet,
        }
    }

    /// Resolves the application directory, defaulting to `~/.rusty-kaspad/<network>`
    pub fn app_dir(&self) -> PathBuf {
        let base = self
            .appdir
            .clone()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".rusty-kaspad"));
        base.join(self.network().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_selection() {
        let args = Args::parse_from(["kaspad", "--simnet"]);
        assert_eq!(args.network(), NetworkType::Simnet);
        let args = Args::parse_from(["kaspad"]);
        assert_eq!(args.network(), NetworkType::Mainnet);
    }

    #[test]
    fn test_peer_args() {
        let args = Args::parse_from(["kaspad", "--addpeer", "1.2.3.4:16111", "--addpeer", "5.6.7.8:16111"]);
        assert_eq!(args.add_peers.len(), 2);
    }
}
