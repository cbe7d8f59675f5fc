use kaspad_core::time::unix_now;
use kaspad_utils::networking::{IpAddress, NetAddress};
use log::{debug, info, warn};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::{
    collections::{HashMap, HashSet},
    path::PathBuf,
};

/// A failed connection attempt count after which an address is dropped
const MAX_FAILED_ATTEMPTS: u32 = 8;

/// Ban duration in milliseconds (24 hours)
const BAN_DURATION: u64 = 24 * 60 * 60 * 1000;

/// Share of outbound candidates drawn from the tried buckets
const TRIED_BIAS_NUMERATOR: u32 = 2;
const TRIED_BIAS_DENOMINATOR: u32 = 3;

/// The filename of the persisted directory snapshot
pub const PEERS_FILE_NAME: &str = "peers.json";

#[derive(Clone, Debug, Serialize, Deserialize)]
struct AddressEntry {
    address: NetAddress,
    /// The network group the address was learned from, for sybil resistance
    source_group: Vec<u8>,
    is_tried: bool,
    failed_attempts: u32,
    last_seen: u64,
}

/// A directory of known peer addresses split into "new" (heard of) and
/// "tried" (successfully connected) buckets keyed by source network group.
/// Also tracks banned IPs with expiry.
pub struct AddressManager {
    entries: HashMap<NetAddress, AddressEntry>,
    /// Bucket membership: source group -> addresses, split by tried state
    new_buckets: HashMap<Vec<u8>, HashSet<NetAddress>>,
    tried_buckets: HashMap<Vec<u8>, HashSet<NetAddress>>,
    banned: HashMap<IpAddress, u64>,
    peers_file: PathBuf,
}

#[derive(Serialize, Deserialize, Default)]
struct Snapshot {
    entries: Vec<AddressEntry>,
    banned: Vec<(IpAddress, u64)>,
}

impl AddressManager {
    pub fn new(app_dir: PathBuf) -> Self {
        let mut manager = Self {
            entries: HashMap::new(),
            new_buckets: HashMap::new(),
            tried_buckets: HashMap::new(),
            banned: HashMap::new(),
            peers_file: app_dir.join(PEERS_FILE_NAME),
        };
        manager.load();
        manager
    }

    fn load(&mut self) {
        let Ok(bytes) = std::fs::read(&self.peers_file) else { return };
        match serde_json::from_slice::<Snapshot>(&bytes) {
            Ok(snapshot) => {
                for entry in snapshot.entries {
                    self.index_entry(entry);
                }
                self.banned = snapshot.banned.into_iter().collect();
                info!("Loaded {} peer addresses from {}", self.entries.len(), self.peers_file.display());
            }
            Err(err) => warn!("Could not parse {}: {err}", self.peers_file.display()),
        }
    }

    /// Serializes the full directory. Called periodically and on shutdown.
    pub fn store(&self) {
        let snapshot = Snapshot {
            entries: self.entries.values().cloned().collect(),
            banned: self.banned.iter().map(|(ip, expiry)| (*ip, *expiry)).collect(),
        };
        match serde_json::to_vec_pretty(&snapshot) {
            Ok(bytes) => {
                if let Err(err) = std::fs::write(&self.peers_file, bytes) {
                    warn!("Could not persist the peers file: {err}");
                }
            }
            Err(err) => warn!("Could not serialize the peers snapshot: {err}"),
        }
    }

    fn index_entry(&mut self, entry: AddressEntry) {
        let buckets = if entry.is_tried { &mut self.tried_buckets } else { &mut self.new_buckets };
        buckets.entry(entry.source_group.clone()).or_default().insert(entry.address);
        self.entries.insert(entry.address, entry);
    }

    /// Adds a routable address heard from an unspecified source (the address
    /// itself determines the bucket group)
    pub fn add_address(&mut self, address: NetAddress) {
        let source_group = address.ip.prefix_bytes();
        self.add_address_with_source_group(address, source_group)
    }

    /// Adds an address learned from a specific peer, bucketing it by the
    /// source's network group so a single subnet cannot flood the directory
    pub fn add_address_from_peer(&mut self, address: NetAddress, source: IpAddress) {
        self.add_address_with_source_group(address, source.prefix_bytes())
    }

    fn add_address_with_source_group(&mut self, address: NetAddress, source_group: Vec<u8>) {
        if self.entries.contains_key(&address) || self.is_banned(address.ip) {
            return;
        }
        if address.ip.is_loopback() || address.ip.is_unspecified() {
            return;
        }
        debug!("Adding address {address} to the directory");
        self.index_entry(AddressEntry { address, source_group, is_tried: false, failed_attempts: 0, last_seen: unix_now() });
    }

    /// Marks a successful connection: promotes the address from new to tried
    pub fn good(&mut self, address: NetAddress) {
        let Some(entry) = self.entries.get_mut(&address) else {
            // An explicitly connected peer may not be pre-listed
            let source_group = address.ip.prefix_bytes();
            self.index_entry(AddressEntry { address, source_group, is_tried: true, failed_attempts: 0, last_seen: unix_now() });
            return;
        };
        entry.failed_attempts = 0;
        entry.last_seen = unix_now();
        if !entry.is_tried {
            entry.is_tried = true;
            let group = entry.source_group.clone();
            if let Some(bucket) = self.new_buckets.get_mut(&group) {
                bucket.remove(&address);
            }
            self.tried_buckets.entry(group).or_default().insert(address);
        }
    }

    /// Records a failed connection attempt; repeatedly failing addresses are
    /// eventually dropped from the directory
    pub fn attempted(&mut self, address: NetAddress) {
        let Some(entry) = self.entries.get_mut(&address) else { return };
        entry.failed_attempts += 1;
        if entry.failed_attempts >= MAX_FAILED_ATTEMPTS {
            debug!("Dropping address {address} after {} failed attempts", entry.failed_attempts);
            self.remove(address);
        }
    }

    fn remove(&mut self, address: NetAddress) {
        if let Some(entry) = self.entries.remove(&address) {
            let buckets = if entry.is_tried { &mut self.tried_buckets } else { &mut self.new_buckets };
            if let Some(bucket) = buckets.get_mut(&entry.source_group) {
                bucket.remove(&address);
            }
        }
    }

    pub fn ban(&mut self, ip: IpAddress) {
        info!("Banning {ip} for {} hours", BAN_DURATION / 1000 / 3600);
        self.banned.insert(ip, unix_now() + BAN_DURATION);
        let to_remove: Vec<NetAddress> = self.entries.keys().copied().filter(|address| address.ip == ip).collect();
        for address in to_remove {
            self.remove(address);
        }
    }

    pub fn unban(&mut self, ip: IpAddress) {
        self.banned.remove(&ip);
    }

    pub fn is_banned(&mut self, ip: IpAddress) -> bool {
        match self.banned.get(&ip) {
            Some(&expiry) if expiry > unix_now() => true,
            Some(_) => {
                // The ban expired
                self.banned.remove(&ip);
                false
            }
            None => false,
        }
    }

    pub fn address_count(&self) -> usize {
        self.entries.len()
    }

    pub fn banned_count(&self) -> usize {
        self.banned.len()
    }

    /// Iterates addresses for sharing with peers: tried first, each bucket
    /// set shuffled to avoid fingerprinting the directory layout
    pub fn iterate_prioritized_addresses(&self) -> impl Iterator<Item = NetAddress> {
        let mut rng = rand::thread_rng();
        let mut tried: Vec<NetAddress> = self.tried_buckets.values().flatten().copied().collect();
        let mut new: Vec<NetAddress> = self.new_buckets.values().flatten().copied().collect();
        tried.shuffle(&mut rng);
        new.shuffle(&mut rng);
        tried.into_iter().chain(new)
    }

    /// Picks a random candidate for an outbound connection, biased toward
    /// tried addresses, excluding the given set
    pub fn select_outbound(&mut self, exclude: &HashSet<NetAddress>) -> Option<NetAddress> {
        let mut rng = rand::thread_rng();
        let pick_tried = rng.gen_ratio(TRIED_BIAS_NUMERATOR, TRIED_BIAS_DENOMINATOR);

        let from_buckets = |buckets: &HashMap<Vec<u8>, HashSet<NetAddress>>, rng: &mut rand::rngs::ThreadRng| {
            let candidates: Vec<NetAddress> =
                buckets.values().flatten().copied().filter(|address| !exclude.contains(address)).collect();
            candidates.choose(rng).copied()
        };

        let (primary, fallback) =
            if pick_tried { (&self.tried_buckets, &self.new_buckets) } else { (&self.new_buckets, &self.tried_buckets) };
        from_buckets(primary, &mut rng)
            .or_else(|| from_buckets(fallback, &mut rng))
            .filter(|address| !self.is_banned_read_only(address.ip))
    }

    fn is_banned_read_only(&self, ip: IpAddress) -> bool {
        matches!(self.banned.get(&ip), Some(&expiry) if expiry > unix_now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address(last_octet: u8) -> NetAddress {
        format!("203.0.113.{last_octet}:16111").parse().unwrap()
    }

    fn temp_manager() -> (tempfile::TempDir, AddressManager) {
        let dir = tempfile::tempdir().unwrap();
        let manager = AddressManager::new(dir.path().to_path_buf());
        (dir, manager)
    }

    #[test]
    fn test_add_good_attempted_cycle() {
        let (_dir, mut manager) = temp_manager();
        manager.add_address(address(1));
        assert_eq!(manager.address_count(), 1);

        // Promotion to tried
        manager.good(address(1));
        let tried: Vec<_> = manager.tried_buckets.values().flatten().collect();
        assert_eq!(tried.len(), 1);

        // Repeated failures drop the address
        for _ in 0..MAX_FAILED_ATTEMPTS {
            manager.attempted(address(1));
        }
        assert_eq!(manager.address_count(), 0);
    }

    #[test]
    fn test_ban_removes_and_blocks() {
        let (_dir, mut manager) = temp_manager();
        manager.add_address(address(7));
        manager.ban(address(7).ip);
        assert!(manager.is_banned(address(7).ip));
        assert_eq!(manager.address_count(), 0);

        // A banned address is not re-admitted
        manager.add_address(address(7));
        assert_eq!(manager.address_count(), 0);

        manager.unban(address(7).ip);
        manager.add_address(address(7));
        assert_eq!(manager.address_count(), 1);
    }

    #[test]
    fn test_loopback_filtered() {
        let (_dir, mut manager) = temp_manager();
        manager.add_address("127.0.0.1:16111".parse().unwrap());
        assert_eq!(manager.address_count(), 0);
    }

    #[test]
    fn test_selection_excludes_connected() {
        let (_dir, mut manager) = temp_manager();
        manager.add_address(address(1));
        manager.add_address(address(2));

        let exclude: HashSet<NetAddress> = [address(1)].into();
        for _ in 0..32 {
            let selected = manager.select_outbound(&exclude).unwrap();
            assert_eq!(selected, address(2));
        }
        let all: HashSet<NetAddress> = [address(1), address(2)].into();
        assert!(manager.select_outbound(&all).is_none());
    }

    #[test]
    fn test_persistence_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut manager = AddressManager::new(dir.path().to_path_buf());
            manager.add_address(address(1));
            manager.good(address(1));
            manager.ban(address(9).ip);
            manager.store();
        }
        let mut reloaded = AddressManager::new(dir.path().to_path_buf());
        assert_eq!(reloaded.address_count(), 1);
        assert!(reloaded.is_banned(address(9).ip));
        let tried: Vec<_> = reloaded.tried_buckets.values().flatten().collect();
        assert_eq!(tried.len(), 1);
    }
}
