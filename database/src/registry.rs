/// Byte prefixes designating the buckets of the keyed store. A prefix pins the
/// on-disk namespace of a store, so values must never be reused or renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DatabaseStorePrefixes {
    // ---- Consensus ----
    AcceptanceData = 1,
    BlockTransactions = 2,
    Ghostdag = 3,
    GhostdagCompact = 4,
    Headers = 5,
    HeadersCompact = 6,
    Reachability = 7,
    ReachabilityReindexRoot = 8,
    Relations = 9,
    RelationsChildren = 10,
    Statuses = 11,
    Tips = 12,
    UtxoDiffs = 13,
    VirtualUtxoset = 14,
    VirtualState = 15,
    PruningPoint = 16,
    BlockLocations = 17,
    UtxoMultisets = 18,

    // ---- Flat files ----
    FlatFileCursors = 64,

    // ---- Components ----
    Addresses = 128,
    BannedAddresses = 129,

    // ---- Metadata ----
    Metadata = 192,
}

impl TryFrom<u8> for DatabaseStorePrefixes {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::AcceptanceData),
            2 => Ok(Self::BlockTransactions),
            3 => Ok(Self::Ghostdag),
            4 => Ok(Self::GhostdagCompact),
            5 => Ok(Self::Headers),
            6 => Ok(Self::HeadersCompact),
            7 => Ok(Self::Reachability),
            8 => Ok(Self::ReachabilityReindexRoot),
            9 => Ok(Self::Relations),
            10 => Ok(Self::RelationsChildren),
            11 => Ok(Self::Statuses),
            12 => Ok(Self::Tips),
            13 => Ok(Self::UtxoDiffs),
            14 => Ok(Self::VirtualUtxoset),
            15 => Ok(Self::VirtualState),
            16 => Ok(Self::PruningPoint),
            17 => Ok(Self::BlockLocations),
            18 => Ok(Self::UtxoMultisets),
            64 => Ok(Self::FlatFileCursors),
            128 => Ok(Self::Addresses),
            129 => Ok(Self::BannedAddresses),
            192 => Ok(Self::Metadata),
            other => Err(other),
        }
    }
}

impl From<DatabaseStorePrefixes> for Vec<u8> {
    fn from(value: DatabaseStorePrefixes) -> Self {
        [value as u8].to_vec()
    }
}

impl From<DatabaseStorePrefixes> for u8 {
    fn from(value: DatabaseStorePrefixes) -> Self {
        value as u8
    }
}

impl AsRef<[u8]> for DatabaseStorePrefixes {
    fn as_ref(&self) -> &[u8] {
        // SAFETY: enum has repr(u8)
        std::slice::from_ref(unsafe { &*(self as *const Self as *const u8) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::size_of;

    #[test]
    fn test_as_ref() {
        let prefix = DatabaseStorePrefixes::AcceptanceData;
        assert_eq!(&[prefix as u8], prefix.as_ref());
        assert_eq!(
            size_of::<u8>(),
            size_of::<DatabaseStorePrefixes>(),
            "DatabaseStorePrefixes is expected to have the same memory layout of u8"
        );
    }

    #[test]
    fn test_round_trip() {
        for prefix in [DatabaseStorePrefixes::Ghostdag, DatabaseStorePrefixes::Addresses, DatabaseStorePrefixes::Metadata] {
            assert_eq!(Ok(prefix), DatabaseStorePrefixes::try_from(prefix as u8));
        }
    }
}
