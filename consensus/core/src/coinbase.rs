use crate::{
    errors::coinbase::{CoinbaseError, CoinbaseResult},
    tx::{ScriptPublicKey, ScriptPublicKeyVersion, ScriptVec},
};

/// The maximum length of the coinbase extra data appended by the miner
pub const MAX_COINBASE_PAYLOAD_EXTRA_DATA_LEN: usize = 64;

const MIN_PAYLOAD_LEN: usize = 8 + 8 + 2 + 1;

/// Holds a rewarded miner's script and the free-form data it attaches to coinbase payloads
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MinerData<T: AsRef<[u8]> = Vec<u8>> {
    pub script_public_key: ScriptPublicKey,
    pub extra_data: T,
}

impl<T: AsRef<[u8]>> MinerData<T> {
    pub fn new(script_public_key: ScriptPublicKey, extra_data: T) -> Self {
        Self { script_public_key, extra_data }
    }
}

/// The structured content of a coinbase transaction payload: the accepting
/// block's blue score and subsidy followed by the miner payout data
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoinbaseData<T: AsRef<[u8]> = Vec<u8>> {
    pub blue_score: u64,
    pub subsidy: u64,
    pub miner_data: MinerData<T>,
}

impl<T: AsRef<[u8]>> CoinbaseData<T> {
    pub fn new(blue_score: u64, subsidy: u64, miner_data: MinerData<T>) -> Self {
        Self { blue_score, subsidy, miner_data }
    }

    pub fn serialize(&self) -> Vec<u8> {
        let script = self.miner_data.script_public_key.script();
        let extra = self.miner_data.extra_data.as_ref();
        let mut payload = Vec::with_capacity(MIN_PAYLOAD_LEN + script.len() + extra.len());
        payload.extend(self.blue_score.to_le_bytes());
        payload.extend(self.subsidy.to_le_bytes());
        payload.extend(self.miner_data.script_public_key.version().to_le_bytes());
        payload.push(script.len() as u8);
        payload.extend(script);
        payload.extend(extra);
        payload
    }
}

pub fn deserialize_coinbase_payload(payload: &[u8]) -> CoinbaseResult<CoinbaseData<&[u8]>> {
    if payload.len() < MIN_PAYLOAD_LEN {
        return Err(CoinbaseError::PayloadLenBelowMin(payload.len(), MIN_PAYLOAD_LEN));
    }
    let blue_score = u64::from_le_bytes(payload[0..8].try_into().expect("slice is exactly 8 bytes"));
    let subsidy = u64::from_le_bytes(payload[8..16].try_into().expect("slice is exactly 8 bytes"));
    let version = ScriptPublicKeyVersion::from_le_bytes(payload[16..18].try_into().expect("slice is exactly 2 bytes"));
    let script_len = payload[18] as usize;
    if payload.len() < MIN_PAYLOAD_LEN + script_len {
        return Err(CoinbaseError::PayloadCantContainScriptPublicKey(payload.len(), MIN_PAYLOAD_LEN + script_len));
    }
    let script = &payload[19..19 + script_len];
    let extra_data = &payload[19 + script_len..];
    if extra_data.len() > MAX_COINBASE_PAYLOAD_EXTRA_DATA_LEN {
        return Err(CoinbaseError::PayloadExtraDataAboveMax(extra_data.len(), MAX_COINBASE_PAYLOAD_EXTRA_DATA_LEN));
    }
    Ok(CoinbaseData {
        blue_score,
        subsidy,
        miner_data: MinerData { script_public_key: ScriptPublicKey::new(version, ScriptVec::from_slice(script)), extra_data },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    #[test]
    fn test_payload_round_trip() {
        let data = CoinbaseData::new(
            1234,
            50_000_000,
            MinerData::new(ScriptPublicKey::new(0, smallvec![0x20, 0xaa, 0xbb]), vec![7, 7, 7]),
        );
        let payload = data.serialize();
        let deserialized = deserialize_coinbase_payload(&payload).unwrap();
        assert_eq!(deserialized.blue_score, data.blue_score);
        assert_eq!(deserialized.subsidy, data.subsidy);
        assert_eq!(deserialized.miner_data.script_public_key, data.miner_data.script_public_key);
        assert_eq!(deserialized.miner_data.extra_data, data.miner_data.extra_data.as_slice());
    }

    #[test]
    fn test_payload_too_short() {
        assert!(matches!(deserialize_coinbase_payload(&[0; 5]), Err(CoinbaseError::PayloadLenBelowMin(5, _))));
    }

    #[test]
    fn test_truncated_script_rejected() {
        let data = CoinbaseData::new(1, 2, MinerData::new(ScriptPublicKey::new(0, smallvec![1, 2, 3, 4]), vec![]));
        let mut payload = data.serialize();
        payload.truncate(payload.len() - 2);
        assert!(matches!(deserialize_coinbase_payload(&payload), Err(CoinbaseError::PayloadCantContainScriptPublicKey(..))));
    }
}
