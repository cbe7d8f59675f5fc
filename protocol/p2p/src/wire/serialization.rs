//! Wire-level serialization: all multi-byte integers are little endian,
//! variable length sequences carry a u64 count, hashes are raw 32 bytes.

use crate::errors::ProtocolError;
use kaspad_consensus_core::{
    block::Block,
    header::Header,
    subnets::{SubnetworkId, SUBNETWORK_ID_SIZE},
    tx::{ScriptPublicKey, Transaction, TransactionInput, TransactionOutpoint, TransactionOutput},
};
use kaspad_hashes::{Hash, HASH_SIZE, ZERO_HASH};
use kaspad_utils::networking::NetAddress;
use std::net::{IpAddr, Ipv6Addr};

/// Upper bound for any single variable-length list, protecting from memory
/// exhaustion on malformed input
pub const MAX_WIRE_LIST_LEN: u64 = 1 << 18;

pub trait WireSerialize {
    fn wire_serialize(&self, buf: &mut Vec<u8>);
}

pub trait WireDeserialize: Sized {
    fn wire_deserialize(reader: &mut WireReader<'_>) -> Result<Self, ProtocolError>;
}

/// A cursor over a received payload
pub struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn is_exhausted(&self) -> bool {
        self.pos == self.buf.len()
    }

    pub fn finish(&self) -> Result<(), ProtocolError> {
        if self.is_exhausted() {
            Ok(())
        } else {
            Err(ProtocolError::MalformedPayload(format!("{} trailing bytes", self.buf.len() - self.pos)))
        }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], ProtocolError> {
        if self.pos + len > self.buf.len() {
            return Err(ProtocolError::MalformedPayload(format!(
                "expected {} more bytes but only {} remain",
                len,
                self.buf.len() - self.pos
            )));
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8, ProtocolError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, ProtocolError> {
        Ok(u16::from_le_bytes(self.take(2)?.try_into().expect("slice is exactly 2 bytes")))
    }

    pub fn read_u32(&mut self) -> Result<u32, ProtocolError> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into().expect("slice is exactly 4 bytes")))
    }

    pub fn read_u64(&mut self) -> Result<u64, ProtocolError> {
        Ok(u64::from_le_bytes(self.take(8)?.try_into().expect("slice is exactly 8 bytes")))
    }

    pub fn read_bool(&mut self) -> Result<bool, ProtocolError> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(ProtocolError::MalformedPayload(format!("invalid boolean encoding {other}"))),
        }
    }

    pub fn read_list_len(&mut self) -> Result<usize, ProtocolError> {
        let len = self.read_u64()?;
        if len > MAX_WIRE_LIST_LEN {
            return Err(ProtocolError::MalformedPayload(format!("list of {len} items exceeds the wire limit")));
        }
        Ok(len as usize)
    }

    pub fn read_var_bytes(&mut self) -> Result<Vec<u8>, ProtocolError> {
        let len = self.read_list_len()?;
        Ok(self.take(len)?.to_vec())
    }

    pub fn read_string(&mut self) -> Result<String, ProtocolError> {
        let bytes = self.read_var_bytes()?;
        String::from_utf8(bytes).map_err(|_| ProtocolError::MalformedPayload("invalid utf-8 string".to_string()))
    }
}

pub fn write_var_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.extend((bytes.len() as u64).to_le_bytes());
    buf.extend(bytes);
}

pub fn write_string(buf: &mut Vec<u8>, s: &str) {
    write_var_bytes(buf, s.as_bytes());
}

pub fn write_list<T: WireSerialize>(buf: &mut Vec<u8>, items: &[T]) {
    buf.extend((items.len() as u64).to_le_bytes());
    for item in items {
        item.wire_serialize(buf);
    }
}

pub fn read_list<T: WireDeserialize>(reader: &mut WireReader<'_>) -> Result<Vec<T>, ProtocolError> {
    let len = reader.read_list_len()?;
    (0..len).map(|_| T::wire_deserialize(reader)).collect()
}

impl WireSerialize for Hash {
    fn wire_serialize(&self, buf: &mut Vec<u8>) {
        buf.extend(self.as_bytes());
    }
}

impl WireDeserialize for Hash {
    fn wire_deserialize(reader: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Hash::from_slice(reader.take(HASH_SIZE)?))
    }
}

impl WireSerialize for SubnetworkId {
    fn wire_serialize(&self, buf: &mut Vec<u8>) {
        buf.extend(self.as_ref());
    }
}

impl WireDeserialize for SubnetworkId {
    fn wire_deserialize(reader: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        let bytes: [u8; SUBNETWORK_ID_SIZE] =
            reader.take(SUBNETWORK_ID_SIZE)?.try_into().expect("slice is exactly the subnetwork id size");
        Ok(SubnetworkId::from_bytes(bytes))
    }
}

/// Addresses travel as 16-byte IPv6 (v4-mapped when needed) plus a port
impl WireSerialize for NetAddress {
    fn wire_serialize(&self, buf: &mut Vec<u8>) {
        let v6 = match self.ip.0 {
            IpAddr::V4(v4) => v4.to_ipv6_mapped(),
            IpAddr::V6(v6) => v6,
        };
        buf.extend(v6.octets());
        buf.extend(self.port.to_le_bytes());
    }
}

impl WireDeserialize for NetAddress {
    fn wire_deserialize(reader: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        let octets: [u8; 16] = reader.take(16)?.try_into().expect("slice is exactly 16 bytes");
        let v6 = Ipv6Addr::from(octets);
        let ip = match v6.to_ipv4_mapped() {
            Some(v4) => IpAddr::V4(v4),
            None => IpAddr::V6(v6),
        };
        let port = reader.read_u16()?;
        Ok(NetAddress::new(ip.into(), port))
    }
}

impl WireSerialize for TransactionOutpoint {
    fn wire_serialize(&self, buf: &mut Vec<u8>) {
        self.transaction_id.wire_serialize(buf);
        buf.extend(self.index.to_le_bytes());
    }
}

impl WireDeserialize for TransactionOutpoint {
    fn wire_deserialize(reader: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        let transaction_id = Hash::wire_deserialize(reader)?;
        let index = reader.read_u32()?;
        Ok(TransactionOutpoint::new(transaction_id, index))
    }
}

impl WireSerialize for TransactionInput {
    fn wire_serialize(&self, buf: &mut Vec<u8>) {
        self.previous_outpoint.wire_serialize(buf);
        write_var_bytes(buf, &self.signature_script);
        buf.extend(self.sequence.to_le_bytes());
    }
}

impl WireDeserialize for TransactionInput {
    fn wire_deserialize(reader: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        let previous_outpoint = TransactionOutpoint::wire_deserialize(reader)?;
        let signature_script = reader.read_var_bytes()?;
        let sequence = reader.read_u64()?;
        Ok(TransactionInput::new(previous_outpoint, signature_script, sequence))
    }
}

impl WireSerialize for TransactionOutput {
    fn wire_serialize(&self, buf: &mut Vec<u8>) {
        buf.extend(self.value.to_le_bytes());
        buf.extend(self.script_public_key.version().to_le_bytes());
        write_var_bytes(buf, self.script_public_key.script());
    }
}

impl WireDeserialize for TransactionOutput {
    fn wire_deserialize(reader: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        let value = reader.read_u64()?;
        let version = reader.read_u16()?;
        let script = reader.read_var_bytes()?;
        Ok(TransactionOutput::new(value, ScriptPublicKey::from_vec(version, script)))
    }
}

/// The subnetwork ID is always present; gas and payload only for non-native
/// subnetwork transactions
impl WireSerialize for Transaction {
    fn wire_serialize(&self, buf: &mut Vec<u8>) {
        buf.extend(self.version.to_le_bytes());
        write_list(buf, &self.inputs);
        write_list(buf, &self.outputs);
        buf.extend(self.lock_time.to_le_bytes());
        self.subnetwork_id.wire_serialize(buf);
        if !self.subnetwork_id.is_native() {
            buf.extend(self.gas.to_le_bytes());
            self.payload_hash.unwrap_or(ZERO_HASH).wire_serialize(buf);
            write_var_bytes(buf, &self.payload);
        }
    }
}

impl WireDeserialize for Transaction {
    fn wire_deserialize(reader: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        let version = reader.read_u16()?;
        let inputs = read_list(reader)?;
        let outputs = read_list(reader)?;
        let lock_time = reader.read_u64()?;
        let subnetwork_id = SubnetworkId::wire_deserialize(reader)?;
        let (gas, payload) = if subnetwork_id.is_native() {
            (0, Vec::new())
        } else {
            let gas = reader.read_u64()?;
            let _payload_hash = Hash::wire_deserialize(reader)?;
            let payload = reader.read_var_bytes()?;
            (gas, payload)
        };
        // `Transaction::new` recomputes the payload hash commitment, which
        // contextual validation compares against the payload
        Ok(Transaction::new(version, inputs, outputs, lock_time, subnetwork_id, gas, payload))
    }
}

impl WireSerialize for Header {
    fn wire_serialize(&self, buf: &mut Vec<u8>) {
        buf.extend(self.version.to_le_bytes());
        write_list(buf, &self.parents);
        self.hash_merkle_root.wire_serialize(buf);
        self.accepted_id_merkle_root.wire_serialize(buf);
        self.utxo_commitment.wire_serialize(buf);
        buf.extend(self.timestamp.to_le_bytes());
        buf.extend(self.bits.to_le_bytes());
        buf.extend(self.nonce.to_le_bytes());
    }
}

impl WireDeserialize for Header {
    fn wire_deserialize(reader: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        let version = reader.read_u16()?;
        let parents = read_list(reader)?;
        let hash_merkle_root = Hash::wire_deserialize(reader)?;
        let accepted_id_merkle_root = Hash::wire_deserialize(reader)?;
        let utxo_commitment = Hash::wire_deserialize(reader)?;
        let timestamp = reader.read_u64()?;
        let bits = reader.read_u32()?;
        let nonce = reader.read_u64()?;

        let mut header = Header::new(version, parents, hash_merkle_root, timestamp, bits, nonce);
        header.accepted_id_merkle_root = accepted_id_merkle_root;
        header.utxo_commitment = utxo_commitment;
        header.finalize();
        Ok(header)
    }
}

impl WireSerialize for Block {
    fn wire_serialize(&self, buf: &mut Vec<u8>) {
        self.header.wire_serialize(buf);
        write_list(buf, &self.transactions);
    }
}

impl WireDeserialize for Block {
    fn wire_deserialize(reader: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        let header = Header::wire_deserialize(reader)?;
        let transactions = read_list(reader)?;
        Ok(Block::new(header, transactions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kaspad_consensus_core::subnets::{SubnetworkId, SUBNETWORK_ID_NATIVE};

    fn round_trip<T: WireSerialize + WireDeserialize + PartialEq + std::fmt::Debug>(value: T) {
        let mut buf = Vec::new();
        value.wire_serialize(&mut buf);
        let mut reader = WireReader::new(&buf);
        let decoded = T::wire_deserialize(&mut reader).unwrap();
        reader.finish().unwrap();
        assert_eq!(value, decoded);
    }

    #[test]
    fn test_primitive_round_trips() {
        round_trip(Hash::from_u64_word(0xabcdef));
        round_trip(SubnetworkId::from_byte(3));
        round_trip("127.0.0.1:16111".parse::<NetAddress>().unwrap());
        round_trip("[2001:db8::1]:16111".parse::<NetAddress>().unwrap());
    }

    #[test]
    fn test_native_transaction_round_trip() {
        let tx = Transaction::new(
            0,
            vec![TransactionInput::new(TransactionOutpoint::new(Hash::from_u64_word(5), 1), vec![1, 2, 3], 7)],
            vec![TransactionOutput::new(900, ScriptPublicKey::from_vec(0, vec![0x51]))],
            100,
            SUBNETWORK_ID_NATIVE,
            0,
            vec![],
        );
        round_trip(tx);
    }

    #[test]
    fn test_subnetwork_transaction_round_trip() {
        let tx = Transaction::new(0, vec![], vec![], 0, SubnetworkId::from_byte(9), 555, vec![1, 2, 3, 4]);
        round_trip(tx);
    }

    #[test]
    fn test_header_and_block_round_trip() {
        let mut header = Header::new(1, vec![Hash::from_u64_word(1), Hash::from_u64_word(2)], Hash::from_u64_word(3), 99, 0x207fffff, 42);
        header.accepted_id_merkle_root = Hash::from_u64_word(7);
        header.utxo_commitment = Hash::from_u64_word(8);
        header.finalize();

        let mut buf = Vec::new();
        header.wire_serialize(&mut buf);
        let decoded = Header::wire_deserialize(&mut WireReader::new(&buf)).unwrap();
        // The cached hash is recomputed on deserialization and must agree
        assert_eq!(header.hash, decoded.hash);
        assert_eq!(header, decoded);

        let block = Block::new(decoded, vec![Transaction::new(0, vec![], vec![], 0, SUBNETWORK_ID_NATIVE, 0, vec![])]);
        let mut buf = Vec::new();
        block.wire_serialize(&mut buf);
        let round = Block::wire_deserialize(&mut WireReader::new(&buf)).unwrap();
        assert_eq!(block.hash(), round.hash());
        assert_eq!(*block.transactions, *round.transactions);
    }

    #[test]
    fn test_truncated_input_fails() {
        let mut buf = Vec::new();
        Hash::from_u64_word(1).wire_serialize(&mut buf);
        buf.truncate(16);
        assert!(Hash::wire_deserialize(&mut WireReader::new(&buf)).is_err());
    }

    #[test]
    fn test_oversize_list_rejected() {
        let mut buf = Vec::new();
        buf.extend(u64::MAX.to_le_bytes());
        assert!(read_list::<Hash>(&mut WireReader::new(&buf)).is_err());
    }
}
