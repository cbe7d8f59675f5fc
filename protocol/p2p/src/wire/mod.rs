mod codec;
pub mod serialization;

pub use codec::{FrameCodec, FRAME_HEADER_SIZE, MAX_PAYLOAD_SIZE};

use crate::errors::ProtocolError;
use kaspad_consensus_core::{block::Block, subnets::SubnetworkId, tx::Transaction};
use kaspad_hashes::Hash;
use kaspad_utils::networking::NetAddress;
use serialization::{read_list, write_list, write_string, WireDeserialize, WireReader, WireSerialize};

/// Wire command discriminants. The values are part of the protocol and must
/// never be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    Version = 0,
    VerAck = 1,
    Ping = 2,
    Pong = 3,
    Addresses = 4,
    RequestAddresses = 5,
    InvBlock = 6,
    Block = 7,
    IbdBlock = 8,
    BlockLocator = 9,
    RequestBlockLocator = 10,
    SelectedTip = 11,
    RequestSelectedTip = 12,
    RequestIbdBlocks = 13,
    RequestNextIbdBlocks = 14,
    DoneIbdBlocks = 15,
    Transaction = 16,
    InvTransaction = 17,
    RequestTransactions = 18,
    TransactionNotFound = 19,
    Reject = 20,
}

impl TryFrom<u8> for Command {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Command::Version),
            1 => Ok(Command::VerAck),
            2 => Ok(Command::Ping),
            3 => Ok(Command::Pong),
            4 => Ok(Command::Addresses),
            5 => Ok(Command::RequestAddresses),
            6 => Ok(Command::InvBlock),
            7 => Ok(Command::Block),
            8 => Ok(Command::IbdBlock),
            9 => Ok(Command::BlockLocator),
            10 => Ok(Command::RequestBlockLocator),
            11 => Ok(Command::SelectedTip),
            12 => Ok(Command::RequestSelectedTip),
            13 => Ok(Command::RequestIbdBlocks),
            14 => Ok(Command::RequestNextIbdBlocks),
            15 => Ok(Command::DoneIbdBlocks),
            16 => Ok(Command::Transaction),
            17 => Ok(Command::InvTransaction),
            18 => Ok(Command::RequestTransactions),
            19 => Ok(Command::TransactionNotFound),
            20 => Ok(Command::Reject),
            other => Err(ProtocolError::UnknownCommand(other)),
        }
    }
}

/// The handshake payload identifying a peer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionMessage {
    pub protocol_version: u32,
    pub timestamp: u64,
    pub id: [u8; 16],
    pub user_agent: String,
    pub disable_relay_tx: bool,
    pub subnetwork_id: Option<SubnetworkId>,
    pub selected_tip_hash: Hash,
}

/// All p2p message kinds with their typed payloads
#[derive(Debug, Clone)]
pub enum Message {
    Version(VersionMessage),
    VerAck,
    Ping { nonce: u64 },
    Pong { nonce: u64 },
    Addresses(Vec<NetAddress>),
    RequestAddresses,
    InvBlock { hash: Hash },
    Block(Block),
    IbdBlock(Block),
    BlockLocator(Vec<Hash>),
    RequestBlockLocator { high: Hash, limit: u32 },
    SelectedTip { hash: Hash },
    RequestSelectedTip,
    RequestIbdBlocks { low: Hash, high: Hash },
    RequestNextIbdBlocks,
    DoneIbdBlocks,
    Transaction(Transaction),
    InvTransaction(Vec<Hash>),
    RequestTransactions(Vec<Hash>),
    TransactionNotFound { id: Hash },
    Reject { reason: String },
}

impl Message {
    pub fn command(&self) -> Command {
        match self {
            Message::Version(_) => Command::Version,
            Message::VerAck => Command::VerAck,
            Message::Ping { .. } => Command::Ping,
            Message::Pong { .. } => Command::Pong,
            Message::Addresses(_) => Command::Addresses,
            Message::RequestAddresses => Command::RequestAddresses,
            Message::InvBlock { .. } => Command::InvBlock,
            Message::Block(_) => Command::Block,
            Message::IbdBlock(_) => Command::IbdBlock,
            Message::BlockLocator(_) => Command::BlockLocator,
            Message::RequestBlockLocator { .. } => Command::RequestBlockLocator,
            Message::SelectedTip { .. } => Command::SelectedTip,
            Message::RequestSelectedTip => Command::RequestSelectedTip,
            Message::RequestIbdBlocks { .. } => Command::RequestIbdBlocks,
            Message::RequestNextIbdBlocks => Command::RequestNextIbdBlocks,
            Message::DoneIbdBlocks => Command::DoneIbdBlocks,
            Message::Transaction(_) => Command::Transaction,
            Message::InvTransaction(_) => Command::InvTransaction,
            Message::RequestTransactions(_) => Command::RequestTransactions,
            Message::TransactionNotFound { .. } => Command::TransactionNotFound,
            Message::Reject { .. } => Command::Reject,
        }
    }

    pub fn serialize_payload(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        match self {
            Message::Version(version) => {
                buf.extend(version.protocol_version.to_le_bytes());
                buf.extend(version.timestamp.to_le_bytes());
                buf.extend(version.id);
                write_string(&mut buf, &version.user_agent);
                buf.push(version.disable_relay_tx as u8);
                match &version.subnetwork_id {
                    Some(subnetwork_id) => {
                        buf.push(1);
                        subnetwork_id.wire_serialize(&mut buf);
                    }
                    None => buf.push(0),
                }
                version.selected_tip_hash.wire_serialize(&mut buf);
            }
            Message::VerAck | Message::RequestAddresses | Message::RequestSelectedTip | Message::RequestNextIbdBlocks
            | Message::DoneIbdBlocks => {}
            Message::Ping { nonce } | Message::Pong { nonce } => buf.extend(nonce.to_le_bytes()),
            Message::Addresses(addresses) => write_list(&mut buf, addresses),
            Message::InvBlock { hash } | Message::SelectedTip { hash } | Message::TransactionNotFound { id: hash } => {
                hash.wire_serialize(&mut buf)
            }
            Message::Block(block) | Message::IbdBlock(block) => block.wire_serialize(&mut buf),
            Message::BlockLocator(hashes) | Message::InvTransaction(hashes) | Message::RequestTransactions(hashes) => {
                write_list(&mut buf, hashes)
            }
            Message::RequestBlockLocator { high, limit } => {
                high.wire_serialize(&mut buf);
                buf.extend(limit.to_le_bytes());
            }
            Message::RequestIbdBlocks { low, high } => {
                low.wire_serialize(&mut buf);
                high.wire_serialize(&mut buf);
            }
            Message::Transaction(tx) => tx.wire_serialize(&mut buf),
            Message::Reject { reason } => write_string(&mut buf, reason),
        }
        buf
    }

    pub fn deserialize_payload(command: Command, payload: &[u8]) -> Result<Self, ProtocolError> {
        let mut reader = WireReader::new(payload);
        let message = match command {
            Command::Version => {
                let protocol_version = reader.read_u32()?;
                let timestamp = reader.read_u64()?;
                let mut id = [0u8; 16];
                for byte in id.iter_mut() {
                    *byte = reader.read_u8()?;
                }
                let user_agent = reader.read_string()?;
                let disable_relay_tx = reader.read_bool()?;
                let subnetwork_id = match reader.read_u8()? {
                    0 => None,
                    1 => Some(SubnetworkId::wire_deserialize(&mut reader)?),
                    other => return Err(ProtocolError::MalformedPayload(format!("invalid option tag {other}"))),
                };
                let selected_tip_hash = Hash::wire_deserialize(&mut reader)?;
                Message::Version(VersionMessage {
                    protocol_version,
                    timestamp,
                    id,
                    user_agent,
                    disable_relay_tx,
                    subnetwork_id,
                    selected_tip_hash,
                })
            }
            Command::VerAck => Message::VerAck,
            Command::Ping => Message::Ping { nonce: reader.read_u64()? },
            Command::Pong => Message::Pong { nonce: reader.read_u64()? },
            Command::Addresses => Message::Addresses(read_list(&mut reader)?),
            Command::RequestAddresses => Message::RequestAddresses,
            Command::InvBlock => Message::InvBlock { hash: Hash::wire_deserialize(&mut reader)? },
            Command::Block => Message::Block(Block::wire_deserialize(&mut reader)?),
            Command::IbdBlock => Message::IbdBlock(Block::wire_deserialize(&mut reader)?),
            Command::BlockLocator => Message::BlockLocator(read_list(&mut reader)?),
            Command::RequestBlockLocator => {
                Message::RequestBlockLocator { high: Hash::wire_deserialize(&mut reader)?, limit: reader.read_u32()? }
            }
            Command::SelectedTip => Message::SelectedTip { hash: Hash::wire_deserialize(&mut reader)? },
            Command::RequestSelectedTip => Message::RequestSelectedTip,
            Command::RequestIbdBlocks => Message::RequestIbdBlocks {
                low: Hash::wire_deserialize(&mut reader)?,
                high: Hash::wire_deserialize(&mut reader)?,
            },
            Command::RequestNextIbdBlocks => Message::RequestNextIbdBlocks,
            Command::DoneIbdBlocks => Message::DoneIbdBlocks,
            Command::Transaction => Message::Transaction(Transaction::wire_deserialize(&mut reader)?),
            Command::InvTransaction => Message::InvTransaction(read_list(&mut reader)?),
            Command::RequestTransactions => Message::RequestTransactions(read_list(&mut reader)?),
            Command::TransactionNotFound => Message::TransactionNotFound { id: Hash::wire_deserialize(&mut reader)? },
            Command::Reject => Message::Reject { reason: reader.read_string()? },
        };
        reader.finish()?;
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kaspad_consensus_core::subnets::SUBNETWORK_ID_NATIVE;

    fn round_trip(message: Message) {
        let payload = message.serialize_payload();
        let decoded = Message::deserialize_payload(message.command(), &payload).unwrap();
        assert_eq!(message.command(), decoded.command());
        // Structural comparison via the payload bytes
        assert_eq!(payload, decoded.serialize_payload());
    }

    #[test]
    fn test_message_round_trips() {
        round_trip(Message::Version(VersionMessage {
            protocol_version: 1,
            timestamp: 123456,
            id: [7; 16],
            user_agent: "/rusty-kaspad:0.1.0/".to_string(),
            disable_relay_tx: true,
            subnetwork_id: None,
            selected_tip_hash: Hash::from_u64_word(99),
        }));
        round_trip(Message::VerAck);
        round_trip(Message::Ping { nonce: 777 });
        round_trip(Message::Pong { nonce: 777 });
        round_trip(Message::Addresses(vec!["10.0.0.1:16111".parse().unwrap(), "[::1]:16111".parse().unwrap()]));
        round_trip(Message::InvBlock { hash: Hash::from_u64_word(5) });
        round_trip(Message::BlockLocator(vec![Hash::from_u64_word(1), Hash::from_u64_word(2)]));
        round_trip(Message::RequestBlockLocator { high: Hash::from_u64_word(3), limit: 100 });
        round_trip(Message::SelectedTip { hash: Hash::from_u64_word(4) });
        round_trip(Message::RequestIbdBlocks { low: Hash::from_u64_word(1), high: Hash::from_u64_word(9) });
        round_trip(Message::Transaction(Transaction::new(0, vec![], vec![], 0, SUBNETWORK_ID_NATIVE, 0, vec![])));
        round_trip(Message::InvTransaction(vec![Hash::from_u64_word(11)]));
        round_trip(Message::TransactionNotFound { id: Hash::from_u64_word(12) });
        round_trip(Message::Reject { reason: "bad block".to_string() });
    }

    #[test]
    fn test_trailing_garbage_rejected() {
        let mut payload = Message::Ping { nonce: 1 }.serialize_payload();
        payload.push(0xff);
        assert!(Message::deserialize_payload(Command::Ping, &payload).is_err());
    }
}
