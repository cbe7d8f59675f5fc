//! Bech32 (cashaddr flavor) payload codec: 5-bit regrouping, BCH checksum
//! over the lower 5 bits of the prefix plus the payload.

use crate::{Address, AddressError, Prefix, Version};

const CHARSET: &[u8] = b"qpzry9x8gf2tvdw0s3jn54khce6mua7l";

fn charset_rev(c: u8) -> Option<u8> {
    CHARSET.iter().position(|&x| x == c).map(|i| i as u8)
}

fn polymod<'data, I>(values: I) -> u64
where
    I: Iterator<Item = &'data u8>,
{
    let mut c = 1u64;
    for d in values {
        let c0 = c >> 35;
        c = ((c & 0x07ffffffff) << 5) ^ (*d as u64);

        if c0 & 0x01 != 0 {
            c ^= 0x98f2bc8e61;
        }
        if c0 & 0x02 != 0 {
            c ^= 0x79b76d99e2;
        }
        if c0 & 0x04 != 0 {
            c ^= 0xf33e5fb3c4;
        }
        if c0 & 0x08 != 0 {
            c ^= 0xae2eabe2a8;
        }
        if c0 & 0x10 != 0 {
            c ^= 0x1e4f43e470;
        }
    }
    c ^ 1
}

fn checksum(payload: &[u8], prefix: Prefix) -> u64 {
    let fivebit_prefix: Vec<u8> = prefix.as_str().bytes().map(|c| c & 0x1f).collect();
    polymod(fivebit_prefix.iter().chain(&[0u8]).chain(payload).chain(&[0u8; 8]))
}

// Convert an 8-bit array to a 5-bit array with right padding
fn conv8to5(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() * 8 / 5 + 1);
    let mut buff = 0u16;
    let mut bits = 0u32;
    for &byte in payload {
        buff = (buff << 8) | byte as u16;
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push((buff >> bits) as u8 & 0x1f);
            buff &= (1 << bits) - 1;
        }
    }
    if bits > 0 {
        out.push((buff << (5 - bits)) as u8 & 0x1f);
    }
    out
}

// Convert a 5-bit array to an 8-bit array, dropping right-side padding
fn conv5to8(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() * 5 / 8);
    let mut buff = 0u16;
    let mut bits = 0u32;
    for &b in payload {
        buff = (buff << 5) | b as u16;
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            out.push((buff >> bits) as u8);
            buff &= (1 << bits) - 1;
        }
    }
    out
}

impl Address {
    pub(crate) fn encode_payload(&self) -> String {
        let fivebit_payload = conv8to5(&[&[self.version as u8], self.payload.as_slice()].concat());
        let checksum = checksum(&fivebit_payload, self.prefix);

        String::from_utf8(
            fivebit_payload
                .iter()
                .chain(conv8to5(&checksum.to_be_bytes()[3..]).iter())
                .map(|&c| CHARSET[c as usize])
                .collect(),
        )
        .expect("all characters are valid utf-8")
    }

    pub(crate) fn decode_payload(prefix: Prefix, address: &str) -> Result<Self, AddressError> {
        if address.len() < 8 + 2 {
            return Err(AddressError::BadChecksum);
        }

        let address_u5 = address
            .bytes()
            .map(|c| charset_rev(c).ok_or(AddressError::DecodingError(c as char)))
            .collect::<Result<Vec<u8>, AddressError>>()?;

        let (payload_u5, checksum_u5) = address_u5.split_at(address_u5.len() - 8);

        let mut checksum_bytes = [0u8; 8];
        checksum_bytes[3..].copy_from_slice(&conv5to8(checksum_u5));
        if checksum(payload_u5, prefix) != u64::from_be_bytes(checksum_bytes) {
            return Err(AddressError::BadChecksum);
        }

        let payload_u8 = conv5to8(payload_u5);
        let version = Version::try_from(payload_u8[0])?;
        Ok(Self { prefix, version, payload: payload_u8[1..].into() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conv_round_trip() {
        let data: Vec<u8> = (0..=255).collect();
        assert_eq!(conv5to8(&conv8to5(&data)), data);
    }

    #[test]
    fn test_conv8to5_padding() {
        // A single byte becomes two 5-bit groups with 2 bits of right padding
        assert_eq!(conv8to5(&[0xff]), vec![0x1f, 0x1c]);
        assert_eq!(conv8to5(&[]), Vec::<u8>::new());
    }
}
