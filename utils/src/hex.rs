use std::fmt::{Display, Formatter};

pub trait ToHex {
    fn to_hex(&self) -> String;
}

pub trait FromHex: Sized {
    type Error: std::error::Error;
    fn from_hex(hex_str: &str) -> Result<Self, Self::Error>;
}

impl ToHex for &[u8] {
    fn to_hex(&self) -> String {
        faster_hex::hex_string(self)
    }
}

impl ToHex for Vec<u8> {
    fn to_hex(&self) -> String {
        faster_hex::hex_string(self)
    }
}

impl FromHex for Vec<u8> {
    type Error = faster_hex::Error;

    fn from_hex(hex_str: &str) -> Result<Self, Self::Error> {
        let mut bytes = vec![0u8; hex_str.len() / 2];
        faster_hex::hex_decode(hex_str.as_bytes(), &mut bytes)?;
        Ok(bytes)
    }
}
