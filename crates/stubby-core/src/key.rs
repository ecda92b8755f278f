use crate::error::KeyError;
use crate::record::LinkId;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::{Serialize, Serializer};
use std::fmt::Display;

/// Longest zig-zag varint of a 64-bit value.
const MAX_VARINT_LEN: usize = 10;

/// Longest key any identifier encodes to (10 bytes of unpadded base64).
pub const MAX_KEY_LEN: usize = 14;

/// Public, URL-safe spelling of a [`LinkId`].
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Key(String);

impl Key {
    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Builds the public short URL below `base_url`.
    pub fn to_url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.0)
    }
}

impl std::fmt::Debug for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Key").field(&self.0).finish()
    }
}

impl Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Key {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for Key {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

/// Bijection between identifiers and keys.
///
/// An identifier is written as a zig-zag varint (the shortest byte string
/// that round-trips it) and the bytes are rendered with the unpadded
/// URL-safe base64 alphabet. Identifiers 1 through 63 become two-character
/// keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyCodec;

impl KeyCodec {
    pub fn encode(id: LinkId) -> Key {
        let mut buf = [0u8; MAX_VARINT_LEN];
        let len = put_varint(&mut buf, id.get());
        Key(URL_SAFE_NO_PAD.encode(&buf[..len]))
    }

    /// Parses a key back into its identifier.
    ///
    /// The alphabet is checked before any byte decoding, so strings that
    /// could address something other than a link are refused up front.
    /// Only the canonical spelling of an identifier is accepted.
    pub fn decode(key: &str) -> Result<LinkId, KeyError> {
        if key.is_empty() {
            return Err(KeyError::Empty);
        }
        if let Some(c) = key.chars().find(|c| !is_key_char(*c)) {
            return Err(KeyError::IllegalCharacter(c));
        }
        if key.len() > MAX_KEY_LEN {
            return Err(KeyError::TooLong {
                len: key.len(),
                max: MAX_KEY_LEN,
            });
        }

        let bytes = URL_SAFE_NO_PAD
            .decode(key)
            .map_err(|_| KeyError::Malformed)?;
        let id = LinkId::new(read_varint(&bytes)?)?;

        // overlong varints and stray trailing bits decode fine but spell a
        // second key for the same identifier
        if Self::encode(id).as_str() != key {
            return Err(KeyError::Malformed);
        }

        Ok(id)
    }
}

fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn put_varint(buf: &mut [u8; MAX_VARINT_LEN], value: i64) -> usize {
    let mut ux = ((value as u64) << 1) ^ ((value >> 63) as u64);
    let mut i = 0;
    while ux >= 0x80 {
        buf[i] = (ux as u8) | 0x80;
        ux >>= 7;
        i += 1;
    }
    buf[i] = ux as u8;
    i + 1
}

fn read_varint(bytes: &[u8]) -> Result<i64, KeyError> {
    let mut ux: u64 = 0;
    let mut shift = 0u32;

    for (i, &byte) in bytes.iter().enumerate() {
        if i == MAX_VARINT_LEN {
            return Err(KeyError::OutOfRange);
        }
        if byte < 0x80 {
            if i == MAX_VARINT_LEN - 1 && byte > 1 {
                return Err(KeyError::OutOfRange);
            }
            if i + 1 != bytes.len() {
                return Err(KeyError::Malformed);
            }
            ux |= u64::from(byte) << shift;
            return Ok(((ux >> 1) as i64) ^ -((ux & 1) as i64));
        }
        ux |= u64::from(byte & 0x7f) << shift;
        shift += 7;
    }

    // ran out of bytes with the continuation bit still set
    Err(KeyError::Malformed)
}
