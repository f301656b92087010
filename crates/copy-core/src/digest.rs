//! Content digests for hash tokens
//!
//! Digests are rendered in one of several encodings. The `baseN` encodings
//! read the digest bytes as a little-endian unsigned integer and write it
//! most significant digit first, using the alphabets below.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use digest::Digest;

use crate::{Error, Result};

/// Digest algorithm of a hash token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashAlgorithm {
    Md4,
    #[default]
    Md5,
    Sha1,
    Sha256,
    Sha512,
    Xxhash64,
}

impl HashAlgorithm {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "md4" => Some(Self::Md4),
            "md5" => Some(Self::Md5),
            "sha1" => Some(Self::Sha1),
            "sha256" => Some(Self::Sha256),
            "sha512" => Some(Self::Sha512),
            "xxhash64" => Some(Self::Xxhash64),
            _ => None,
        }
    }

    pub fn digest(self, content: &[u8]) -> Vec<u8> {
        match self {
            Self::Md4 => md4::Md4::digest(content).to_vec(),
            Self::Md5 => md5::Md5::digest(content).to_vec(),
            Self::Sha1 => sha1::Sha1::digest(content).to_vec(),
            Self::Sha256 => sha2::Sha256::digest(content).to_vec(),
            Self::Sha512 => sha2::Sha512::digest(content).to_vec(),
            Self::Xxhash64 => xxhash_rust::xxh64::xxh64(content, 0).to_be_bytes().to_vec(),
        }
    }
}

/// Text encoding of a digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DigestEncoding {
    #[default]
    Hex,
    Base64,
    /// Positional encoding over one of the fixed alphabets
    Base(u32),
}

const BASE26: &str = "abcdefghijklmnopqrstuvwxyz";
// no 0, l, i, o
const BASE32: &str = "123456789abcdefghjkmnpqrstuvwxyz";
const BASE36: &str = "0123456789abcdefghijklmnopqrstuvwxyz";
// no l, I, O
const BASE49: &str = "abcdefghijkmnopqrstuvwxyzABCDEFGHJKLMNPQRSTUVWXYZ";
const BASE52: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
// no 0, l, I, O
const BASE58: &str = "123456789abcdefghijkmnopqrstuvwxyzABCDEFGHJKLMNPQRSTUVWXYZ";
const BASE62: &str = "0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

fn alphabet(base: u32) -> Option<&'static [u8]> {
    let table = match base {
        26 => BASE26,
        32 => BASE32,
        36 => BASE36,
        49 => BASE49,
        52 => BASE52,
        58 => BASE58,
        62 => BASE62,
        _ => return None,
    };
    Some(table.as_bytes())
}

impl DigestEncoding {
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.to_ascii_lowercase();
        match name.as_str() {
            "hex" => Some(Self::Hex),
            "base64" => Some(Self::Base64),
            other => {
                let base = other.strip_prefix("base")?.parse().ok()?;
                alphabet(base).map(|_| Self::Base(base))
            }
        }
    }

    pub fn encode(self, bytes: &[u8]) -> String {
        match self {
            Self::Hex => bytes.iter().map(|b| format!("{b:02x}")).collect(),
            Self::Base64 => STANDARD.encode(bytes),
            Self::Base(base) => alphabet(base)
                .map(|table| encode_base(bytes, table))
                .unwrap_or_default(),
        }
    }
}

/// Encode `bytes` (little-endian) positionally with `table`.
fn encode_base(bytes: &[u8], table: &[u8]) -> String {
    let base = table.len() as u32;
    // Most significant byte first, leading zeros dropped
    let mut number: Vec<u32> = bytes
        .iter()
        .rev()
        .skip_while(|b| **b == 0)
        .map(|b| u32::from(*b))
        .collect();

    let mut digits = Vec::new();
    while !number.is_empty() {
        let mut remainder = 0u32;
        let mut quotient = Vec::with_capacity(number.len());
        for byte in &number {
            let acc = remainder * 256 + byte;
            let q = acc / base;
            remainder = acc % base;
            if !(quotient.is_empty() && q == 0) {
                quotient.push(q);
            }
        }
        digits.push(table[remainder as usize]);
        number = quotient;
    }

    digits.iter().rev().map(|d| char::from(*d)).collect()
}

/// Digest `content` and render it, truncated to `max_length` characters
/// when given (zero means untruncated).
pub fn hash_digest(
    content: &[u8],
    algorithm: &str,
    encoding: &str,
    max_length: Option<usize>,
) -> Result<String> {
    let algorithm = if algorithm.is_empty() {
        HashAlgorithm::default()
    } else {
        HashAlgorithm::parse(algorithm).ok_or_else(|| Error::Template {
            template: algorithm.to_string(),
            message: "unknown hash algorithm".into(),
        })?
    };
    let encoding = if encoding.is_empty() {
        DigestEncoding::default()
    } else {
        DigestEncoding::parse(encoding).ok_or_else(|| Error::Template {
            template: encoding.to_string(),
            message: "unknown digest encoding".into(),
        })?
    };

    let mut rendered = encoding.encode(&algorithm.digest(content));
    if let Some(len) = max_length.filter(|len| *len > 0) {
        rendered.truncate(len);
    }
    Ok(rendered)
}
