//! Module `id` implements the 128-bit sortable identifier used for node,
//! page, tuple and transaction ids throughout the core.

use std::{convert::TryInto, fmt, sync::Mutex};

use lazy_static::lazy_static;
use rand::RngCore;

lazy_static! {
    // (last millisecond seen, monotonic counter within that millisecond).
    // Guarantees that two `Id::new()` calls in the same process never
    // collide even when they land in the same millisecond.
    static ref CLOCK: Mutex<(i64, u16)> = Mutex::new((0, 0));
}

/// A 128-bit identifier, sortable in approximately insertion order.
///
/// The first 48 bits encode a wall-clock millisecond timestamp, the next
/// 16 bits a per-millisecond sequence counter, and the remaining 64 bits
/// are random. Bytes round-trip and compare lexicographically, so `Ord`
/// on `Id` matches insertion order except for the random tail breaking
/// ties within the same (millisecond, counter) pair -- which cannot
/// happen for ids minted by this process, only across processes.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Id([u8; 16]);

impl Id {
    /// Mint a fresh id. Never returns the same value twice within one
    /// process.
    pub fn new() -> Id {
        let ms = chrono::Utc::now().timestamp_millis();
        let counter = {
            let mut clock = CLOCK.lock().unwrap();
            if clock.0 == ms {
                clock.1 = clock.1.wrapping_add(1);
            } else {
                clock.0 = ms;
                clock.1 = 0;
            }
            clock.1
        };

        let mut bytes = [0_u8; 16];
        // 48 bits of millisecond timestamp, big-endian.
        let ms_bytes = ms.to_be_bytes();
        bytes[0..6].copy_from_slice(&ms_bytes[2..8]);
        bytes[6..8].copy_from_slice(&counter.to_be_bytes());
        rand::thread_rng().fill_bytes(&mut bytes[8..16]);
        Id(bytes)
    }

    pub fn to_bytes(&self) -> [u8; 16] {
        self.0
    }

    pub fn from_bytes(bytes: [u8; 16]) -> Id {
        Id(bytes)
    }

    /// Base64, url-safe, no padding -- the format the core uses whenever
    /// an id needs a textual representation (log lines, debug output).
    pub fn to_base64url(&self) -> String {
        base64url_encode(&self.0)
    }

    pub fn from_base64url(s: &str) -> Option<Id> {
        let bytes = base64url_decode(s)?;
        let arr: [u8; 16] = bytes.try_into().ok()?;
        Some(Id(arr))
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Id({})", self.to_base64url())
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_base64url())
    }
}

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

fn base64url_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity((bytes.len() * 4 + 2) / 3);
    for chunk in bytes.chunks(3) {
        let b0 = chunk[0] as u32;
        let b1 = *chunk.get(1).unwrap_or(&0) as u32;
        let b2 = *chunk.get(2).unwrap_or(&0) as u32;
        let n = (b0 << 16) | (b1 << 8) | b2;

        out.push(ALPHABET[((n >> 18) & 0x3f) as usize] as char);
        out.push(ALPHABET[((n >> 12) & 0x3f) as usize] as char);
        if chunk.len() > 1 {
            out.push(ALPHABET[((n >> 6) & 0x3f) as usize] as char);
        }
        if chunk.len() > 2 {
            out.push(ALPHABET[(n & 0x3f) as usize] as char);
        }
    }
    out
}

fn base64url_decode(s: &str) -> Option<Vec<u8>> {
    fn index_of(c: u8) -> Option<u32> {
        ALPHABET.iter().position(|&a| a == c).map(|p| p as u32)
    }

    let chars: Vec<u8> = s.bytes().collect();
    let mut out = Vec::with_capacity((chars.len() * 3) / 4 + 1);
    for chunk in chars.chunks(4) {
        let n0 = index_of(chunk[0])?;
        let n1 = index_of(*chunk.get(1)?)?;
        let n = (n0 << 18) | (n1 << 12);
        let mut n = n;
        if let Some(&c2) = chunk.get(2) {
            n |= index_of(c2)? << 6;
        }
        if let Some(&c3) = chunk.get(3) {
            n |= index_of(c3)?;
        }
        out.push((n >> 16) as u8);
        if chunk.len() > 2 {
            out.push((n >> 8) as u8);
        }
        if chunk.len() > 3 {
            out.push(n as u8);
        }
    }
    Some(out)
}

#[cfg(test)]
#[path = "id_test.rs"]
mod id_test;
