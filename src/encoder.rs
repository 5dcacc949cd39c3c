//! Projection of external identifiers onto fixed-width sortable keys.

/// Turns an input into a 64-bit key.
///
/// Encoders must be deterministic. They need not be injective: distinct
/// inputs sharing a key are resolved by comparing the inputs themselves.
/// The top bits should be uniformly distributed, since preparation
/// partitions entries by the most significant key byte.
pub trait Encoder: Send + Sync {
    fn encode(&self, input: &[u8]) -> u64;
}

impl<F> Encoder for F
where
    F: Fn(&[u8]) -> u64 + Send + Sync,
{
    #[inline]
    fn encode(&self, input: &[u8]) -> u64 {
        self(input)
    }
}

/// Default encoder for string-like identifiers.
///
/// Layout of the key:
/// - Bits 63..8: FNV-1a hash of the bytes, run through the murmur3 finalizer
/// - Bits 7..0: input length, saturated at 255
///
/// Inputs shorter than 255 bytes only collide with inputs of the same length.
/// With 56 hash bits, runs longer than one entry stay rare well past a
/// billion distinct inputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringEncoder;

const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;
const LENGTH_BITS: u32 = 8;
const LENGTH_MASK: u64 = (1 << LENGTH_BITS) - 1;

impl StringEncoder {
    #[inline]
    pub fn encode_bytes(input: &[u8]) -> u64 {
        let mut hash = FNV_OFFSET_BASIS;
        for &byte in input {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(FNV_PRIME);
        }
        let length = (input.len() as u64).min(LENGTH_MASK);
        (fmix64(hash) & !LENGTH_MASK) | length
    }
}

impl Encoder for StringEncoder {
    #[inline]
    fn encode(&self, input: &[u8]) -> u64 {
        Self::encode_bytes(input)
    }
}

/// Murmur3 64-bit finalizer: every input bit affects every output bit.
#[inline]
fn fmix64(mut k: u64) -> u64 {
    k ^= k >> 33;
    k = k.wrapping_mul(0xff51afd7ed558ccd);
    k ^= k >> 33;
    k = k.wrapping_mul(0xc4ceb9fe1a85ec53);
    k ^= k >> 33;
    k
}
