use crate::error::FilterError;

/// Bits-per-value used when no stored envelope dictates a width.
/// Increasing this makes envelopes more accurate and larger; it must be
/// even so that four values pack to a whole number of bytes, and cannot
/// exceed 32 without widening the 128-bit packing register below.
pub const DEFAULT_BITS_PER_VALUE: u32 = 20;

/// A geographic bounding box, degrees longitude / latitude.
/// `w > e` is legal and means the box crosses the antimeridian.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub w: f64,
    pub s: f64,
    pub e: f64,
    pub n: f64,
}

impl Envelope {
    pub fn new(w: f64, s: f64, e: f64, n: f64) -> Self {
        Self { w, s, e, n }
    }
}

/// Encodes and decodes envelopes as bit-packed big-endian byte strings.
///
/// Each value is scaled to an unsigned integer of `bits_per_value` bits,
/// 0 meaning the range minimum (-180 for longitudes, -90 for latitudes)
/// and `2^bits - 1` the maximum. Minima round down and maxima round up,
/// so a decoded envelope always contains the envelope that was encoded.
/// The four values are concatenated most-significant-first in the order
/// `w, s, e, n` and emitted big-endian over `bits_per_value / 2` bytes.
#[derive(Debug)]
pub struct EnvelopeEncoder {
    bits_per_value: u32,
    bytes_per_envelope: usize,
    value_max_int: u32,

    num_lo_bits: u32,
    num_hi_bits: u32,
}

impl EnvelopeEncoder {
    pub fn new(bits_per_value: u32) -> Self {
        assert!(
            bits_per_value >= 2 && bits_per_value <= 32 && bits_per_value % 2 == 0,
            "bits_per_value {} out of range",
            bits_per_value
        );
        let bits_per_envelope = bits_per_value * 4;
        Self {
            bits_per_value,
            bytes_per_envelope: (bits_per_envelope / 8) as usize,
            value_max_int: ((1u64 << bits_per_value) - 1) as u32,
            num_lo_bits: bits_per_envelope.min(64),
            num_hi_bits: bits_per_envelope.saturating_sub(64),
        }
    }

    /// Decoder for envelopes already stored at some byte width. The width
    /// of one stored envelope fixes the precision of the whole index.
    pub fn for_stored_width(num_bytes: usize) -> Result<Self, FilterError> {
        let bits_per_value = num_bytes * 8 / 4;
        if num_bytes == 0 || bits_per_value > 32 {
            return Err(FilterError::UnsupportedEnvelopeWidth { bytes: num_bytes });
        }
        Ok(Self::new(bits_per_value as u32))
    }

    pub fn bits_per_value(&self) -> u32 {
        self.bits_per_value
    }

    pub fn bytes_per_envelope(&self) -> usize {
        self.bytes_per_envelope
    }

    pub fn encode(&self, envelope: &Envelope) -> Vec<u8> {
        let mut hi: u64 = 0;
        let mut lo: u64 = self.encode_value(envelope.w, -180.0, 180.0, false) as u64;
        self.shift_left(&mut hi, &mut lo);
        lo |= self.encode_value(envelope.s, -90.0, 90.0, false) as u64;
        self.shift_left(&mut hi, &mut lo);
        lo |= self.encode_value(envelope.e, -180.0, 180.0, true) as u64;
        self.shift_left(&mut hi, &mut lo);
        lo |= self.encode_value(envelope.n, -90.0, 90.0, true) as u64;

        let mut bytes = Vec::with_capacity(self.bytes_per_envelope);
        push_bytes_be(&mut bytes, hi, self.num_hi_bits);
        push_bytes_be(&mut bytes, lo, self.num_lo_bits);
        bytes
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<Envelope, FilterError> {
        if bytes.len() != self.bytes_per_envelope {
            return Err(FilterError::WrongEnvelopeWidth {
                expected: self.bytes_per_envelope,
                actual: bytes.len(),
            });
        }
        let num_hi_bytes = (self.num_hi_bits / 8) as usize;
        let mut hi = read_bytes_be(&bytes[..num_hi_bytes]);
        let mut lo = read_bytes_be(&bytes[num_hi_bytes..]);

        let n = self.decode_value((lo & self.value_max_int as u64) as u32, -90.0, 90.0);
        self.shift_right(&mut hi, &mut lo);
        let e = self.decode_value((lo & self.value_max_int as u64) as u32, -180.0, 180.0);
        self.shift_right(&mut hi, &mut lo);
        let s = self.decode_value((lo & self.value_max_int as u64) as u32, -90.0, 90.0);
        self.shift_right(&mut hi, &mut lo);
        let w = self.decode_value((lo & self.value_max_int as u64) as u32, -180.0, 180.0);
        Ok(Envelope { w, s, e, n })
    }

    fn encode_value(&self, value: f64, min_value: f64, max_value: f64, round_up: bool) -> u32 {
        assert!(
            (min_value..=max_value).contains(&value),
            "value {} outside [{}, {}]",
            value,
            min_value,
            max_value
        );
        let normalised = (value - min_value) / (max_value - min_value);
        let scaled = normalised * self.value_max_int as f64;
        let encoded = if round_up { scaled.ceil() } else { scaled.floor() } as u32;
        debug_assert!(encoded <= self.value_max_int);
        encoded
    }

    fn decode_value(&self, encoded: u32, min_value: f64, max_value: f64) -> f64 {
        debug_assert!(encoded <= self.value_max_int);
        let normalised = encoded as f64 / self.value_max_int as f64;
        normalised * (max_value - min_value) + min_value
    }

    // 128-bit register as two 64-bit halves; shifts are by bits_per_value,
    // which is at most 32, so the carry shifts below stay in range.
    fn shift_left(&self, hi: &mut u64, lo: &mut u64) {
        let shift = self.bits_per_value;
        let carry = *lo >> (64 - shift);
        *hi = (*hi << shift) | carry;
        *lo <<= shift;
    }

    fn shift_right(&self, hi: &mut u64, lo: &mut u64) {
        let shift = self.bits_per_value;
        let carry = *hi << (64 - shift);
        *hi >>= shift;
        *lo = (*lo >> shift) | carry;
    }
}

impl Default for EnvelopeEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_BITS_PER_VALUE)
    }
}

fn push_bytes_be(out: &mut Vec<u8>, value: u64, num_bits: u32) {
    let mut remaining = num_bits;
    while remaining > 0 {
        remaining -= 8;
        out.push(((value >> remaining) & 0xff) as u8);
    }
}

fn read_bytes_be(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, b| (acc << 8) | *b as u64)
}
