//! Arbitrary-precision unsigned integers backed by 64-bit words.

/// An unsigned integer of a fixed, arbitrary bit width. Stored as 64-bit
/// words, least significant first; unused bits of the top word are zero.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ApInt {
    width: u64,
    words: Vec<u64>,
}

fn word_count(width: u64) -> usize {
    (width as usize).div_ceil(64)
}

impl ApInt {
    pub fn zero(width: u64) -> Self {
        ApInt {
            width,
            words: vec![0; word_count(width)],
        }
    }

    pub fn from_u64(value: u64, width: u64) -> Self {
        debug_assert!(width >= 64 || value < (1 << width));
        let mut out = Self::zero(width);
        if let Some(w) = out.words.first_mut() {
            *w = value;
        }
        out
    }

    /// Build from little-endian bytes. Bytes beyond `width` bits must be
    /// zero.
    pub fn from_bytes_le(bytes: &[u8], width: u64) -> Self {
        let mut out = Self::zero(width);
        for (i, byte) in bytes.iter().enumerate() {
            let word = i / 8;
            if word >= out.words.len() {
                debug_assert_eq!(*byte, 0);
                continue;
            }
            out.words[word] |= u64::from(*byte) << ((i % 8) * 8);
        }
        out
    }

    pub fn width(&self) -> u64 {
        self.width
    }

    /// The value as a `u64`, if it fits.
    pub fn to_u64(&self) -> Option<u64> {
        if self.words.iter().skip(1).any(|w| *w != 0) {
            return None;
        }
        Some(self.words.first().copied().unwrap_or(0))
    }

    pub fn is_zero(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }
}

impl std::fmt::Display for ApInt {
    /// Values that fit a `u64` print in decimal, wider ones in hexadecimal.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(v) = self.to_u64() {
            return write!(f, "{v}");
        }
        let mut words = self.words.iter().rev().skip_while(|w| **w == 0);
        // to_u64 returned None, so some upper word is nonzero
        write!(f, "0x{:x}", words.next().unwrap())?;
        for w in words {
            write!(f, "{w:016x}")?;
        }
        Ok(())
    }
}
