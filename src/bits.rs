//! MSB-first bit-stream reading
//!
//! TIFF stores sub-byte samples (1, 2, 4, 12 bits) packed high-bit-first.
//! This module provides a dedicated cursor over a byte buffer so the
//! sample decode loop never has to branch on bit alignment itself.

/// MSB-first bit reader over a byte buffer
///
/// The cursor is a (byte offset, bit offset) pair where the bit offset
/// counts from the high bit of the current byte. Running off the end of
/// the buffer sets a sticky EOF flag; once set, `get_bits` returns the
/// -1 sentinel. Callers that treat the full 32-bit range as legitimate
/// data must check `is_eof()` instead of comparing against the sentinel.
pub struct BitUnpacker<'a> {
    data: &'a [u8],
    byte_cursor: usize,
    bit_cursor: u32,
    eof: bool,
}

impl<'a> BitUnpacker<'a> {
    /// Creates an unpacker positioned at the first bit of the buffer
    pub fn new(data: &'a [u8]) -> Self {
        BitUnpacker {
            data,
            byte_cursor: 0,
            bit_cursor: 0,
            eof: false,
        }
    }

    /// Reads the next `count` bits as an unsigned integer, MSB-first
    ///
    /// `count` may be 0 (returns 0 without moving the cursor) or larger
    /// than 32, in which case only the last 32 bits consumed are
    /// returned. A read that crosses the end of the buffer sets the
    /// sticky EOF flag and returns -1, as does any read on an
    /// already-exhausted stream.
    pub fn get_bits(&mut self, count: u32) -> i64 {
        if count == 0 {
            return 0;
        }
        if self.eof {
            return -1;
        }

        let mut remaining = count;
        let mut accumulator: u64 = 0;

        while remaining > 0 {
            if self.byte_cursor >= self.data.len() {
                self.eof = true;
                return -1;
            }

            let bits_left_in_byte = 8 - self.bit_cursor;
            let current = self.data[self.byte_cursor] as u64;

            if remaining >= bits_left_in_byte {
                // Take the rest of this byte and move to the next one
                let low_mask = (1u64 << bits_left_in_byte) - 1;
                accumulator = (accumulator << bits_left_in_byte) | (current & low_mask);
                remaining -= bits_left_in_byte;
                self.byte_cursor += 1;
                self.bit_cursor = 0;
            } else {
                // Take the top `remaining` bits of the tail of this byte
                let tail_mask = (1u64 << bits_left_in_byte) - 1;
                let tail = current & tail_mask;
                accumulator = (accumulator << remaining) | (tail >> (bits_left_in_byte - remaining));
                self.bit_cursor += remaining;
                remaining = 0;
            }
        }

        (accumulator & 0xFFFF_FFFF) as i64
    }

    /// Skips the next `count` bits
    ///
    /// Skipping past the end of the buffer clamps the cursor to the end
    /// and sets the sticky EOF flag.
    pub fn skip_bits(&mut self, count: u64) {
        let total_bits = (self.data.len() as u64) * 8;
        let target = self.position() + count;

        if target > total_bits {
            self.byte_cursor = self.data.len();
            self.bit_cursor = 0;
            self.eof = true;
        } else {
            self.byte_cursor = (target / 8) as usize;
            self.bit_cursor = (target % 8) as u32;
        }
    }

    /// Advances to the next byte boundary
    ///
    /// A no-op when the cursor already sits on a boundary. Rows of
    /// packed samples start on byte boundaries, so the decode loop
    /// calls this once per row.
    pub fn skip_to_next_byte(&mut self) {
        if self.bit_cursor != 0 {
            self.byte_cursor += 1;
            self.bit_cursor = 0;
            if self.byte_cursor > self.data.len() {
                self.byte_cursor = self.data.len();
                self.eof = true;
            }
        }
    }

    /// Absolute bit position: 8 * byte cursor + bit cursor
    pub fn position(&self) -> u64 {
        (self.byte_cursor as u64) * 8 + self.bit_cursor as u64
    }

    /// Whether a past-the-end read or skip has happened
    pub fn is_eof(&self) -> bool {
        self.eof
    }
}
