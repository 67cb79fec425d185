//! Big-endian bit cursor over a byte slice.

use super::CueError;

pub struct BitReader<'a> {
    data: &'a [u8],
    /// Bit offset from the start of the slice.
    pos: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Read up to 64 bits, most significant first.
    pub fn read(&mut self, count: usize) -> Result<u64, CueError> {
        debug_assert!(count <= 64);
        if self.pos + count > self.data.len() * 8 {
            return Err(CueError::Truncated(self.pos));
        }
        let mut value = 0u64;
        for _ in 0..count {
            let byte = self.data[self.pos / 8];
            let bit = (byte >> (7 - (self.pos % 8))) & 1;
            value = (value << 1) | bit as u64;
            self.pos += 1;
        }
        Ok(value)
    }

    pub fn skip_bytes(&mut self, count: usize) -> Result<(), CueError> {
        if self.pos + count * 8 > self.data.len() * 8 {
            return Err(CueError::Truncated(self.pos));
        }
        self.pos += count * 8;
        Ok(())
    }

    /// Jump to an absolute bit position, used to realign after a
    /// descriptor whose declared length exceeds the fields read.
    pub fn seek(&mut self, bit_pos: usize) -> Result<(), CueError> {
        if bit_pos > self.data.len() * 8 {
            return Err(CueError::Truncated(bit_pos));
        }
        self.pos = bit_pos;
        Ok(())
    }
}
