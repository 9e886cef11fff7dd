//! Pixel sources: the "read" side of a rectangular transfer.
//!
//! Four producers share one cursor contract (`load_line` / `current_pixel`
//! / `advance_pixel` / `advance_line`): a plain [`PixelStream`] over a
//! bitmap, a solid value, a packed 1-bit tile and an unpacked
//! word-per-pixel tile. The set is closed, so dispatch is an enum match
//! rather than a trait object.

use crate::error::MalformedOperation;
use crate::stream::PixelStream;
use dandelion_mem::{LongPointer, MemoryBus, MemoryFault, WORD_BITS};

/// A single pixel value repeated everywhere.
///
/// Produced by the decoder when an unpacked tile collapses to one pixel;
/// the tile word is read once at decode time.
#[derive(Debug)]
pub struct SolidSource {
    value: u16,
}

impl SolidSource {
    pub fn new(value: u16) -> Self {
        Self { value }
    }
}

/// A packed 1-bit tile, cycled horizontally and vertically.
///
/// The tile (`width_words × height` words) is read once, on the first
/// `load_line`; re-running `load_line` after a fault or a resumption is a
/// no-op once the read has succeeded.
#[derive(Debug)]
pub struct PackedPattern {
    origin: LongPointer,
    /// Horizontal phase the cursor rewinds to at each line start, in bits.
    start_bit: u16,
    width_words: u16,
    height: u16,
    tile: Vec<u16>,
    loaded: bool,
    line: u16,
    bit: u16,
}

impl PackedPattern {
    pub fn new(
        origin: LongPointer,
        bit: u16,
        y_offset: u16,
        width_words: u16,
        height: u16,
    ) -> Result<Self, MalformedOperation> {
        check_phase(bit, y_offset, width_words * WORD_BITS, height)?;
        Ok(Self {
            origin,
            start_bit: bit,
            width_words,
            height,
            tile: Vec::new(),
            loaded: false,
            line: y_offset,
            bit,
        })
    }

    fn load_line<M: MemoryBus>(&mut self, mem: &mut M) -> Result<(), MemoryFault> {
        if self.loaded {
            return Ok(());
        }
        let len = usize::from(self.width_words) * usize::from(self.height);
        self.tile.resize(len, 0);
        mem.read_words(self.origin, &mut self.tile)?;
        self.loaded = true;
        Ok(())
    }

    fn current_pixel(&self) -> u16 {
        let word = usize::from(self.line) * usize::from(self.width_words)
            + usize::from(self.bit / WORD_BITS);
        let shift = WORD_BITS - 1 - self.bit % WORD_BITS;
        (self.tile[word] >> shift) & 1
    }

    fn advance_pixel(&mut self) {
        self.bit = (self.bit + 1) % (self.width_words * WORD_BITS);
    }

    fn advance_line(&mut self) {
        self.line = (self.line + 1) % self.height;
        self.bit = self.start_bit;
    }
}

/// An unpacked tile: one word per pixel.
///
/// Monochrome tiles map any non-zero word to pixel value 1; color tiles
/// produce the raw word as a color index.
#[derive(Debug)]
pub struct UnpackedPattern {
    origin: LongPointer,
    start_x: u16,
    width: u16,
    height: u16,
    monochrome: bool,
    tile: Vec<u16>,
    loaded: bool,
    line: u16,
    x: u16,
}

impl UnpackedPattern {
    pub fn new(
        origin: LongPointer,
        x: u16,
        y_offset: u16,
        width: u16,
        height: u16,
        monochrome: bool,
    ) -> Result<Self, MalformedOperation> {
        check_phase(x, y_offset, width, height)?;
        Ok(Self {
            origin,
            start_x: x,
            width,
            height,
            monochrome,
            tile: Vec::new(),
            loaded: false,
            line: y_offset,
            x,
        })
    }

    pub fn monochrome(&self) -> bool {
        self.monochrome
    }

    fn load_line<M: MemoryBus>(&mut self, mem: &mut M) -> Result<(), MemoryFault> {
        if self.loaded {
            return Ok(());
        }
        let len = usize::from(self.width) * usize::from(self.height);
        self.tile.resize(len, 0);
        mem.read_words(self.origin, &mut self.tile)?;
        self.loaded = true;
        Ok(())
    }

    fn current_pixel(&self) -> u16 {
        let word = self.tile[usize::from(self.line) * usize::from(self.width) + usize::from(self.x)];
        if self.monochrome {
            u16::from(word != 0)
        } else {
            word
        }
    }

    fn advance_pixel(&mut self) {
        self.x = (self.x + 1) % self.width;
    }

    fn advance_line(&mut self) {
        self.line = (self.line + 1) % self.height;
        self.x = self.start_x;
    }
}

fn check_phase(
    x: u16,
    y_offset: u16,
    width_px: u16,
    height: u16,
) -> Result<(), MalformedOperation> {
    if y_offset >= height {
        return Err(MalformedOperation::PatternPhase { y_offset, height });
    }
    if x >= width_px {
        return Err(MalformedOperation::PatternColumn { x, width: width_px });
    }
    Ok(())
}

/// The source operand of a transfer.
#[derive(Debug)]
pub enum PixelSource {
    Solid(SolidSource),
    Packed(PackedPattern),
    Unpacked(UnpackedPattern),
    Stream(PixelStream),
}

impl PixelSource {
    pub fn load_line<M: MemoryBus>(&mut self, mem: &mut M) -> Result<(), MemoryFault> {
        match self {
            PixelSource::Solid(_) => Ok(()),
            PixelSource::Packed(p) => p.load_line(mem),
            PixelSource::Unpacked(p) => p.load_line(mem),
            PixelSource::Stream(s) => s.load_line(mem),
        }
    }

    pub fn current_pixel(&self) -> u16 {
        match self {
            PixelSource::Solid(s) => s.value,
            PixelSource::Packed(p) => p.current_pixel(),
            PixelSource::Unpacked(p) => p.current_pixel(),
            PixelSource::Stream(s) => s.current_pixel(),
        }
    }

    pub fn advance_pixel(&mut self) {
        match self {
            PixelSource::Solid(_) => {}
            PixelSource::Packed(p) => p.advance_pixel(),
            PixelSource::Unpacked(p) => p.advance_pixel(),
            PixelSource::Stream(s) => s.advance_pixel(),
        }
    }

    pub fn advance_line(&mut self) {
        match self {
            PixelSource::Solid(_) => {}
            PixelSource::Packed(p) => p.advance_line(),
            PixelSource::Unpacked(p) => p.advance_line(),
            PixelSource::Stream(s) => s.advance_line(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dandelion_mem::FlatMemory;

    fn pixels(src: &mut PixelSource, mem: &mut FlatMemory, per_line: usize, lines: usize) -> Vec<Vec<u16>> {
        let mut out = Vec::new();
        for l in 0..lines {
            src.load_line(mem).unwrap();
            let mut row = Vec::new();
            for _ in 0..per_line {
                row.push(src.current_pixel());
                src.advance_pixel();
            }
            out.push(row);
            if l + 1 < lines {
                src.advance_line();
            }
        }
        out
    }

    #[test]
    fn packed_tile_wraps_both_ways() {
        // Two-line, one-word tile: 0xF0F0 / 0x0F0F.
        let mut mem = FlatMemory::from_words(0x40, vec![0xF0F0, 0x0F0F]);
        let mut src =
            PixelSource::Packed(PackedPattern::new(0x40, 0, 0, 1, 2).unwrap());
        // 20 pixels per line exercises the horizontal wrap; 3 lines the
        // vertical one.
        let rows = pixels(&mut src, &mut mem, 20, 3);
        assert_eq!(rows[0][..8], [1, 1, 1, 1, 0, 0, 0, 0]);
        assert_eq!(rows[0][16..], [1, 1, 1, 1]);
        assert_eq!(rows[1][..8], [0, 0, 0, 0, 1, 1, 1, 1]);
        // Line 3 wraps back to tile line 0.
        assert_eq!(rows[2], rows[0]);
    }

    #[test]
    fn packed_phase_offsets_start_position() {
        let mut mem = FlatMemory::from_words(0, vec![0x8000, 0x0001]);
        let mut src =
            PixelSource::Packed(PackedPattern::new(0, 1, 1, 1, 2).unwrap());
        let rows = pixels(&mut src, &mut mem, 16, 2);
        // Starts on tile line 1 at bit 1: bits 1..15 of 0x0001 (all clear
        // until the LSB) then wraps to bit 0.
        assert_eq!(rows[0][13..], [0, 1, 0]);
        // Next line wraps to tile line 0, rewound to bit 1; 0x8000 only has
        // bit 0 set, reached after the horizontal wrap.
        assert_eq!(rows[1][..15], [0; 15]);
        assert_eq!(rows[1][15], 1);
    }

    #[test]
    fn unpacked_monochrome_squashes_to_bits() {
        let mut mem = FlatMemory::from_words(0, vec![0x1234, 0, 7, 0]);
        let mut mono =
            PixelSource::Unpacked(UnpackedPattern::new(0, 0, 0, 2, 2, true).unwrap());
        assert_eq!(pixels(&mut mono, &mut mem, 3, 2), [[1, 0, 1], [1, 0, 1]]);

        let mut color =
            PixelSource::Unpacked(UnpackedPattern::new(0, 0, 0, 2, 2, false).unwrap());
        assert_eq!(
            pixels(&mut color, &mut mem, 3, 2),
            [[0x1234, 0, 0x1234], [7, 0, 7]]
        );
    }

    #[test]
    fn tile_is_read_once() {
        let mut mem = FlatMemory::from_words(0, vec![0xAAAA]);
        let mut src = PixelSource::Packed(PackedPattern::new(0, 0, 0, 1, 1).unwrap());
        src.load_line(&mut mem).unwrap();
        assert_eq!(src.current_pixel(), 1);
        // A later change to the backing words is not observed.
        mem.words_mut()[0] = 0;
        src.advance_line();
        src.load_line(&mut mem).unwrap();
        assert_eq!(src.current_pixel(), 1);
    }

    #[test]
    fn out_of_tile_phase_is_rejected() {
        assert_eq!(
            PackedPattern::new(0, 0, 2, 1, 2).unwrap_err(),
            MalformedOperation::PatternPhase { y_offset: 2, height: 2 }
        );
        assert_eq!(
            UnpackedPattern::new(0, 4, 0, 4, 1, true).unwrap_err(),
            MalformedOperation::PatternColumn { x: 4, width: 4 }
        );
    }
}
