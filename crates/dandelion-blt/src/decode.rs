//! Instruction front-ends for the rectangular transfer family.
//!
//! Three encodings feed the same engine:
//! - `BITBLT` — a long pointer on the stack to a 12-word argument block;
//! - `BITBLTX` — the first 11 of those words directly on the stack;
//! - `COLORBLT` — a long pointer to a 13-word block that appends a color
//!   mapping pair and widens the function selector to all eight combine
//!   rules.
//!
//! Each decoder classifies its operands as plain bitmap (1-bit pixels) or
//! display memory (pixels at the active display's depth) by address-range
//! comparison, builds the streams, registers the operation and drives it.
//! On re-entry with a resumption marker (exactly one word on the stack) the
//! decoder skips straight to the registered operation.

use bitflags::bitflags;

use crate::combine::{Combiner, DstFunc, SrcFunc};
use crate::env::{DisplayGeometry, InterruptSignal};
use crate::error::{BltError, MalformedOperation};
use crate::op::{ExecOutcome, OperationRegistry, TransferOp};
use crate::pattern::{PackedPattern, PixelSource, SolidSource, UnpackedPattern};
use crate::pixel::PixelDepth;
use crate::stack::OperandStack;
use crate::stream::PixelStream;
use dandelion_mem::{LongPointer, MemoryBus};

bitflags! {
    /// Single-bit flags of the `BITBLT`/`BITBLTX` flag word (word 10).
    ///
    /// Bits 10..9 hold the destination-function code and are not flags;
    /// see [`BITBLT_DST_FUNCS`]. `DISJOINT`/`DISJOINT_ITEMS` are overlap
    /// promises from the compiler; the line-buffered transfer is correct
    /// either way, so they are accepted without being consulted.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BitBltFlags: u16 {
        const BACKWARD = 1 << 15;
        const DISJOINT = 1 << 14;
        const DISJOINT_ITEMS = 1 << 13;
        const GRAY = 1 << 12;
        const SRC_COMPLEMENT = 1 << 11;
    }
}

bitflags! {
    /// Single-bit flags of the `COLORBLT` flag word (word 10). Bits 10..8
    /// hold the destination-function code; see [`COLORBLT_DST_FUNCS`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ColorBltFlags: u16 {
        const BACKWARD = 1 << 15;
        const PATTERN = 1 << 14;
        const SRC_COMPLEMENT = 1 << 11;
    }
}

/// Legacy destination-function codes (2 bits): store, and, or, xor. Fixed
/// instruction-set constants.
const BITBLT_DST_FUNCS: [DstFunc; 4] = [
    DstFunc::Src,
    DstFunc::SrcIfDstNe0,
    DstFunc::SrcIfNe0,
    DstFunc::PixelXor,
];

/// `COLORBLT` destination-function codes (3 bits), in instruction-set
/// order.
const COLORBLT_DST_FUNCS: [DstFunc; 8] = [
    DstFunc::Src,
    DstFunc::SrcIfDstLe1,
    DstFunc::DstIfSrc0,
    DstFunc::SrcIfDstNe0,
    DstFunc::SrcIfNe0,
    DstFunc::SrcIfDst0,
    DstFunc::PixelXor,
    DstFunc::IndexXor,
];

#[derive(Debug, Clone, Copy)]
struct ResolvedStream {
    base: LongPointer,
    bit: u16,
    stride_bits: i32,
    depth: PixelDepth,
}

#[derive(Debug, Clone, Copy)]
enum SourceSpec {
    Stream {
        stream: ResolvedStream,
        display: bool,
    },
    Packed {
        origin: LongPointer,
        bit: u16,
        y_offset: u16,
        width_words: u16,
        height: u16,
    },
    Unpacked {
        origin: LongPointer,
        x: u16,
        y_offset: u16,
        width: u16,
        height: u16,
        monochrome: bool,
    },
    Solid {
        value: u16,
        bit_typed: bool,
    },
}

#[derive(Debug, Clone, Copy)]
struct RectRequest {
    dst: ResolvedStream,
    src: SourceSpec,
    width: u16,
    height: u16,
    backward: bool,
    src_func: SrcFunc,
    dst_func: DstFunc,
    color_map: [u16; 2],
}

fn long_from(w: &[u16], i: usize) -> LongPointer {
    u32::from(w[i]) | (u32::from(w[i + 1]) << 16)
}

fn classify<P: DisplayGeometry>(platform: &P, ptr: LongPointer) -> (bool, PixelDepth) {
    let (start, end) = platform.display_memory_range();
    if ptr >= start && ptr < end {
        (true, platform.active_color_depth())
    } else {
        (false, PixelDepth::One)
    }
}

/// `BITBLT`: rectangular transfer described by a 12-word argument block in
/// memory. Word 11 of the block is reserved and ignored.
pub fn exec_bitblt<M, P>(
    stack: &mut OperandStack,
    ops: &mut OperationRegistry,
    mem: &mut M,
    platform: &P,
) -> Result<ExecOutcome, BltError>
where
    M: MemoryBus,
    P: InterruptSignal + DisplayGeometry,
{
    match stack.depth() {
        1 => {
            let id = stack.pop()?;
            return ops.run(id, stack, mem, platform);
        }
        2 => {}
        depth => return Err(MalformedOperation::StackDepth { depth }.into()),
    }

    let arg = stack.pop_long()?;
    let mut w = [0u16; 12];
    if let Err(fault) = mem.read_words(arg, &mut w) {
        // Nothing is registered yet; restore the operand so the dispatcher
        // restarts the instruction once the page is resident.
        stack.push_long(arg)?;
        return Err(fault.into());
    }

    let req = decode_bitblt(&w, platform);
    if req.width == 0 || req.height == 0 {
        return Ok(ExecOutcome::Completed);
    }
    start_rect(req, stack, ops, mem, platform)
}

/// `BITBLTX`: the same transfer with the 11 argument words on the operand
/// stack (flag word on top).
pub fn exec_bitbltx<M, P>(
    stack: &mut OperandStack,
    ops: &mut OperationRegistry,
    mem: &mut M,
    platform: &P,
) -> Result<ExecOutcome, BltError>
where
    M: MemoryBus,
    P: InterruptSignal + DisplayGeometry,
{
    match stack.depth() {
        1 => {
            let id = stack.pop()?;
            return ops.run(id, stack, mem, platform);
        }
        11 => {}
        depth => return Err(MalformedOperation::StackDepth { depth }.into()),
    }

    let mut w = [0u16; 11];
    for slot in w.iter_mut().rev() {
        *slot = stack.pop()?;
    }

    let req = decode_bitblt(&w, platform);
    if req.width == 0 || req.height == 0 {
        return Ok(ExecOutcome::Completed);
    }
    start_rect(req, stack, ops, mem, platform)
}

fn decode_bitblt<P: DisplayGeometry>(w: &[u16], platform: &P) -> RectRequest {
    let flags_word = w[10];
    let flags = BitBltFlags::from_bits_truncate(flags_word);
    let dst_func = BITBLT_DST_FUNCS[usize::from((flags_word >> 9) & 0b11)];
    let src_func = if flags.contains(BitBltFlags::SRC_COMPLEMENT) {
        SrcFunc::Complement
    } else {
        SrcFunc::Identity
    };

    let dst_ptr = long_from(w, 0);
    let (_, dst_depth) = classify(platform, dst_ptr);
    let dst = ResolvedStream {
        base: dst_ptr,
        bit: w[2],
        // Legacy strides are given in bits per line.
        stride_bits: i32::from(w[3] as i16),
        depth: dst_depth,
    };

    let src = if flags.contains(BitBltFlags::GRAY) {
        // Word 7 is a GrayParm instead of a stride: a packed 1-bit tile
        // with its vertical phase and size packed into nibbles.
        let parm = w[7];
        SourceSpec::Packed {
            origin: long_from(w, 4),
            bit: w[6],
            y_offset: (parm >> 8) & 0xF,
            width_words: ((parm >> 4) & 0xF) + 1,
            height: (parm & 0xF) + 1,
        }
    } else {
        let src_ptr = long_from(w, 4);
        let (display, depth) = classify(platform, src_ptr);
        SourceSpec::Stream {
            stream: ResolvedStream {
                base: src_ptr,
                bit: w[6],
                stride_bits: i32::from(w[7] as i16),
                depth,
            },
            display,
        }
    };

    RectRequest {
        dst,
        src,
        width: w[8],
        height: w[9],
        backward: flags.contains(BitBltFlags::BACKWARD),
        src_func,
        dst_func,
        // The legacy encodings carry no mapping pair; bit sources map
        // through the identity.
        color_map: [0, 1],
    }
}

/// `COLORBLT`: rectangular transfer described by a 13-word argument block,
/// with pixel strides, an optional packed/unpacked pattern source and a
/// color mapping pair for bit-typed sources.
pub fn exec_colorblt<M, P>(
    stack: &mut OperandStack,
    ops: &mut OperationRegistry,
    mem: &mut M,
    platform: &P,
) -> Result<ExecOutcome, BltError>
where
    M: MemoryBus,
    P: InterruptSignal + DisplayGeometry,
{
    match stack.depth() {
        1 => {
            let id = stack.pop()?;
            return ops.run(id, stack, mem, platform);
        }
        2 => {}
        depth => return Err(MalformedOperation::StackDepth { depth }.into()),
    }

    let arg = stack.pop_long()?;
    let mut w = [0u16; 13];
    if let Err(fault) = mem.read_words(arg, &mut w) {
        stack.push_long(arg)?;
        return Err(fault.into());
    }

    let (width, height) = (w[8], w[9]);
    if width == 0 || height == 0 {
        return Ok(ExecOutcome::Completed);
    }

    let flags_word = w[10];
    let flags = ColorBltFlags::from_bits_truncate(flags_word);
    let dst_func = COLORBLT_DST_FUNCS[usize::from((flags_word >> 8) & 0b111)];
    let src_func = if flags.contains(ColorBltFlags::SRC_COMPLEMENT) {
        SrcFunc::Complement
    } else {
        SrcFunc::Identity
    };

    let dst_ptr = long_from(&w, 0);
    let (_, dst_depth) = classify(platform, dst_ptr);
    let dst = ResolvedStream {
        base: dst_ptr,
        bit: w[2],
        // COLORBLT strides are pixels per line.
        stride_bits: i32::from(w[3] as i16) * i32::from(dst_depth.bits()),
        depth: dst_depth,
    };

    let src = if flags.contains(ColorBltFlags::PATTERN) {
        // Word 7 is a PatternParm: tile kind, phase and size.
        let parm = w[7];
        let unpacked = parm & (1 << 15) != 0;
        let monochrome = parm & (1 << 14) != 0;
        let y_offset = (parm >> 8) & 0xF;
        let tile_width = ((parm >> 4) & 0xF) + 1;
        let tile_height = (parm & 0xF) + 1;
        let origin = long_from(&w, 4);
        if unpacked {
            if tile_width == 1 && tile_height == 1 {
                // A 1x1 unpacked tile is a solid color; its one word is
                // read here, before anything is registered, under the same
                // restart rule as the argument block itself.
                if y_offset != 0 {
                    return Err(MalformedOperation::PatternPhase {
                        y_offset,
                        height: 1,
                    }
                    .into());
                }
                if w[6] != 0 {
                    return Err(MalformedOperation::PatternColumn { x: w[6], width: 1 }.into());
                }
                let word = match mem.read_word(origin) {
                    Ok(v) => v,
                    Err(fault) => {
                        stack.push_long(arg)?;
                        return Err(fault.into());
                    }
                };
                if monochrome {
                    SourceSpec::Solid {
                        value: u16::from(word != 0),
                        bit_typed: true,
                    }
                } else {
                    SourceSpec::Solid {
                        value: word,
                        bit_typed: false,
                    }
                }
            } else {
                SourceSpec::Unpacked {
                    origin,
                    x: w[6],
                    y_offset,
                    width: tile_width,
                    height: tile_height,
                    monochrome,
                }
            }
        } else {
            SourceSpec::Packed {
                origin,
                bit: w[6],
                y_offset,
                width_words: tile_width,
                height: tile_height,
            }
        }
    } else {
        let src_ptr = long_from(&w, 4);
        let (display, depth) = classify(platform, src_ptr);
        SourceSpec::Stream {
            stream: ResolvedStream {
                base: src_ptr,
                bit: w[6],
                stride_bits: i32::from(w[7] as i16) * i32::from(depth.bits()),
                depth,
            },
            display,
        }
    };

    let req = RectRequest {
        dst,
        src,
        width,
        height,
        backward: flags.contains(ColorBltFlags::BACKWARD),
        src_func,
        dst_func,
        color_map: [w[11], w[12]],
    };
    start_rect(req, stack, ops, mem, platform)
}

/// Build the streams, register the operation and drive it.
fn start_rect<M: MemoryBus, I: InterruptSignal>(
    req: RectRequest,
    stack: &mut OperandStack,
    ops: &mut OperationRegistry,
    mem: &mut M,
    ints: &I,
) -> Result<ExecOutcome, BltError> {
    let color_source = matches!(
        req.src,
        SourceSpec::Unpacked {
            monochrome: false,
            ..
        } | SourceSpec::Solid {
            bit_typed: false,
            ..
        }
    );
    if color_source && req.dst.depth == PixelDepth::One {
        return Err(MalformedOperation::ColorPatternIntoBitmap.into());
    }

    let dst = PixelStream::new(
        req.dst.base,
        req.dst.bit,
        req.dst.stride_bits,
        req.width,
        req.dst.depth,
        req.backward,
    )?;

    let (src, bit_typed) = match req.src {
        SourceSpec::Stream { stream: s, display } => (
            PixelSource::Stream(PixelStream::new(
                s.base,
                s.bit,
                s.stride_bits,
                req.width,
                s.depth,
                req.backward,
            )?),
            !display,
        ),
        SourceSpec::Packed {
            origin,
            bit,
            y_offset,
            width_words,
            height,
        } => (
            PixelSource::Packed(PackedPattern::new(origin, bit, y_offset, width_words, height)?),
            true,
        ),
        SourceSpec::Unpacked {
            origin,
            x,
            y_offset,
            width,
            height,
            monochrome,
        } => (
            PixelSource::Unpacked(UnpackedPattern::new(
                origin, x, y_offset, width, height, monochrome,
            )?),
            monochrome,
        ),
        SourceSpec::Solid { value, bit_typed } => {
            (PixelSource::Solid(SolidSource::new(value)), bit_typed)
        }
    };

    // The mapping pair converts bit-typed pixels to color indices. A
    // complemented source stays in the {0,1} domain instead.
    let map_source = bit_typed && req.src_func == SrcFunc::Identity;

    let op = TransferOp::new(
        req.width,
        req.height,
        Combiner::new(req.src_func, req.dst_func),
        map_source,
        req.color_map,
        src,
        dst,
    );
    let id = ops.register(op);
    ops.run(id, stack, mem, ints)
}
