//! Block-transfer engine of the Dandelion virtual processor.
//!
//! The instruction set defines two families of bulk-transfer instructions,
//! both implemented here:
//! - rectangular pixel transfers — `BITBLT` (12-word argument block in
//!   memory), `BITBLTX` (arguments on the operand stack) and `COLORBLT`
//!   (adds a color mapping pair and the full set of eight combine
//!   functions) — over 1/4/8-bit pixels, with bitmap, solid and tiled
//!   pattern sources;
//! - word-granularity block operations — `BLT` (block move), `BLTC` (move
//!   from the current code segment), `BLEQ` (block compare) and `CKSUM`
//!   (running checksum).
//!
//! Every instruction in both families is *interruptible*: the processor may
//! suspend mid-transfer to service an interrupt or a page fault and later
//! re-execute the same instruction, continuing where it left off with no
//! word or pixel moved twice. Rectangular transfers checkpoint as an opaque
//! identifier on the operand stack, resolved through an
//! [`op::OperationRegistry`] owned by the processor core; the word family
//! checkpoints as its literal (source, count, dest) operands. Interrupts are
//! polled only at line (or word) boundaries, so mid-line state is never
//! externally observable.

#![forbid(unsafe_code)]

pub mod combine;
pub mod decode;
pub mod env;
pub mod error;
pub mod op;
pub mod pattern;
pub mod pixel;
pub mod stack;
pub mod stream;
pub mod wordblt;

pub use combine::{Combiner, DstFunc, SrcFunc};
pub use decode::{exec_bitblt, exec_bitbltx, exec_colorblt, BitBltFlags, ColorBltFlags};
pub use env::{DisplayGeometry, InterruptSignal};
pub use error::{BltError, MalformedOperation};
pub use op::{ExecOutcome, OpId, OperationRegistry};
pub use pixel::PixelDepth;
pub use stack::OperandStack;
pub use stream::PixelStream;
pub use wordblt::{exec_bleq, exec_blt, exec_bltc, exec_cksum};
