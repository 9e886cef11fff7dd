use dandelion_mem::MemoryFault;
use thiserror::Error;

/// Internally inconsistent decoded geometry or operand state.
///
/// These halt the processor instead of being masked; masking would corrupt
/// display memory invisibly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MalformedOperation {
    #[error("operand stack underflow")]
    StackUnderflow,

    #[error("operand stack overflow")]
    StackOverflow,

    #[error("unexpected operand stack depth {depth} at instruction entry")]
    StackDepth { depth: usize },

    #[error("pixel bit offset {bit} outside the word")]
    BitOffsetRange { bit: u16 },

    #[error("pixel bit offset {bit} not aligned to {bits}-bit pixels")]
    BitOffsetAlignment { bit: u16, bits: u16 },

    #[error("pattern phase line {y_offset} outside a {height}-line tile")]
    PatternPhase { y_offset: u16, height: u16 },

    #[error("pattern phase column {x} outside a {width}-pixel tile line")]
    PatternColumn { x: u16, width: u16 },

    #[error("color pattern cannot feed a 1-bit destination")]
    ColorPatternIntoBitmap,
}

/// Errors surfaced by the instruction front-ends.
///
/// The two kinds demand opposite handling: a fault is caught by the
/// dispatcher, which resolves the missing page and re-executes the
/// instruction (resumable state is already on the stack and in the
/// registry by the time the fault propagates); a malformed operation is
/// never caught.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BltError {
    #[error(transparent)]
    Fault(#[from] MemoryFault),

    #[error("malformed block-transfer operation: {0}")]
    Malformed(#[from] MalformedOperation),
}
