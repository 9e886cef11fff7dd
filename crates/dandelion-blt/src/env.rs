//! Platform services consumed, never provided, by the transfer engine.

use crate::pixel::PixelDepth;
use dandelion_mem::LongPointer;

/// The scheduler's preemption signal.
///
/// Polled at line boundaries (word boundaries for the word family), never
/// mid-line. Must be non-blocking.
pub trait InterruptSignal {
    fn interrupt_pending(&self) -> bool;
}

/// Geometry of the active display, used to classify transfer operands as
/// plain bitmaps or display memory.
pub trait DisplayGeometry {
    /// Color depth of display-memory pixels.
    fn active_color_depth(&self) -> PixelDepth;

    /// Half-open word range `[start, end)` occupied by display memory.
    fn display_memory_range(&self) -> (LongPointer, LongPointer);
}
