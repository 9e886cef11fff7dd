//! The per-line transfer loop and the registry of suspended operations.

use std::collections::HashMap;

use tracing::trace;

use crate::combine::Combiner;
use crate::env::InterruptSignal;
use crate::error::BltError;
use crate::pattern::PixelSource;
use crate::stack::OperandStack;
use crate::stream::PixelStream;
use dandelion_mem::MemoryBus;

/// How an instruction front-end returned to the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecOutcome {
    /// The instruction ran to completion; advance past it.
    Completed,
    /// A pending interrupt preempted the transfer. Resumable state is on
    /// the operand stack; re-execute the same instruction after the
    /// interrupt is serviced.
    Interrupted,
}

/// Identifier of a registered operation; the resumption marker pushed on
/// yield. Never 0.
pub type OpId = u16;

/// One decoded rectangular transfer, mid-flight.
///
/// Owns both cursors exclusively. Created by the decoders, driven a line at
/// a time until `remaining_lines` hits 0.
#[derive(Debug)]
pub struct TransferOp {
    pub(crate) id: OpId,
    width: u16,
    remaining_lines: u16,
    combiner: Combiner,
    /// Map {0,1} source pixels through `color_map` before combining.
    map_source: bool,
    color_map: [u16; 2],
    src: PixelSource,
    dst: PixelStream,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineOutcome {
    Finished,
    MoreLines,
}

impl TransferOp {
    pub(crate) fn new(
        width: u16,
        height: u16,
        combiner: Combiner,
        map_source: bool,
        color_map: [u16; 2],
        src: PixelSource,
        dst: PixelStream,
    ) -> Self {
        debug_assert!(width > 0 && height > 0);
        Self {
            id: 0,
            width,
            remaining_lines: height,
            combiner,
            map_source,
            color_map,
            src,
            dst,
        }
    }

    /// Transfer one full line.
    ///
    /// A fault propagates before any pixel of the line is flushed, so a
    /// retried line re-reads and re-writes exactly its own words. Pixels
    /// are combined strictly left to right whatever the requested
    /// direction; direction only decides which line `advance_line` visits
    /// next.
    fn step<M: MemoryBus>(&mut self, mem: &mut M) -> Result<LineOutcome, dandelion_mem::MemoryFault> {
        self.src.load_line(mem)?;
        self.dst.load_line(mem)?;

        for _ in 0..self.width {
            let mut s = self.src.current_pixel();
            if self.map_source {
                s = self.color_map[usize::from(s != 0)];
            }
            let d = self.dst.current_pixel();
            self.dst.set_pixel(self.combiner.apply(s, d));
            self.src.advance_pixel();
            self.dst.advance_pixel();
        }
        self.dst.flush_line(mem)?;

        self.remaining_lines -= 1;
        if self.remaining_lines == 0 {
            Ok(LineOutcome::Finished)
        } else {
            self.src.advance_line();
            self.dst.advance_line();
            Ok(LineOutcome::MoreLines)
        }
    }
}

/// Suspended transfers, keyed by the marker word on the operand stack.
///
/// Owned by the virtual-processor core and passed by reference into the
/// front-ends, so an identifier on the stack survives dispatcher re-entry
/// without hidden global state. An entry leaves the registry exactly once,
/// at natural completion; an operation that never resumes simply stays
/// registered.
#[derive(Debug, Default)]
pub struct OperationRegistry {
    next_id: OpId,
    live: HashMap<OpId, TransferOp>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Register a fresh operation under a new identifier.
    ///
    /// Registration happens before the first line moves so that a fault
    /// during line 0 already has resumable state.
    pub(crate) fn register(&mut self, mut op: TransferOp) -> OpId {
        op.id = self.fresh_id();
        let id = op.id;
        trace!(id, lines = op.remaining_lines, "registered block transfer");
        self.live.insert(id, op);
        id
    }

    fn fresh_id(&mut self) -> OpId {
        loop {
            self.next_id = self.next_id.wrapping_add(1);
            if self.next_id != 0 && !self.live.contains_key(&self.next_id) {
                return self.next_id;
            }
        }
    }

    /// Drive the operation `id` until it completes, faults, or yields to a
    /// pending interrupt. Shared by fresh execution and resumption.
    pub(crate) fn run<M: MemoryBus, I: InterruptSignal + ?Sized>(
        &mut self,
        id: OpId,
        stack: &mut OperandStack,
        mem: &mut M,
        ints: &I,
    ) -> Result<ExecOutcome, BltError> {
        loop {
            // An absent identifier is the lost-resumption case: in-flight
            // state may legitimately be discarded without notice, so the
            // marker completes as a no-op.
            let Some(op) = self.live.get_mut(&id) else {
                trace!(id, "resumption marker without a live operation");
                return Ok(ExecOutcome::Completed);
            };
            match op.step(mem) {
                Ok(LineOutcome::MoreLines) => {
                    if ints.interrupt_pending() {
                        stack.push(id)?;
                        trace!(id, "yielding to pending interrupt");
                        return Ok(ExecOutcome::Interrupted);
                    }
                }
                Ok(LineOutcome::Finished) => {
                    self.live.remove(&id);
                    trace!(id, "block transfer complete");
                    return Ok(ExecOutcome::Completed);
                }
                Err(fault) => {
                    stack.push(id)?;
                    trace!(id, %fault, "suspending on memory fault");
                    return Err(BltError::Fault(fault));
                }
            }
        }
    }
}
