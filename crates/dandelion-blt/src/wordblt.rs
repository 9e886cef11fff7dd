//! Word-granularity block instructions: `BLT`, `BLTC`, `BLEQ`, `CKSUM`.
//!
//! Same yield discipline as the rectangular family — suspend fully on a
//! fault, yield between units only when an interrupt is pending — but the
//! unit of work is one word, so no registry is needed: the updated
//! (source, count, dest) operands are pushed back in their entry layout and
//! re-executing the instruction continues the transfer. The moved prefix is
//! excluded by the updated operands, so no word is ever moved twice.

use crate::env::InterruptSignal;
use crate::error::{BltError, MalformedOperation};
use crate::op::ExecOutcome;
use crate::stack::OperandStack;
use dandelion_mem::{LongPointer, MemoryBus};

/// `BLT`: move `count` words from `source` to `dest`, ascending.
///
/// Stack at entry, bottom to top: source (long), count, dest (long).
pub fn exec_blt<M: MemoryBus, I: InterruptSignal>(
    stack: &mut OperandStack,
    mem: &mut M,
    ints: &I,
) -> Result<ExecOutcome, BltError> {
    let mut dest = stack.pop_long()?;
    let mut count = stack.pop()?;
    let mut source = stack.pop_long()?;

    while count != 0 {
        let value = match mem.read_word(source) {
            Ok(v) => v,
            Err(fault) => {
                push_move_state(stack, source, count, dest)?;
                return Err(fault.into());
            }
        };
        if let Err(fault) = mem.write_word(dest, value) {
            push_move_state(stack, source, count, dest)?;
            return Err(fault.into());
        }
        source = source.wrapping_add(1);
        dest = dest.wrapping_add(1);
        count -= 1;
        if count != 0 && ints.interrupt_pending() {
            push_move_state(stack, source, count, dest)?;
            return Ok(ExecOutcome::Interrupted);
        }
    }
    Ok(ExecOutcome::Completed)
}

/// `BLTC`: like `BLT`, but the source is a one-word offset into the
/// current code segment.
///
/// Stack at entry, bottom to top: source offset, count, dest (long).
pub fn exec_bltc<M: MemoryBus, I: InterruptSignal>(
    stack: &mut OperandStack,
    mem: &mut M,
    ints: &I,
    code_base: LongPointer,
) -> Result<ExecOutcome, BltError> {
    let mut dest = stack.pop_long()?;
    let mut count = stack.pop()?;
    let mut offset = stack.pop()?;

    while count != 0 {
        let value = match mem.read_word(code_base.wrapping_add(u32::from(offset))) {
            Ok(v) => v,
            Err(fault) => {
                push_code_move_state(stack, offset, count, dest)?;
                return Err(fault.into());
            }
        };
        if let Err(fault) = mem.write_word(dest, value) {
            push_code_move_state(stack, offset, count, dest)?;
            return Err(fault.into());
        }
        offset = offset.wrapping_add(1);
        dest = dest.wrapping_add(1);
        count -= 1;
        if count != 0 && ints.interrupt_pending() {
            push_code_move_state(stack, offset, count, dest)?;
            return Ok(ExecOutcome::Interrupted);
        }
    }
    Ok(ExecOutcome::Completed)
}

/// `BLEQ`: compare two word blocks; pushes 1 if every word matched, else 0.
///
/// Stack at entry, bottom to top: first (long), count, second (long).
/// Comparison is ascending with an early exit at the first mismatch.
pub fn exec_bleq<M: MemoryBus, I: InterruptSignal>(
    stack: &mut OperandStack,
    mem: &mut M,
    ints: &I,
) -> Result<ExecOutcome, BltError> {
    let mut second = stack.pop_long()?;
    let mut count = stack.pop()?;
    let mut first = stack.pop_long()?;

    while count != 0 {
        let a = match mem.read_word(first) {
            Ok(v) => v,
            Err(fault) => {
                push_compare_state(stack, first, count, second)?;
                return Err(fault.into());
            }
        };
        let b = match mem.read_word(second) {
            Ok(v) => v,
            Err(fault) => {
                push_compare_state(stack, first, count, second)?;
                return Err(fault.into());
            }
        };
        if a != b {
            stack.push(0)?;
            return Ok(ExecOutcome::Completed);
        }
        first = first.wrapping_add(1);
        second = second.wrapping_add(1);
        count -= 1;
        if count != 0 && ints.interrupt_pending() {
            push_compare_state(stack, first, count, second)?;
            return Ok(ExecOutcome::Interrupted);
        }
    }
    stack.push(1)?;
    Ok(ExecOutcome::Completed)
}

/// `CKSUM`: fold `count` words at `source` into a running checksum.
///
/// Stack at entry, bottom to top: checksum, count, source (long). The final
/// checksum is pushed on completion; a result of 0xFFFF is normalized to 0.
pub fn exec_cksum<M: MemoryBus, I: InterruptSignal>(
    stack: &mut OperandStack,
    mem: &mut M,
    ints: &I,
) -> Result<ExecOutcome, BltError> {
    let mut source = stack.pop_long()?;
    let mut count = stack.pop()?;
    let mut cksum = stack.pop()?;

    while count != 0 {
        let word = match mem.read_word(source) {
            Ok(v) => v,
            Err(fault) => {
                push_cksum_state(stack, cksum, count, source)?;
                return Err(fault.into());
            }
        };
        cksum = checksum_step(cksum, word);
        source = source.wrapping_add(1);
        count -= 1;
        if count != 0 && ints.interrupt_pending() {
            push_cksum_state(stack, cksum, count, source)?;
            return Ok(ExecOutcome::Interrupted);
        }
    }
    stack.push(if cksum == 0xFFFF { 0 } else { cksum })?;
    Ok(ExecOutcome::Completed)
}

/// Ones-complement add with end-around carry, then rotate left one bit.
fn checksum_step(cksum: u16, word: u16) -> u16 {
    let (sum, carry) = cksum.overflowing_add(word);
    let sum = if carry { sum.wrapping_add(1) } else { sum };
    sum.rotate_left(1)
}

fn push_move_state(
    stack: &mut OperandStack,
    source: LongPointer,
    count: u16,
    dest: LongPointer,
) -> Result<(), MalformedOperation> {
    stack.push_long(source)?;
    stack.push(count)?;
    stack.push_long(dest)
}

fn push_code_move_state(
    stack: &mut OperandStack,
    offset: u16,
    count: u16,
    dest: LongPointer,
) -> Result<(), MalformedOperation> {
    stack.push(offset)?;
    stack.push(count)?;
    stack.push_long(dest)
}

fn push_compare_state(
    stack: &mut OperandStack,
    first: LongPointer,
    count: u16,
    second: LongPointer,
) -> Result<(), MalformedOperation> {
    stack.push_long(first)?;
    stack.push(count)?;
    stack.push_long(second)
}

fn push_cksum_state(
    stack: &mut OperandStack,
    cksum: u16,
    count: u16,
    source: LongPointer,
) -> Result<(), MalformedOperation> {
    stack.push(cksum)?;
    stack.push(count)?;
    stack.push_long(source)
}
