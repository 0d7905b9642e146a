//! Tapes shared between configurations.
//!
//! Every tape lives in a [`TapeArena`] slot together with a counter of *extra* owners:
//! a tape held by `n` configurations has `count == n - 1`. Deterministic moves share
//! the parent's tape ([`TapeArena::share`]), branch points give each child a private
//! copy ([`TapeArena::fork`]), and a slot is freed when its last owner releases it.

use crate::types::{TuringMachineError, BLANK_SYMBOL, TAPE_MARGIN};
use std::iter;

/// Index of a tape inside a [`TapeArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TapeHandle(usize);

#[derive(Debug)]
struct TapeSlot {
    cells: Vec<char>,
    count: usize,
}

/// Storage for all tapes of one simulation.
#[derive(Debug, Default)]
pub struct TapeArena {
    slots: Vec<Option<TapeSlot>>,
    free: Vec<usize>,
    live: usize,
}

impl TapeArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `cells` as a new tape with a single owner.
    pub fn alloc(&mut self, cells: Vec<char>) -> TapeHandle {
        let slot = Some(TapeSlot { cells, count: 0 });
        self.live += 1;

        match self.free.pop() {
            Some(index) => {
                self.slots[index] = slot;
                TapeHandle(index)
            }
            None => {
                self.slots.push(slot);
                TapeHandle(self.slots.len() - 1)
            }
        }
    }

    /// Registers one more owner of `handle` and returns the same handle.
    pub fn share(&mut self, handle: TapeHandle) -> TapeHandle {
        self.slot_mut(handle).count += 1;
        handle
    }

    /// Copies the contents of `handle` into a new tape owned only by the caller.
    pub fn fork(&mut self, handle: TapeHandle) -> Result<TapeHandle, TuringMachineError> {
        let source = &self.slot(handle).cells;
        let mut cells = Vec::new();
        cells
            .try_reserve_exact(source.len())
            .map_err(|_| TuringMachineError::TapeAllocation(source.len()))?;
        cells.extend_from_slice(source);

        Ok(self.alloc(cells))
    }

    /// Drops one owner of `handle`. Returns `true` when that was the last owner and the
    /// tape has been freed.
    pub fn release(&mut self, handle: TapeHandle) -> bool {
        let slot = self.slot_mut(handle);
        if slot.count > 0 {
            slot.count -= 1;
            return false;
        }

        self.slots[handle.0] = None;
        self.free.push(handle.0);
        self.live -= 1;
        true
    }

    /// Number of configurations holding `handle`, or `None` once it has been freed.
    pub fn owners(&self, handle: TapeHandle) -> Option<usize> {
        self.slots
            .get(handle.0)
            .and_then(Option::as_ref)
            .map(|slot| slot.count + 1)
    }

    /// Number of tapes currently allocated.
    pub fn live(&self) -> usize {
        self.live
    }

    /// Handles of all allocated tapes, in slot order.
    pub fn handles(&self) -> impl Iterator<Item = TapeHandle> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(index, _)| TapeHandle(index))
    }

    pub fn cells(&self, handle: TapeHandle) -> &[char] {
        &self.slot(handle).cells
    }

    pub fn read(&self, handle: TapeHandle, index: usize) -> char {
        self.slot(handle).cells[index]
    }

    pub fn write(&mut self, handle: TapeHandle, index: usize, symbol: char) {
        self.slot_mut(handle).cells[index] = symbol;
    }

    /// Grows the tape behind `handle` until `head` addresses a cell. Returns the length
    /// of the tape afterwards.
    pub fn widen(
        &mut self,
        handle: TapeHandle,
        head: &mut isize,
    ) -> Result<usize, TuringMachineError> {
        widen(&mut self.slot_mut(handle).cells, head)
    }

    fn slot(&self, handle: TapeHandle) -> &TapeSlot {
        self.slots[handle.0]
            .as_ref()
            .expect("tape handle used after its last owner released it")
    }

    fn slot_mut(&mut self, handle: TapeHandle) -> &mut TapeSlot {
        self.slots[handle.0]
            .as_mut()
            .expect("tape handle used after its last owner released it")
    }
}

/// Pads `cells` with [`TAPE_MARGIN`] blanks on both sides, as many times as needed for
/// `head` to fall inside `[0, cells.len())`, shifting `head` so it keeps addressing the
/// same logical cell. The tape is copied at most once. Existing symbols are never
/// changed. Returns the resulting length.
pub fn widen(cells: &mut Vec<char>, head: &mut isize) -> Result<usize, TuringMachineError> {
    let rounds = margins_needed(cells.len(), *head);
    if rounds == 0 {
        return Ok(cells.len());
    }

    let pad = rounds
        .checked_mul(TAPE_MARGIN)
        .filter(|&pad| pad <= isize::MAX as usize)
        .ok_or(TuringMachineError::TapeAllocation(usize::MAX))?;
    let len = pad
        .checked_mul(2)
        .and_then(|both| both.checked_add(cells.len()))
        .ok_or(TuringMachineError::TapeAllocation(usize::MAX))?;

    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|_| TuringMachineError::TapeAllocation(len))?;

    buffer.extend(iter::repeat(BLANK_SYMBOL).take(pad));
    buffer.extend_from_slice(cells);
    buffer.extend(iter::repeat(BLANK_SYMBOL).take(pad));

    *cells = buffer;
    *head += pad as isize;

    Ok(len)
}

/// Smallest number of margins that brings `head` inside a tape of `len` cells.
fn margins_needed(len: usize, head: isize) -> usize {
    if head < 0 {
        head.unsigned_abs().div_ceil(TAPE_MARGIN)
    } else if head as usize >= len {
        (head as usize - len) / TAPE_MARGIN + 1
    } else {
        0
    }
}
