/*
    MartyPC
    https://github.com/dbalsom/martypc

    Copyright 2022-2025 Daniel Balsom

    Permission is hereby granted, free of charge, to any person obtaining a
    copy of this software and associated documentation files (the “Software”),
    to deal in the Software without restriction, including without limitation
    the rights to use, copy, modify, merge, publish, distribute, sublicense,
    and/or sell copies of the Software, and to permit persons to whom the
    Software is furnished to do so, subject to the following conditions:

    The above copyright notice and this permission notice shall be included in
    all copies or substantial portions of the Software.

    THE SOFTWARE IS PROVIDED “AS IS”, WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
    IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
    FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
    AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
    LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
    FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
    DEALINGS IN THE SOFTWARE.

    ---------------------------------------------------------------------------

    bank.rs

    One DRAM bank: its request buffer (free-list + pending FIFO) and the
    per-bank command state machine (§3, §4.2, §4.4).
*/

use std::collections::VecDeque;

use crate::{
    clock::ClockDomains,
    entry::{Cycle, Entry, EntryState},
    request::RequestPool,
};

/// The DRAM sub-command issued when a bank leaves the `Cmd` state.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Command {
    Activate,
    Column,
    Precharge,
}

/// One DRAM bank. Owns its own pending queue and tracks how many of its
/// `capacity` entries are currently free, in lieu of a literal pool of
/// reusable dummy entries: a fresh [`Entry`] is constructed on admission
/// and dropped on release, and `free_count` stands in for the free list's
/// length (invariant 1-2, §3).
#[derive(Debug)]
pub struct Bank {
    pub id: usize,
    capacity: usize,
    free_count: usize,
    pub pending: VecDeque<Entry>,
    pub current: Option<Entry>,
    pub open_row_id: Option<u64>,
    pub bank_ready_at: Option<Cycle>,
    pub data_ready_at: Option<Cycle>,
    pub data_avail_at: Option<Cycle>,
    pub last_command_timestamp: Cycle,
}

impl Bank {
    pub fn new(id: usize, capacity: usize) -> Self {
        Bank {
            id,
            capacity,
            free_count: capacity,
            pending: VecDeque::with_capacity(capacity),
            current: None,
            open_row_id: None,
            bank_ready_at: None,
            data_ready_at: None,
            data_avail_at: None,
            last_command_timestamp: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn free_count(&self) -> usize {
        self.free_count
    }

    #[inline]
    pub fn pending_full(&self) -> bool {
        self.free_count == 0
    }

    #[inline]
    pub fn pending_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Reserve one free slot and push `entry` onto the back of the pending
    /// FIFO. Returns `false` without modifying anything if the bank's
    /// buffer is full.
    pub fn try_push_pending(&mut self, entry: Entry) -> bool {
        if self.free_count == 0 {
            return false;
        }
        self.free_count -= 1;
        self.pending.push_back(entry);
        true
    }

    /// Remove and return the pending entry at `index`, returning its slot
    /// to the free list. Used by prefetch flush, merge completion, and by
    /// the scheduling policy once it has chosen which entry to promote.
    pub(crate) fn remove_pending(&mut self, index: usize) -> Entry {
        let entry = self.pending.remove(index).expect("index must be in range");
        self.free_count += 1;
        entry
    }

    /// Remove every pending entry that is a flushable prefetch (§4.3),
    /// freeing each underlying request through `pool`. Returns the number
    /// of entries flushed.
    pub fn flush_prefetches(&mut self, pool: &mut dyn RequestPool) -> usize {
        let mut flushed = 0;
        let mut i = 0;
        while i < self.pending.len() {
            if self.pending[i].kind.is_flushable_prefetch() {
                let entry = self.remove_pending(i);
                pool.free(entry.handle);
                flushed += 1;
            } else {
                i += 1;
            }
        }
        flushed
    }

    /// Promote the front-most selected entry (already removed from pending
    /// by the caller's scheduling policy) into the `current` slot and the
    /// `Cmd` state. The bank must currently be idle (`current.is_none()`).
    pub fn promote_to_current(&mut self, mut entry: Entry, now: Cycle) {
        debug_assert!(self.current.is_none(), "promote_to_current on a busy bank");
        entry.state = EntryState::Cmd;
        entry.scheduled_timestamp = Some(now);
        self.last_command_timestamp = now;
        self.current = Some(entry);
    }

    /// Issue the next sub-command for the bank currently sitting in `Cmd`
    /// (§4.4's `cmd_issue`). Panics if the bank isn't in that state -
    /// callers (the channel command scheduler) only call this after
    /// checking `current.state == Cmd`.
    pub fn issue_command(&mut self, now: Cycle, clocks: &ClockDomains) -> Command {
        let is_gpu = self.current.as_ref().expect("issue_command on idle bank").is_gpu;
        let row = self.current.as_ref().unwrap().row_id;

        let command = match self.open_row_id {
            None => Command::Activate,
            Some(open) if open == row => Command::Column,
            Some(_) => Command::Precharge,
        };

        let entry = self.current.as_mut().unwrap();
        match command {
            Command::Activate => {
                let delta = clocks.activate.for_request(is_gpu) as u64;
                entry.state = EntryState::CmdWait;
                self.bank_ready_at = Some(now + delta);
                self.data_avail_at = None;
                self.open_row_id = Some(row);
            }
            Command::Column => {
                let delta = clocks.column.for_request(is_gpu) as u64;
                entry.state = EntryState::Data;
                let ready = now + delta;
                self.bank_ready_at = Some(ready);
                self.data_avail_at = Some(ready);
            }
            Command::Precharge => {
                let delta = clocks.precharge.for_request(is_gpu) as u64;
                entry.state = EntryState::CmdWait;
                self.bank_ready_at = Some(now + delta);
                self.data_avail_at = None;
                self.open_row_id = None;
            }
        }
        self.last_command_timestamp = now;
        command
    }

    /// True when this bank is waiting in `Cmd` for the channel command
    /// scheduler to pick it.
    #[inline]
    pub fn awaiting_command(&self) -> bool {
        matches!(self.current.as_ref().map(|e| e.state), Some(EntryState::Cmd))
    }

    /// Re-arm a `CmdWait` bank whose inter-command delay has elapsed,
    /// moving it back to `Cmd` so the channel command scheduler can issue
    /// its next sub-command on a later tick.
    pub fn try_rearm(&mut self, now: Cycle) -> bool {
        let ready = match (self.current.as_ref().map(|e| e.state), self.bank_ready_at) {
            (Some(EntryState::CmdWait), Some(ready)) => ready <= now,
            _ => false,
        };
        if ready {
            self.current.as_mut().unwrap().state = EntryState::Cmd;
            self.bank_ready_at = None;
            self.last_command_timestamp = now;
        }
        ready
    }

    /// True when this bank's column access has completed and it is
    /// waiting for the channel data scheduler to grant it the bus.
    #[inline]
    pub fn awaiting_data_bus(&self, now: Cycle) -> bool {
        matches!(self.current.as_ref().map(|e| e.state), Some(EntryState::Data))
            && self.data_avail_at.map(|t| t <= now).unwrap_or(false)
    }

    /// Grant the data bus: record the release cycle computed by the channel
    /// scheduler and move into `DataWait`.
    pub fn grant_data_bus(&mut self, release_cycle: Cycle) {
        let entry = self.current.as_mut().expect("grant_data_bus on idle bank");
        entry.state = EntryState::DataWait;
        self.data_ready_at = Some(release_cycle);
        self.data_avail_at = None;
    }

    /// True when this bank's data has arrived and completion/merge
    /// processing (§4.8) should run.
    #[inline]
    pub fn awaiting_completion(&self, now: Cycle) -> bool {
        matches!(self.current.as_ref().map(|e| e.state), Some(EntryState::DataWait))
            && self.data_ready_at.map(|t| t <= now).unwrap_or(false)
    }

    /// Reset the bank's `current` slot after successful completion,
    /// returning the freed entry to the caller for any final bookkeeping
    /// (e.g. latency sampling) and incrementing the free count.
    pub fn complete_current(&mut self) -> Entry {
        self.data_ready_at = None;
        self.free_count += 1;
        self.current.take().expect("complete_current on idle bank")
    }

    /// Addresses identical to `address` among pending entries, oldest
    /// first, without removing them (used to scan merge candidates before
    /// committing to removing any of them - §4.8's atomic-merge redesign).
    pub fn pending_matching_indices(&self, address: u64) -> Vec<usize> {
        self.pending
            .iter()
            .enumerate()
            .filter(|(_, e)| e.address == address)
            .map(|(i, _)| i)
            .collect()
    }

    /// Remove the pending entries at `indices` (which must be sorted
    /// ascending) and return them in the same order. Removal happens from
    /// the highest index down so that removing one entry never shifts the
    /// position of another index still to be removed.
    pub fn take_pending(&mut self, indices: &[usize]) -> Vec<Entry> {
        let mut removed: Vec<Entry> = indices.iter().rev().map(|&i| self.remove_pending(i)).collect();
        removed.reverse();
        removed
    }
}
