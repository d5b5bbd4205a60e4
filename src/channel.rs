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

    channel.rs

    A DRAM channel: the shared data bus arbitrated across its banks, and
    the command/data scheduling passes described in §4.5 and §4.6. At most
    one command and one data-bus acquisition is issued per channel per
    cycle, except that a data-bus grant for a sub-bus-width transfer can
    leave the bus free again in the same cycle, matching real DDR burst
    behavior.
*/

use crate::{bank::Bank, clock::ClockDomains, entry::Cycle};

#[derive(Debug, Clone)]
pub struct Channel {
    pub id: usize,
    pub bus_free_at: Cycle,
    pub bytes_available: u32,
    effective_bus_width: u32,
}

impl Channel {
    pub fn new(id: usize, bus_width: usize, ddr_factor: usize) -> Self {
        let effective_bus_width = (bus_width * ddr_factor) as u32;
        Channel {
            id,
            bus_free_at: 0,
            bytes_available: effective_bus_width,
            effective_bus_width,
        }
    }

    /// §4.5: among `banks` (this channel's banks) awaiting a command,
    /// choose the oldest waiter, ties broken by ascending bank index.
    /// Returns an index into `banks`, not a global bank id.
    pub fn select_command_bank(&self, banks: &[Bank]) -> Option<usize> {
        banks
            .iter()
            .enumerate()
            .filter(|(_, b)| b.awaiting_command())
            .min_by_key(|(_, b)| b.last_command_timestamp)
            .map(|(i, _)| i)
    }

    /// §4.6 step 3's `acquire_data_bus`: compute how long `size` bytes
    /// occupies the bus starting at `now`, updating `bus_free_at` and the
    /// partial-cycle byte budget.
    fn acquire_data_bus(&mut self, size: u32, is_gpu: bool, now: Cycle, clocks: &ClockDomains) -> Cycle {
        let release_cycle = if size < self.bytes_available {
            self.bytes_available -= size;
            now
        } else {
            let remaining = size - self.bytes_available;
            let dram_cycles = remaining / self.effective_bus_width + 1;
            self.bytes_available = self.effective_bus_width - (remaining % self.effective_bus_width);
            now + clocks.dram_cycles_to_host(dram_cycles, is_gpu) as u64
        };
        self.bus_free_at = release_cycle;
        release_cycle
    }

    /// §4.6: while the bus is free, hand it to the oldest bank whose
    /// column access has completed. Loops within one tick since a
    /// sub-bus-width transfer can leave `bus_free_at == now`, allowing
    /// another grant in the same cycle. Returns the (local) indices of
    /// every bank granted the bus this tick, in grant order.
    pub fn run_data_scheduler(&mut self, banks: &mut [Bank], now: Cycle, clocks: &ClockDomains) -> Vec<usize> {
        let mut granted = Vec::new();
        while self.bus_free_at <= now {
            let next = banks
                .iter()
                .enumerate()
                .filter(|(_, b)| b.awaiting_data_bus(now))
                .min_by_key(|(_, b)| b.last_command_timestamp)
                .map(|(i, _)| i);

            let Some(i) = next else { break };
            let (size, is_gpu) = {
                let entry = banks[i].current.as_ref().expect("awaiting_data_bus implies current");
                (entry.size, entry.is_gpu)
            };
            let release_cycle = self.acquire_data_bus(size, is_gpu, now, clocks);
            banks[i].grant_data_bus(release_cycle);
            granted.push(i);
        }
        granted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{entry::Entry, request::RequestKind};

    fn idle_data_bank(id: usize, capacity: usize, size: u32, last_cmd: u64, data_avail: u64) -> Bank {
        let mut bank = Bank::new(id, capacity);
        let mut e = Entry::new(1, 1, 0, id, 0, 0, 0, 0, 0, false, RequestKind::Dfetch, size, 0);
        e.state = crate::entry::EntryState::Data;
        bank.current = Some(e);
        bank.data_avail_at = Some(data_avail);
        bank.last_command_timestamp = last_cmd;
        bank
    }

    #[test]
    fn command_scheduler_picks_oldest_waiter() {
        let mut bank_a = Bank::new(0, 4);
        let mut bank_b = Bank::new(1, 4);
        let mut ea = Entry::new(1, 1, 0, 0, 0, 0, 0, 0, 0, false, RequestKind::Dfetch, 64, 0);
        ea.state = crate::entry::EntryState::Cmd;
        bank_a.current = Some(ea);
        bank_a.last_command_timestamp = 5;
        let mut eb = Entry::new(2, 2, 0, 1, 0, 0, 0, 0, 0, false, RequestKind::Dfetch, 64, 0);
        eb.state = crate::entry::EntryState::Cmd;
        bank_b.current = Some(eb);
        bank_b.last_command_timestamp = 2;

        let channel = Channel::new(0, 8, 2);
        let banks = vec![bank_a, bank_b];
        assert_eq!(channel.select_command_bank(&banks), Some(1));
    }

    #[test]
    fn command_scheduler_breaks_ties_by_bank_index() {
        let mut bank_a = Bank::new(0, 4);
        let mut bank_b = Bank::new(1, 4);
        for (bank, id) in [(&mut bank_a, 1u64), (&mut bank_b, 2u64)] {
            let mut e = Entry::new(id, id as u32, 0, 0, 0, 0, 0, 0, 0, false, RequestKind::Dfetch, 64, 0);
            e.state = crate::entry::EntryState::Cmd;
            bank.current = Some(e);
            bank.last_command_timestamp = 9;
        }
        let channel = Channel::new(0, 8, 2);
        let banks = vec![bank_a, bank_b];
        assert_eq!(channel.select_command_bank(&banks), Some(0));
    }

    #[test]
    fn small_transfer_completes_same_cycle_and_leaves_bus_partially_free() {
        let cfg = crate::config::MemCtrlConfig::default();
        let clocks = ClockDomains::new(&cfg);
        let mut channel = Channel::new(0, 8, 1); // effective width 8 bytes/dram-cycle
        let mut banks = vec![idle_data_bank(0, 4, 4, 0, 0)];
        let granted = channel.run_data_scheduler(&mut banks, 0, &clocks);
        assert_eq!(granted, vec![0]);
        assert_eq!(banks[0].data_ready_at, Some(0));
        assert_eq!(channel.bytes_available, 4);
    }

    #[test]
    fn large_transfer_spans_multiple_dram_cycles() {
        let cfg = crate::config::MemCtrlConfig::default();
        let clocks = ClockDomains::new(&cfg);
        let mut channel = Channel::new(0, 8, 1);
        let mut banks = vec![idle_data_bank(0, 4, 64, 0, 0)];
        let granted = channel.run_data_scheduler(&mut banks, 0, &clocks);
        assert_eq!(granted, vec![0]);
        // 64 bytes over an 8-byte bus: floor((64-8)/8)+1 = 8 dram cycles.
        let ready = banks[0].data_ready_at.unwrap();
        assert!(ready > 0);
    }

    #[test]
    fn only_one_bank_granted_the_bus_when_transfer_spans_cycles() {
        let cfg = crate::config::MemCtrlConfig::default();
        let clocks = ClockDomains::new(&cfg);
        let mut channel = Channel::new(0, 8, 1);
        let mut banks = vec![idle_data_bank(0, 4, 64, 0, 0), idle_data_bank(1, 4, 64, 1, 0)];
        let granted = channel.run_data_scheduler(&mut banks, 0, &clocks);
        assert_eq!(granted.len(), 1);
    }
}
