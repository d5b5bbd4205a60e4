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

    scheduler.rs

    The per-bank request-selection policy (§4.9). The source swaps FCFS for
    FR-FCFS through class inheritance; here the policy is a small tagged
    enum with a manual match-based `select`, in the same style as the
    teacher's `VideoCardDispatch` enum dispatch (`bus::dispatch`) rather
    than a boxed trait object - there are exactly two variants and neither
    carries per-instance state.
*/

use std::collections::VecDeque;

use serde_derive::Deserialize;

use crate::entry::Entry;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerKind {
    Fcfs,
    FrFcfs,
}

impl SchedulerKind {
    /// Choose the index within `pending` to promote next, given the bank's
    /// currently open row (or `None` if no row is open). Returns `None`
    /// only if `pending` is empty.
    pub fn select(self, pending: &VecDeque<Entry>, open_row: Option<u64>) -> Option<usize> {
        match self {
            SchedulerKind::Fcfs => {
                if pending.is_empty() {
                    None
                } else {
                    Some(0)
                }
            }
            SchedulerKind::FrFcfs => Self::select_fr_fcfs(pending, open_row),
        }
    }

    /// §4.9's three-way comparator, applied via a stable sort of indices so
    /// ties preserve arrival order without needing to move the entries
    /// themselves.
    fn select_fr_fcfs(pending: &VecDeque<Entry>, open_row: Option<u64>) -> Option<usize> {
        if pending.is_empty() {
            return None;
        }
        let mut order: Vec<usize> = (0..pending.len()).collect();
        order.sort_by(|&a, &b| Self::rank(&pending[a], open_row).cmp(&Self::rank(&pending[b], open_row)));
        order.into_iter().next()
    }

    /// Lower rank sorts first. Encodes, in order: non-prefetch before
    /// prefetch, row-buffer hit before miss, then arrival order (folded
    /// into the stable sort rather than the key, since `insert_timestamp`
    /// ties are already broken by original position under a stable sort).
    /// The "prefetch" rule is scoped to `Dprf` specifically (§4.9: "type ≠
    /// DPRF"), matching `is_flushable_prefetch` rather than the broader
    /// `is_prefetch` predicate the software-prefetch family also satisfies.
    #[inline]
    fn rank(entry: &Entry, open_row: Option<u64>) -> (u8, u8) {
        let prefetch_rank = u8::from(entry.kind.is_flushable_prefetch());
        let is_hit = open_row == Some(entry.row_id);
        let hit_rank = u8::from(!is_hit);
        (prefetch_rank, hit_rank)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::RequestKind;

    fn entry_at(id: u64, row: u64, ts: u64, kind: RequestKind) -> Entry {
        crate::entry::Entry::new(id, id as u32, 0, 0, row, 0, 0, 0, 0, false, kind, 64, ts)
    }

    #[test]
    fn fcfs_always_picks_the_front() {
        let mut pending = VecDeque::new();
        pending.push_back(entry_at(1, 5, 1, RequestKind::Dfetch));
        pending.push_back(entry_at(2, 9, 2, RequestKind::Dfetch));
        assert_eq!(SchedulerKind::Fcfs.select(&pending, Some(9)), Some(0));
    }

    #[test]
    fn fr_fcfs_prefers_row_buffer_hit_over_older_miss() {
        let mut pending = VecDeque::new();
        pending.push_back(entry_at(1, 7, 1, RequestKind::Dfetch)); // row miss, older
        pending.push_back(entry_at(2, 9, 2, RequestKind::Dfetch)); // row hit, younger
        let selected = SchedulerKind::FrFcfs.select(&pending, Some(9)).unwrap();
        assert_eq!(pending[selected].id, 2);
    }

    #[test]
    fn fr_fcfs_prefers_demand_over_prefetch_even_if_older() {
        let mut pending = VecDeque::new();
        pending.push_back(entry_at(1, 9, 1, RequestKind::Dprf)); // hit, but prefetch
        pending.push_back(entry_at(2, 7, 2, RequestKind::Dfetch)); // miss, demand
        let selected = SchedulerKind::FrFcfs.select(&pending, Some(9)).unwrap();
        assert_eq!(pending[selected].id, 2);
    }

    #[test]
    fn fr_fcfs_breaks_remaining_ties_by_arrival_order() {
        let mut pending = VecDeque::new();
        pending.push_back(entry_at(1, 3, 1, RequestKind::Dfetch));
        pending.push_back(entry_at(2, 4, 2, RequestKind::Dfetch));
        // Neither is a row-buffer hit (open_row is None); stable sort keeps
        // arrival order since both share rank (0, 1).
        let selected = SchedulerKind::FrFcfs.select(&pending, None).unwrap();
        assert_eq!(pending[selected].id, 1);
    }
}
