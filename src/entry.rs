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

    entry.rs

    The DRAM request buffer (DRB) entry: the controller's own bookkeeping
    record for one pending request, plus the bank-local state machine it
    rides through (§3, §4.4).
*/

use crate::request::{LifecycleState, ReqHandle, RequestKind};

pub type Cycle = u64;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EntryState {
    Init,
    Cmd,
    CmdWait,
    Data,
    DataWait,
}

/// A populated DRB entry. Freed entries are represented by simply not
/// existing in the pending list or current slot; see [`crate::bank::Bank`]
/// for the free-list/pending-list split (invariant 1, §3).
#[derive(Debug, Clone)]
pub struct Entry {
    pub id: u64,
    pub state: EntryState,
    pub handle: ReqHandle,
    pub address: u64,
    pub bank_id: usize,
    pub row_id: u64,
    pub column_id: u64,
    pub core_id: u32,
    pub thread_id: u32,
    pub app_id: u32,
    pub is_gpu: bool,
    pub kind: RequestKind,
    pub is_read: bool,
    pub priority: i32,
    pub size: u32,
    pub insert_timestamp: Cycle,
    pub scheduled_timestamp: Option<Cycle>,
}

impl Entry {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: u64,
        handle: ReqHandle,
        address: u64,
        bank_id: usize,
        row_id: u64,
        column_id: u64,
        core_id: u32,
        thread_id: u32,
        app_id: u32,
        is_gpu: bool,
        kind: RequestKind,
        size: u32,
        now: Cycle,
    ) -> Self {
        Entry {
            id,
            state: EntryState::Init,
            handle,
            address,
            bank_id,
            row_id,
            column_id,
            core_id,
            thread_id,
            app_id,
            is_gpu,
            kind,
            is_read: kind.is_read(),
            priority: 0,
            size,
            insert_timestamp: now,
            scheduled_timestamp: None,
        }
    }

    #[inline]
    pub fn lifecycle_state(&self) -> LifecycleState {
        match self.state {
            EntryState::Init => LifecycleState::DramStart,
            EntryState::Cmd | EntryState::CmdWait => LifecycleState::DramCmd,
            EntryState::Data | EntryState::DataWait => LifecycleState::DramData,
        }
    }
}
