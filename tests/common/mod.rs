//! Shared fakes for the black-box integration tests: a slab-backed request
//! pool and a configurable NoC, standing in for the host simulator's real
//! collaborators per the controller's external-interface boundary.

use std::collections::{HashMap, VecDeque};

use dram_ctrl_sim::noc::{DestinationLookup, FillMessage, MemLevel, NocPort};
use dram_ctrl_sim::request::{LifecycleState, ReqHandle, RequestKind, RequestMeta, RequestPool, CACHE_LEVELS};

pub struct FakePool {
    next_handle: ReqHandle,
    meta: HashMap<ReqHandle, RequestMeta>,
    pub lifecycle: HashMap<ReqHandle, LifecycleState>,
    pub freed: Vec<ReqHandle>,
}

impl FakePool {
    pub fn new() -> Self {
        FakePool { next_handle: 0, meta: HashMap::new(), lifecycle: HashMap::new(), freed: Vec::new() }
    }

    pub fn alloc(&mut self, address: u64, kind: RequestKind, size: u32) -> ReqHandle {
        self.alloc_gpu(address, kind, size, false)
    }

    pub fn alloc_gpu(&mut self, address: u64, kind: RequestKind, size: u32, is_gpu: bool) -> ReqHandle {
        let handle = self.next_handle;
        self.next_handle += 1;
        self.meta.insert(
            handle,
            RequestMeta {
                address,
                size,
                kind,
                source_core_id: 0,
                thread_id: 0,
                app_id: 0,
                is_gpu,
                cache_ids: [0; CACHE_LEVELS],
            },
        );
        handle
    }
}

impl RequestPool for FakePool {
    fn meta(&self, handle: ReqHandle) -> RequestMeta {
        self.meta[&handle]
    }

    fn set_lifecycle(&mut self, handle: ReqHandle, state: LifecycleState) {
        self.lifecycle.insert(handle, state);
    }

    fn free(&mut self, handle: ReqHandle) {
        self.freed.push(handle);
    }
}

/// A NoC that accepts up to `accept_budget` fills (or unlimited, if `None`)
/// before refusing everything afterward, recording every accepted message.
pub struct FakeNoc {
    pub accept_budget: Option<usize>,
    pub accepted: VecDeque<FillMessage>,
}

impl FakeNoc {
    pub fn always_accepting() -> Self {
        FakeNoc { accept_budget: None, accepted: VecDeque::new() }
    }

    pub fn always_refusing() -> Self {
        FakeNoc { accept_budget: Some(0), accepted: VecDeque::new() }
    }
}

impl NocPort for FakeNoc {
    fn insert(&mut self, msg: FillMessage) -> bool {
        match &mut self.accept_budget {
            None => {
                self.accepted.push_back(msg);
                true
            }
            Some(0) => false,
            Some(n) => {
                *n -= 1;
                self.accepted.push_back(msg);
                true
            }
        }
    }
}

pub struct FakeMemoryMap;

impl DestinationLookup for FakeMemoryMap {
    fn get_dst_id(&self, _level: MemLevel, cache_id: u32) -> u32 {
        cache_id
    }
}
