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

    request.rs

    Types describing the external request pool's view of an in-flight memory
    access. The controller never owns a `Request`; it only reads a snapshot
    of its fields at ingress and, afterward, addresses it by an opaque
    `ReqHandle` through the `RequestPool` collaborator trait.
*/

use strum_macros::{Display, EnumIs};

/// Number of cache levels a request's origin is recorded for (L1/L2/L3).
pub const CACHE_LEVELS: usize = 3;

/// Opaque handle into the external request pool. The controller treats this
/// as inert bits; only the pool knows how to resolve it back to storage.
pub type ReqHandle = u32;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Display, EnumIs)]
pub enum RequestKind {
    Ifetch,
    Dfetch,
    Dstore,
    Iprf,
    Dprf,
    Wb,
    SwDprf,
    SwDprfNta,
    SwDprfT0,
    SwDprfT1,
    SwDprfT2,
}

impl RequestKind {
    /// All request kinds are reads except writebacks (§3).
    #[inline]
    pub fn is_read(self) -> bool {
        !matches!(self, RequestKind::Wb)
    }

    /// True for the software-prefetch family and the hardware data prefetch:
    /// the broader notion of "speculative load with no architectural
    /// requirement to complete". Neither of the two rules the spec actually
    /// names a prefetch predicate for — buffer-full flush (§4.3) and the
    /// FR-FCFS ranking (§4.9) — use this; both name `DPRF` specifically, so
    /// both call [`RequestKind::is_flushable_prefetch`] instead. This is the
    /// wider classification for callers that do need it.
    #[inline]
    pub fn is_prefetch(self) -> bool {
        matches!(
            self,
            RequestKind::Dprf
                | RequestKind::SwDprf
                | RequestKind::SwDprfNta
                | RequestKind::SwDprfT0
                | RequestKind::SwDprfT1
                | RequestKind::SwDprfT2
        )
    }

    /// `type == DPRF` exactly (§4.3's flush-on-full condition and §4.9's
    /// FR-FCFS "non-prefetch outranks prefetch" rule both name this type
    /// specifically, not the broader software-prefetch family).
    #[inline]
    pub fn is_flushable_prefetch(self) -> bool {
        matches!(self, RequestKind::Dprf)
    }
}

/// Lifecycle tag mutated on the external request as it moves through the
/// controller. The controller is the sole writer of this field.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Display)]
pub enum LifecycleState {
    DramStart,
    DramCmd,
    DramData,
    DramDone,
}

/// A read-only snapshot of the fields the controller needs out of an
/// external `Request`, taken once at ingress (§4.3) and cached in the
/// [`crate::entry::Entry`] for the remainder of the request's time in the
/// controller.
#[derive(Debug, Copy, Clone)]
pub struct RequestMeta {
    pub address: u64,
    pub size: u32,
    pub kind: RequestKind,
    pub source_core_id: u32,
    pub thread_id: u32,
    pub app_id: u32,
    pub is_gpu: bool,
    pub cache_ids: [u32; CACHE_LEVELS],
}

/// The external collaborator that owns `Request` storage. The controller
/// never allocates or frees a request itself (§1, §6); it only reads a
/// snapshot via [`RequestPool::meta`], advances the lifecycle tag, and
/// eventually calls [`RequestPool::free`] once the request is fully retired
/// from the controller's point of view (a writeback) or handed to the NoC
/// (a fill).
pub trait RequestPool {
    fn meta(&self, handle: ReqHandle) -> RequestMeta;
    fn set_lifecycle(&mut self, handle: ReqHandle, state: LifecycleState);
    fn free(&mut self, handle: ReqHandle);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writeback_is_not_a_read() {
        assert!(!RequestKind::Wb.is_read());
        assert!(RequestKind::Dfetch.is_read());
        assert!(RequestKind::Ifetch.is_read());
    }

    #[test]
    fn only_dprf_is_flushable() {
        assert!(RequestKind::Dprf.is_flushable_prefetch());
        assert!(!RequestKind::SwDprf.is_flushable_prefetch());
        assert!(!RequestKind::Dfetch.is_flushable_prefetch());
    }
}
