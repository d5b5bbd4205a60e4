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

    noc.rs

    The minimal collaborator interfaces the controller needs from the rest
    of the simulator (§1, §6): the interconnect that sinks completed fills
    and sources new requests, and the destination lookup the controller
    uses to address a fill at the originating L3 slice. Both are passed in
    at construction rather than reached for through a global context
    pointer (§9's dependency-injection redesign).
*/

use crate::request::ReqHandle;

/// A fill (or writeback-ack) message handed to the interconnect. The NoC
/// owns routing from here on; the controller only knows source/destination
/// node ids and which request it corresponds to.
#[derive(Debug, Copy, Clone)]
pub struct FillMessage {
    pub src: u32,
    pub dst: u32,
    pub handle: ReqHandle,
}

/// The interconnect fabric between memory controllers and caches. `insert`
/// is non-blocking: it either accepts the message immediately or refuses,
/// in which case the controller retries on a later tick (§4.8, §5).
pub trait NocPort {
    fn insert(&mut self, msg: FillMessage) -> bool;
}

/// Cache level tag used by [`DestinationLookup::get_dst_id`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MemLevel {
    L3,
}

/// Resolves a requester's cache id at a given level to the NoC node id that
/// should receive its fill. Owned by the memory hierarchy, not by this
/// controller (§1).
pub trait DestinationLookup {
    fn get_dst_id(&self, level: MemLevel, cache_id: u32) -> u32;
}
