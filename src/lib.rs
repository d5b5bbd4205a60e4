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

    --------------------------------------------------------------------------

    lib.rs

    A cycle-accurate DRAM memory-controller model: address decoding,
    per-bank request buffers, the bank and channel command/data schedulers,
    FCFS/FR-FCFS request ordering, completion merging, and the starvation
    watchdog. Built to be driven one `run_a_cycle` call per host CPU cycle
    from inside a larger heterogeneous CPU+GPU architectural simulator.
*/

#![allow(dead_code)]

pub mod bank;
pub mod channel;
pub mod clock;
pub mod config;
pub mod controller;
pub mod decoder;
pub mod entry;
pub mod error;
pub mod noc;
pub mod request;
pub mod scheduler;
pub mod stats;
pub mod tracelogger;

pub use config::MemCtrlConfig;
pub use controller::MemController;
pub use error::MemCtrlError;
