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

    error.rs

    Defines the error type returned by fallible, recoverable operations on
    the memory controller (construction-time configuration checks). Fatal
    implementation-bug-class failures are asserted instead; see §7 of the
    design notes for the split.
*/

use std::{error::Error, fmt, fmt::Display};

#[derive(Debug, Clone, PartialEq)]
pub enum MemCtrlError {
    /// `num_banks` is not evenly divisible by `num_channels`.
    BankChannelMismatch { num_banks: usize, num_channels: usize },
    /// A latency or sizing knob was zero or otherwise nonsensical.
    InvalidConfig(String),
    /// `rowbuffer_size` or `bus_width` was not a power of two.
    NotPowerOfTwo { field: &'static str, value: usize },
}

impl Error for MemCtrlError {}

impl Display for MemCtrlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemCtrlError::BankChannelMismatch { num_banks, num_channels } => write!(
                f,
                "num_banks ({}) is not evenly divisible by num_channels ({})",
                num_banks, num_channels
            ),
            MemCtrlError::InvalidConfig(msg) => write!(f, "invalid memory controller configuration: {}", msg),
            MemCtrlError::NotPowerOfTwo { field, value } => {
                write!(f, "{} must be a power of two, got {}", field, value)
            }
        }
    }
}
