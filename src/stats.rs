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

    stats.rs

    The statistics sink the controller emits named counters and samples
    through. Ownership of an actual stats table lives with the host
    simulator (§1); the controller only needs somewhere to call out to.
*/

pub const TOTAL_DRAM: &str = "TOTAL_DRAM";
pub const TOTAL_DRAM_MERGE: &str = "TOTAL_DRAM_MERGE";
pub const DRAM_ACTIVATE: &str = "DRAM_ACTIVATE";
pub const DRAM_COLUMN: &str = "DRAM_COLUMN";
pub const DRAM_PRECHARGE: &str = "DRAM_PRECHARGE";
pub const DRAM_AVG_LATENCY: &str = "DRAM_AVG_LATENCY";
pub const BANDWIDTH_TOT: &str = "BANDWIDTH_TOT";
pub const POWER_MC_R: &str = "POWER_MC_R";
pub const POWER_MC_W: &str = "POWER_MC_W";

pub fn dbus_idle_stat(channel: usize) -> String {
    format!("DRAM_CHANNEL_{}_DBUS_IDLE", channel)
}

pub fn bandwidth_saturated_stat(channel: usize) -> String {
    format!("DRAM_CHANNEL_{}_BANDWIDTH_SATURATED", channel)
}

/// Single-writer-per-counter statistics sink (§5). The controller never
/// reads these back; it is purely an outbound call site.
pub trait StatSink {
    fn record_event(&mut self, name: &str);
    fn record_sample(&mut self, name: &str, value: f64);
}

/// The zero-cost default for production use, where the host simulator
/// supplies its own sink and has no interest in this controller keeping a
/// shadow copy.
#[derive(Debug, Default)]
pub struct NullStats;

impl StatSink for NullStats {
    fn record_event(&mut self, _name: &str) {}
    fn record_sample(&mut self, _name: &str, _value: f64) {}
}

/// A `StatSink` that records every event count and sample average, used by
/// the test suite to assert on emitted statistics (§8's merge-correctness
/// and latency-lower-bound properties).
#[derive(Debug, Default)]
pub struct CountingStats {
    pub events: fxhash::FxHashMap<String, u64>,
    pub samples: fxhash::FxHashMap<String, Vec<f64>>,
}

impl StatSink for CountingStats {
    fn record_event(&mut self, name: &str) {
        *self.events.entry(name.to_string()).or_insert(0) += 1;
    }

    fn record_sample(&mut self, name: &str, value: f64) {
        self.samples.entry(name.to_string()).or_default().push(value);
    }
}

impl CountingStats {
    pub fn count(&self, name: &str) -> u64 {
        self.events.get(name).copied().unwrap_or(0)
    }
}
