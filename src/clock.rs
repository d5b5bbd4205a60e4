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

    clock.rs

    Precomputes the CPU- and GPU-cycle equivalents of each DRAM-cycle
    latency parameter, once, at construction. A request's `is_gpu` flag
    selects which precomputed pair it pays.
*/

use crate::config::MemCtrlConfig;

/// A DRAM-cycle latency parameter pre-converted to both host clock domains.
#[derive(Debug, Copy, Clone, Default)]
pub struct DualLatency {
    pub cpu_cycles: u32,
    pub gpu_cycles: u32,
}

impl DualLatency {
    #[inline]
    pub fn for_request(self, is_gpu: bool) -> u32 {
        if is_gpu {
            self.gpu_cycles
        } else {
            self.cpu_cycles
        }
    }
}

/// The three clock domains (CPU, GPU, DRAM) and the derived conversion
/// factors and pre-scaled latencies used throughout command scheduling.
#[derive(Debug, Clone)]
pub struct ClockDomains {
    pub scale_cpu: f64,
    pub scale_gpu: f64,
    pub precharge: DualLatency,
    pub activate: DualLatency,
    pub column: DualLatency,
}

impl ClockDomains {
    pub fn new(cfg: &MemCtrlConfig) -> Self {
        let scale_cpu = cfg.cpu_frequency_mhz / cfg.dram_frequency_mhz;
        let scale_gpu = cfg.gpu_frequency_mhz / cfg.dram_frequency_mhz;

        let scale = |dram_cycles: u32| DualLatency {
            cpu_cycles: (dram_cycles as f64 * scale_cpu).round() as u32,
            gpu_cycles: (dram_cycles as f64 * scale_gpu).round() as u32,
        };

        ClockDomains {
            scale_cpu,
            scale_gpu,
            precharge: scale(cfg.precharge_cycles),
            activate: scale(cfg.activate_cycles),
            column: scale(cfg.column_cycles),
        }
    }

    /// Convert a count of whole DRAM cycles (e.g. a data-burst transfer
    /// time, §4.6) into host cycles for the appropriate clock domain,
    /// rounding up so a transfer never finishes early.
    #[inline]
    pub fn dram_cycles_to_host(&self, dram_cycles: u32, is_gpu: bool) -> u32 {
        let scale = if is_gpu { self.scale_gpu } else { self.scale_cpu };
        (dram_cycles as f64 * scale).ceil() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg_with(cpu: f64, gpu: f64, dram: f64) -> MemCtrlConfig {
        let mut cfg = MemCtrlConfig::default();
        cfg.cpu_frequency_mhz = cpu;
        cfg.gpu_frequency_mhz = gpu;
        cfg.dram_frequency_mhz = dram;
        cfg.activate_cycles = 10;
        cfg
    }

    #[test]
    fn equal_clocks_pass_latency_through_unscaled() {
        let clocks = ClockDomains::new(&cfg_with(800.0, 800.0, 800.0));
        assert_eq!(clocks.activate.cpu_cycles, 10);
        assert_eq!(clocks.activate.gpu_cycles, 10);
    }

    #[test]
    fn faster_host_clock_inflates_cycle_count() {
        let clocks = ClockDomains::new(&cfg_with(1600.0, 800.0, 800.0));
        assert_eq!(clocks.activate.cpu_cycles, 20);
        assert_eq!(clocks.activate.gpu_cycles, 10);
    }

    #[test]
    fn gpu_and_cpu_scales_are_independent() {
        let clocks = ClockDomains::new(&cfg_with(2000.0, 500.0, 1000.0));
        assert_eq!(clocks.scale_cpu, 2.0);
        assert_eq!(clocks.scale_gpu, 0.5);
    }
}
