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

    config.rs

    The static configuration knobs read at controller construction. Loadable
    from a TOML fragment, or built programmatically via `MemCtrlConfig::default()`.
*/

use serde_derive::Deserialize;

use crate::{error::MemCtrlError, scheduler::SchedulerKind};

/// Static, construction-time configuration for a [`crate::controller::MemController`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MemCtrlConfig {
    pub num_banks: usize,
    pub num_channels: usize,
    pub buffer_size: usize,
    pub bus_width: usize,
    pub ddr_factor: usize,
    pub rowbuffer_size: usize,
    pub precharge_cycles: u32,
    pub activate_cycles: u32,
    pub column_cycles: u32,
    pub cpu_frequency_mhz: f64,
    pub gpu_frequency_mhz: f64,
    pub dram_frequency_mhz: f64,
    pub l3_line_size: usize,
    pub bank_xor_index: bool,
    pub merge_requests: bool,
    pub scheduler: SchedulerKind,
    pub starvation_limit: u64,
}

impl Default for MemCtrlConfig {
    fn default() -> Self {
        // A modest multi-bank, single-channel configuration; the end-to-end
        // scenario tests override num_banks/num_channels/buffer_size down to
        // the one-bank reference setup they need (activate=10, column=5,
        // precharge=10, bus width=8, line size=64).
        MemCtrlConfig {
            num_banks: 8,
            num_channels: 1,
            buffer_size: 16,
            bus_width: 8,
            ddr_factor: 2,
            rowbuffer_size: 2048,
            precharge_cycles: 10,
            activate_cycles: 10,
            column_cycles: 5,
            cpu_frequency_mhz: 2000.0,
            gpu_frequency_mhz: 1000.0,
            dram_frequency_mhz: 800.0,
            l3_line_size: 64,
            bank_xor_index: false,
            merge_requests: true,
            scheduler: SchedulerKind::FrFcfs,
            starvation_limit: 5000,
        }
    }
}

impl MemCtrlConfig {
    /// Parse a configuration from a TOML fragment such as the one found in
    /// a host simulator's machine configuration file. Unset fields fall back
    /// to [`MemCtrlConfig::default`].
    pub fn from_toml_str(s: &str) -> Result<Self, MemCtrlError> {
        toml::from_str(s).map_err(|e| MemCtrlError::InvalidConfig(e.to_string()))
    }

    /// Validate the configuration-violation error class from the design's
    /// error taxonomy. Called once by the controller constructor.
    pub fn validate(&self) -> Result<(), MemCtrlError> {
        if self.num_channels == 0 || self.num_banks % self.num_channels != 0 {
            return Err(MemCtrlError::BankChannelMismatch {
                num_banks: self.num_banks,
                num_channels: self.num_channels,
            });
        }
        if !self.rowbuffer_size.is_power_of_two() {
            return Err(MemCtrlError::NotPowerOfTwo {
                field: "rowbuffer_size",
                value: self.rowbuffer_size,
            });
        }
        if !self.bus_width.is_power_of_two() {
            return Err(MemCtrlError::NotPowerOfTwo {
                field: "bus_width",
                value: self.bus_width,
            });
        }
        if self.buffer_size == 0 {
            return Err(MemCtrlError::InvalidConfig("buffer_size must be nonzero".into()));
        }
        if self.starvation_limit == 0 {
            return Err(MemCtrlError::InvalidConfig("starvation_limit must be nonzero".into()));
        }
        Ok(())
    }

    #[inline]
    pub fn banks_per_channel(&self) -> usize {
        self.num_banks / self.num_channels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(MemCtrlConfig::default().validate().is_ok());
    }

    #[test]
    fn mismatched_banks_rejected() {
        let mut cfg = MemCtrlConfig::default();
        cfg.num_banks = 7;
        cfg.num_channels = 2;
        assert!(matches!(cfg.validate(), Err(MemCtrlError::BankChannelMismatch { .. })));
    }

    #[test]
    fn non_power_of_two_rowbuffer_rejected() {
        let mut cfg = MemCtrlConfig::default();
        cfg.rowbuffer_size = 3000;
        assert!(matches!(cfg.validate(), Err(MemCtrlError::NotPowerOfTwo { .. })));
    }

    #[test]
    fn parses_partial_toml_with_defaults() {
        let cfg = MemCtrlConfig::from_toml_str("num_banks = 4\nnum_channels = 2\n").unwrap();
        assert_eq!(cfg.num_banks, 4);
        assert_eq!(cfg.num_channels, 2);
        assert_eq!(cfg.buffer_size, MemCtrlConfig::default().buffer_size);
    }
}
