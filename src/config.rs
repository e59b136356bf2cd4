//! Sizes of the machine's fixed arenas and the placement of the device window.
//!
//! Nothing here changes after `Machine::new`. The defaults reproduce the classic layout: 4 KiB of
//! instructions, 4 KiB of stack, and 8 KiB of general memory whose upper half is the device window,
//! i.e. the addresses `0x1000..0x2000` whose bits 12-15 equal the device tag `0x1`.

use crate::error::{VmError, VmResult};

pub const DEFAULT_CODE_CAPACITY     : usize = 0x1000;
pub const DEFAULT_STACK_CAPACITY    : usize = 0x1000;
pub const DEFAULT_MEMORY_CAPACITY   : usize = 0x2000;
pub const DEFAULT_DEVICE_WINDOW_BASE: u64   = 0x1000;
pub const DEFAULT_DEVICE_WINDOW_SIZE: u64   = 0x1000;

#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub struct MachineConfig {
  pub code_capacity      : usize,
  pub stack_capacity     : usize,
  pub memory_capacity    : usize,
  pub device_window_base : u64,
  pub device_window_size : u64,
}

impl Default for MachineConfig {
  fn default() -> Self {
    MachineConfig {
      code_capacity      : DEFAULT_CODE_CAPACITY,
      stack_capacity     : DEFAULT_STACK_CAPACITY,
      memory_capacity    : DEFAULT_MEMORY_CAPACITY,
      device_window_base : DEFAULT_DEVICE_WINDOW_BASE,
      device_window_size : DEFAULT_DEVICE_WINDOW_SIZE,
    }
  }
}

impl MachineConfig {

  /// Checks that every arena is non-empty and that the device window lies inside memory.
  pub fn validate(&self) -> VmResult<()> {
    if self.code_capacity == 0 || self.stack_capacity == 0 || self.memory_capacity == 0 {
      return Err(VmError::InvalidConfig("arena capacities must be non-zero"));
    }
    if self.device_window_size == 0 {
      return Err(VmError::InvalidConfig("device window must be non-empty"));
    }
    let end = self.device_window_base.checked_add(self.device_window_size);
    match end {
      Some(end) if end <= self.memory_capacity as u64 => Ok(()),
      _ => Err(VmError::InvalidConfig("device window must lie inside general memory"))
    }
  }

}
