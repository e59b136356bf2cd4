//! The register file and machine status.

use strum_macros::Display as StrumDisplay;

/// Program counter, frame pointer, and stack pointer. `pc` indexes the instruction store; `fp` and
/// `sp` both index the stack.
#[derive(Clone, Copy, Default, Eq, PartialEq, Debug)]
pub struct Registers {
  pub pc : u64,
  pub fp : u64,
  pub sp : u64,
}

#[derive(StrumDisplay, Clone, Copy, Eq, PartialEq, Debug, Hash)]
pub enum Status {
  Running,
  Halted,
  /// Stopped at an ECALL, waiting for the host to service it and resume.
  Trapped,
  /// Stopped by a fatal error. Never leaves this state.
  Illegal,
}
