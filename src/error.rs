//! Error types for the machine and the assembler. Every machine error is fatal: the step that
//! produced it leaves the machine `Illegal` and the driver decides how to terminate.

use strum_macros::Display as StrumDisplay;
use thiserror::Error;

use crate::bytecode::Operation;

/// The byte arena an out-of-bounds access was aimed at.
#[derive(StrumDisplay, Clone, Copy, Eq, PartialEq, Debug, Hash)]
pub enum Region {
  Instructions,
  Stack,
  Memory,
  DeviceWindow,
}

#[derive(Error, Clone, Eq, PartialEq, Debug)]
pub enum VmError {
  #[error("invalid value descriptor 0x{byte:02x}")]
  InvalidDescriptor { byte: u8 },

  #[error("invalid instruction at pc {pc}: {reason}")]
  InvalidInstruction { pc: u64, reason: &'static str },

  #[error("out of bounds: {length} byte(s) at address {address} in {region}")]
  OutOfBounds { region: Region, address: u64, length: u64 },

  #[error("bytecode size {size} exceeds the permitted limit of {capacity} bytes")]
  BytecodeTooLarge { size: usize, capacity: usize },

  #[error("negative shift count at pc {pc}")]
  NegativeShiftCount { pc: u64 },

  #[error("instruction {operation} at pc {pc} is not implemented")]
  UnimplementedInstruction { pc: u64, operation: Operation },

  #[error("invalid machine configuration: {0}")]
  InvalidConfig(&'static str),
}

/// An assembler failure, with the 1-based line it occurred on.
#[derive(Error, Clone, Eq, PartialEq, Debug)]
#[error("line {line}: {message}")]
pub struct AssemblyError {
  pub line: usize,
  pub message: String,
}

/// A failure while running a program against a host sink: either the machine stopped with an
/// error, or the device string could not be written out.
#[derive(Error, Debug)]
pub enum RunError {
  #[error(transparent)]
  Machine(#[from] VmError),

  #[error("could not write the device string: {0}")]
  Output(#[from] std::io::Error),
}

pub type VmResult<T> = Result<T, VmError>;
