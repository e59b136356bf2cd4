/*!
  A small stack-based bytecode virtual machine. Programs are flat byte images of variable-length
  instructions whose operands are typed by one-byte descriptors. Values live on a byte-addressed
  stack; a frame pointer gives indirect operands a base, and a device window in general memory
  carries NUL-terminated strings out to the host through environment calls.
*/

#[macro_use] extern crate prettytable;
#[macro_use] extern crate lazy_static;

pub mod bytecode;
pub mod config;
pub mod error;
pub mod memory;
pub mod registers;
pub mod vm;

pub use bytecode::{Descriptor, Instruction, Operation};
pub use config::MachineConfig;
pub use error::{AssemblyError, Region, RunError, VmError, VmResult};
pub use registers::{Registers, Status};
pub use vm::{Frame, Machine};
