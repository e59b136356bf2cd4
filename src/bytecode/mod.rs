/*!

  Bytecode is a flat sequence of variable-length instructions. Every instruction begins with a one
  byte opcode, followed by zero or more value descriptors (see `descriptor`) and then, for `PUSH`,
  a little-endian immediate of the descriptor's width, or, for `STORE_STRING`, a NUL-terminated
  byte literal:

    HALT, ECALL, CALL, JUMP                 [Opcode]
    RETURN, BRANCH, POP                     [Opcode][Descriptor]
    PUSH                                    [Opcode][Descriptor][Immediate:width]
    ASSIGN, CONVERT, arithmetic, comparison [Opcode][Descriptor][Descriptor]
    STORE_STRING                            [Opcode][Literal...][0]

  `RETURN`'s descriptor may be the byte 0, which means "no return value". There is no header and no
  relocation: jump and call offsets are relative to the address of the instruction that consumes
  them, and the program author computes them by hand (or with the assembler).

  Only the opcode is an enum; decoded operands live in `Instruction`.

*/

mod binary;
mod instruction;
pub mod assembly;
pub mod descriptor;

pub use binary::{decode_instruction, encode_instruction};
pub use descriptor::Descriptor;
pub use instruction::Instruction;

use strum_macros::{Display as StrumDisplay, EnumString, IntoStaticStr};
use num_enum::{TryFromPrimitive, IntoPrimitive};

/// Opcodes of the virtual machine. The byte values are part of the bytecode format.
#[derive(
StrumDisplay, IntoStaticStr, EnumString, TryFromPrimitive, IntoPrimitive,
Clone,        Copy,          Eq, PartialEq,  Debug,            Hash
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum Operation {
  // Machine control
  Halt        = 0x01,
  Ecall       = 0x02,

  // Calling convention
  Call        = 0x04,
  Return      = 0x05,

  // Control transfer
  Jump        = 0x08,
  Branch      = 0x09,

  // Stack
  Push        = 0x0c,
  Pop         = 0x0d,
  Assign      = 0x0e,

  // Memory (LOAD and STORE are reserved)
  Load        = 0x20,
  Store       = 0x21,
  StoreString = 0x22,

  // Arithmetic and logic
  Add         = 0x40,
  Sub         = 0x41,

  And         = 0x44,
  Or          = 0x45,
  Xor         = 0x46,

  Shl         = 0x48,
  Shr         = 0x49,

  Mul         = 0x4c,
  Quo         = 0x4d, // reserved
  Rem         = 0x4e, // reserved

  // Comparison
  Eql         = 0x50,
  Neq         = 0x51,
  Lss         = 0x52,
  Gtr         = 0x53,
  Leq         = 0x54,
  Geq         = 0x55,

  Convert     = 0x58,
}

impl Operation {

  pub fn code(&self) -> u8 {
    Into::<u8>::into(*self)
  }

  /// Opcodes that are recognized but have no implementation.
  pub fn is_reserved(&self) -> bool {
    matches!(self, Operation::Load | Operation::Store | Operation::Quo | Operation::Rem)
  }

  pub fn is_arithmetic(&self) -> bool {
    matches!(
      self,
      Operation::Add | Operation::Sub | Operation::And | Operation::Or | Operation::Xor | Operation::Mul
    )
  }

  pub fn is_shift(&self) -> bool {
    matches!(self, Operation::Shl | Operation::Shr)
  }

  pub fn is_comparison(&self) -> bool {
    matches!(
      self,
      Operation::Eql | Operation::Neq | Operation::Lss | Operation::Gtr | Operation::Leq | Operation::Geq
    )
  }

  /// Operations encoded as `[Opcode][Descriptor][Descriptor]` that pop two values and push one.
  pub fn is_binary(&self) -> bool {
    self.is_arithmetic() || self.is_shift() || self.is_comparison()
  }

}
