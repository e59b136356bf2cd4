use std::fmt::{Display, Formatter};

use super::{Descriptor, Operation};

/// Holds the decoded components of an instruction: its opcode and whatever descriptors,
/// immediate, or literal follow it in the instruction stream.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum Instruction {
  /// [Opcode]
  Halt,
  Ecall,
  Call,
  Jump,
  /// [Opcode][Descriptor]; `None` is the null descriptor (byte 0), meaning no return value.
  Return(Option<Descriptor>),
  Branch(Descriptor),
  Pop(Descriptor),
  /// [Opcode][Descriptor][Immediate:width]
  Push {
    descriptor : Descriptor,
    value      : u64
  },
  /// [Opcode][Descriptor][Descriptor]
  Assign {
    target : Descriptor,
    source : Descriptor
  },
  Binary {
    operation : Operation,
    lhs       : Descriptor,
    rhs       : Descriptor
  },
  Convert {
    from : Descriptor,
    to   : Descriptor
  },
  /// [Opcode][Literal...][0]; the literal is stored without its terminator.
  StoreString(Vec<u8>),
}

impl Instruction {

  pub fn operation(&self) -> Operation {
    match self {
      Instruction::Halt                       => Operation::Halt,
      Instruction::Ecall                      => Operation::Ecall,
      Instruction::Call                       => Operation::Call,
      Instruction::Jump                       => Operation::Jump,
      Instruction::Return(_)                  => Operation::Return,
      Instruction::Branch(_)                  => Operation::Branch,
      Instruction::Pop(_)                     => Operation::Pop,
      Instruction::Push{ .. }                 => Operation::Push,
      Instruction::Assign{ .. }               => Operation::Assign,
      Instruction::Binary{ operation, .. }    => *operation,
      Instruction::Convert{ .. }              => Operation::Convert,
      Instruction::StoreString(_)             => Operation::StoreString,
    }
  }

  /// Size of the encoded instruction in bytes, which is how far `pc` moves past it.
  pub fn encoded_len(&self) -> u64 {
    match self {
      | Instruction::Halt
      | Instruction::Ecall
      | Instruction::Call
      | Instruction::Jump                => 1,

      | Instruction::Return(_)
      | Instruction::Branch(_)
      | Instruction::Pop(_)              => 2,

      Instruction::Push{ descriptor, .. } => 2 + descriptor.width as u64,

      | Instruction::Assign{ .. }
      | Instruction::Binary{ .. }
      | Instruction::Convert{ .. }       => 3,

      Instruction::StoreString(literal)  => literal.len() as u64 + 2,
    }
  }

}

/// Renders the instruction in the assembler's syntax.
impl Display for Instruction {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let operation = self.operation();
    match self {

      | Instruction::Halt
      | Instruction::Ecall
      | Instruction::Call
      | Instruction::Jump => {
        write!(f, "{}", operation)
      }

      Instruction::Return(None) => {
        write!(f, "{} void", operation)
      }

      | Instruction::Return(Some(descriptor))
      | Instruction::Branch(descriptor)
      | Instruction::Pop(descriptor) => {
        write!(f, "{} {}", operation, descriptor)
      }

      Instruction::Push{ descriptor, value } => {
        match descriptor.signed {
          true  => write!(f, "{} {} {}", operation, descriptor, descriptor.sign_extend(*value) as i64),
          false => write!(f, "{} {} {}", operation, descriptor, value)
        }
      }

      | Instruction::Assign{ target: lhs, source: rhs }
      | Instruction::Binary{ lhs, rhs, .. }
      | Instruction::Convert{ from: lhs, to: rhs } => {
        write!(f, "{} {} {}", operation, lhs, rhs)
      }

      Instruction::StoreString(literal) => {
        write!(f, "{} \"", operation)?;
        for byte in literal {
          match *byte {
            b'\n' => write!(f, "\\n")?,
            b'\t' => write!(f, "\\t")?,
            b'\\' => write!(f, "\\\\")?,
            b'"'  => write!(f, "\\\"")?,
            0x20..=0x7E => write!(f, "{}", *byte as char)?,
            other => write!(f, "\\x{:02x}", other)?,
          }
        }
        write!(f, "\"")
      }

    }
  }
}
