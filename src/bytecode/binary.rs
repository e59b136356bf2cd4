/*!
  This module is responsible for the encoding and decoding of binary instructions.

*/
use std::convert::TryFrom;

use super::{Descriptor, Instruction, Operation};
use crate::error::{Region, VmError, VmResult};
use crate::memory::Arena;

/// Address of the `n`th byte after `pc`.
fn operand_address(pc: u64, n: u64) -> VmResult<u64> {
  pc.checked_add(n)
    .ok_or(VmError::OutOfBounds{ region: Region::Instructions, address: pc, length: n + 1 })
}

fn descriptor_at(code: &Arena, pc: u64, n: u64) -> VmResult<Descriptor> {
  Descriptor::decode(code.byte(operand_address(pc, n)?)?)
}

/**
  Decodes the instruction whose opcode is at `pc`. Descriptors are validated here, so the execution
  core only ever sees well-formed ones. Reserved opcodes are recognized and reported as
  unimplemented; any other unknown byte is an invalid instruction.
*/
pub fn decode_instruction(code: &Arena, pc: u64) -> VmResult<Instruction> {
  let byte = code.byte(pc)?;
  let operation = Operation::try_from(byte)
    .map_err(|_| VmError::InvalidInstruction{ pc, reason: "unknown opcode" })?;

  let instruction =
    match operation {
      Operation::Halt  => Instruction::Halt,
      Operation::Ecall => Instruction::Ecall,
      Operation::Call  => Instruction::Call,
      Operation::Jump  => Instruction::Jump,

      Operation::Return => {
        match code.byte(operand_address(pc, 1)?)? {
          0    => Instruction::Return(None),
          byte => Instruction::Return(Some(Descriptor::decode(byte)?))
        }
      }

      Operation::Branch => Instruction::Branch(descriptor_at(code, pc, 1)?),
      Operation::Pop    => Instruction::Pop(descriptor_at(code, pc, 1)?),

      Operation::Push => {
        let descriptor = descriptor_at(code, pc, 1)?;
        let value      = code.read_uint(operand_address(pc, 2)?, descriptor.width)?;
        Instruction::Push{ descriptor, value }
      }

      Operation::Assign => {
        Instruction::Assign{
          target: descriptor_at(code, pc, 1)?,
          source: descriptor_at(code, pc, 2)?
        }
      }

      Operation::Convert => {
        Instruction::Convert{
          from: descriptor_at(code, pc, 1)?,
          to:   descriptor_at(code, pc, 2)?
        }
      }

      Operation::StoreString => {
        let start  = operand_address(pc, 1)?;
        let length = code.find_terminator(start, u64::MAX)?;
        Instruction::StoreString(code.slice(start, length)?.to_vec())
      }

      operation if operation.is_binary() => {
        Instruction::Binary{
          operation,
          lhs: descriptor_at(code, pc, 1)?,
          rhs: descriptor_at(code, pc, 2)?
        }
      }

      operation => {
        return Err(VmError::UnimplementedInstruction{ pc, operation });
      }
    };

  Ok(instruction)
}

/// Encodes the instruction into bytecode. The inverse of `decode_instruction`.
pub fn encode_instruction(instruction: &Instruction) -> Vec<u8> {
  let mut bytes = Vec::with_capacity(instruction.encoded_len() as usize);
  bytes.push(instruction.operation().code());

  match instruction {

    | Instruction::Halt
    | Instruction::Ecall
    | Instruction::Call
    | Instruction::Jump => {}

    Instruction::Return(descriptor) => {
      // [Opcode][Descriptor or 0]
      bytes.push(descriptor.map_or(0, |d| d.encode()));
    }

    | Instruction::Branch(descriptor)
    | Instruction::Pop(descriptor) => {
      // [Opcode][Descriptor]
      bytes.push(descriptor.encode());
    }

    Instruction::Push{ descriptor, value } => {
      // [Opcode][Descriptor][Immediate:width]
      bytes.push(descriptor.encode());
      bytes.extend_from_slice(&value.to_le_bytes()[..descriptor.width as usize]);
    }

    | Instruction::Assign{ target: first, source: second }
    | Instruction::Binary{ lhs: first, rhs: second, .. }
    | Instruction::Convert{ from: first, to: second } => {
      // [Opcode][Descriptor][Descriptor]
      bytes.push(first.encode());
      bytes.push(second.encode());
    }

    Instruction::StoreString(literal) => {
      // [Opcode][Literal...][0]
      bytes.extend_from_slice(literal);
      bytes.push(0);
    }

  }

  bytes
}


#[cfg(test)]
mod tests {
  use super::*;

  fn code(bytes: &[u8]) -> Arena {
    let mut arena = Arena::new(Region::Instructions, 64);
    arena.load(bytes).unwrap();
    arena
  }

  #[test]
  fn decode_push(){
    let arena = code(&[0x0c, 0x12, 0x34, 0x12]);
    let instruction = decode_instruction(&arena, 0).unwrap();
    assert_eq!(instruction, Instruction::Push{ descriptor: Descriptor::signed(2), value: 0x1234 });
    assert_eq!(instruction.encoded_len(), 4);
  }

  #[test]
  fn decode_return_null_descriptor(){
    let arena = code(&[0x05, 0x00, 0x05, 0x18]);
    assert_eq!(decode_instruction(&arena, 0), Ok(Instruction::Return(None)));
    assert_eq!(decode_instruction(&arena, 2), Ok(Instruction::Return(Some(Descriptor::signed(8)))));
  }

  #[test]
  fn decode_store_string(){
    let arena = code(b"\x22hi\0\x01");
    let instruction = decode_instruction(&arena, 0).unwrap();
    assert_eq!(instruction, Instruction::StoreString(b"hi".to_vec()));
    assert_eq!(instruction.encoded_len(), 4);
  }

  #[test]
  fn unknown_and_reserved_opcodes(){
    let arena = code(&[0x03, 0x4d, 0x01, 0x01]);
    assert_eq!(
      decode_instruction(&arena, 0),
      Err(VmError::InvalidInstruction{ pc: 0, reason: "unknown opcode" })
    );
    assert_eq!(
      decode_instruction(&arena, 1),
      Err(VmError::UnimplementedInstruction{ pc: 1, operation: Operation::Quo })
    );
  }

  #[test]
  fn invalid_descriptor(){
    let arena = code(&[0x40, 0x04, 0x43]);
    assert_eq!(decode_instruction(&arena, 0), Err(VmError::InvalidDescriptor{ byte: 0x43 }));
  }

  #[test]
  fn truncated_immediate(){
    let mut arena = Arena::new(Region::Instructions, 4);
    arena.load(&[0x0c, 0x08, 0x01, 0x02]).unwrap();
    assert!(matches!(
      decode_instruction(&arena, 0),
      Err(VmError::OutOfBounds{ region: Region::Instructions, .. })
    ));
  }

  #[test]
  fn encoding_matches_layout(){
    let instructions = vec![
      Instruction::Push{ descriptor: Descriptor::unsigned(4), value: 0xDEADBEEF },
      Instruction::Binary{
        operation: Operation::Lss,
        lhs: Descriptor::signed(1),
        rhs: Descriptor::signed(1).as_indirect()
      },
      Instruction::Return(None),
      Instruction::StoreString(b"ok".to_vec()),
    ];
    let bytes: Vec<u8> = instructions.iter().flat_map(encode_instruction).collect();
    assert_eq!(
      bytes,
      vec![0x0c, 0x04, 0xEF, 0xBE, 0xAD, 0xDE, 0x52, 0x11, 0x31, 0x05, 0x00, 0x22, b'o', b'k', 0]
    );

    let arena = code(&bytes);
    let mut pc = 0;
    for expected in instructions {
      let decoded = decode_instruction(&arena, pc).unwrap();
      pc += decoded.encoded_len();
      assert_eq!(decoded, expected);
    }
  }

}
