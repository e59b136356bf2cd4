//! Integer semantics for the binary operators. Operands arrive zero-extended to 64 bits; results
//! are truncated to the left operand's width.

use std::cmp::Ordering;

use crate::bytecode::{Descriptor, Operation};

/// ADD, SUB, AND, OR, XOR, MUL. Signed and unsigned results share a bit pattern, so signedness
/// does not matter here.
pub fn arithmetic(operation: Operation, descriptor: &Descriptor, a: u64, b: u64) -> u64 {
  let result = match operation {
    Operation::Add => a.wrapping_add(b),
    Operation::Sub => a.wrapping_add((!b).wrapping_add(1)),
    Operation::And => a & b,
    Operation::Or  => a | b,
    Operation::Xor => a ^ b,
    Operation::Mul => a.wrapping_mul(b),
    _              => unreachable!("{} is not an arithmetic operation", operation)
  };
  result & descriptor.mask()
}

/**
  SHL and SHR. `count` must already be known to be non-negative. SHR replicates the sign bit
  when the left operand is signed and negative and shifts in zeros otherwise; a count of 64 or
  more leaves nothing but the fill.
*/
pub fn shift(operation: Operation, descriptor: &Descriptor, a: u64, count: u64) -> u64 {
  let a = a & descriptor.mask();
  let result = match operation {

    Operation::Shl => {
      match count < 64 {
        true  => a << count,
        false => 0
      }
    }

    Operation::Shr if descriptor.is_negative(a) => {
      let extended = descriptor.sign_extend(a) as i64;
      match count < 64 {
        true  => (extended >> count) as u64,
        false => u64::MAX
      }
    }

    Operation::Shr => {
      match count < 64 {
        true  => a >> count,
        false => 0
      }
    }

    _ => unreachable!("{} is not a shift", operation)
  };
  result & descriptor.mask()
}

/**
  EQL, NEQ, LSS, GTR, LEQ, GEQ. For signed operands the sign bits are compared first: a negative
  value orders below a non-negative one whatever its raw magnitude. When the sign bits agree,
  the raw unsigned comparison gives the two's-complement order.
*/
pub fn compare(operation: Operation, descriptor: &Descriptor, a: u64, b: u64) -> bool {
  let ordering = match (descriptor.is_negative(a), descriptor.is_negative(b)) {
    (true, false) => Ordering::Less,
    (false, true) => Ordering::Greater,
    _             => a.cmp(&b)
  };

  match operation {
    Operation::Eql => ordering == Ordering::Equal,
    Operation::Neq => ordering != Ordering::Equal,
    Operation::Lss => ordering == Ordering::Less,
    Operation::Gtr => ordering == Ordering::Greater,
    Operation::Leq => ordering != Ordering::Greater,
    Operation::Geq => ordering != Ordering::Less,
    _              => unreachable!("{} is not a comparison", operation)
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn sub_is_add_of_negation(){
    let d = Descriptor::unsigned(1);
    assert_eq!(arithmetic(Operation::Sub, &d, 1, 2), 0xFF);
    assert_eq!(arithmetic(Operation::Sub, &d, 5, 0), 5);
    for a in 0..=255u64 {
      for b in (0..=255u64).step_by(17) {
        let sum = arithmetic(Operation::Add, &d, a, b);
        assert_eq!(arithmetic(Operation::Sub, &d, sum, b), a);
      }
    }
  }

  #[test]
  fn logic(){
    let d = Descriptor::unsigned(2);
    assert_eq!(arithmetic(Operation::And, &d, 0xFF00, 0x0FF0), 0x0F00);
    assert_eq!(arithmetic(Operation::Or,  &d, 0xFF00, 0x0FF0), 0xFFF0);
    assert_eq!(arithmetic(Operation::Mul, &d, 0x100, 0x100), 0);
  }

  #[test]
  fn arithmetic_shift_right(){
    let signed = Descriptor::signed(1);
    assert_eq!(shift(Operation::Shr, &signed, 0x80, 1), 0xC0);
    assert_eq!(shift(Operation::Shr, &signed, 0x80, 7), 0xFF);
    assert_eq!(shift(Operation::Shr, &signed, 0x80, 9), 0xFF);
    assert_eq!(shift(Operation::Shr, &signed, 0x80, 1000), 0xFF);
    assert_eq!(shift(Operation::Shr, &signed, 0x40, 1), 0x20);
    assert_eq!(shift(Operation::Shr, &Descriptor::signed(8), 1 << 63, 63), u64::MAX);
  }

  #[test]
  fn logical_shifts(){
    let unsigned = Descriptor::unsigned(1);
    assert_eq!(shift(Operation::Shr, &unsigned, 0x80, 1), 0x40);
    assert_eq!(shift(Operation::Shr, &unsigned, 0x80, 64), 0);
    assert_eq!(shift(Operation::Shl, &unsigned, 0x81, 1), 0x02);
    assert_eq!(shift(Operation::Shl, &unsigned, 0x01, 8), 0);
    assert_eq!(shift(Operation::Shl, &Descriptor::unsigned(8), 1, 64), 0);
  }

  #[test]
  fn sign_bit_first_ordering(){
    let signed = Descriptor::signed(1);
    assert!(compare(Operation::Lss, &signed, 0xFF, 0x01));
    assert!(compare(Operation::Gtr, &signed, 0x01, 0x80));
    assert!(compare(Operation::Lss, &signed, 0x80, 0xFF));
    assert!(compare(Operation::Leq, &signed, 0xFF, 0xFF));
    assert!(!compare(Operation::Neq, &signed, 0xFF, 0xFF));

    let unsigned = Descriptor::unsigned(1);
    assert!(compare(Operation::Gtr, &unsigned, 0xFF, 0x01));
    assert!(compare(Operation::Geq, &unsigned, 0x01, 0x01));
    assert!(compare(Operation::Eql, &unsigned, 0x00, 0x00));
  }

}
