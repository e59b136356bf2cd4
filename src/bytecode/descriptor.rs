/*!
  Value descriptors. Most operands carry a one byte descriptor that gives the width, signedness,
  and addressing mode of the value they refer to:

    [0:2][Indirect:1][Signed:1][Width:4]

  The width nibble must be 1, 2, 4, or 8 (bytes) and the top two bits must be clear. Anything
  else is an invalid descriptor. The (width, signedness) pair is the value's "type"; the
  indirect bit only says where the value lives.
*/

use std::fmt::{Display, Formatter};

use crate::error::{VmError, VmResult};

const WIDTH_MASK    : u8 = 0x0F;
const SIGNED_FLAG   : u8 = 0x10;
const INDIRECT_FLAG : u8 = 0x20;
const RESERVED_MASK : u8 = 0xC0;

pub fn is_valid(byte: u8) -> bool {
  byte & RESERVED_MASK == 0 && matches!(byte & WIDTH_MASK, 1 | 2 | 4 | 8)
}

pub fn size(byte: u8) -> VmResult<u8> {
  Descriptor::decode(byte).map(|d| d.width)
}

pub fn is_signed(byte: u8) -> VmResult<bool> {
  Descriptor::decode(byte).map(|d| d.signed)
}

pub fn is_indirect(byte: u8) -> VmResult<bool> {
  Descriptor::decode(byte).map(|d| d.indirect)
}

/// A decoded, validated descriptor.
#[derive(Clone, Copy, Eq, PartialEq, Debug, Hash)]
pub struct Descriptor {
  /// Width of the value in bytes: 1, 2, 4, or 8.
  pub width    : u8,
  pub signed   : bool,
  /// The value is read from `stack[fp + offset]` rather than from the top of the stack.
  pub indirect : bool,
}

impl Descriptor {

  pub fn decode(byte: u8) -> VmResult<Descriptor> {
    if !is_valid(byte) {
      return Err(VmError::InvalidDescriptor{ byte });
    }
    Ok(Descriptor {
      width    : byte & WIDTH_MASK,
      signed   : byte & SIGNED_FLAG != 0,
      indirect : byte & INDIRECT_FLAG != 0,
    })
  }

  pub fn encode(&self) -> u8 {
    let mut byte = self.width & WIDTH_MASK;
    if self.signed {
      byte |= SIGNED_FLAG;
    }
    if self.indirect {
      byte |= INDIRECT_FLAG;
    }
    byte
  }

  pub fn unsigned(width: u8) -> Descriptor {
    Descriptor{ width, signed: false, indirect: false }
  }

  pub fn signed(width: u8) -> Descriptor {
    Descriptor{ width, signed: true, indirect: false }
  }

  /// The 8-byte unsigned word used for offsets, addresses, and linkage.
  pub fn word() -> Descriptor {
    Descriptor::unsigned(8)
  }

  pub fn as_indirect(self) -> Descriptor {
    Descriptor{ indirect: true, ..self }
  }

  /// Two descriptors have the same type when width and signedness agree; the addressing mode
  /// is ignored.
  pub fn same_type(&self, other: &Descriptor) -> bool {
    self.width == other.width && self.signed == other.signed
  }

  pub fn bits(&self) -> u32 {
    self.width as u32 * 8
  }

  /// All ones in the low `width` bytes.
  pub fn mask(&self) -> u64 {
    match self.width {
      8 => u64::MAX,
      w => (1u64 << (w as u32 * 8)) - 1
    }
  }

  pub fn sign_bit(&self) -> u64 {
    1u64 << (self.bits() - 1)
  }

  /// True when the value is signed and its sign bit (at this width) is set.
  pub fn is_negative(&self, value: u64) -> bool {
    self.signed && value & self.sign_bit() != 0
  }

  /// Widens a value of this type to 64 bits, replicating the sign bit when the value is negative.
  pub fn sign_extend(&self, value: u64) -> u64 {
    let value = value & self.mask();
    match self.is_negative(value) {
      true  => value | !self.mask(),
      false => value
    }
  }

}

impl Display for Descriptor {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(
      f,
      "{}{}{}",
      if self.indirect { "&" } else { "" },
      if self.signed { 'i' } else { 'u' },
      self.bits()
    )
  }
}
