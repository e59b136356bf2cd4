//! Fixed-capacity byte arenas. An arena never resizes, and every access to it goes through
//! `slice`/`slice_mut`, so a read or write past the end is always an `OutOfBounds` error.
//! Multi-byte values are little-endian.

use crate::error::{Region, VmError, VmResult};

pub struct Arena {
  region : Region,
  bytes  : Box<[u8]>,
}

impl Arena {

  /// A zero-filled arena of `capacity` bytes.
  pub fn new(region: Region, capacity: usize) -> Arena {
    Arena {
      region,
      bytes: vec![0u8; capacity].into_boxed_slice(),
    }
  }

  pub fn capacity(&self) -> usize {
    self.bytes.len()
  }

  pub fn as_bytes(&self) -> &[u8] {
    &self.bytes
  }

  /// Copies a program image to the start of the arena.
  pub fn load(&mut self, image: &[u8]) -> VmResult<()> {
    if image.len() > self.capacity() {
      return Err(VmError::BytecodeTooLarge{ size: image.len(), capacity: self.capacity() });
    }
    self.bytes[..image.len()].copy_from_slice(image);
    Ok(())
  }

  fn range(&self, address: u64, length: u64) -> VmResult<std::ops::Range<usize>> {
    let out_of_bounds = VmError::OutOfBounds{ region: self.region, address, length };
    let end = address.checked_add(length).ok_or_else(|| out_of_bounds.clone())?;
    if end > self.capacity() as u64 {
      return Err(out_of_bounds);
    }
    Ok(address as usize..end as usize)
  }

  pub fn slice(&self, address: u64, length: u64) -> VmResult<&[u8]> {
    let range = self.range(address, length)?;
    Ok(&self.bytes[range])
  }

  pub fn slice_mut(&mut self, address: u64, length: u64) -> VmResult<&mut [u8]> {
    let range = self.range(address, length)?;
    Ok(&mut self.bytes[range])
  }

  pub fn byte(&self, address: u64) -> VmResult<u8> {
    self.slice(address, 1).map(|b| b[0])
  }

  /// Reads a `width`-byte little-endian integer, zero-extended to 64 bits.
  pub fn read_uint(&self, address: u64, width: u8) -> VmResult<u64> {
    let bytes = self.slice(address, width as u64)?;
    let mut buffer = [0u8; 8];
    buffer[..bytes.len()].copy_from_slice(bytes);
    Ok(u64::from_le_bytes(buffer))
  }

  /// Writes the low `width` bytes of `value`, little-endian.
  pub fn write_uint(&mut self, address: u64, width: u8, value: u64) -> VmResult<()> {
    let bytes = self.slice_mut(address, width as u64)?;
    bytes.copy_from_slice(&value.to_le_bytes()[..width as usize]);
    Ok(())
  }

  /// Position of the first zero byte at or after `address`, relative to `address`.
  pub fn find_terminator(&self, address: u64, limit: u64) -> VmResult<u64> {
    let available = (self.capacity() as u64).saturating_sub(address).min(limit);
    let bytes = self.slice(address, available)?;
    bytes
      .iter()
      .position(|b| *b == 0)
      .map(|p| p as u64)
      .ok_or(VmError::OutOfBounds{ region: self.region, address, length: available + 1 })
  }

}

/// The sub-range of general memory reserved for the trap protocol.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub struct DeviceWindow {
  pub base : u64,
  pub size : u64,
}

impl DeviceWindow {

  pub fn contains(&self, address: u64) -> bool {
    address >= self.base && address - self.base < self.size
  }

  /// True when all of `[address, address + length)` is inside the window.
  pub fn contains_range(&self, address: u64, length: u64) -> bool {
    match address.checked_add(length) {
      Some(end) => self.contains(address) && end <= self.base + self.size,
      None      => false
    }
  }

}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn little_endian_round_trip(){
    let mut arena = Arena::new(Region::Stack, 16);
    arena.write_uint(2, 4, 0xAABB_CCDD).unwrap();
    assert_eq!(arena.slice(2, 4).unwrap(), &[0xDD, 0xCC, 0xBB, 0xAA]);
    assert_eq!(arena.read_uint(2, 2).unwrap(), 0xCCDD);
  }

  #[test]
  fn write_truncates_to_width(){
    let mut arena = Arena::new(Region::Stack, 8);
    arena.write_uint(0, 1, 0x1234).unwrap();
    assert_eq!(arena.read_uint(0, 8).unwrap(), 0x34);
  }

  #[test]
  fn access_past_end(){
    let mut arena = Arena::new(Region::Memory, 8);
    assert_eq!(
      arena.read_uint(4, 8),
      Err(VmError::OutOfBounds{ region: Region::Memory, address: 4, length: 8 })
    );
    assert!(arena.write_uint(u64::MAX, 2, 0).is_err());
    assert!(arena.byte(8).is_err());
    assert!(arena.byte(7).is_ok());
  }

  #[test]
  fn load_too_large(){
    let mut arena = Arena::new(Region::Instructions, 4);
    assert_eq!(
      arena.load(&[1, 2, 3, 4, 5]),
      Err(VmError::BytecodeTooLarge{ size: 5, capacity: 4 })
    );
    arena.load(&[1, 2, 3, 4]).unwrap();
    assert_eq!(arena.as_bytes(), &[1, 2, 3, 4]);
  }

  #[test]
  fn terminator(){
    let mut arena = Arena::new(Region::Memory, 8);
    arena.load(b"abc\0").unwrap();
    assert_eq!(arena.find_terminator(0, 8), Ok(3));
    assert_eq!(arena.find_terminator(4, 8), Ok(0));
    arena.load(b"abcdefgh").unwrap();
    assert!(arena.find_terminator(0, 8).is_err());
  }

  #[test]
  fn window_bounds(){
    let window = DeviceWindow{ base: 0x1000, size: 0x1000 };
    assert!(window.contains(0x1000));
    assert!(window.contains(0x1FFF));
    assert!(!window.contains(0x0FFF));
    assert!(!window.contains(0x2000));
    assert!(window.contains_range(0x1FFE, 2));
    assert!(!window.contains_range(0x1FFE, 3));
    assert!(!window.contains_range(u64::MAX, 2));
  }

}
