/*!
  The calling convention. A frame is linked by two 8-byte words directly below `fp`:

    [fp - 16]  caller's fp
    [fp -  8]  return pc (the address just past the CALL)

  CALL and RETURN are the only instructions that touch them. Arguments are pushed before the jump
  offset and read back inside the callee with indirect operands at negative offsets from `fp`.
  RETURN's frame adjustment is added to `fp` to produce the caller's `sp`, so an adjustment of
  -16 (two's complement) drops exactly the linkage words, and a further negative amount drops
  the arguments too.
*/

use log::trace;

use super::Machine;
use crate::bytecode::Descriptor;
use crate::error::{Region, VmError, VmResult};

const LINKAGE_SIZE: u64 = 16;

/// The linkage words of the active frame.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub struct Frame {
  pub caller_fp : u64,
  pub return_pc : u64,
}

impl Machine {

  /// Reads the linkage words below `fp`.
  pub fn frame(&self) -> VmResult<Frame> {
    let fp   = self.registers.fp;
    let base = fp.checked_sub(LINKAGE_SIZE)
      .ok_or(VmError::OutOfBounds{ region: Region::Stack, address: fp, length: LINKAGE_SIZE })?;

    Ok(Frame {
      caller_fp : self.stack.read_uint(base, 8)?,
      return_pc : self.stack.read_uint(base + 8, 8)?,
    })
  }

  /// CALL: pops the jump offset, pushes the linkage words, and enters the callee.
  pub(super) fn call(&mut self) -> VmResult<()> {
    let offset = self.pop_word()?;
    let pc     = self.registers.pc;
    let fp     = self.registers.fp;

    self.push_word(fp)?;
    self.push_word(pc.wrapping_add(1))?;
    self.registers.fp = self.registers.sp;
    self.registers.pc = pc.wrapping_add(offset);

    trace!("call from {} to {}, fp = {}", pc, self.registers.pc, self.registers.fp);
    Ok(())
  }

  /**
    RETURN: pops the frame adjustment, tears the frame down to `fp + adjustment`, and restores the
    caller's `pc` and `fp`. With a descriptor, the return value is popped before the teardown and
    pushed again at the new top of the stack; without one, whatever is pending is discarded. A
    new `sp` past the end of the stack is out of bounds, and nothing is torn down.
  */
  pub(super) fn return_from(&mut self, descriptor: Option<Descriptor>) -> VmResult<()> {
    let adjustment = self.pop_word()?;
    let frame      = self.frame()?;
    let sp         = self.registers.fp.wrapping_add(adjustment);

    if sp > self.stack.capacity() as u64 {
      return Err(VmError::OutOfBounds{ region: Region::Stack, address: sp, length: 0 });
    }

    match descriptor {

      None => {
        self.registers.sp = sp;
      }

      Some(descriptor) => {
        let payload = self.pop_value(descriptor)?;
        self.registers.sp = sp;
        self.push_value(descriptor.width, payload)?;
      }

    }

    self.registers.pc = frame.return_pc;
    self.registers.fp = frame.caller_fp;

    trace!("return to {}, fp = {}, sp = {}", self.registers.pc, self.registers.fp, self.registers.sp);
    Ok(())
  }

}


#[cfg(test)]
mod tests {
  use crate::bytecode::assembly::assemble;
  use crate::error::{Region, VmError};
  use crate::registers::Status;
  use crate::vm::{Frame, Machine};

  fn boot(text: &str) -> Machine {
    Machine::with_program(&assemble(text).unwrap()).unwrap()
  }

  fn step_n(machine: &mut Machine, n: usize) {
    for _ in 0..n {
      machine.step().unwrap();
    }
  }

  #[test]
  fn call_pushes_linkage(){
    //  0: PUSH u64 12
    // 10: CALL               -> 22, returns to 11
    let mut machine = boot("PUSH u64 12\nCALL\nHALT");
    step_n(&mut machine, 2);

    let registers = machine.registers();
    assert_eq!(registers.pc, 22);
    assert_eq!(registers.sp, 16);
    assert_eq!(registers.fp, 16);
    assert_eq!(machine.frame(), Ok(Frame{ caller_fp: 0, return_pc: 11 }));
  }

  #[test]
  fn call_return_round_trip(){
    //  0: PUSH u8 9          something the caller owns
    //  3: PUSH u64 9
    // 13: CALL               -> 22, returns to 14
    // 14: HALT
    // 15: HALT
    // 16: PUSH u8 0          padding
    // 19: PUSH u8 0          padding
    // 22: PUSH i64 -16       drop the linkage words
    // 32: RETURN void
    let text = "
      PUSH u8 9
      PUSH u64 9
      CALL
      HALT
      HALT
      PUSH u8 0
      PUSH u8 0
      PUSH i64 -16
      RETURN void
    ";
    let mut machine = boot(text);
    step_n(&mut machine, 2);
    let before = machine.registers();
    assert_eq!(before.sp, 9);

    step_n(&mut machine, 1);
    assert_eq!(machine.registers().pc, 22);
    step_n(&mut machine, 2);

    let after = machine.registers();
    assert_eq!(after.pc, 14);
    assert_eq!(after.fp, before.fp);
    // The jump offset was consumed by CALL.
    assert_eq!(after.sp, before.sp - 8);
    assert_eq!(machine.step(), Ok(Status::Halted));
  }

  #[test]
  fn zero_adjustment_keeps_linkage(){
    //  0: PUSH u64 12
    // 10: CALL               -> 22, returns to 11
    // 11: HALT
    // 12: PUSH u64 0         padding
    // 22: PUSH u64 0
    // 32: RETURN void
    let text = "
      PUSH u64 12
      CALL
      HALT
      PUSH u64 0
      PUSH u64 0
      RETURN void
    ";
    let mut machine = boot(text);
    step_n(&mut machine, 4);
    let registers = machine.registers();
    assert_eq!(registers.pc, 11);
    assert_eq!(registers.fp, 0);
    assert_eq!(registers.sp, 16);
  }

  #[test]
  fn return_value_survives_teardown(){
    // The callee reads its argument at fp - 17 and returns it doubled.
    //  0: PUSH u8 21         argument
    //  3: PUSH u64 12
    // 13: CALL               -> 25, returns to 14
    // 14: HALT
    // 15: PUSH u64 0         padding
    // 25: PUSH i64 -17
    // 35: PUSH i64 -17
    // 45: ADD &u8 &u8
    // 48: PUSH i64 -17       drop the linkage words and the argument
    // 58: RETURN u8
    let text = "
      PUSH u8 21
      PUSH u64 12
      CALL
      HALT
      PUSH u64 0
      PUSH i64 -17
      PUSH i64 -17
      ADD &u8 &u8
      PUSH i64 -17
      RETURN u8
    ";
    let mut machine = boot(text);
    step_n(&mut machine, 3);
    assert_eq!(machine.registers().pc, 25);
    assert_eq!(machine.registers().fp, 17);

    step_n(&mut machine, 5);
    let registers = machine.registers();
    assert_eq!(registers.pc, 14);
    assert_eq!(registers.fp, 0);
    assert_eq!(registers.sp, 1);
    assert_eq!(machine.stack()[0], 42);
    assert_eq!(machine.step(), Ok(Status::Halted));
  }

  #[test]
  fn nested_calls(){
    //  0: PUSH u64 12
    // 10: CALL               -> 22, returns to 11
    // 11: HALT
    // 12: PUSH u64 0         padding
    // 22: PUSH u64 24
    // 32: CALL               -> 56, returns to 33
    // 33: PUSH i64 -16
    // 43: RETURN void
    // 45: HALT
    // 46: PUSH u64 0         padding
    // 56: PUSH i64 -16
    // 66: RETURN void
    let text = "
      PUSH u64 12
      CALL
      HALT
      PUSH u64 0
      PUSH u64 24
      CALL
      PUSH i64 -16
      RETURN void
      HALT
      PUSH u64 0
      PUSH i64 -16
      RETURN void
    ";
    let mut machine = boot(text);
    step_n(&mut machine, 4);
    assert_eq!(machine.registers().pc, 56);
    assert_eq!(machine.registers().fp, 32);
    assert_eq!(machine.frame(), Ok(Frame{ caller_fp: 16, return_pc: 33 }));

    assert_eq!(machine.run_until_trap_or_halt(), Ok(Status::Halted));
    let registers = machine.registers();
    assert_eq!(registers.pc, 12);
    assert_eq!(registers.fp, 0);
    assert_eq!(registers.sp, 0);
  }

  #[test]
  fn return_past_stack_bounds(){
    //  0: PUSH u64 12
    // 10: CALL               -> 22, returns to 11
    // 11: HALT
    // 12: PUSH u64 0         padding
    // 22: PUSH i64 -100      fp + -100 wraps below zero
    // 32: RETURN void
    let text = "
      PUSH u64 12
      CALL
      HALT
      PUSH u64 0
      PUSH i64 -100
      RETURN void
    ";
    let mut machine = boot(text);
    step_n(&mut machine, 3);
    assert_eq!(
      machine.step(),
      Err(VmError::OutOfBounds{ region: Region::Stack, address: (-84i64) as u64, length: 0 })
    );
    assert_eq!(machine.status(), Status::Illegal);
    assert_eq!(machine.registers().pc, 32);
    assert_eq!(machine.registers().fp, 16);

    // An adjustment landing exactly on the end of the stack is still in bounds.
    let config = crate::config::MachineConfig{ stack_capacity: 64, ..Default::default() };
    let text = "
      PUSH u64 12
      CALL
      HALT
      PUSH u64 0
      PUSH u64 48
      RETURN void
    ";
    let mut machine = Machine::load(&assemble(text).unwrap(), &config).unwrap();
    assert_eq!(machine.run_until_trap_or_halt(), Ok(Status::Halted));
    assert_eq!(machine.registers().sp, 64);

    let text = "
      PUSH u64 12
      CALL
      HALT
      PUSH u64 0
      PUSH u64 49
      RETURN void
    ";
    let mut machine = Machine::load(&assemble(text).unwrap(), &config).unwrap();
    assert!(matches!(
      machine.run_until_trap_or_halt(),
      Err(VmError::OutOfBounds{ region: Region::Stack, address: 65, .. })
    ));
  }

  #[test]
  fn return_without_frame(){
    let mut machine = boot("PUSH u64 0\nRETURN void");
    machine.step().unwrap();
    assert!(matches!(
      machine.step(),
      Err(VmError::OutOfBounds{ region: Region::Stack, .. })
    ));
    assert_eq!(machine.status(), Status::Illegal);
  }

}
