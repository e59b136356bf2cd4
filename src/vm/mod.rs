//! The machine: three fixed arenas, the register file, and the fetch/decode/execute step.
//!
//! Every instruction that consumes a value goes through `pop_value`, which implements the
//! machine's only addressing abstraction. A direct operand is consumed from the top of the stack.
//! An indirect operand first pops an 8-byte offset and then loads the value from
//! `stack[fp + offset]`, leaving the slot where it is.

mod arithmetic;
mod calling;
mod display;
mod trap;

pub use calling::Frame;

use log::{debug, trace};

use crate::bytecode::{decode_instruction, Descriptor, Instruction, Operation};
use crate::config::MachineConfig;
use crate::error::{Region, VmError, VmResult};
use crate::memory::{Arena, DeviceWindow};
use crate::registers::{Registers, Status};

pub struct Machine {

  // Memory Stores
  code   : Arena, // Instruction store, read-only once loaded
  stack  : Arena, // Evaluation stack and frame storage
  memory : Arena, // General memory, including the device window

  // Registers
  registers : Registers,
  status    : Status,

  device_window : DeviceWindow,

}

impl Machine {

  // region Construction and accessors

  /// A machine with zeroed arenas and registers, ready to run whatever is in the instruction store
  /// (initially all zeros, which is not a legal opcode).
  pub fn new(config: &MachineConfig) -> VmResult<Machine> {
    config.validate()?;
    Ok(Machine {
      code      : Arena::new(Region::Instructions, config.code_capacity),
      stack     : Arena::new(Region::Stack,        config.stack_capacity),
      memory    : Arena::new(Region::Memory,       config.memory_capacity),
      registers : Registers::default(),
      status    : Status::Running,
      device_window : DeviceWindow {
        base : config.device_window_base,
        size : config.device_window_size,
      },
    })
  }

  /// Creates a machine and copies the program image into its instruction store. Fails with
  /// `BytecodeTooLarge` when the image does not fit, before anything executes.
  pub fn load(image: &[u8], config: &MachineConfig) -> VmResult<Machine> {
    let mut machine = Machine::new(config)?;
    machine.code.load(image)?;
    debug!("Loaded {} bytes of bytecode.", image.len());
    Ok(machine)
  }

  /// `load` with the default configuration.
  pub fn with_program(image: &[u8]) -> VmResult<Machine> {
    Machine::load(image, &MachineConfig::default())
  }

  pub fn registers(&self) -> Registers {
    self.registers
  }

  pub fn status(&self) -> Status {
    self.status
  }

  pub fn code(&self) -> &[u8] {
    self.code.as_bytes()
  }

  pub fn stack(&self) -> &[u8] {
    self.stack.as_bytes()
  }

  pub fn memory(&self) -> &[u8] {
    self.memory.as_bytes()
  }

  // endregion

  // region Stack transport

  /// Consumes a value of the descriptor's width, directly from the top of the stack or indirectly
  /// from the frame slot at `fp + offset`. The result is zero-extended to 64 bits.
  pub fn pop_value(&mut self, descriptor: Descriptor) -> VmResult<u64> {
    if descriptor.indirect {
      let offset  = self.pop_word()?;
      let address = self.registers.fp.wrapping_add(offset);
      return self.stack.read_uint(address, descriptor.width);
    }

    let width = descriptor.width as u64;
    let sp    = self.registers.sp.checked_sub(width).ok_or(
      VmError::OutOfBounds{ region: Region::Stack, address: self.registers.sp, length: width }
    )?;
    let value = self.stack.read_uint(sp, descriptor.width)?;
    self.registers.sp = sp;
    Ok(value)
  }

  /// Writes the low `width` bytes of `value` at `sp` and moves `sp` past them.
  pub fn push_value(&mut self, width: u8, value: u64) -> VmResult<()> {
    let sp = self.registers.sp;
    self.stack.write_uint(sp, width, value)?;
    self.registers.sp = sp + width as u64;
    Ok(())
  }

  pub fn pop_word(&mut self) -> VmResult<u64> {
    self.pop_value(Descriptor::word())
  }

  pub fn push_word(&mut self, value: u64) -> VmResult<()> {
    self.push_value(8, value)
  }

  // endregion

  // region Execution

  /**
    Executes one instruction. Does nothing unless the machine is `Running`, in which case it
    returns the status the instruction left behind. Any error is fatal: the machine becomes
    `Illegal` and stays that way.
  */
  pub fn step(&mut self) -> VmResult<Status> {
    if self.status != Status::Running {
      return Ok(self.status);
    }

    match self.execute_next() {
      Ok(()) => Ok(self.status),
      Err(error) => {
        debug!("Machine stopped at pc {}: {}", self.registers.pc, error);
        self.status = Status::Illegal;
        Err(error)
      }
    }
  }

  /// Steps until the machine halts or traps.
  pub fn run_until_trap_or_halt(&mut self) -> VmResult<Status> {
    while self.status == Status::Running {
      self.step()?;
    }
    Ok(self.status)
  }

  fn advance(&mut self, length: u64) {
    self.registers.pc = self.registers.pc.wrapping_add(length);
  }

  fn execute_next(&mut self) -> VmResult<()> {
    let pc          = self.registers.pc;
    let instruction = decode_instruction(&self.code, pc)?;
    let length      = instruction.encoded_len();
    trace!("{:>6}: {}", pc, instruction);

    match instruction {

      Instruction::Halt => {
        debug!("Halted at pc {}.", pc);
        self.status = Status::Halted;
        self.advance(length);
      }

      Instruction::Ecall => {
        debug!("Environment call at pc {}.", pc);
        self.status = Status::Trapped;
        self.advance(length);
      }

      Instruction::Push{ descriptor, value } => {
        self.push_value(descriptor.width, value)?;
        self.advance(length);
      }

      Instruction::Pop(descriptor) => {
        if descriptor.indirect {
          return Err(VmError::InvalidInstruction{ pc, reason: "POP requires a direct descriptor" });
        }
        self.pop_value(descriptor)?;
        self.advance(length);
      }

      Instruction::Assign{ target, source } => {
        self.assign(target, source)?;
        self.advance(length);
      }

      Instruction::Binary{ operation, lhs, rhs } => {
        self.binary(operation, lhs, rhs)?;
        self.advance(length);
      }

      Instruction::Convert{ from, to } => {
        if to.indirect {
          return Err(VmError::InvalidInstruction{ pc, reason: "CONVERT target must be direct" });
        }
        let value = self.pop_value(from)?;
        self.push_value(to.width, from.sign_extend(value))?;
        self.advance(length);
      }

      Instruction::Jump => {
        let offset = self.pop_word()?;
        self.registers.pc = pc.wrapping_add(offset);
      }

      // The displacement is on top of the condition.
      Instruction::Branch(descriptor) => {
        let offset    = self.pop_word()?;
        let condition = self.pop_value(descriptor)?;
        match condition == 0 {
          true  => self.registers.pc = pc.wrapping_add(offset),
          false => self.advance(length)
        }
      }

      Instruction::Call => {
        self.call()?;
      }

      Instruction::Return(descriptor) => {
        self.return_from(descriptor)?;
      }

      Instruction::StoreString(literal) => {
        self.store_string(&literal)?;
        self.advance(length);
      }

    }

    Ok(())
  }

  /// Stores a value into the frame slot at `fp + offset`. The payload is popped before the offset.
  fn assign(&mut self, target: Descriptor, source: Descriptor) -> VmResult<()> {
    let pc = self.registers.pc;
    if !target.indirect {
      return Err(VmError::InvalidInstruction{ pc, reason: "ASSIGN target must be indirect" });
    }
    if !target.same_type(&source) {
      return Err(VmError::InvalidInstruction{ pc, reason: "ASSIGN operand types differ" });
    }

    let payload = self.pop_value(source)?;
    let offset  = self.pop_word()?;
    let address = self.registers.fp.wrapping_add(offset);
    self.stack.write_uint(address, target.width, payload)
  }

  /// Arithmetic, logic, shifts, and comparisons. The right-hand operand was pushed last, so it is
  /// popped first.
  fn binary(&mut self, operation: Operation, lhs: Descriptor, rhs: Descriptor) -> VmResult<()> {
    let pc = self.registers.pc;
    if !operation.is_shift() && !lhs.same_type(&rhs) {
      return Err(VmError::InvalidInstruction{ pc, reason: "operand types differ" });
    }

    let b = self.pop_value(rhs)?;
    let a = self.pop_value(lhs)?;

    if operation.is_comparison() {
      let result = arithmetic::compare(operation, &lhs, a, b);
      return self.push_value(1, result as u64);
    }

    if operation.is_shift() {
      if rhs.is_negative(b) {
        return Err(VmError::NegativeShiftCount{ pc });
      }
      return self.push_value(lhs.width, arithmetic::shift(operation, &lhs, a, b));
    }

    self.push_value(lhs.width, arithmetic::arithmetic(operation, &lhs, a, b))
  }

  // endregion

}
