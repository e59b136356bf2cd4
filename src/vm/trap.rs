/*!
  The trap protocol, the machine's only channel to the host. A program stages a NUL-terminated
  string in the device window with STORE_STRING and then executes ECALL, which stops the machine
  in the `Trapped` state. The host reads the string from the window base, acts on it, and calls
  `resume`.
*/

use std::io::Write;
use std::time::Duration;

use log::debug;

use super::Machine;
use crate::bytecode::Descriptor;
use crate::error::{Region, RunError, VmError, VmResult};
use crate::registers::Status;

impl Machine {

  /// STORE_STRING: the target address is loaded from a frame slot (an 8-byte unsigned indirect
  /// operand). The whole literal and its terminator must fit in the device window; nothing is
  /// copied otherwise.
  pub(super) fn store_string(&mut self, literal: &[u8]) -> VmResult<()> {
    let address = self.pop_value(Descriptor::word().as_indirect())?;
    let length  = literal.len() as u64 + 1;

    if !self.device_window.contains_range(address, length) {
      return Err(VmError::OutOfBounds{ region: Region::DeviceWindow, address, length });
    }

    let target = self.memory.slice_mut(address, length)?;
    let (text, terminator) = target.split_at_mut(literal.len());
    text.copy_from_slice(literal);
    terminator[0] = 0;
    Ok(())
  }

  /// The NUL-terminated string at the base of the device window, without its terminator.
  pub fn device_string(&self) -> VmResult<&[u8]> {
    let window = self.device_window;
    let length = self.memory
      .find_terminator(window.base, window.size)
      .map_err(|_| VmError::OutOfBounds{ region: Region::DeviceWindow, address: window.base, length: window.size })?;
    self.memory.slice(window.base, length)
  }

  /// Lets a trapped machine continue. Returns false, and does nothing, in any other state.
  pub fn resume(&mut self) -> bool {
    match self.status {
      Status::Trapped => {
        self.status = Status::Running;
        true
      }
      _ => false
    }
  }

  /**
    Services a pending trap: hands the device string to `handler` and resumes the machine. Returns
    whether there was a trap to service.
  */
  pub fn service_trap<F>(&mut self, handler: F) -> VmResult<bool>
    where F: FnOnce(&[u8])
  {
    if self.status != Status::Trapped {
      return Ok(false);
    }

    let text = self.device_string()?;
    debug!("Servicing environment call with {} byte(s).", text.len());
    handler(text);
    Ok(self.resume())
  }

  /**
    Runs the program to completion as a host would: every environment call's string is written to
    `out` as lossy UTF-8 and flushed, and the machine resumed. Returns the final status, which is
    `Halted` unless the machine failed.

    With `trace_computation` the state table is logged at trace level after each step, and `delay`
    is slept between steps.
  */
  pub fn run_with<W>(&mut self, out: &mut W, delay: Duration) -> Result<Status, RunError>
    where W: Write
  {
    loop {
      let status = self.step()?;

      #[cfg(feature = "trace_computation")]
      {
        log::trace!("\n{}", self);
        if delay > Duration::from_millis(0) {
          std::thread::sleep(delay);
        }
      }
      #[cfg(not(feature = "trace_computation"))]
      let _ = delay;

      match status {

        Status::Trapped => {
          let mut written = Ok(());
          self.service_trap(|text| {
            written = out
              .write_all(String::from_utf8_lossy(text).as_bytes())
              .and_then(|_| out.flush());
          })?;
          written?;
        }

        Status::Running => {}

        _ => {
          debug!("Stopped at pc {} with status {}.", self.registers.pc, status);
          return Ok(status);
        }

      }
    }
  }

}
