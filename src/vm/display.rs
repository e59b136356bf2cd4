//! A table of the machine state: registers and status beside the live part of the stack.

use std::fmt::{Display, Formatter};

use prettytable::{format as TableFormat, Table};

use super::Machine;

/// Stack bytes shown per row.
const ROW_WIDTH: u64 = 8;
/// At most this many rows of stack, counted down from the row holding `sp`.
const MAX_ROWS: u64 = 32;

lazy_static! {
  static ref TABLE_DISPLAY_FORMAT: TableFormat::TableFormat =
    TableFormat::FormatBuilder::new()
      .column_separator('│')
      .borders(' ')
      .separator(
        TableFormat::LinePosition::Title,
        TableFormat::LineSeparator::new('─', '┼', ' ', ' ')
      )
      .separator(
        TableFormat::LinePosition::Bottom,
        TableFormat::LineSeparator::new('─', '┴', ' ', ' ')
      )
      .padding(1, 1)
      .build();
}

impl Machine {

  fn make_register_table(&self) -> Table {
    let mut table = Table::new();

    table.set_format(*TABLE_DISPLAY_FORMAT);
    table.set_titles(row![ubr->"Register", ubl->"Value"]);

    table.add_row(row![r->"PC", format!("{:#06x}", self.registers.pc)]);
    table.add_row(row![r->"FP", format!("{:#06x}", self.registers.fp)]);
    table.add_row(row![r->"SP", format!("{:#06x}", self.registers.sp)]);
    table.add_row(row![r->"Status", format!("{}", self.status)]);

    table
  }

  /// Rows of stack bytes from the bottom of the visible window up to `sp`. The row holding `fp`
  /// is marked.
  fn make_stack_table(&self) -> Table {
    let mut table = Table::new();

    table.set_format(*TABLE_DISPLAY_FORMAT);
    table.set_titles(row![ubr->"Address", ubl->"Contents"]);

    let bytes = self.stack.as_bytes();
    let end   = self.registers.sp.min(bytes.len() as u64);
    let last  = (end + ROW_WIDTH - 1) / ROW_WIDTH;
    let first = last.saturating_sub(MAX_ROWS);

    for row in first..last {
      let start    = row * ROW_WIDTH;
      let stop     = (start + ROW_WIDTH).min(end);
      let contents = bytes[start as usize..stop as usize]
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<String>>()
        .join(" ");

      let holds_fp = self.registers.fp >= start && self.registers.fp < start + ROW_WIDTH;
      match holds_fp {

        true  => {
          table.add_row(row![r->format!("FP --> S[{:#06x}] =", start), contents]);
        }

        false => {
          table.add_row(row![r->format!("S[{:#06x}] =", start), contents]);
        }

      }
    }

    table
  }

}

impl Display for Machine {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let register_table = self.make_register_table();
    let stack_table    = self.make_stack_table();

    let mut combined_table = table!([register_table, stack_table]);

    combined_table.set_titles(row![ub->"Registers", ub->"Stack"]);
    combined_table.set_format(*TABLE_DISPLAY_FORMAT);

    write!(f, "{}", combined_table)
  }
}
