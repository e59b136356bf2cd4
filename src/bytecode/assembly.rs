/*!
  The human readable textual form of bytecode is called assembly. One instruction per line, in
  the form `MNEMONIC operand operand`, where the mnemonic is the `strum` serialization of the
  opcode. Operands are:

    descriptors  u8 u16 u32 u64 i8 i16 i32 i64, prefixed with `&` when indirect
    void         the null descriptor, for `RETURN` without a value
    integers     decimal or 0x-prefixed hex, optionally negative
    strings      double quoted, with \n \t \\ \" and \xHH escapes

  `#` starts a comment. There are no labels: jump and call offsets are plain integers relative to
  the instruction that consumes them.

    PUSH u64 0x1000       # device window base
    STORE_STRING "hi\n"
*/

use std::str::FromStr;

use nom::{
  branch::alt,
  bytes::complete::{tag, tag_no_case, take_while1, take_while_m_n},
  character::complete::{
    char as one_char,
    digit1,
    hex_digit1,
    none_of,
    not_line_ending,
    one_of,
    space0,
    space1
  },
  combinator::{all_consuming, map, map_res, opt, value},
  multi::many0,
  sequence::{delimited, pair, preceded, tuple},
  IResult
};

use crate::bytecode::{decode_instruction, encode_instruction, Descriptor, Instruction, Operation};
use crate::error::{AssemblyError, Region, VmResult};
use crate::memory::Arena;

#[derive(Clone, Debug, Eq, PartialEq)]
enum Operand {
  Descriptor(Descriptor),
  Void,
  Integer(i128),
  Literal(Vec<u8>),
}

// region Parsers

fn descriptor(input: &str) -> IResult<&str, Descriptor> {
  map_res(
    tuple((opt(one_char('&')), one_of("ui"), digit1)),
    |(indirect, sign, bits): (Option<char>, char, &str)| {
      let width = match bits {
        "8"  => 1,
        "16" => 2,
        "32" => 4,
        "64" => 8,
        _    => return Err(())
      };
      Ok(Descriptor{ width, signed: sign == 'i', indirect: indirect.is_some() })
    }
  )(input)
}

fn integer(input: &str) -> IResult<&str, i128> {
  let (input, negative)  = opt(one_char('-'))(input)?;
  let (input, magnitude) = alt((
    map_res(preceded(tag_no_case("0x"), hex_digit1), |digits: &str| i128::from_str_radix(digits, 16)),
    map_res(digit1, |digits: &str| digits.parse::<i128>()),
  ))(input)?;

  match negative {
    Some(_) => Ok((input, -magnitude)),
    None    => Ok((input, magnitude))
  }
}

fn string_literal(input: &str) -> IResult<&str, Vec<u8>> {
  let escape = alt((
    value(vec![b'\n'], one_char('n')),
    value(vec![b'\t'], one_char('t')),
    value(vec![b'\\'], one_char('\\')),
    value(vec![b'"'],  one_char('"')),
    map_res(
      preceded(one_char('x'), take_while_m_n(2, 2, |c: char| c.is_ascii_hexdigit())),
      |digits: &str| u8::from_str_radix(digits, 16).map(|b| vec![b])
    ),
  ));
  let plain = map(none_of("\\\""), |c: char| {
    let mut buffer = [0u8; 4];
    c.encode_utf8(&mut buffer).as_bytes().to_vec()
  });

  map(
    delimited(
      one_char('"'),
      many0(alt((plain, preceded(one_char('\\'), escape)))),
      one_char('"')
    ),
    |pieces: Vec<Vec<u8>>| pieces.concat()
  )(input)
}

fn operand(input: &str) -> IResult<&str, Operand> {
  alt((
    value(Operand::Void, tag("void")),
    map(descriptor, Operand::Descriptor),
    map(integer, Operand::Integer),
    map(string_literal, Operand::Literal),
  ))(input)
}

fn statement(input: &str) -> IResult<&str, (&str, Vec<Operand>)> {
  pair(
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    many0(preceded(space1, operand))
  )(input)
}

fn line(input: &str) -> IResult<&str, Option<(&str, Vec<Operand>)>> {
  all_consuming(
    delimited(
      space0,
      opt(statement),
      pair(space0, opt(preceded(one_char('#'), not_line_ending)))
    )
  )(input)
}

// endregion

/// The immediate's bit pattern at the descriptor's width. Negative values must fit the signed
/// range; non-negative values may use every bit, so `PUSH i8 0xFF` is the same as `PUSH i8 -1`.
fn immediate(descriptor: &Descriptor, value: i128) -> Result<u64, String> {
  let bits = descriptor.bits();
  let min  = match descriptor.signed {
    true  => -(1i128 << (bits - 1)),
    false => 0
  };
  let max  = (1i128 << bits) - 1;

  if value < min || value > max {
    return Err(format!("{} does not fit in {}", value, descriptor));
  }
  Ok((value as u64) & descriptor.mask())
}

fn expected_operands(operation: Operation) -> &'static str {
  match operation {
    | Operation::Halt
    | Operation::Ecall
    | Operation::Call
    | Operation::Jump        => "no operands",
    Operation::Return        => "a descriptor or `void`",
    | Operation::Branch
    | Operation::Pop         => "one descriptor",
    Operation::Push          => "a descriptor and an integer",
    Operation::StoreString   => "a string literal",
    _                        => "two descriptors"
  }
}

fn build_instruction(mnemonic: &str, operands: &[Operand]) -> Result<Instruction, String> {
  let operation = Operation::from_str(mnemonic)
    .map_err(|_| format!("{} is not an operation", mnemonic))?;

  if operation.is_reserved() {
    return Err(format!("{} is reserved and not implemented", operation));
  }

  let instruction =
    match (operation, operands) {

      (Operation::Halt,  []) => Instruction::Halt,
      (Operation::Ecall, []) => Instruction::Ecall,
      (Operation::Call,  []) => Instruction::Call,
      (Operation::Jump,  []) => Instruction::Jump,

      (Operation::Return, [Operand::Void])          => Instruction::Return(None),
      (Operation::Return, [Operand::Descriptor(d)]) => Instruction::Return(Some(*d)),
      (Operation::Branch, [Operand::Descriptor(d)]) => Instruction::Branch(*d),
      (Operation::Pop,    [Operand::Descriptor(d)]) => Instruction::Pop(*d),

      (Operation::Push, [Operand::Descriptor(d), Operand::Integer(v)]) => {
        Instruction::Push{ descriptor: *d, value: immediate(d, *v)? }
      }

      (Operation::Assign, [Operand::Descriptor(target), Operand::Descriptor(source)]) => {
        Instruction::Assign{ target: *target, source: *source }
      }

      (Operation::Convert, [Operand::Descriptor(from), Operand::Descriptor(to)]) => {
        Instruction::Convert{ from: *from, to: *to }
      }

      (Operation::StoreString, [Operand::Literal(bytes)]) => {
        if bytes.contains(&0) {
          return Err("string literals cannot contain a NUL byte".to_string());
        }
        Instruction::StoreString(bytes.clone())
      }

      (operation, [Operand::Descriptor(lhs), Operand::Descriptor(rhs)]) if operation.is_binary() => {
        Instruction::Binary{ operation, lhs: *lhs, rhs: *rhs }
      }

      (operation, operands) => {
        return Err(format!(
          "{} takes {} but was given {} operand(s)",
          operation,
          expected_operands(operation),
          operands.len()
        ));
      }

    };

  Ok(instruction)
}

/// Parses assembly text into instructions. Stops at the first bad line.
pub fn parse_assembly(text: &str) -> Result<Vec<Instruction>, AssemblyError> {
  let mut instructions = Vec::new();

  for (index, source) in text.lines().enumerate() {
    let line_number = index + 1;
    let parsed = line(source)
      .map_err(|_| AssemblyError{ line: line_number, message: format!("cannot parse `{}`", source.trim()) })?;

    if let (_, Some((mnemonic, operands))) = parsed {
      let instruction = build_instruction(mnemonic, &operands)
        .map_err(|message| AssemblyError{ line: line_number, message })?;
      instructions.push(instruction);
    }
  }

  Ok(instructions)
}

/// Assembles text straight to a flat program image.
pub fn assemble(text: &str) -> Result<Vec<u8>, AssemblyError> {
  let instructions = parse_assembly(text)?;
  Ok(instructions.iter().flat_map(encode_instruction).collect())
}

/// Decodes a whole program image, pairing each instruction with its address.
pub fn disassemble(image: &[u8]) -> VmResult<Vec<(u64, Instruction)>> {
  let mut code = Arena::new(Region::Instructions, image.len());
  code.load(image)?;

  let mut listing = Vec::new();
  let mut pc = 0u64;
  while pc < image.len() as u64 {
    let instruction = decode_instruction(&code, pc)?;
    let next_pc = pc + instruction.encoded_len();
    listing.push((pc, instruction));
    pc = next_pc;
  }
  Ok(listing)
}
