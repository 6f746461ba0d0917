//! Instructions as loaded, and as decoded for execution.
//!
//! The loader hands us [`InstructionRecord`]s whose operands are still raw
//! tokens (`"R3"`, `"4(R5)"`, `"-2"`). Before an instruction executes it is
//! decoded into an [`Instruction`], which checks operand count and token shape
//! up front so the handlers only ever see well-formed operands.

use std::fmt;
use std::num::ParseIntError;

use crate::opcode::Opcode;
use crate::registers::REGISTER_COUNT;

/// A single instruction exactly as it appeared in the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionRecord {
  opcode: String,
  operands: Vec<String>,
}

impl InstructionRecord {
  pub fn new<S>(opcode: &str, operands: impl IntoIterator<Item = S>) -> Self
  where
    S: Into<String>,
  {
    Self {
      opcode: opcode.to_owned(),
      operands: operands.into_iter().map(Into::into).collect(),
    }
  }

  pub fn opcode(&self) -> &str {
    &self.opcode
  }

  pub fn operands(&self) -> &[String] {
    &self.operands
  }
}

impl fmt::Display for InstructionRecord {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} {}", self.opcode, self.operands.join(", "))
  }
}

/// An index into the register file, guaranteed to be in range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Register(u8);

impl Register {
  /// The link register written by `JAL`
  pub const LINK: Register = Register(7);

  pub fn new(index: usize) -> Option<Self> {
    (index < REGISTER_COUNT).then(|| Self(index as u8))
  }

  pub fn index(self) -> usize {
    self.0 as usize
  }
}

impl fmt::Display for Register {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "R{}", self.0)
  }
}

/// The reason an instruction's operands could not be decoded
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
  #[error("{opcode} expects {expected} operand(s), found {found}")]
  Arity {
    opcode: Opcode,
    expected: usize,
    found: usize,
  },

  #[error("`{0}` is not a register (expected `R0`..`R31`)")]
  Register(String),

  #[error("register `{0}` is out of range (expected `R0`..`R31`)")]
  RegisterRange(String),

  #[error("`{token}` is not an integer: {source}")]
  Integer {
    token: String,
    #[source]
    source: ParseIntError,
  },

  #[error("`{0}` is not a memory operand (expected `offset(Rn)`)")]
  Memory(String),

  #[error("jump target `{0}` is negative")]
  Target(i64),
}

/// A decoded instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
  Add { rd: Register, rs: Register, rt: Register },
  Sub { rd: Register, rs: Register, rt: Register },
  Addi { rt: Register, rs: Register, imm: i64 },
  Lw { rt: Register, offset: i64, base: Register },
  Sw { rt: Register, offset: i64, base: Register },
  Slt { rd: Register, rs: Register, rt: Register },
  Bne { rs: Register, rt: Register, offset: i64 },
  J { target: usize },
  Jal { target: usize },
  Cache { code: i64 },
  Halt,
  /// Not an error at decode time, the machine reports it and moves on
  Unknown { opcode: String },
}

impl Instruction {
  /// Decode a record, validating its operands.
  ///
  /// An unrecognised mnemonic decodes to [`Instruction::Unknown`] rather
  /// than failing; malformed operands on a known mnemonic are an error.
  pub fn decode(record: &InstructionRecord) -> Result<Self, DecodeError> {
    let op = match record.opcode().parse::<Opcode>() {
      Ok(op) => op,
      Err(_) => {
        return Ok(Self::Unknown {
          opcode: record.opcode().to_owned(),
        })
      }
    };
    let operands = record.operands();
    let instruction = match op {
      Opcode::Add => {
        let [rd, rs, rt] = registers(op, operands)?;
        Self::Add { rd, rs, rt }
      }
      Opcode::Sub => {
        let [rd, rs, rt] = registers(op, operands)?;
        Self::Sub { rd, rs, rt }
      }
      Opcode::Slt => {
        let [rd, rs, rt] = registers(op, operands)?;
        Self::Slt { rd, rs, rt }
      }
      Opcode::Addi => {
        let [rt, rs, imm] = arity::<3>(op, operands)?;
        Self::Addi {
          rt: register(rt)?,
          rs: register(rs)?,
          imm: integer(imm)?,
        }
      }
      Opcode::Lw => {
        let [rt, mem] = arity::<2>(op, operands)?;
        let (offset, base) = memory(mem)?;
        Self::Lw {
          rt: register(rt)?,
          offset,
          base,
        }
      }
      Opcode::Sw => {
        let [rt, mem] = arity::<2>(op, operands)?;
        let (offset, base) = memory(mem)?;
        Self::Sw {
          rt: register(rt)?,
          offset,
          base,
        }
      }
      Opcode::Bne => {
        let [rs, rt, offset] = arity::<3>(op, operands)?;
        Self::Bne {
          rs: register(rs)?,
          rt: register(rt)?,
          offset: integer(offset)?,
        }
      }
      Opcode::J => {
        let [target] = arity::<1>(op, operands)?;
        Self::J {
          target: target_index(target)?,
        }
      }
      Opcode::Jal => {
        let [target] = arity::<1>(op, operands)?;
        Self::Jal {
          target: target_index(target)?,
        }
      }
      Opcode::Cache => {
        let [code] = arity::<1>(op, operands)?;
        Self::Cache {
          code: integer(code)?,
        }
      }
      Opcode::Halt => {
        let [] = arity::<0>(op, operands)?;
        Self::Halt
      }
    };
    Ok(instruction)
  }
}

fn arity<'a, const N: usize>(
  opcode: Opcode,
  operands: &'a [String],
) -> Result<[&'a str; N], DecodeError> {
  if operands.len() != N {
    return Err(DecodeError::Arity {
      opcode,
      expected: N,
      found: operands.len(),
    });
  }
  Ok(std::array::from_fn(|i| operands[i].as_str()))
}

fn registers(opcode: Opcode, operands: &[String]) -> Result<[Register; 3], DecodeError> {
  let [a, b, c] = arity::<3>(opcode, operands)?;
  Ok([register(a)?, register(b)?, register(c)?])
}

// R<n>
fn register(token: &str) -> Result<Register, DecodeError> {
  let digits = token
    .trim()
    .strip_prefix('R')
    .filter(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
    .ok_or_else(|| DecodeError::Register(token.to_owned()))?;
  digits
    .parse::<usize>()
    .ok()
    .and_then(Register::new)
    .ok_or_else(|| DecodeError::RegisterRange(token.to_owned()))
}

fn integer(token: &str) -> Result<i64, DecodeError> {
  token
    .trim()
    .parse::<i64>()
    .map_err(|source| DecodeError::Integer {
      token: token.to_owned(),
      source,
    })
}

// o(R<n>)
fn memory(token: &str) -> Result<(i64, Register), DecodeError> {
  let malformed = || DecodeError::Memory(token.to_owned());
  let (offset, rest) = token.trim().split_once('(').ok_or_else(malformed)?;
  let base = rest.strip_suffix(')').ok_or_else(malformed)?;
  if offset.trim().is_empty() {
    return Err(malformed());
  }
  Ok((integer(offset)?, register(base)?))
}

fn target_index(token: &str) -> Result<usize, DecodeError> {
  let target = integer(token)?;
  usize::try_from(target).map_err(|_| DecodeError::Target(target))
}

#[cfg(test)]
mod tests {
  use super::*;

  use rstest::rstest;

  fn r(index: usize) -> Register {
    Register::new(index).unwrap()
  }

  fn decode(opcode: &str, operands: &[&str]) -> Result<Instruction, DecodeError> {
    Instruction::decode(&InstructionRecord::new(opcode, operands.iter().copied()))
  }

  #[test]
  fn register_bounds() {
    assert_eq!(Register::new(0).map(Register::index), Some(0));
    assert_eq!(Register::new(31).map(Register::index), Some(31));
    assert_eq!(Register::new(32), None);
    assert_eq!(Register::LINK.index(), 7);
    assert_eq!(r(12).to_string(), "R12");
  }

  #[test]
  fn decode_three_register_forms() {
    assert_eq!(
      decode("ADD", &["R3", "R1", "R2"]),
      Ok(Instruction::Add { rd: r(3), rs: r(1), rt: r(2) })
    );
    assert_eq!(
      decode("SUB", &["R0", "R31", "R7"]),
      Ok(Instruction::Sub { rd: r(0), rs: r(31), rt: r(7) })
    );
    assert_eq!(
      decode("SLT", &["R4", "R5", "R6"]),
      Ok(Instruction::Slt { rd: r(4), rs: r(5), rt: r(6) })
    );
  }

  #[test]
  fn decode_immediates() {
    assert_eq!(
      decode("ADDI", &["R4", "R0", "10"]),
      Ok(Instruction::Addi { rt: r(4), rs: r(0), imm: 10 })
    );
    assert_eq!(
      decode("ADDI", &["R4", "R0", "-10"]),
      Ok(Instruction::Addi { rt: r(4), rs: r(0), imm: -10 })
    );
    assert_eq!(
      decode("BNE", &["R1", "R2", "-3"]),
      Ok(Instruction::Bne { rs: r(1), rt: r(2), offset: -3 })
    );
    assert_eq!(decode("J", &["4"]), Ok(Instruction::J { target: 4 }));
    assert_eq!(decode("JAL", &["0"]), Ok(Instruction::Jal { target: 0 }));
    assert_eq!(decode("CACHE", &["7"]), Ok(Instruction::Cache { code: 7 }));
    assert_eq!(decode("HALT", &[]), Ok(Instruction::Halt));
  }

  #[test]
  fn decode_memory_operands() {
    assert_eq!(
      decode("LW", &["R3", "4(R5)"]),
      Ok(Instruction::Lw { rt: r(3), offset: 4, base: r(5) })
    );
    assert_eq!(
      decode("SW", &["R2", "-8(R1)"]),
      Ok(Instruction::Sw { rt: r(2), offset: -8, base: r(1) })
    );
  }

  #[test]
  fn decode_unknown_is_not_an_error() {
    assert_eq!(
      decode("FOO", &["R1", "whatever"]),
      Ok(Instruction::Unknown { opcode: "FOO".into() })
    );
    assert_eq!(decode("halt", &[]), Ok(Instruction::Halt));
  }

  #[rstest]
  #[case("ADD", &["R1", "R2"])]
  #[case("ADDI", &["R1", "R2", "3", "4"])]
  #[case("LW", &["R1"])]
  #[case("J", &[])]
  #[case("HALT", &["R1"])]
  fn decode_rejects_arity(#[case] opcode: &str, #[case] operands: &[&str]) {
    assert!(matches!(
      decode(opcode, operands),
      Err(DecodeError::Arity { found, .. }) if found == operands.len()
    ));
  }

  #[rstest]
  #[case(&["X1", "R2", "R3"])]
  #[case(&["R", "R2", "R3"])]
  #[case(&["R-1", "R2", "R3"])]
  #[case(&["R1x", "R2", "R3"])]
  #[case(&["r1", "R2", "R3"])]
  fn decode_rejects_register_shape(#[case] operands: &[&str]) {
    assert!(matches!(decode("ADD", operands), Err(DecodeError::Register(_))));
  }

  #[test]
  fn decode_rejects_register_range() {
    assert_eq!(
      decode("ADD", &["R32", "R1", "R2"]),
      Err(DecodeError::RegisterRange("R32".into()))
    );
    assert!(matches!(
      decode("LW", &["R1", "0(R99)"]),
      Err(DecodeError::RegisterRange(_))
    ));
  }

  #[rstest]
  #[case("ADDI", &["R1", "R0", "ten"])]
  #[case("BNE", &["R1", "R0", "1.5"])]
  #[case("CACHE", &["on"])]
  #[case("LW", &["R1", "x(R2)"])]
  fn decode_rejects_integers(#[case] opcode: &str, #[case] operands: &[&str]) {
    assert!(matches!(
      decode(opcode, operands),
      Err(DecodeError::Integer { .. })
    ));
  }

  #[rstest]
  #[case("4R5")]
  #[case("(R5)")]
  #[case("4(R5")]
  #[case("R5")]
  fn decode_rejects_memory_shape(#[case] token: &str) {
    assert!(matches!(
      decode("SW", &["R1", token]),
      Err(DecodeError::Memory(_))
    ));
  }

  #[test]
  fn decode_rejects_negative_jump() {
    assert_eq!(decode("J", &["-1"]), Err(DecodeError::Target(-1)));
    assert_eq!(decode("JAL", &["-4"]), Err(DecodeError::Target(-4)));
  }

  #[test]
  fn record_display() {
    let record = InstructionRecord::new("LW", ["R3", "4(R5)"]);
    assert_eq!(record.to_string(), "LW R3, 4(R5)");
    assert_eq!(record.opcode(), "LW");
    assert_eq!(record.operands(), ["R3", "4(R5)"]);
  }
}
