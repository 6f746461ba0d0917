//! Text front-ends for programs and initial memory.
//!
//! Program files hold one instruction per line, `;` starts a comment, and
//! operands are separated by commas and/or whitespace:
//!
//! ```text
//! ADDI R1, R0, 3   ; r1 = 3
//! sw   R1, 0(R0)
//! halt
//! ```
//!
//! Memory files hold one `<address> <value>` pair per line.
//!
//! The `load_*` functions never fail: a file that cannot be read (or, for
//! memory, cannot be parsed) is reported through `tracing` and treated as
//! empty. The `read_*` functions return the error instead.

use std::fs;
use std::io;
use std::num::ParseIntError;
use std::path::{Path, PathBuf};

use crate::instruction::InstructionRecord;
use crate::memory::{Address, MemoryBus};
use crate::region::Program;
use crate::registers::Word;

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
  #[error("could not read `{}`: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("line {line}: expected `<address> <value>`, found `{text}`")]
  Malformed { line: usize, text: String },

  #[error("line {line}: `{text}` is not an integer: {source}")]
  Integer {
    line: usize,
    text: String,
    #[source]
    source: ParseIntError,
  },
}

/// Parse program text. Every non-empty line becomes a record whose opcode
/// is upper-cased; operands are kept verbatim.
pub fn parse_program(text: &str) -> Program {
  text.lines().filter_map(parse_instruction).collect()
}

fn parse_instruction(line: &str) -> Option<InstructionRecord> {
  let code = line.split(';').next().unwrap_or_default();
  let mut tokens = code
    .split(|c: char| c == ',' || c.is_whitespace())
    .filter(|token| !token.is_empty());
  let opcode = tokens.next()?.to_ascii_uppercase();
  Some(InstructionRecord::new(&opcode, tokens))
}

/// Parse memory text into `(address, value)` pairs, in file order
pub fn parse_memory(text: &str) -> Result<Vec<(Address, Word)>, LoadError> {
  let mut entries = Vec::new();
  for (index, line) in text.lines().enumerate() {
    let line_no = index + 1;
    let mut fields = line.split_whitespace();
    let (address, value) = match (fields.next(), fields.next(), fields.next()) {
      (None, ..) => continue,
      (Some(address), Some(value), None) => (address, value),
      _ => {
        return Err(LoadError::Malformed {
          line: line_no,
          text: line.to_owned(),
        })
      }
    };
    entries.push((integer(line_no, address)?, integer(line_no, value)?));
  }
  Ok(entries)
}

fn integer(line: usize, text: &str) -> Result<i64, LoadError> {
  text.parse().map_err(|source| LoadError::Integer {
    line,
    text: text.to_owned(),
    source,
  })
}

fn read(path: &Path) -> Result<String, LoadError> {
  fs::read_to_string(path).map_err(|source| LoadError::Io {
    path: path.to_owned(),
    source,
  })
}

pub fn read_program(path: impl AsRef<Path>) -> Result<Program, LoadError> {
  read(path.as_ref()).map(|text| parse_program(&text))
}

pub fn read_memory(path: impl AsRef<Path>) -> Result<MemoryBus, LoadError> {
  let text = read(path.as_ref())?;
  Ok(parse_memory(&text)?.into_iter().collect())
}

/// Load a program file, treating an unreadable file as an empty program
pub fn load_program(path: impl AsRef<Path>) -> Program {
  let path = path.as_ref();
  read_program(path).unwrap_or_else(|error| {
    tracing::warn!(path = %path.display(), %error, "instruction file not loaded, using an empty program");
    Program::default()
  })
}

/// Load a memory file, treating an unreadable or malformed file as empty
/// memory
pub fn load_memory(path: impl AsRef<Path>) -> MemoryBus {
  let path = path.as_ref();
  read_memory(path).unwrap_or_else(|error| {
    tracing::warn!(path = %path.display(), %error, "memory file not loaded, using empty memory");
    MemoryBus::new()
  })
}
