use std::fmt;
use std::str::FromStr;

/// The mnemonics understood by the machine.
///
/// Register operands are written `R<n>` with `n` in `0..=31`, memory operands
/// are written `o(R<n>)`, and every control-flow target is measured in
/// instructions, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
  /// | Operation | Semantics/RTL          | Assembly         |
  /// |-----------|------------------------|------------------|
  /// | Add       | `r[d] ← r[s] + r[t]`   | `add rd, rs, rt` |
  Add,

  /// | Operation | Semantics/RTL          | Assembly         |
  /// |-----------|------------------------|------------------|
  /// | Subtract  | `r[d] ← r[s] − r[t]`   | `sub rd, rs, rt` |
  Sub,

  /// | Operation     | Semantics/RTL          | Assembly            |
  /// |---------------|------------------------|---------------------|
  /// | Add Immediate | `r[t] ← r[s] + vvvv`   | `addi rt, rs, vvvv` |
  Addi,

  /// Loads a value from memory using a base register and offset.
  ///
  /// | Operation        | Semantics/RTL          | Assembly        |
  /// |------------------|------------------------|-----------------|
  /// | Load Base+Offset | `r[t] ← m[r[s] + o]`   | `lw rt, o(rs)`  |
  Lw,

  /// Stores a value in memory using a base register and offset.
  ///
  /// | Operation         | Semantics/RTL          | Assembly        |
  /// |-------------------|------------------------|-----------------|
  /// | Store Base+Offset | `m[r[s] + o] ← r[t]`   | `sw rt, o(rs)`  |
  Sw,

  /// | Operation      | Semantics/RTL                   | Assembly         |
  /// |----------------|---------------------------------|------------------|
  /// | Set Less Than  | `r[d] ← r[s] < r[t] ? 1 : 0`    | `slt rd, rs, rt` |
  Slt,

  /// Branches relative to the instruction *after* the branch.
  ///
  /// | Operation        | Semantics/RTL                        | Assembly        |
  /// |------------------|--------------------------------------|-----------------|
  /// | Branch Not Equal | `if r[s] ≠ r[t] : pc ← pc + 1 + o`   | `bne rs, rt, o` |
  Bne,

  /// | Operation | Semantics/RTL | Assembly |
  /// |-----------|---------------|----------|
  /// | Jump      | `pc ← a`      | `j a`    |
  J,

  /// | Operation     | Semantics/RTL              | Assembly |
  /// |---------------|----------------------------|----------|
  /// | Jump And Link | `r[7] ← pc + 1 ; pc ← a`   | `jal a`  |
  Jal,

  /// Cache control. There is no cache behind this, it only records the
  /// last directive.
  ///
  /// | Code | Effect          |
  /// |------|-----------------|
  /// | `0`  | disable         |
  /// | `1`  | enable          |
  /// | `2`  | flush (notice)  |
  Cache,

  /// | Operation | Semantics/RTL      | Assembly |
  /// |-----------|--------------------|----------|
  /// | Halt      | `(stop execution)` | `halt`   |
  Halt,
}

impl Opcode {
  pub const ALL: [Self; 11] = [
    Self::Add,
    Self::Sub,
    Self::Addi,
    Self::Lw,
    Self::Sw,
    Self::Slt,
    Self::Bne,
    Self::J,
    Self::Jal,
    Self::Cache,
    Self::Halt,
  ];

  /// The canonical (upper-case) mnemonic
  pub const fn mnemonic(self) -> &'static str {
    match self {
      Self::Add => "ADD",
      Self::Sub => "SUB",
      Self::Addi => "ADDI",
      Self::Lw => "LW",
      Self::Sw => "SW",
      Self::Slt => "SLT",
      Self::Bne => "BNE",
      Self::J => "J",
      Self::Jal => "JAL",
      Self::Cache => "CACHE",
      Self::Halt => "HALT",
    }
  }
}

impl fmt::Display for Opcode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.mnemonic())
  }
}

/// A mnemonic that names none of the known opcodes
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown opcode `{0}`")]
pub struct UnknownOpcode(pub String);

impl FromStr for Opcode {
  type Err = UnknownOpcode;

  /// Mnemonics are matched case-insensitively
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::ALL
      .into_iter()
      .find(|op| op.mnemonic().eq_ignore_ascii_case(s))
      .ok_or_else(|| UnknownOpcode(s.to_owned()))
  }
}
