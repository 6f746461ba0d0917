/// The type of a single register in our machine
pub type Word = i64;

/// Number of general-purpose registers, `R0..R31`
pub const REGISTER_COUNT: usize = 32;

/// The general-purpose register bank.
///
/// Unlike real MIPS, `R0` is not wired to zero: it can be written like any
/// other register. `R7` only becomes the link register because `JAL` writes
/// it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterFile {
  registers: [Word; REGISTER_COUNT],
}

impl RegisterFile {
  /// Create a register file with every register zeroed
  pub fn new() -> Self {
    Self {
      registers: [0; REGISTER_COUNT],
    }
  }

  /// Read register `index`.
  ///
  /// # Panics
  ///
  /// If `index` is not in `0..32`. Indices are validated when instructions
  /// are decoded, so reaching this is a bug in the caller.
  pub fn read(&self, index: usize) -> Word {
    self.registers[index]
  }

  /// Write register `index`, with the same panic condition as [`Self::read`]
  pub fn write(&mut self, index: usize, value: Word) {
    self.registers[index] = value;
  }

  /// All registers in index order
  pub fn iter(&self) -> impl Iterator<Item = (usize, Word)> + '_ {
    self.registers.iter().copied().enumerate()
  }

  pub fn as_array(&self) -> &[Word; REGISTER_COUNT] {
    &self.registers
  }
}

impl Default for RegisterFile {
  fn default() -> Self {
    Self::new()
  }
}
