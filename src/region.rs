use crate::instruction::InstructionRecord;

/// A region of instructions
pub trait Region {
  fn instructions(&self) -> &[InstructionRecord];

  /// The instruction at index `pc`, if there is one
  fn fetch(&self, pc: usize) -> Option<&InstructionRecord> {
    self.instructions().get(pc)
  }
}

/// A `Program` is the ordered list of instructions our machine executes.
/// Control flow addresses instructions by their index in this list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
  instructions: Vec<InstructionRecord>,
}

impl Program {
  pub fn len(&self) -> usize {
    self.instructions.len()
  }

  pub fn is_empty(&self) -> bool {
    self.instructions.is_empty()
  }
}

impl From<Vec<InstructionRecord>> for Program {
  fn from(instructions: Vec<InstructionRecord>) -> Self {
    Self { instructions }
  }
}

impl FromIterator<InstructionRecord> for Program {
  fn from_iter<I: IntoIterator<Item = InstructionRecord>>(iter: I) -> Self {
    Self {
      instructions: iter.into_iter().collect(),
    }
  }
}

impl Region for Program {
  fn instructions(&self) -> &[InstructionRecord] {
    &self.instructions
  }
}

impl Region for [InstructionRecord] {
  fn instructions(&self) -> &[InstructionRecord] {
    self
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fetch_in_and_out_of_range() {
    let program: Program = vec![
      InstructionRecord::new("ADDI", ["R1", "R0", "1"]),
      InstructionRecord::new("HALT", [] as [&str; 0]),
    ]
    .into();
    assert_eq!(program.len(), 2);
    assert_eq!(program.fetch(1).map(InstructionRecord::opcode), Some("HALT"));
    assert_eq!(program.fetch(2), None);
    assert!(Program::default().is_empty());
  }
}
