//! Console rendering of execution traces and the final machine state.

use std::fmt;

use crate::memory::Address;
use crate::registers::{Word, REGISTER_COUNT};
use crate::vm::{CacheDirective, Event, Trace, Vm};

impl fmt::Display for Trace {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "[PC={}] Executing: {}", self.pc, self.record)?;
    match self.event {
      Event::Retired => Ok(()),
      Event::Branch { target } => {
        write!(f, "\n[BNE] Branching from PC={} to PC={target}", self.pc)
      }
      Event::Jump { target } => write!(f, "\n[J] Jumping to PC={target}"),
      Event::Link {
        return_address,
        target,
      } => write!(
        f,
        "\n[JAL] Saving return address {return_address} in R7 and jumping to PC={target}"
      ),
      Event::Cache(CacheDirective::Disable) => write!(f, "\n[CACHE] Cache disabled."),
      Event::Cache(CacheDirective::Enable) => write!(f, "\n[CACHE] Cache enabled."),
      Event::Cache(CacheDirective::Flush) => write!(f, "\n[CACHE] Cache flushed."),
      Event::UnknownCacheCode(code) => write!(f, "\n[CACHE] Unknown cache code: {code}"),
      Event::UnknownOpcode(ref opcode) => write!(f, "\n[ERROR] Unknown instruction: {opcode}"),
      Event::Halt => write!(f, "\n[CPU] HALT encountered. Stopping execution."),
    }
  }
}

/// A snapshot of the machine once it has stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
  pub pc: usize,
  pub steps: u64,
  pub cache_enabled: bool,
  pub registers: [Word; REGISTER_COUNT],
  /// Sorted by address
  pub memory: Vec<(Address, Word)>,
}

impl Report {
  pub fn new(vm: &Vm) -> Self {
    Self {
      pc: vm.pc(),
      steps: vm.steps(),
      cache_enabled: vm.cache_enabled(),
      registers: *vm.registers().as_array(),
      memory: vm.memory().iter().collect(),
    }
  }
}

impl From<&Vm> for Report {
  fn from(vm: &Vm) -> Self {
    Self::new(vm)
  }
}

impl fmt::Display for Report {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "[CPU] Execution completed.")?;
    writeln!(
      f,
      "[CPU] {} instruction(s) executed, PC={}, cache {}.",
      self.steps,
      self.pc,
      if self.cache_enabled { "enabled" } else { "disabled" }
    )?;
    writeln!(f, "[CPU] Final Register States:")?;
    for (index, value) in self.registers.iter().enumerate() {
      writeln!(f, "R{index}: {value}")?;
    }
    writeln!(f)?;
    write!(f, "[CPU] Final Memory State:")?;
    for (address, value) in &self.memory {
      write!(f, "\nMEM[{address}] = {value}")?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  use pretty_assertions::assert_eq;

  use crate::instruction::InstructionRecord;
  use crate::memory::MemoryBus;
  use crate::region::Program;

  fn trace(event: Event) -> Trace {
    Trace {
      pc: 2,
      record: InstructionRecord::new("BNE", ["R1", "R2", "5"]),
      event,
    }
  }

  #[test]
  fn trace_lines() {
    assert_eq!(trace(Event::Retired).to_string(), "[PC=2] Executing: BNE R1, R2, 5");
    assert_eq!(
      trace(Event::Branch { target: 8 }).to_string(),
      "[PC=2] Executing: BNE R1, R2, 5\n[BNE] Branching from PC=2 to PC=8"
    );
    assert_eq!(
      trace(Event::Link {
        return_address: 3,
        target: 0
      })
      .to_string()
      .lines()
      .last(),
      Some("[JAL] Saving return address 3 in R7 and jumping to PC=0")
    );
    assert_eq!(
      trace(Event::UnknownOpcode("FOO".into())).to_string().lines().last(),
      Some("[ERROR] Unknown instruction: FOO")
    );
    assert_eq!(
      trace(Event::UnknownCacheCode(5)).to_string().lines().last(),
      Some("[CACHE] Unknown cache code: 5")
    );
  }

  #[test]
  fn final_state() {
    let memory: MemoryBus = [(16, 4), (-2, 9)].into_iter().collect();
    let mut vm = Vm::with_memory(memory);
    let program: Program = vec![
      InstructionRecord::new("ADDI", ["R31", "R0", "-1"]),
      InstructionRecord::new("CACHE", ["1"]),
      InstructionRecord::new("HALT", [] as [&str; 0]),
    ]
    .into();
    vm.run(&program).unwrap();

    let report = Report::new(&vm);
    assert_eq!(report.steps, 3);
    assert_eq!(report.pc, 2);
    assert!(report.cache_enabled);
    assert_eq!(report.registers[31], -1);
    assert_eq!(report.memory, vec![(-2, 9), (16, 4)]);

    let text = report.to_string();
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines[0], "[CPU] Execution completed.");
    assert_eq!(lines[1], "[CPU] 3 instruction(s) executed, PC=2, cache enabled.");
    assert_eq!(lines[3], "R0: 0");
    assert_eq!(lines[3 + 31], "R31: -1");
    assert_eq!(&lines[lines.len() - 3..], ["[CPU] Final Memory State:", "MEM[-2] = 9", "MEM[16] = 4"]);
  }
}
