use crate::instruction::{DecodeError, Instruction, InstructionRecord, Register};
use crate::memory::MemoryBus;
use crate::region::Region;
use crate::registers::{RegisterFile, Word};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
  Active,
  Halted,
}

/// The last directive given by `CACHE`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheDirective {
  Disable,
  Enable,
  Flush,
}

/// What an executed instruction did beyond plain register/memory updates.
///
/// This is also what decides where the program counter goes next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
  /// Nothing to report, continue with the next instruction
  Retired,
  /// `BNE` was taken
  Branch { target: usize },
  Jump { target: usize },
  /// `JAL`, with the return address stored in the link register
  Link { return_address: usize, target: usize },
  Cache(CacheDirective),
  UnknownCacheCode(Word),
  UnknownOpcode(String),
  Halt,
}

/// One executed step, for whoever wants to report it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trace {
  pub pc: usize,
  pub record: InstructionRecord,
  pub event: Event,
}

/// A virtual machine for a small MIPS-like instruction set.
///
/// The program counter indexes instructions, not bytes, and every register
/// and memory word is a signed 64-bit integer. Arithmetic wraps on overflow.
#[derive(Debug, Clone)]
pub struct Vm {
  pc: usize,
  registers: RegisterFile,
  memory: MemoryBus,
  state: State,
  cache_enabled: bool,
  steps: u64,
}

/// An error that stopped execution
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
  #[error("invalid operand in `{record}` at PC={pc}: {source}")]
  Decode {
    pc: usize,
    record: InstructionRecord,
    #[source]
    source: DecodeError,
  },

  #[error("branch at PC={pc} targets {target}, before the start of the program")]
  TargetOutOfRange { pc: usize, target: i64 },

  #[error("step limit of {0} reached before the machine halted")]
  StepLimit(u64),
}

impl Vm {
  /// Create a new virtual machine with zeroed registers and empty memory
  pub fn new() -> Self {
    Self::with_memory(MemoryBus::new())
  }

  /// Create a new virtual machine over preloaded memory
  pub fn with_memory(memory: MemoryBus) -> Self {
    Self {
      pc: 0,
      registers: RegisterFile::new(),
      memory,
      state: State::Active,
      cache_enabled: false,
      steps: 0,
    }
  }

  pub fn pc(&self) -> usize {
    self.pc
  }

  pub fn state(&self) -> State {
    self.state
  }

  pub fn is_halted(&self) -> bool {
    self.state == State::Halted
  }

  pub fn cache_enabled(&self) -> bool {
    self.cache_enabled
  }

  /// Number of instructions executed so far
  pub fn steps(&self) -> u64 {
    self.steps
  }

  pub fn registers(&self) -> &RegisterFile {
    &self.registers
  }

  pub fn memory(&self) -> &MemoryBus {
    &self.memory
  }

  /// Step through a single instruction.
  ///
  /// Returns `Ok(None)` once the machine has halted, either through `HALT`
  /// or because the program counter left the program. An invalid operand
  /// halts the machine and is returned as an error.
  pub fn step<R>(&mut self, region: &R) -> Result<Option<Trace>, Error>
  where
    R: Region + ?Sized,
  {
    if self.state == State::Halted {
      return Ok(None);
    }
    let pc = self.pc;
    let Some(record) = region.fetch(pc) else {
      tracing::debug!(pc, "reached the end of the program");
      self.state = State::Halted;
      return Ok(None);
    };
    tracing::debug!(pc, instruction = %record, "executing");

    let instruction = match Instruction::decode(record) {
      Ok(instruction) => instruction,
      Err(source) => {
        return Err(self.fault(Error::Decode {
          pc,
          record: record.clone(),
          source,
        }))
      }
    };
    let mut task = Task::new(self, pc);
    let event = match task.run(&instruction) {
      Ok(event) => event,
      Err(e) => return Err(self.fault(e)),
    };

    self.steps += 1;
    self.advance(pc, &event);
    Ok(Some(Trace {
      pc,
      record: record.clone(),
      event,
    }))
  }

  /// Run until the machine halts, collecting every step
  pub fn run<R>(&mut self, region: &R) -> Result<Vec<Trace>, Error>
  where
    R: Region + ?Sized,
  {
    let mut traces = Vec::new();
    self.run_with(region, None, |trace| traces.push(trace.clone()))?;
    Ok(traces)
  }

  /// Run until the machine halts, handing each step to `on_step` as it
  /// happens. With a `limit`, give up once that many instructions have
  /// executed in this call without halting.
  ///
  /// Returns the number of instructions executed.
  pub fn run_with<R, F>(&mut self, region: &R, limit: Option<u64>, mut on_step: F) -> Result<u64, Error>
  where
    R: Region + ?Sized,
    F: FnMut(&Trace),
  {
    let mut executed = 0;
    loop {
      if let Some(limit) = limit.filter(|&limit| executed >= limit) {
        if self.state == State::Active && region.fetch(self.pc).is_some() {
          tracing::warn!(limit, pc = self.pc, "step limit reached");
          return Err(Error::StepLimit(limit));
        }
      }
      match self.step(region)? {
        Some(trace) => {
          executed += 1;
          on_step(&trace);
        }
        None => return Ok(executed),
      }
    }
  }

  fn advance(&mut self, pc: usize, event: &Event) {
    match *event {
      Event::Halt => self.state = State::Halted,
      Event::Branch { target } | Event::Jump { target } | Event::Link { target, .. } => {
        self.pc = target;
      }
      Event::Retired | Event::Cache(_) | Event::UnknownCacheCode(_) | Event::UnknownOpcode(_) => {
        self.pc = pc + 1;
      }
    }
  }

  fn fault(&mut self, error: Error) -> Error {
    tracing::error!(pc = self.pc, %error, "halting");
    self.state = State::Halted;
    error
  }
}

impl Default for Vm {
  fn default() -> Self {
    Self::new()
  }
}

struct Task<'vm> {
  vm: &'vm mut Vm,
  // the pc of the instruction being executed
  pc: usize,
}

impl<'vm> Task<'vm> {
  fn new(vm: &'vm mut Vm, pc: usize) -> Self {
    Self { vm, pc }
  }

  #[inline]
  fn reg(&self, r: Register) -> Word {
    self.vm.registers.read(r.index())
  }

  #[inline]
  fn set(&mut self, r: Register, value: Word) {
    self.vm.registers.write(r.index(), value);
  }

  fn run(&mut self, instruction: &Instruction) -> Result<Event, Error> {
    let event = match *instruction {
      Instruction::Add { rd, rs, rt } => add(self, rd, rs, rt),
      Instruction::Sub { rd, rs, rt } => sub(self, rd, rs, rt),
      Instruction::Addi { rt, rs, imm } => addi(self, rt, rs, imm),
      Instruction::Lw { rt, offset, base } => load_word(self, rt, offset, base),
      Instruction::Sw { rt, offset, base } => store_word(self, rt, offset, base),
      Instruction::Slt { rd, rs, rt } => set_less_than(self, rd, rs, rt),
      Instruction::Bne { rs, rt, offset } => branch_not_equal(self, rs, rt, offset)?,
      Instruction::J { target } => jump(self, target),
      Instruction::Jal { target } => jump_and_link(self, target),
      Instruction::Cache { code } => cache(self, code),
      Instruction::Halt => halt(self),
      Instruction::Unknown { ref opcode } => unknown(self, opcode),
    };
    Ok(event)
  }
}

// r[d] ← r[s] + r[t]
fn add(task: &mut Task<'_>, rd: Register, rs: Register, rt: Register) -> Event {
  let value = task.reg(rs).wrapping_add(task.reg(rt));
  task.set(rd, value);
  Event::Retired
}

// r[d] ← r[s] − r[t]
fn sub(task: &mut Task<'_>, rd: Register, rs: Register, rt: Register) -> Event {
  let value = task.reg(rs).wrapping_sub(task.reg(rt));
  task.set(rd, value);
  Event::Retired
}

// r[t] ← r[s] + vvvv
fn addi(task: &mut Task<'_>, rt: Register, rs: Register, imm: Word) -> Event {
  let value = task.reg(rs).wrapping_add(imm);
  task.set(rt, value);
  Event::Retired
}

// r[t] ← m[r[s] + o]
fn load_word(task: &mut Task<'_>, rt: Register, offset: Word, base: Register) -> Event {
  let address = task.reg(base).wrapping_add(offset);
  let value = task.vm.memory.read(address);
  task.set(rt, value);
  Event::Retired
}

// m[r[s] + o] ← r[t]
fn store_word(task: &mut Task<'_>, rt: Register, offset: Word, base: Register) -> Event {
  let address = task.reg(base).wrapping_add(offset);
  let value = task.reg(rt);
  task.vm.memory.write(address, value);
  Event::Retired
}

// r[d] ← r[s] < r[t] ? 1 : 0
fn set_less_than(task: &mut Task<'_>, rd: Register, rs: Register, rt: Register) -> Event {
  let value = Word::from(task.reg(rs) < task.reg(rt));
  task.set(rd, value);
  Event::Retired
}

// if r[s] ≠ r[t] : pc ← pc + 1 + o
fn branch_not_equal(task: &mut Task<'_>, rs: Register, rt: Register, offset: Word) -> Result<Event, Error> {
  if task.reg(rs) == task.reg(rt) {
    return Ok(Event::Retired);
  }
  let pc = task.pc;
  let target = pc as i128 + 1 + i128::from(offset);
  if target < 0 {
    return Err(Error::TargetOutOfRange {
      pc,
      target: target as i64,
    });
  }
  // anything past the end halts on the next fetch
  let target = usize::try_from(target).unwrap_or(usize::MAX);
  tracing::info!(from = pc, to = target, "branching");
  Ok(Event::Branch { target })
}

// pc ← a
fn jump(task: &mut Task<'_>, target: usize) -> Event {
  tracing::info!(from = task.pc, to = target, "jumping");
  Event::Jump { target }
}

// r[7] ← pc + 1 ; pc ← a
fn jump_and_link(task: &mut Task<'_>, target: usize) -> Event {
  let return_address = task.pc + 1;
  task.set(Register::LINK, return_address as Word);
  tracing::info!(from = task.pc, to = target, return_address, "jumping and linking");
  Event::Link {
    return_address,
    target,
  }
}

fn cache(task: &mut Task<'_>, code: Word) -> Event {
  let directive = match code {
    0 => CacheDirective::Disable,
    1 => CacheDirective::Enable,
    2 => CacheDirective::Flush,
    _ => {
      tracing::warn!(pc = task.pc, code, "unknown cache code");
      return Event::UnknownCacheCode(code);
    }
  };
  match directive {
    CacheDirective::Disable => task.vm.cache_enabled = false,
    CacheDirective::Enable => task.vm.cache_enabled = true,
    // nothing to flush
    CacheDirective::Flush => {}
  }
  tracing::info!(pc = task.pc, ?directive, "cache");
  Event::Cache(directive)
}

// (stop execution)
fn halt(task: &mut Task<'_>) -> Event {
  tracing::info!(pc = task.pc, "halt");
  Event::Halt
}

fn unknown(task: &mut Task<'_>, opcode: &str) -> Event {
  tracing::warn!(pc = task.pc, opcode, "unknown instruction, skipping");
  Event::UnknownOpcode(opcode.to_owned())
}
