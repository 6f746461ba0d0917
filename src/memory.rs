use std::collections::BTreeMap;

use crate::registers::Word;

/// A word address. Addresses are plain integers and may be negative.
pub type Address = i64;

/// Sparse word-addressed memory.
///
/// Every address reads as zero until it is written. Contents enumerate in
/// ascending address order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryBus {
  words: BTreeMap<Address, Word>,
}

impl MemoryBus {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn read(&self, address: Address) -> Word {
    self.words.get(&address).copied().unwrap_or(0)
  }

  pub fn write(&mut self, address: Address, value: Word) {
    self.words.insert(address, value);
  }

  /// Bulk-initialize from `(address, value)` pairs; later pairs win
  pub fn load<I>(&mut self, entries: I)
  where
    I: IntoIterator<Item = (Address, Word)>,
  {
    self.words.extend(entries);
  }

  /// Every written address with its value, lowest address first
  pub fn iter(&self) -> impl Iterator<Item = (Address, Word)> + '_ {
    self.words.iter().map(|(&address, &value)| (address, value))
  }

  pub fn len(&self) -> usize {
    self.words.len()
  }

  pub fn is_empty(&self) -> bool {
    self.words.is_empty()
  }
}

impl FromIterator<(Address, Word)> for MemoryBus {
  fn from_iter<I: IntoIterator<Item = (Address, Word)>>(iter: I) -> Self {
    let mut memory = Self::new();
    memory.load(iter);
    memory
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  use proptest::prelude::*;

  #[test]
  fn unset_reads_zero() {
    let memory = MemoryBus::new();
    assert_eq!(memory.read(0), 0);
    assert_eq!(memory.read(-17), 0);
    assert!(memory.is_empty());
  }

  #[test]
  fn write_overwrites() {
    let mut memory = MemoryBus::new();
    memory.write(8, 1);
    memory.write(8, 2);
    assert_eq!(memory.read(8), 2);
    assert_eq!(memory.len(), 1);
  }

  #[test]
  fn load_then_iter_is_sorted() {
    let mut memory = MemoryBus::new();
    memory.load([(30, 3), (-4, 1), (10, 2), (30, 4)]);
    let contents: Vec<_> = memory.iter().collect();
    assert_eq!(contents, vec![(-4, 1), (10, 2), (30, 4)]);
  }

  #[test]
  fn collect_from_pairs() {
    let memory: MemoryBus = [(1, 10), (0, 5)].into_iter().collect();
    assert_eq!(memory.read(1), 10);
    assert_eq!(memory.iter().next(), Some((0, 5)));
  }

  proptest! {
    #[test]
    fn last_write_wins(writes in prop::collection::vec((-64i64..64, any::<i64>()), 0..32)) {
      let mut memory = MemoryBus::new();
      for &(address, value) in &writes {
        memory.write(address, value);
      }
      for &(address, _) in &writes {
        let last = writes.iter().rev().find(|(a, _)| *a == address).map(|&(_, v)| v);
        prop_assert_eq!(Some(memory.read(address)), last);
      }
      let addresses: Vec<_> = memory.iter().map(|(a, _)| a).collect();
      prop_assert!(addresses.windows(2).all(|w| w[0] < w[1]));
    }
  }
}
