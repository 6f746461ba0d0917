//! A simulator for a tiny MIPS-like instruction set
//!
//! Programs are lists of textual instructions (`ADD`, `SUB`, `ADDI`, `LW`,
//! `SW`, `SLT`, `BNE`, `J`, `JAL`, `CACHE`, `HALT`) executed against 32
//! general-purpose registers and a sparse word memory. Branch and jump
//! targets count instructions, not bytes.

pub mod instruction;
pub mod loader;
pub mod memory;
pub mod opcode;
pub mod region;
pub mod registers;
pub mod report;
pub mod vm;
