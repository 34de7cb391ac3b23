//! Compiled level scripts
//!
//! Scripts are bytecode for a small stack machine. After a `0x60` byte
//! prefix comes a header locating the tables below; every offset is relative
//! to the end of the prefix.
//!
//! - internals: `0x18`-byte `(address, name)` entries labelling the code
//! - externals: `0x18`-byte entries naming the engine functions opcode
//!   `0x7B` calls by index
//! - strings: the string table, see [`decoder`]
//! - instructions: 32-bit opcodes, each followed by its operands
//!
//! [`disasm`] renders a decoded [`Script`] as a readable listing.

pub mod decoder;
pub mod disasm;

use std::collections::BTreeMap;

use serde::Serialize;

pub use decoder::{HEADER_SIZE, Operands, decode_script, read_script};

/// Fixed header fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScriptHeader {
    pub offset0: i32,
    pub hw1: i16,
    pub hw2: i16,
    pub hw3: i16,
    pub hw4: i16,
    pub instructions_offset: i32,
    pub strings_offset: i32,
    pub offset3: i32,
    pub offset4: i32,
    pub offset5: i32,
    pub num_internals: i32,
    pub offset_internals: i32,
    pub num_externals: i32,
    pub offset_externals: i32,
}

/// One decoded instruction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Instruction {
    /// Byte offset from the start of the code.
    pub address: usize,
    pub opcode: u8,
    pub args: Vec<i32>,
    /// Internal label attached to this address.
    pub label: Option<String>,
}

impl Instruction {
    /// Operand `index`, or 0 past the end of the operands.
    #[must_use]
    pub fn arg(&self, index: usize) -> i32 {
        self.args.get(index).copied().unwrap_or_default()
    }
}

/// A decoded script.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Script {
    pub header: ScriptHeader,
    /// Internal labels by code address.
    pub labels: BTreeMap<usize, String>,
    /// External function names, indexed by call number.
    pub externals: Vec<String>,
    /// String table entries by offset.
    pub strings: BTreeMap<usize, String>,
    pub instructions: Vec<Instruction>,
    /// Oddities found while decoding.
    pub warnings: Vec<String>,
}

impl Script {
    /// String table entry `id`.
    #[must_use]
    pub fn string(&self, id: i32) -> Option<&str> {
        let id = usize::try_from(id).ok()?;
        self.strings.get(&id).map(String::as_str)
    }

    /// Name of external function `index`.
    #[must_use]
    pub fn external(&self, index: i32) -> Option<&str> {
        let index = usize::try_from(index).ok()?;
        self.externals.get(index).map(String::as_str)
    }
}
