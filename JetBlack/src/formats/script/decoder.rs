//! Script header, symbol tables and instruction decoding

use std::collections::BTreeMap;
use std::path::Path;

use super::{Instruction, Script, ScriptHeader};
use crate::error::{Error, Result};
use crate::utils::ByteReader;

/// Every offset in a script is relative to the end of this prefix.
pub const HEADER_SIZE: usize = 0x60;

const SYMBOL_SIZE: usize = 0x18;
const SYMBOL_NAME_SIZE: usize = SYMBOL_SIZE - 4;

/// How an opcode's operands are laid out after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operands {
    Zero,
    One,
    /// One operand holding an instruction address.
    Jump,
    Two,
    /// A word count including itself, then that many words less one.
    Variadic,
    /// A pair count, the pairs, then one trailing word.
    SwitchTable,
}

/// Operand layout for every opcode the engine defines.
pub const OPERANDS: [Operands; 0x83] = {
    use Operands::{Jump as J, One as O, SwitchTable as S, Two as T, Variadic as V, Zero as Z};
    [
        Z, O, O, O, O, O, O, O, O, Z, O, O, O, O, O, O, // 0x00
        O, O, O, O, O, O, O, Z, O, Z, O, Z, O, O, O, O, // 0x10
        O, Z, Z, Z, Z, Z, O, O, O, O, Z, Z, O, O, Z, Z, // 0x20
        Z, J, Z, J, O, J, J, J, J, J, J, J, J, J, J, J, // 0x30
        J, Z, Z, Z, O, O, O, O, Z, Z, Z, Z, Z, Z, Z, Z, // 0x40
        Z, Z, Z, Z, Z, Z, Z, O, O, Z, Z, O, O, Z, Z, Z, // 0x50
        Z, Z, Z, Z, Z, Z, Z, Z, Z, O, O, Z, Z, O, O, Z, // 0x60
        Z, Z, O, O, Z, O, O, O, O, O, Z, O, V, T, V, T, // 0x70
        Z, J, S, // 0x80
    ]
};

/// Operand layout of `opcode`, if it is a known instruction.
#[must_use]
pub fn operands(opcode: i32) -> Option<Operands> {
    usize::try_from(opcode).ok().and_then(|op| OPERANDS.get(op)).copied()
}

fn count_field(value: i32, field: &str) -> Result<usize> {
    usize::try_from(value).map_err(|_| Error::InvalidHeader {
        format: "script",
        message: format!("negative {field} {value}"),
    })
}

fn span(from: i32, to: i32, field: &str) -> Result<usize> {
    count_field(to.wrapping_sub(from), field)
}

impl ScriptHeader {
    fn parse(reader: &mut ByteReader<'_>) -> Result<Self> {
        Ok(Self {
            offset0: reader.read_i32()?,
            hw1: reader.read_i16()?,
            hw2: reader.read_i16()?,
            hw3: reader.read_i16()?,
            hw4: reader.read_i16()?,
            instructions_offset: reader.read_i32()?,
            strings_offset: reader.read_i32()?,
            offset3: reader.read_i32()?,
            offset4: reader.read_i32()?,
            offset5: reader.read_i32()?,
            num_internals: reader.read_i32()?,
            offset_internals: reader.read_i32()?,
            num_externals: reader.read_i32()?,
            offset_externals: reader.read_i32()?,
        })
    }
}

/// Decode a compiled script. An empty file is an empty script.
pub fn decode_script(data: &[u8]) -> Result<Script> {
    if data.is_empty() {
        return Ok(Script::default());
    }
    let mut reader = ByteReader::at(data, HEADER_SIZE);
    let header = ScriptHeader::parse(&mut reader)?;
    let mut script = Script {
        header,
        ..Script::default()
    };

    let num_internals = count_field(header.num_internals, "internal count")?;
    let num_externals = count_field(header.num_externals, "external count")?;

    if num_internals > 0 {
        let base = reader.resolve_offset(HEADER_SIZE, header.offset_internals, "internals")?;
        for i in 0..num_internals {
            let at = base + i * SYMBOL_SIZE;
            let address = reader.i32_at(at)?;
            let label = reader.fixed_string_at(at + 4, SYMBOL_NAME_SIZE)?;
            if let Ok(address) = usize::try_from(address) {
                script.labels.insert(address, label);
            } else {
                script
                    .warnings
                    .push(format!("internal label {label} has negative address {address}"));
            }
        }
    }

    if num_externals > 0 {
        let base = reader.resolve_offset(HEADER_SIZE, header.offset_externals, "externals")?;
        for i in 0..num_externals {
            let at = base + i * SYMBOL_SIZE;
            if reader.i32_at(at)? != 0 {
                script.warnings.push("found a non-zero external label address".to_string());
            }
            script.externals.push(reader.fixed_string_at(at + 4, SYMBOL_NAME_SIZE)?);
        }
    }

    let strings_len = span(header.strings_offset, header.offset3, "string table length")?;
    let strings_start = reader.resolve_offset(HEADER_SIZE, header.strings_offset, "string table")?;
    script.strings = read_string_table(reader.bytes_at(strings_start, strings_len)?);

    let code_len = span(header.instructions_offset, header.strings_offset, "instruction length")?;
    let code_start = reader.resolve_offset(HEADER_SIZE, header.instructions_offset, "instructions")?;
    script.instructions = decode_instructions(reader.bytes_at(code_start, code_len)?, &script.labels)?;

    for warning in &script.warnings {
        tracing::warn!("{warning}");
    }
    tracing::debug!(
        "decoded script: {} instructions, {} strings, {} externals",
        script.instructions.len(),
        script.strings.len(),
        script.externals.len()
    );
    Ok(script)
}

pub fn read_script<P: AsRef<Path>>(path: P) -> Result<Script> {
    decode_script(&std::fs::read(path)?)
}

/// Strings are packed into words with their bytes in reverse order. Each
/// string starts on a word boundary and is keyed by its offset in the table.
fn read_string_table(bytes: &[u8]) -> BTreeMap<usize, String> {
    let mut strings = BTreeMap::new();
    let mut current: Option<(usize, String)> = None;

    for (index, word) in bytes.chunks_exact(4).enumerate() {
        let (start, text) = current.get_or_insert_with(|| (index * 4, String::new()));
        match word.iter().rev().position(|&b| b == 0) {
            Some(end) => {
                text.extend(word.iter().rev().take(end).map(|&b| char::from(b)));
                strings.insert(*start, std::mem::take(text));
                current = None;
            }
            None => text.extend(word.iter().rev().map(|&b| char::from(b))),
        }
    }
    if let Some((start, _)) = current {
        tracing::debug!("unterminated string at {start:#x}");
    }
    strings
}

/// Decode the instruction stream. Addresses are byte offsets from the start
/// of `code`.
pub fn decode_instructions(code: &[u8], labels: &BTreeMap<usize, String>) -> Result<Vec<Instruction>> {
    let mut reader = ByteReader::new(code);
    let mut instructions = Vec::new();

    while reader.remaining() > 0 {
        let address = reader.position();
        let opcode = reader.read_i32()?;
        let layout = operands(opcode).ok_or(Error::UnknownScriptOpcode { opcode, address })?;

        let mut args = Vec::new();
        match layout {
            Operands::Zero => {}
            Operands::One | Operands::Jump => args.push(reader.read_i32()?),
            Operands::Two => {
                args.push(reader.read_i32()?);
                args.push(reader.read_i32()?);
            }
            Operands::Variadic => {
                let count = reader.read_i32()?;
                if count < 1 {
                    return Err(Error::InvalidHeader {
                        format: "script",
                        message: format!("argument count {count} at {address:#06x}"),
                    });
                }
                for _ in 1..count {
                    args.push(reader.read_i32()?);
                }
            }
            Operands::SwitchTable => {
                let pairs = reader.read_i32()?;
                for _ in 0..pairs {
                    args.push(reader.read_i32()?);
                    args.push(reader.read_i32()?);
                }
                args.push(reader.read_i32()?);
            }
        }

        instructions.push(Instruction {
            address,
            opcode: opcode as u8,
            args,
            label: labels.get(&address).cloned(),
        });
    }
    Ok(instructions)
}
