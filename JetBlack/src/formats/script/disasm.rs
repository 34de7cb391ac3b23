//! Script listings
//!
//! The listing follows a simple stack model: pushes of immediates are
//! remembered so that external calls can show their arguments. Jumps are
//! assumed not to change the stack depth.

use std::fmt::Write as _;

use super::{Instruction, Script};

/// Opcode calling the external function named by its operand.
const CALL_EXTERNAL: u8 = 0x7B;
/// Source line markers, left out of listings.
const DEBUG_LINE: u8 = 0x7D;

impl Script {
    fn text(&self, id: i32) -> String {
        self.string(id)
            .map_or_else(|| format!("[string {id:#x}]"), str::to_string)
    }

    /// Describe a call to external `name` given the stack before the call.
    /// The top of the stack holds the argument size, the arguments follow.
    fn describe_external(&self, name: &str, stack: &[i32]) -> String {
        let args: Vec<i32> = stack.iter().rev().skip(1).copied().collect();
        let int = |i: usize| args.get(i).copied().unwrap_or_default();
        let text = |i: usize| self.text(int(i));

        let detail = match name {
            "addHelpMessage" | "addQuest" | "soundSequence" | "startPropAnim" => {
                format!("{}, {}", text(1), text(0))
            }
            "startDialog" if stack.len() > 3 => format!("{}, {}, {}", text(0), text(1), int(2)),
            "moveTalkTarget" if stack.len() > 3 => format!("{}, {}, {}", int(0), int(1), int(2)),
            "startDialog" | "moveTalkTarget" => format!(" ** only {} entries on the stack", stack.len()),
            "getv" | "removeQuest" | "stopPropAnim" => text(0),
            "givePlayerItem" | "setNoCollide" | "callScript" => args
                .get(1)
                .map_or_else(|| text(0), |value| format!("{}, {value}", text(0))),
            "givePlayerExp" | "givePlayerGold" | "hideMonster" => int(0).to_string(),
            "loadMonsterSlot" => format!("{}, {}, {}", int(0), text(1), int(2)),
            "setTalkTarget" => format!(
                "{}, {}, {}, {}, {}, {}",
                text(0),
                int(1),
                int(2),
                int(3),
                int(4),
                int(5)
            ),
            "setv" if stack.len() >= 3 => format!("{} = {}", text(0), int(1)),
            _ => String::new(),
        };
        format!("{name} {detail}")
    }

    /// Describe one instruction and apply its effect on `stack`. Debug line
    /// markers produce nothing.
    pub fn describe_instruction(&self, inst: &Instruction, stack: &mut Vec<i32>) -> Option<String> {
        let a = inst.arg(0);
        let text = match inst.opcode {
            0x01 => format!("a = var {a}"),
            0x02 => format!("s3 = var {a}"),
            0x03 => format!("a = t4 var {a}"),
            0x04 => format!("s3 = t4 var {a}"),
            0x0B => format!("a = {a}"),
            0x0C => format!("reload a, set s3 to 0x{a:x}"),
            0x0F => format!("var {a} = acc"),
            0x11 => format!("t4 var {a} = a"),
            0x21 => "a = s3".to_string(),
            0x22 => "s3 = a".to_string(),
            0x23 => "exch s3, a".to_string(),
            0x24 => {
                stack.push(0);
                "push a".to_string()
            }
            0x25 => {
                stack.push(0);
                "push s3".to_string()
            }
            0x27 => {
                stack.push(a);
                format!("push 0x{a:x}")
            }
            // Variable pushes record the variable number, not its value.
            0x28 => {
                stack.push(a);
                format!("push var {a}")
            }
            0x29 => {
                stack.push(a);
                format!("push t4 var {a}")
            }
            0x2B => {
                stack.pop();
                "pop s3".to_string()
            }
            0x2C => {
                let words = usize::try_from(a / 4).unwrap_or(0);
                stack.truncate(stack.len().saturating_sub(words));
                format!("pop {a} bytes")
            }
            0x2E => "enter".to_string(),
            0x30 => "return".to_string(),
            0x31 => format!("call 0x{a:x}"),
            0x33 => format!("jump to 0x{a:04X}"),
            0x35 => format!("jump if a == 0 to 0x{a:04x}"),
            0x36 => format!("jump if a != 0 to 0x{a:04X}"),
            0x37 => format!("jump if a == s3 to 0x{a:04X}"),
            0x38 => format!("jump if a != s3 to 0x{a:04X}"),
            0x3D => format!("jump if a < s3 to 0x{a:04X}"),
            0x3E => format!("jump if a <= s3 to 0x{a:04X}"),
            0x3F => format!("jump if a > s3 to 0x{a:04X}"),
            0x40 => format!("jump if a >= s3 to 0x{a:04X}"),
            0x4A => "a = s3 / a, s3 = remainder".to_string(),
            0x54 => "a <= 0".to_string(),
            0x55 => "neg a".to_string(),
            0x57 => format!("a += {a}"),
            0x59 => "a = 0".to_string(),
            0x5A => "reload a, set s3 to 0".to_string(),
            0x5B => format!("clear var {a}"),
            0x5C => format!("clear t4 var {a}"),
            0x69 => format!("(a xor 0x{a:x}) <= 0"),
            0x6D => format!("inc var {a}"),
            0x6E => format!("inc t4 var {a}"),
            0x72 => format!("dec var {a}"),
            CALL_EXTERNAL => {
                let name = self.external(a).unwrap_or("[NULL]");
                self.describe_external(name, stack)
            }
            DEBUG_LINE => return None,
            0x81 => format!("switch(a) @ 0x{a:x}"),
            0x82 => {
                let mut text = "switch vector table".to_string();
                for arg in &inst.args {
                    text.push_str(&format!(" 0x{arg:x}"));
                }
                text
            }
            opcode => {
                let mut text = format!("unknown opcode 0x{opcode:x}");
                for arg in &inst.args {
                    text.push_str(&format!(" 0x{arg:x}"));
                }
                text
            }
        };

        let mut line = String::new();
        if let Some(label) = &inst.label {
            line.push_str(&format!("\n{label}:\n"));
        }
        line.push_str(&format!("{:04x}  {text}", inst.address));
        Some(line)
    }

    /// Render the header, symbol tables, strings and code as text.
    #[must_use]
    pub fn disassemble(&self) -> String {
        let mut out = String::new();
        let header = &self.header;
        // Writing to a String cannot fail.
        let _ = self.write_tables(&mut out);

        out.push_str("\nScript\n~~~~~~\n");
        let mut stack = Vec::new();
        for inst in &self.instructions {
            if let Some(line) = self.describe_instruction(inst, &mut stack) {
                out.push_str(&line);
                out.push('\n');
            }
        }
        tracing::debug!(
            "disassembled {} instructions from {:#x}",
            self.instructions.len(),
            header.instructions_offset
        );
        out
    }

    fn write_tables(&self, out: &mut String) -> std::fmt::Result {
        let header = &self.header;
        if !self.warnings.is_empty() {
            out.push_str("Warnings:\n");
            for warning in &self.warnings {
                writeln!(out, "{warning}")?;
            }
            out.push('\n');
        }

        writeln!(out, "Offset0: 0x{:04X}", header.offset0)?;
        writeln!(out, "hw1: 0x{:04X}", header.hw1)?;
        writeln!(out, "hw2: 0x{:04X}", header.hw2)?;
        writeln!(out, "hw3: 0x{:04X}", header.hw3)?;
        writeln!(out, "hw4: 0x{:04X}", header.hw4)?;
        writeln!(out, "Offset3: 0x{:04X}", header.offset3)?;
        writeln!(out, "Offset4: 0x{:04X}", header.offset4)?;
        writeln!(out, "Offset5: 0x{:04X}", header.offset5)?;

        out.push_str("\nInternals\n~~~~~~~~~\n");
        writeln!(
            out,
            "{} internals at  0x{:04X}\n",
            header.num_internals, header.offset_internals
        )?;
        for (address, label) in &self.labels {
            writeln!(out, "{label}: 0x{address:04X}")?;
        }

        out.push_str("\nExternals\n~~~~~~~~~\n");
        writeln!(
            out,
            "{} externals at  0x{:04X}\n",
            header.num_externals, header.offset_externals
        )?;
        for (index, name) in self.externals.iter().enumerate() {
            writeln!(out, "{index}: {name}")?;
        }

        out.push_str("\nStrings\n~~~~~~~\n");
        for (offset, text) in &self.strings {
            writeln!(out, "0x{offset:04X}: {text}")?;
        }
        Ok(())
    }
}
