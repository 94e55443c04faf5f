use std::fmt;

use crate::chip8::Chip8;

// Bytes of memory shown around the PC, and how many go on one row.
const PAGE_BYTES: u16 = 0x80;
const ROW_BYTES: u16 = 8;

// Keypad keys as they sit on the physical pad.
const KEY_GRID: [[u8; 4]; 4] = [
    [0x1, 0x2, 0x3, 0xC],
    [0x4, 0x5, 0x6, 0xD],
    [0x7, 0x8, 0x9, 0xE],
    [0xA, 0x0, 0xB, 0xF],
];

/// A text view of everything a `Chip8` holds apart from the screen.
///
/// One `Display` line per row, so hosts can place the lines wherever they like.
pub struct Inspector<'a> {
    chip8: &'a Chip8,
    steps_per_second: u32,
}

impl<'a> Inspector<'a> {
    pub fn new(chip8: &'a Chip8, steps_per_second: u32) -> Self {
        Inspector { chip8, steps_per_second }
    }
}

impl fmt::Display for Inspector<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let chip8 = self.chip8;
        let regs = chip8.registers();
        let stack = chip8.stack();

        writeln!(f, "PC {:#05X}  I {:#06X}  SP {:>2}", regs.pc, regs.index, stack.sp())?;
        writeln!(f, "DT {:>3}  ST {:>3}  {} ips", regs.dt, regs.st, self.steps_per_second)?;
        for (r, vals) in regs.as_slice().chunks(4).enumerate() {
            for (c, val) in vals.iter().enumerate() {
                if c > 0 {
                    write!(f, "  ")?;
                }
                write!(f, "V{:X} {val:02X}", r * 4 + c)?;
            }
            writeln!(f)?;
        }

        write!(f, "stack")?;
        if stack.frames().is_empty() {
            write!(f, " -")?;
        }
        for addr in stack.frames() {
            write!(f, " {addr:03X}")?;
        }
        writeln!(f)?;

        let keypad = chip8.keypad();
        for (r, keys) in KEY_GRID.iter().enumerate() {
            write!(f, "{}", if r == 0 { "keys " } else { "     " })?;
            for (c, &key) in keys.iter().enumerate() {
                if c > 0 {
                    write!(f, " ")?;
                }
                if keypad.is_down(key) {
                    write!(f, "{key:X}")?;
                } else {
                    write!(f, ".")?;
                }
            }
            if r == 0 && chip8.is_awaiting_key() {
                write!(f, "  waiting")?;
            }
            writeln!(f)?;
        }

        let config = chip8.config();
        writeln!(
            f,
            "capacity {:#05X}  index increment {}",
            config.rom_capacity,
            if config.index_increment { "on" } else { "off" }
        )?;
        match chip8.fault() {
            Some(fault) => writeln!(f, "halted: {fault}")?,
            None => writeln!(f, "running")?,
        }

        let memory = chip8.memory();
        let page = regs.pc & !(PAGE_BYTES - 1);
        for row in (page..page + PAGE_BYTES).step_by(ROW_BYTES as usize) {
            let mark = if (row..row + ROW_BYTES).contains(&regs.pc) { '>' } else { ' ' };
            write!(f, "{mark}{row:03X}:")?;
            for addr in row..row + ROW_BYTES {
                write!(f, " {:02X}", memory.read(addr))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
