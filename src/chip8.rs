use std::fs;
use std::io;
use std::ops::Deref;
use std::path::Path;

use log::{debug, trace, warn};

use crate::error::{Fault, LoadError};
use crate::font::{FONT_ADDR, GLYPH_BYTES};
use crate::instr::Instr;
use crate::keypad::Keypad;
use crate::rng::{RandomSource, SeededRng};
use crate::screen::Screen;
use crate::state::{Memory, Registers, Stack, MEM_BYTES, PROGRAM_START};

// Maximum allowed bytes of a user's ROM.
pub const MAX_ROM_BYTES: usize = MEM_BYTES - PROGRAM_START as usize;
// Mask applied to every value written to the PC.
const ADDR_MASK: u16 = (MEM_BYTES - 1) as u16;

/// Behaviour that differs between interpreters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Largest ROM accepted by [`Chip8::load`]. Never more than [`MAX_ROM_BYTES`].
    pub rom_capacity: usize,
    /// Whether `Fx55`/`Fx65` leave I pointing past the last register copied.
    pub index_increment: bool,
}

impl Config {
    pub fn rom_capacity(mut self, bytes: usize) -> Self {
        self.rom_capacity = bytes.min(MAX_ROM_BYTES);
        self
    }

    pub fn index_increment(mut self, on: bool) -> Self {
        self.index_increment = on;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            rom_capacity: MAX_ROM_BYTES,
            index_increment: false,
        }
    }
}

/// A Chip8 interpreter.
///
/// The interpreter never blocks: `Fx0A` parks the PC on itself until a key
/// release is reported through [`Chip8::set_key_state`]. After a fault every
/// call to [`Chip8::step`] returns that fault until [`Chip8::reset`] or
/// [`Chip8::load`].
#[derive(Debug)]
pub struct Chip8 {
    memory: Memory,
    registers: Registers,
    stack: Stack,
    screen: Screen,
    keypad: Keypad,
    rng: Box<dyn RandomSource>,
    config: Config,
    rom: Option<Rom>,
    fault: Option<Fault>,
    redraw: bool,
}

impl Chip8 {
    /// Returns a new Chip8 interpreter with the default config.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Returns a new Chip8 interpreter whose random source is seeded from system entropy.
    pub fn with_config(config: Config) -> Self {
        Self::with_rng(config, Box::new(SeededRng::from_entropy()))
    }

    pub fn with_rng(config: Config, rng: Box<dyn RandomSource>) -> Self {
        Chip8 {
            memory: Memory::new(),
            registers: Registers::new(),
            stack: Stack::new(),
            screen: Screen::new(),
            keypad: Keypad::new(),
            rng,
            config,
            rom: None,
            fault: None,
            redraw: true,
        }
    }

    /// Resets the machine and loads `rom` at 0x200.
    ///
    /// This function returns Err if the ROM is larger than the configured capacity.
    pub fn load(&mut self, rom: Rom) -> Result<(), LoadError> {
        if rom.len() > self.config.rom_capacity {
            return Err(LoadError::TooLarge {
                size: rom.len(),
                capacity: self.config.rom_capacity,
            });
        }
        self.rom = Some(rom);
        self.reset();
        Ok(())
    }

    /// Returns every component to its power-on state and reloads the current ROM, if any.
    pub fn reset(&mut self) {
        self.memory = Memory::new();
        self.registers = Registers::new();
        self.stack = Stack::new();
        self.screen = Screen::new();
        self.keypad = Keypad::new();
        self.fault = None;
        self.redraw = true;
        if let Some(rom) = &self.rom {
            self.memory.load(PROGRAM_START, rom);
            debug!("loaded {} byte ROM at {:#05X}", rom.len(), PROGRAM_START);
        }
    }

    /// Fetches, decodes and executes one instruction.
    pub fn step(&mut self) -> Result<(), Fault> {
        if let Some(fault) = self.fault {
            return Err(fault);
        }

        let pc = self.registers.pc;
        let word = self.memory.read_word(pc);
        let instr = Instr::decode(word);
        trace!("{pc:#05X}  {word:04X}  {instr}");

        self.registers.pc = pc.wrapping_add(2) & ADDR_MASK;
        if let Err(fault) = self.execute(instr, pc) {
            warn!("halting: {fault}");
            self.registers.pc = pc;
            self.fault = Some(fault);
            return Err(fault);
        }
        Ok(())
    }

    // Applies `instr`, fetched from `pc`. The PC already points at the next instruction.
    fn execute(&mut self, instr: Instr, pc: u16) -> Result<(), Fault> {
        let v = &mut self.registers;
        match instr {
            Instr::Cls => {
                self.screen.clear();
                self.redraw = true;
            }

            Instr::Ret => {
                v.pc = self.stack.pop(pc)?;
            }

            Instr::Jp(nnn) => v.pc = nnn,

            Instr::Call(nnn) => {
                self.stack.push(v.pc, pc)?;
                v.pc = nnn;
            }

            Instr::SeImm { x, kk } => {
                if v[x] == kk {
                    self.skip();
                }
            }

            Instr::SneImm { x, kk } => {
                if v[x] != kk {
                    self.skip();
                }
            }

            Instr::SeReg { x, y } => {
                if v[x] == v[y] {
                    self.skip();
                }
            }

            Instr::SneReg { x, y } => {
                if v[x] != v[y] {
                    self.skip();
                }
            }

            Instr::LdImm { x, kk } => v[x] = kk,

            // VF is untouched, even on overflow
            Instr::AddImm { x, kk } => v[x] = v[x].wrapping_add(kk),

            Instr::Ld { x, y } => v[x] = v[y],
            Instr::Or { x, y } => v[x] |= v[y],
            Instr::And { x, y } => v[x] &= v[y],
            Instr::Xor { x, y } => v[x] ^= v[y],

            // The flag is written last so it wins when x is F.
            Instr::Add { x, y } => {
                let (sum, carry) = v[x].overflowing_add(v[y]);
                v[x] = sum;
                v.set_flag(carry);
            }

            Instr::Sub { x, y } => {
                let (vx, vy) = (v[x], v[y]);
                v[x] = vx.wrapping_sub(vy);
                v.set_flag(vx > vy);
            }

            Instr::Shr { x } => {
                let vx = v[x];
                v[x] = vx >> 1;
                v.set_flag(vx & 0x01 == 0x01);
            }

            Instr::Subn { x, y } => {
                let (vx, vy) = (v[x], v[y]);
                v[x] = vy.wrapping_sub(vx);
                v.set_flag(vy > vx);
            }

            Instr::Shl { x } => {
                let vx = v[x];
                v[x] = vx << 1;
                v.set_flag(vx & 0x80 == 0x80);
            }

            Instr::LdI(nnn) => v.index = nnn,

            Instr::JpV0(nnn) => v.pc = (nnn + v[0] as u16) & ADDR_MASK,

            Instr::Rnd { x, kk } => v[x] = self.rng.next_byte() & kk,

            Instr::Drw { x, y, n } => {
                let mut sprite = [0; 15];
                for (row, byte) in sprite.iter_mut().enumerate().take(n as usize) {
                    *byte = self.memory.read(v.index.wrapping_add(row as u16));
                }
                let collision = self.screen.draw(v[x], v[y], &sprite[..n as usize]);
                v.set_flag(collision);
                self.redraw = true;
            }

            Instr::Skp { x } => {
                if self.keypad.is_down(v[x]) {
                    self.skip();
                }
            }

            Instr::Sknp { x } => {
                if !self.keypad.is_down(v[x]) {
                    self.skip();
                }
            }

            Instr::LdVxDt { x } => v[x] = v.dt,

            Instr::LdKey { x } => match self.keypad.take_release() {
                Some(key) => v[x] = key,
                // not retired: fetch it again next step
                None => v.pc = pc,
            },

            Instr::LdDtVx { x } => v.dt = v[x],
            Instr::LdStVx { x } => v.st = v[x],

            Instr::AddI { x } => {
                let sum = v.index as u32 + v[x] as u32;
                v.index = sum as u16;
                v.set_flag(sum > 0xFFFF);
            }

            Instr::LdFont { x } => v.index = (FONT_ADDR + v[x] as usize * GLYPH_BYTES) as u16,

            Instr::Bcd { x } => {
                let val = v[x];
                let i = v.index;
                self.memory.write(i, val / 100);
                self.memory.write(i.wrapping_add(1), val / 10 % 10);
                self.memory.write(i.wrapping_add(2), val % 10);
            }

            Instr::Store { x } => {
                for r in 0..=x {
                    self.memory.write(v.index.wrapping_add(r as u16), v[r]);
                }
                if self.config.index_increment {
                    v.index = v.index.wrapping_add(x as u16 + 1);
                }
            }

            Instr::Load { x } => {
                for r in 0..=x {
                    v[r] = self.memory.read(v.index.wrapping_add(r as u16));
                }
                if self.config.index_increment {
                    v.index = v.index.wrapping_add(x as u16 + 1);
                }
            }

            Instr::Unknown(opcode) => return Err(Fault::UnknownOpcode { opcode, pc }),
        }
        Ok(())
    }

    fn skip(&mut self) {
        self.registers.pc = self.registers.pc.wrapping_add(2) & ADDR_MASK;
    }

    /// Applies one 60 Hz timer tick: each nonzero timer drops by one.
    pub fn tick_timers(&mut self) {
        self.registers.dt = self.registers.dt.saturating_sub(1);
        self.registers.st = self.registers.st.saturating_sub(1);
    }

    /// True while the sound timer is nonzero.
    pub fn tone_active(&self) -> bool {
        self.registers.st > 0
    }

    /// Reports a key going down or up. Codes above 0xF are ignored.
    pub fn set_key_state(&mut self, code: u8, down: bool) {
        if !self.keypad.set(code, down) {
            debug!("ignoring key code {code:#04X}");
        }
    }

    /// True while an `Fx0A` is waiting for a key release.
    pub fn is_awaiting_key(&self) -> bool {
        self.keypad.is_waiting()
    }

    /// Returns true once after each change to the screen.
    pub fn take_redraw(&mut self) -> bool {
        std::mem::take(&mut self.redraw)
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    pub fn keypad(&self) -> &Keypad {
        &self.keypad
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The fault that halted the machine, if any.
    pub fn fault(&self) -> Option<Fault> {
        self.fault
    }
}

impl Default for Chip8 {
    fn default() -> Self {
        Self::new()
    }
}

/// A Chip8 program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rom {
    code: Vec<u8>,
}

impl Rom {
    /// Returns a new Chip8 ROM.
    ///
    /// This function returns Err if `code.len() > MAX_ROM_BYTES || code.is_empty()`.
    pub fn with_code(code: Vec<u8>) -> Result<Self, LoadError> {
        Self::with_capacity(code, MAX_ROM_BYTES)
    }

    /// Like [`Rom::with_code`], with a smaller size limit.
    pub fn with_capacity(code: Vec<u8>, capacity: usize) -> Result<Self, LoadError> {
        let capacity = capacity.min(MAX_ROM_BYTES);
        if code.is_empty() {
            return Err(LoadError::Empty);
        }
        if code.len() > capacity {
            return Err(LoadError::TooLarge { size: code.len(), capacity });
        }
        Ok(Rom { code })
    }

    /// Reads a ROM file in full.
    pub fn from_file(path: impl AsRef<Path>, capacity: usize) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let code = fs::read(path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => LoadError::NotFound(path.to_path_buf()),
            _ => LoadError::NotReadable {
                path: path.to_path_buf(),
                source,
            },
        })?;
        Self::with_capacity(code, capacity)
    }
}

impl Deref for Rom {
    type Target = [u8];
    fn deref(&self) -> &Self::Target {
        &self.code
    }
}
