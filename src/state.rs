use std::ops::{Index, IndexMut};

use crate::error::Fault;
use crate::font::{FONT, FONT_ADDR};

// Number of bytes in the Chip8's memory.
pub const MEM_BYTES: usize = 4096;
// Where programs are loaded and where the PC starts.
pub const PROGRAM_START: u16 = 0x200;
// Depth of the call stack.
pub const STACK_DEPTH: usize = 16;

/// Byte-addressable memory. Every address is taken modulo [`MEM_BYTES`].
#[derive(Debug, Clone, PartialEq)]
pub struct Memory {
    bytes: [u8; MEM_BYTES],
}

impl Memory {
    /// Returns zeroed memory with the font table copied in.
    pub fn new() -> Self {
        let mut bytes = [0; MEM_BYTES];
        bytes[FONT_ADDR..FONT_ADDR + FONT.len()].copy_from_slice(&FONT);
        Memory { bytes }
    }

    pub fn read(&self, addr: u16) -> u8 {
        self.bytes[wrap(addr)]
    }

    pub fn write(&mut self, addr: u16, value: u8) {
        self.bytes[wrap(addr)] = value;
    }

    /// Reads the big-endian instruction word at `addr`.
    pub fn read_word(&self, addr: u16) -> u16 {
        u16::from_be_bytes([self.read(addr), self.read(addr.wrapping_add(1))])
    }

    /// Copies `code` in starting at `offset`, wrapping past the top of memory.
    pub fn load(&mut self, offset: u16, code: &[u8]) {
        for (i, &byte) in code.iter().enumerate() {
            self.write(offset.wrapping_add(i as u16), byte);
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

fn wrap(addr: u16) -> usize {
    addr as usize % MEM_BYTES
}

/// General registers V0-VF plus I, PC and the two timers.
#[derive(Debug, Clone, PartialEq)]
pub struct Registers {
    v: [u8; 16],
    pub index: u16,
    pub pc: u16,
    pub dt: u8,
    pub st: u8,
}

impl Registers {
    pub fn new() -> Self {
        Registers {
            v: [0; 16],
            index: 0,
            pc: PROGRAM_START,
            dt: 0,
            st: 0,
        }
    }

    /// Sets VF to 1 or 0.
    pub fn set_flag(&mut self, flag: bool) {
        self.v[0xF] = flag as u8;
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.v
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<u8> for Registers {
    type Output = u8;
    fn index(&self, reg: u8) -> &u8 {
        &self.v[(reg & 0x0F) as usize]
    }
}

impl IndexMut<u8> for Registers {
    fn index_mut(&mut self, reg: u8) -> &mut u8 {
        &mut self.v[(reg & 0x0F) as usize]
    }
}

/// Return addresses. `sp` is the next free slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Stack {
    slots: [u16; STACK_DEPTH],
    sp: u8,
}

impl Stack {
    pub fn new() -> Self {
        Stack { slots: [0; STACK_DEPTH], sp: 0 }
    }

    /// Pushes a return address. `pc` is the calling instruction, used only for the fault.
    pub fn push(&mut self, addr: u16, pc: u16) -> Result<(), Fault> {
        if self.sp as usize >= STACK_DEPTH {
            return Err(Fault::StackOverflow { pc });
        }
        self.slots[self.sp as usize] = addr;
        self.sp += 1;
        Ok(())
    }

    /// Pops the most recent return address.
    pub fn pop(&mut self, pc: u16) -> Result<u16, Fault> {
        if self.sp == 0 {
            return Err(Fault::StackUnderflow { pc });
        }
        self.sp -= 1;
        Ok(self.slots[self.sp as usize])
    }

    pub fn sp(&self) -> u8 {
        self.sp
    }

    /// The occupied slots, oldest first.
    pub fn frames(&self) -> &[u16] {
        &self.slots[..self.sp as usize]
    }
}

impl Default for Stack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_starts_with_font_and_zeroes() {
        let mem = Memory::new();
        assert_eq!(&mem.as_slice()[..FONT.len()], &FONT);
        assert!(mem.as_slice()[FONT.len()..].iter().all(|&b| b == 0));
    }

    #[test]
    fn memory_wraps_addresses() {
        let mut mem = Memory::new();
        mem.write(0x1005, 0xAB);
        assert_eq!(mem.read(0x005), 0xAB);
        mem.write(0xFFF, 0x12);
        mem.write(0x000, 0x34);
        assert_eq!(mem.read_word(0xFFF), 0x1234);
    }

    #[test]
    fn memory_loads_at_offset() {
        let mut mem = Memory::new();
        mem.load(PROGRAM_START, &[1, 2, 3]);
        assert_eq!(mem.read_word(0x200), 0x0102);
        assert_eq!(mem.read(0x202), 3);
        assert_eq!(mem.read(0x203), 0);
    }

    #[test]
    fn memory_load_wraps_past_the_top() {
        let mut mem = Memory::new();
        mem.load(0xFFF, &[0xAA, 0xBB]);
        assert_eq!(mem.read(0xFFF), 0xAA);
        assert_eq!(mem.read(0x000), 0xBB);

        mem.load(0x1010, &[0xCC]);
        assert_eq!(mem.read(0x010), 0xCC);
    }

    #[test]
    fn registers_mask_index_and_set_flag() {
        let mut regs = Registers::new();
        regs[0x1A] = 7; // only the low nibble selects a register
        assert_eq!(regs[0xA], 7);
        regs.set_flag(true);
        assert_eq!(regs[0xF], 1);
        regs.set_flag(false);
        assert_eq!(regs[0xF], 0);
        assert_eq!(regs.pc, PROGRAM_START);
    }

    #[test]
    fn stack_pushes_and_pops_in_order() {
        let mut stack = Stack::new();
        stack.push(0x202, 0x200).unwrap();
        stack.push(0x304, 0x302).unwrap();
        assert_eq!(stack.sp(), 2);
        assert_eq!(stack.frames(), &[0x202, 0x304]);
        assert_eq!(stack.pop(0x400), Ok(0x304));
        assert_eq!(stack.pop(0x306), Ok(0x202));
        assert_eq!(stack.sp(), 0);
    }

    #[test]
    fn stack_overflows_past_depth() {
        let mut stack = Stack::new();
        for i in 0..STACK_DEPTH as u16 {
            stack.push(i, 0x200).unwrap();
        }
        assert_eq!(stack.push(0, 0x210), Err(Fault::StackOverflow { pc: 0x210 }));
        assert_eq!(stack.sp() as usize, STACK_DEPTH);
    }

    #[test]
    fn stack_underflows_when_empty() {
        let mut stack = Stack::new();
        assert_eq!(stack.pop(0x200), Err(Fault::StackUnderflow { pc: 0x200 }));
        assert_eq!(stack.sp(), 0);
    }
}
