use std::fmt;

/// The nibble fields of an instruction word.
///
/// ```text
/// op   [o___]  top nibble
/// x    [_x__]  register Vx, or the last register of V0..=Vx
/// y    [__y_]  register Vy
/// n    [___n]  4-bit immediate
/// kk   [__kk]  8-bit immediate
/// nnn  [_nnn]  12-bit address
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fields {
    pub op: u8,
    pub x: u8,
    pub y: u8,
    pub n: u8,
    pub kk: u8,
    pub nnn: u16,
}

impl From<u16> for Fields {
    fn from(word: u16) -> Self {
        Fields {
            op: (word >> 12) as u8,
            x: ((word >> 8) & 0x0F) as u8,
            y: ((word >> 4) & 0x0F) as u8,
            n: (word & 0x0F) as u8,
            kk: (word & 0xFF) as u8,
            nnn: word & 0x0FFF,
        }
    }
}

/// A decoded instruction. Words matching no known pattern decode to [`Instr::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instr {
    /// 00E0
    Cls,
    /// 00EE
    Ret,
    /// 1nnn
    Jp(u16),
    /// 2nnn
    Call(u16),
    /// 3xkk
    SeImm { x: u8, kk: u8 },
    /// 4xkk
    SneImm { x: u8, kk: u8 },
    /// 5xy0
    SeReg { x: u8, y: u8 },
    /// 6xkk
    LdImm { x: u8, kk: u8 },
    /// 7xkk
    AddImm { x: u8, kk: u8 },
    /// 8xy0
    Ld { x: u8, y: u8 },
    /// 8xy1
    Or { x: u8, y: u8 },
    /// 8xy2
    And { x: u8, y: u8 },
    /// 8xy3
    Xor { x: u8, y: u8 },
    /// 8xy4
    Add { x: u8, y: u8 },
    /// 8xy5
    Sub { x: u8, y: u8 },
    /// 8xy6
    Shr { x: u8 },
    /// 8xy7
    Subn { x: u8, y: u8 },
    /// 8xyE
    Shl { x: u8 },
    /// 9xy0
    SneReg { x: u8, y: u8 },
    /// Annn
    LdI(u16),
    /// Bnnn
    JpV0(u16),
    /// Cxkk
    Rnd { x: u8, kk: u8 },
    /// Dxyn
    Drw { x: u8, y: u8, n: u8 },
    /// Ex9E
    Skp { x: u8 },
    /// ExA1
    Sknp { x: u8 },
    /// Fx07
    LdVxDt { x: u8 },
    /// Fx0A
    LdKey { x: u8 },
    /// Fx15
    LdDtVx { x: u8 },
    /// Fx18
    LdStVx { x: u8 },
    /// Fx1E
    AddI { x: u8 },
    /// Fx29
    LdFont { x: u8 },
    /// Fx33
    Bcd { x: u8 },
    /// Fx55
    Store { x: u8 },
    /// Fx65
    Load { x: u8 },
    Unknown(u16),
}

impl Instr {
    pub fn decode(word: u16) -> Self {
        let Fields { op, x, y, n, kk, nnn } = Fields::from(word);
        match (op, n) {
            (0x0, _) if word == 0x00E0 => Instr::Cls,
            (0x0, _) if word == 0x00EE => Instr::Ret,
            (0x1, _) => Instr::Jp(nnn),
            (0x2, _) => Instr::Call(nnn),
            (0x3, _) => Instr::SeImm { x, kk },
            (0x4, _) => Instr::SneImm { x, kk },
            (0x5, 0x0) => Instr::SeReg { x, y },
            (0x6, _) => Instr::LdImm { x, kk },
            (0x7, _) => Instr::AddImm { x, kk },
            (0x8, 0x0) => Instr::Ld { x, y },
            (0x8, 0x1) => Instr::Or { x, y },
            (0x8, 0x2) => Instr::And { x, y },
            (0x8, 0x3) => Instr::Xor { x, y },
            (0x8, 0x4) => Instr::Add { x, y },
            (0x8, 0x5) => Instr::Sub { x, y },
            (0x8, 0x6) => Instr::Shr { x },
            (0x8, 0x7) => Instr::Subn { x, y },
            (0x8, 0xE) => Instr::Shl { x },
            (0x9, 0x0) => Instr::SneReg { x, y },
            (0xA, _) => Instr::LdI(nnn),
            (0xB, _) => Instr::JpV0(nnn),
            (0xC, _) => Instr::Rnd { x, kk },
            (0xD, _) => Instr::Drw { x, y, n },
            (0xE, _) if kk == 0x9E => Instr::Skp { x },
            (0xE, _) if kk == 0xA1 => Instr::Sknp { x },
            (0xF, _) => match kk {
                0x07 => Instr::LdVxDt { x },
                0x0A => Instr::LdKey { x },
                0x15 => Instr::LdDtVx { x },
                0x18 => Instr::LdStVx { x },
                0x1E => Instr::AddI { x },
                0x29 => Instr::LdFont { x },
                0x33 => Instr::Bcd { x },
                0x55 => Instr::Store { x },
                0x65 => Instr::Load { x },
                _ => Instr::Unknown(word),
            },
            _ => Instr::Unknown(word),
        }
    }
}

/// Mnemonics in the style of Cowgod's reference.
impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Instr::Cls => write!(f, "CLS"),
            Instr::Ret => write!(f, "RET"),
            Instr::Jp(nnn) => write!(f, "JP {nnn:#05X}"),
            Instr::Call(nnn) => write!(f, "CALL {nnn:#05X}"),
            Instr::SeImm { x, kk } => write!(f, "SE V{x:X}, {kk:#04X}"),
            Instr::SneImm { x, kk } => write!(f, "SNE V{x:X}, {kk:#04X}"),
            Instr::SeReg { x, y } => write!(f, "SE V{x:X}, V{y:X}"),
            Instr::LdImm { x, kk } => write!(f, "LD V{x:X}, {kk:#04X}"),
            Instr::AddImm { x, kk } => write!(f, "ADD V{x:X}, {kk:#04X}"),
            Instr::Ld { x, y } => write!(f, "LD V{x:X}, V{y:X}"),
            Instr::Or { x, y } => write!(f, "OR V{x:X}, V{y:X}"),
            Instr::And { x, y } => write!(f, "AND V{x:X}, V{y:X}"),
            Instr::Xor { x, y } => write!(f, "XOR V{x:X}, V{y:X}"),
            Instr::Add { x, y } => write!(f, "ADD V{x:X}, V{y:X}"),
            Instr::Sub { x, y } => write!(f, "SUB V{x:X}, V{y:X}"),
            Instr::Shr { x } => write!(f, "SHR V{x:X}"),
            Instr::Subn { x, y } => write!(f, "SUBN V{x:X}, V{y:X}"),
            Instr::Shl { x } => write!(f, "SHL V{x:X}"),
            Instr::SneReg { x, y } => write!(f, "SNE V{x:X}, V{y:X}"),
            Instr::LdI(nnn) => write!(f, "LD I, {nnn:#05X}"),
            Instr::JpV0(nnn) => write!(f, "JP V0, {nnn:#05X}"),
            Instr::Rnd { x, kk } => write!(f, "RND V{x:X}, {kk:#04X}"),
            Instr::Drw { x, y, n } => write!(f, "DRW V{x:X}, V{y:X}, {n:#X}"),
            Instr::Skp { x } => write!(f, "SKP V{x:X}"),
            Instr::Sknp { x } => write!(f, "SKNP V{x:X}"),
            Instr::LdVxDt { x } => write!(f, "LD V{x:X}, DT"),
            Instr::LdKey { x } => write!(f, "LD V{x:X}, K"),
            Instr::LdDtVx { x } => write!(f, "LD DT, V{x:X}"),
            Instr::LdStVx { x } => write!(f, "LD ST, V{x:X}"),
            Instr::AddI { x } => write!(f, "ADD I, V{x:X}"),
            Instr::LdFont { x } => write!(f, "LD F, V{x:X}"),
            Instr::Bcd { x } => write!(f, "LD B, V{x:X}"),
            Instr::Store { x } => write!(f, "LD [I], V{x:X}"),
            Instr::Load { x } => write!(f, "LD V{x:X}, [I]"),
            Instr::Unknown(word) => write!(f, "DW {word:#06X}"),
        }
    }
}
