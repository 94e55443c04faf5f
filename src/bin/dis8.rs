use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

use chip8vm::chip8::{Rom, MAX_ROM_BYTES};
use chip8vm::instr::Instr;
use chip8vm::state::PROGRAM_START;
use clap::Parser;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
/// A Chip-8 disassembler.
struct Cli {
    /// The binary ROM file to disassemble
    #[arg(long, value_name = "BINARY")]
    rom: PathBuf,

    /// Largest ROM accepted, in bytes
    #[arg(long, value_name = "BYTES", default_value_t = MAX_ROM_BYTES)]
    capacity: usize,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Cli::parse();
    let rom = match Rom::from_file(&args.rom, args.capacity) {
        Ok(rom) => rom,
        Err(e) => {
            eprintln!("error reading Chip-8 ROM: {e}");
            process::exit(1);
        }
    };

    let mut out = io::stdout().lock();
    if let Err(e) = disassemble(&rom, &mut out) {
        if e.kind() != io::ErrorKind::BrokenPipe {
            eprintln!("error writing disassembly: {e}");
            process::exit(1);
        }
    }
}

// Writes one line per word, addressed as if loaded at 0x200. A trailing odd byte is a DB.
fn disassemble(code: &[u8], out: &mut impl Write) -> io::Result<()> {
    let mut addr = PROGRAM_START;
    for chunk in code.chunks(2) {
        match *chunk {
            [hi, lo] => {
                let word = u16::from_be_bytes([hi, lo]);
                writeln!(out, "{addr:03X}  {word:04X}  {}", Instr::decode(word))?;
            }
            [byte] => writeln!(out, "{addr:03X}  {byte:02X}    DB {byte:#04X}")?,
            _ => {}
        }
        addr += 2;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(code: &[u8]) -> String {
        let mut out = Vec::new();
        disassemble(code, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn disassembles_words_from_program_start() {
        let text = listing(&[
            0x00, 0xE0, // clear
            0xA2, 0x0A, // set index register
            0xDA, 0xB5, // draw
        ]);
        assert_eq!(
            text,
            "200  00E0  CLS\n\
             202  A20A  LD I, 0x20A\n\
             204  DAB5  DRW VA, VB, 0x5\n"
        );
    }

    #[test]
    fn marks_unknown_words_and_odd_tail() {
        let text = listing(&[0xFF, 0xFF, 0x12]);
        assert_eq!(text, "200  FFFF  DW 0xFFFF\n202  12    DB 0x12\n");
    }
}
