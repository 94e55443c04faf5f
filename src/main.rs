use std::io::{self, stdout, Stdout, Write};
use std::path::PathBuf;
use std::process;
use std::thread;
use std::time::{Duration, Instant};

use chip8vm::chip8::{Chip8, Config, Rom, MAX_ROM_BYTES};
use chip8vm::clock::{Cadence, Clock, DEFAULT_STEPS_PER_SECOND, TIMER_HZ};
use chip8vm::error::Fault;
use chip8vm::inspect::Inspector;
use chip8vm::keypad::KEYS;
use chip8vm::rng::SeededRng;
use chip8vm::screen::{Screen, WIDTH};
use clap::Parser;
use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, KeyboardEnhancementFlags,
    PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::style::{self, Stylize};
use crossterm::{cursor, execute, queue, terminal};
use log::{debug, info};
use thiserror::Error;

// How long a press is held when the terminal can't report releases.
const HOLD: Duration = Duration::from_millis(150);
// Longest the host loop sleeps between polls.
const MAX_NAP: Duration = Duration::from_millis(16);
// Simulated time per iteration in headless mode.
const HEADLESS_SLICE: Duration = Duration::from_millis(1);
// The state view sits right of the screen, which takes two columns per pixel.
const PANEL_COL: u16 = WIDTH as u16 * 2 + 2;
const PANEL_WIDTH: usize = 44;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
/// A Chip-8 interpreter for the terminal.
///
/// Keys 1234/qwer/asdf/zxcv map to the hex keypad. Tab shows the machine
/// state. Esc quits.
struct Cli {
    /// The binary ROM file to run
    #[arg(value_name = "ROM")]
    rom: PathBuf,

    /// Instructions executed per second
    #[arg(long, default_value_t = DEFAULT_STEPS_PER_SECOND, value_parser = clap::value_parser!(u32).range(1..))]
    ips: u32,

    /// Largest ROM accepted, in bytes
    #[arg(long, value_name = "BYTES", default_value_t = MAX_ROM_BYTES)]
    capacity: usize,

    /// Make Fx55/Fx65 advance I past the registers they copy
    #[arg(long)]
    index_increment: bool,

    /// Seed for the random number generator
    #[arg(long)]
    seed: Option<u64>,

    /// Run this many instructions without a terminal, then print the screen
    #[arg(long, value_name = "STEPS")]
    headless: Option<u64>,

    /// Show registers, stack, keys and memory beside the screen
    #[arg(long)]
    debug: bool,
}

#[derive(Debug, Error)]
enum RunError {
    #[error("terminal error: {0}")]
    Io(#[from] io::Error),

    #[error("halted: {0}")]
    Fault(#[from] Fault),
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

    let config = Config::default()
        .rom_capacity(args.capacity)
        .index_increment(args.index_increment);
    let rng = match args.seed {
        Some(seed) => SeededRng::with_seed(seed),
        None => SeededRng::from_entropy(),
    };
    let mut chip8 = Chip8::with_rng(config, Box::new(rng));
    if let Err(e) = chip8.load(rom) {
        eprintln!("error loading Chip-8 ROM: {e}");
        process::exit(1);
    }

    info!("running {} at {} instructions/sec", args.rom.display(), args.ips);
    let clock = Clock::new(args.ips);
    let result = match args.headless {
        Some(steps) => run_headless(&mut chip8, clock, steps, args.debug),
        None => run_terminal(&mut chip8, clock, args.debug),
    };
    if let Err(e) = result {
        eprintln!("{e}");
        process::exit(1);
    }
}

// Runs `steps` instructions against simulated time and prints the final screen,
// followed by the machine state when `debug` is set.
fn run_headless(
    chip8: &mut Chip8,
    mut clock: Clock,
    steps: u64,
    debug: bool,
) -> Result<(), RunError> {
    let mut done = 0;
    while done < steps {
        let ticks = clock.advance(HEADLESS_SLICE);
        for _ in 0..ticks.steps.min(steps - done) {
            chip8.step()?;
        }
        done += ticks.steps;
        for _ in 0..ticks.timer_ticks {
            chip8.tick_timers();
        }
    }
    print!("{}", chip8.screen());
    if debug {
        print!("{}", Inspector::new(chip8, clock.steps_per_second()));
    }
    Ok(())
}

fn run_terminal(chip8: &mut Chip8, mut clock: Clock, panel: bool) -> Result<(), RunError> {
    let mut out = stdout();
    let releases = terminal::supports_keyboard_enhancement().unwrap_or(false);
    debug!("terminal reports key releases: {releases}");

    terminal::enable_raw_mode()?;
    execute!(
        out,
        terminal::EnterAlternateScreen,
        terminal::Clear(terminal::ClearType::All),
        cursor::Hide
    )?;
    if releases {
        execute!(
            out,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        )?;
    }

    let result = host_loop(chip8, &mut clock, &mut out, releases, panel);

    let restored = restore_terminal(&mut out, releases);
    result?;
    restored?;
    Ok(())
}

fn restore_terminal(out: &mut Stdout, releases: bool) -> io::Result<()> {
    if releases {
        execute!(out, PopKeyboardEnhancementFlags)?;
    }
    execute!(out, cursor::Show, terminal::LeaveAlternateScreen)?;
    terminal::disable_raw_mode()
}

// Polls input, advances the machine by the wall time that passed, and repaints.
// Quitting is only checked here, between steps.
fn host_loop(
    chip8: &mut Chip8,
    clock: &mut Clock,
    out: &mut Stdout,
    releases: bool,
    mut panel: bool,
) -> Result<(), RunError> {
    let mut held: [Option<Instant>; KEYS] = [None; KEYS];
    let mut tone = false;
    let mut refresh = Cadence::new(TIMER_HZ);
    let mut last = Instant::now();

    loop {
        while event::poll(Duration::ZERO)? {
            match event::read()? {
                Event::Key(key) if is_quit(&key, releases) => return Ok(()),
                Event::Key(key) if key.code == KeyCode::Tab => {
                    if key.kind == KeyEventKind::Press {
                        panel = !panel;
                        queue!(out, terminal::Clear(terminal::ClearType::All))?;
                        draw(out, chip8.screen())?;
                    }
                }
                Event::Key(key) => {
                    let Some(code) = keymap(key.code) else { continue };
                    match key.kind {
                        KeyEventKind::Press | KeyEventKind::Repeat => {
                            chip8.set_key_state(code, true);
                            if !releases {
                                held[code as usize] = Some(Instant::now() + HOLD);
                            }
                        }
                        KeyEventKind::Release => chip8.set_key_state(code, false),
                    }
                }
                Event::Resize(..) => draw(out, chip8.screen())?,
                _ => {}
            }
        }

        let now = Instant::now();
        for (code, until) in held.iter_mut().enumerate() {
            if until.is_some_and(|t| t <= now) {
                *until = None;
                chip8.set_key_state(code as u8, false);
            }
        }

        let elapsed = now - last;
        last = now;
        clock.run(chip8, elapsed)?;

        if chip8.take_redraw() {
            draw(out, chip8.screen())?;
        }
        if refresh.advance(elapsed) > 0 && panel {
            draw_panel(out, chip8, clock.steps_per_second())?;
        }
        let active = chip8.tone_active();
        if active && !tone {
            queue!(out, style::Print('\x07'))?;
            out.flush()?;
        }
        tone = active;

        thread::sleep(clock.step_period().min(MAX_NAP));
    }
}

// Esc quits on release, or on press when the terminal never reports releases.
fn is_quit(key: &KeyEvent, releases: bool) -> bool {
    match key.code {
        KeyCode::Esc if releases => key.kind == KeyEventKind::Release,
        KeyCode::Esc => key.kind != KeyEventKind::Release,
        KeyCode::Char('c') => {
            key.kind == KeyEventKind::Press && key.modifiers.contains(KeyModifiers::CONTROL)
        }
        _ => false,
    }
}

// 1 2 3 C      1 2 3 4
// 4 5 6 D  <-  q w e r
// 7 8 9 E      a s d f
// A 0 B F      z x c v
fn keymap(code: KeyCode) -> Option<u8> {
    let KeyCode::Char(c) = code else {
        return None;
    };
    let key = match c.to_ascii_lowercase() {
        '1' => 0x1,
        '2' => 0x2,
        '3' => 0x3,
        '4' => 0xC,
        'q' => 0x4,
        'w' => 0x5,
        'e' => 0x6,
        'r' => 0xD,
        'a' => 0x7,
        's' => 0x8,
        'd' => 0x9,
        'f' => 0xE,
        'z' => 0xA,
        'x' => 0x0,
        'c' => 0xB,
        'v' => 0xF,
        _ => return None,
    };
    Some(key)
}

fn draw(out: &mut Stdout, screen: &Screen) -> io::Result<()> {
    for (y, row) in screen.rows().iter().enumerate() {
        queue!(out, cursor::MoveTo(0, y as u16))?;
        for &on in row {
            if on {
                queue!(out, style::PrintStyledContent("\u{2588}\u{2588}".yellow()))?;
            } else {
                queue!(out, style::Print("  "))?;
            }
        }
    }
    out.flush()
}

fn draw_panel(out: &mut Stdout, chip8: &Chip8, steps_per_second: u32) -> io::Result<()> {
    let view = Inspector::new(chip8, steps_per_second).to_string();
    for (y, line) in view.lines().enumerate() {
        queue!(
            out,
            cursor::MoveTo(PANEL_COL, y as u16),
            style::Print(format!("{line:<width$}", width = PANEL_WIDTH))
        )?;
    }
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keymap_covers_the_keypad_once() {
        let mut seen = [false; KEYS];
        for c in "1234qwerasdfzxcv".chars() {
            let key = keymap(KeyCode::Char(c)).unwrap();
            assert!(!seen[key as usize], "{c} maps to a taken key");
            seen[key as usize] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn keymap_ignores_case_and_other_keys() {
        assert_eq!(keymap(KeyCode::Char('Q')), Some(0x4));
        assert_eq!(keymap(KeyCode::Char('p')), None);
        assert_eq!(keymap(KeyCode::Enter), None);
    }

    fn key(code: KeyCode, modifiers: KeyModifiers, kind: KeyEventKind) -> KeyEvent {
        KeyEvent::new_with_kind(code, modifiers, kind)
    }

    #[test]
    fn escape_quits_on_release_when_releases_are_reported() {
        let none = KeyModifiers::NONE;
        assert!(!is_quit(&key(KeyCode::Esc, none, KeyEventKind::Press), true));
        assert!(!is_quit(&key(KeyCode::Esc, none, KeyEventKind::Repeat), true));
        assert!(is_quit(&key(KeyCode::Esc, none, KeyEventKind::Release), true));
    }

    #[test]
    fn escape_quits_on_press_without_release_events() {
        let none = KeyModifiers::NONE;
        assert!(is_quit(&key(KeyCode::Esc, none, KeyEventKind::Press), false));
        assert!(!is_quit(&key(KeyCode::Esc, none, KeyEventKind::Release), false));
    }

    #[test]
    fn ctrl_c_quits_on_press() {
        let ctrl = KeyModifiers::CONTROL;
        for releases in [true, false] {
            assert!(is_quit(&key(KeyCode::Char('c'), ctrl, KeyEventKind::Press), releases));
            assert!(!is_quit(&key(KeyCode::Char('c'), ctrl, KeyEventKind::Release), releases));
            assert!(!is_quit(
                &key(KeyCode::Char('c'), KeyModifiers::NONE, KeyEventKind::Press),
                releases
            ));
            assert!(!is_quit(&key(KeyCode::Tab, KeyModifiers::NONE, KeyEventKind::Press), releases));
        }
    }

    #[test]
    fn cli_parses_defaults() {
        let cli = Cli::try_parse_from(["chip8vm", "game.ch8"]).unwrap();
        assert_eq!(cli.ips, DEFAULT_STEPS_PER_SECOND);
        assert_eq!(cli.capacity, MAX_ROM_BYTES);
        assert!(!cli.index_increment);
        assert_eq!(cli.headless, None);
        assert!(!cli.debug);

        let cli = Cli::try_parse_from(["chip8vm", "game.ch8", "--debug"]).unwrap();
        assert!(cli.debug);
    }

    #[test]
    fn cli_rejects_zero_ips() {
        assert!(Cli::try_parse_from(["chip8vm", "game.ch8", "--ips", "0"]).is_err());
    }

    #[test]
    fn headless_run_draws_and_stops_at_fault() {
        let mut chip8 = Chip8::new();
        chip8
            .load(
                Rom::with_code(vec![
                    0xD0, 0x05, // draw glyph "0" at (0, 0)
                    0x12, 0x02, // jump to self
                ])
                .unwrap(),
            )
            .unwrap();
        run_headless(&mut chip8, Clock::new(1000), 50, true).unwrap();
        assert_eq!(chip8.screen().lit(), 14);

        let mut chip8 = Chip8::new();
        chip8.load(Rom::with_code(vec![0x00, 0xEE]).unwrap()).unwrap();
        let result = run_headless(&mut chip8, Clock::new(1000), 5, false);
        assert!(matches!(result, Err(RunError::Fault(f)) if f.is_stack_fault()));
    }
}
