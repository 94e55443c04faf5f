use std::time::Duration;

use crate::chip8::Chip8;
use crate::error::Fault;

/// Rate of the delay and sound timers.
pub const TIMER_HZ: u32 = 60;
/// CPU rate used when none is given.
pub const DEFAULT_STEPS_PER_SECOND: u32 = 700;

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Turns elapsed wall time into a whole number of ticks at a fixed rate.
///
/// Time is accumulated in nanoseconds scaled by the rate, so no rounding error
/// builds up: one second always yields exactly `hz` ticks, however it is sliced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cadence {
    hz: u32,
    acc: u128,
}

impl Cadence {
    /// A rate of 0 never ticks.
    pub fn new(hz: u32) -> Self {
        Cadence { hz, acc: 0 }
    }

    /// Adds `elapsed` and returns how many ticks fell due.
    pub fn advance(&mut self, elapsed: Duration) -> u64 {
        self.acc += elapsed.as_nanos() * self.hz as u128;
        let ticks = self.acc / NANOS_PER_SEC;
        self.acc %= NANOS_PER_SEC;
        ticks as u64
    }

    pub fn hz(&self) -> u32 {
        self.hz
    }

    /// Wall time per tick.
    pub fn period(&self) -> Duration {
        if self.hz == 0 {
            return Duration::MAX;
        }
        Duration::from_nanos((NANOS_PER_SEC / self.hz as u128) as u64)
    }
}

/// Ticks due in one call to [`Clock::advance`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Ticks {
    pub steps: u64,
    pub timer_ticks: u64,
}

/// Drives the CPU at a chosen rate and the timers at [`TIMER_HZ`], independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clock {
    cpu: Cadence,
    timers: Cadence,
}

impl Clock {
    pub fn new(steps_per_second: u32) -> Self {
        Clock {
            cpu: Cadence::new(steps_per_second),
            timers: Cadence::new(TIMER_HZ),
        }
    }

    pub fn steps_per_second(&self) -> u32 {
        self.cpu.hz()
    }

    /// Wall time between CPU steps; a host can sleep this long between calls.
    pub fn step_period(&self) -> Duration {
        self.cpu.period()
    }

    pub fn advance(&mut self, elapsed: Duration) -> Ticks {
        Ticks {
            steps: self.cpu.advance(elapsed),
            timer_ticks: self.timers.advance(elapsed),
        }
    }

    /// Advances by `elapsed` and applies the ticks that fell due to `chip8`:
    /// the CPU steps first, then the timers.
    ///
    /// Stops stepping at the first fault; timer ticks are applied regardless.
    pub fn run(&mut self, chip8: &mut Chip8, elapsed: Duration) -> Result<Ticks, Fault> {
        let ticks = self.advance(elapsed);
        let mut result = Ok(ticks);
        for _ in 0..ticks.steps {
            if let Err(fault) = chip8.step() {
                result = Err(fault);
                break;
            }
        }
        for _ in 0..ticks.timer_ticks {
            chip8.tick_timers();
        }
        result
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new(DEFAULT_STEPS_PER_SECOND)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chip8::{Config, Rom};
    use crate::rng::Sequence;

    // Splits one second into `parts` slices that add up to exactly one second.
    fn one_second_in(parts: u64) -> Vec<Duration> {
        let nanos = NANOS_PER_SEC as u64;
        let mut slices = vec![Duration::from_nanos(nanos / parts); parts as usize];
        if let Some(last) = slices.last_mut() {
            *last += Duration::from_nanos(nanos % parts);
        }
        slices
    }

    fn spin_forever() -> Chip8 {
        let mut chip8 = Chip8::with_rng(Config::default(), Box::new(Sequence::new(vec![0])));
        chip8
            .load(
                Rom::with_code(vec![
                    0x60, 0x3C, // set V0 to 60
                    0xF0, 0x15, // dt = V0
                    0xF0, 0x18, // st = V0
                    0x12, 0x06, // jump to self
                ])
                .unwrap(),
            )
            .unwrap();
        chip8
    }

    #[test]
    fn cadence_counts_whole_ticks() {
        let mut c = Cadence::new(60);
        assert_eq!(c.advance(Duration::from_millis(16)), 0);
        assert_eq!(c.advance(Duration::from_millis(1)), 1);
        assert_eq!(c.advance(Duration::from_millis(500)), 30);
    }

    #[test]
    fn cadence_is_exact_over_one_second() {
        for parts in [1, 7, 60, 61, 700, 1000, 1337] {
            let mut c = Cadence::new(60);
            let total: u64 = one_second_in(parts).into_iter().map(|d| c.advance(d)).sum();
            assert_eq!(total, 60, "{parts} slices");
        }
    }

    #[test]
    fn zero_rate_never_ticks() {
        let mut c = Cadence::new(0);
        assert_eq!(c.advance(Duration::from_secs(10)), 0);
        assert_eq!(c.period(), Duration::MAX);
    }

    #[test]
    fn clock_separates_cpu_and_timer_rates() {
        let mut clock = Clock::new(1000);
        let ticks = clock.advance(Duration::from_millis(100));
        assert_eq!(ticks, Ticks { steps: 100, timer_ticks: 6 });
        assert_eq!(clock.step_period(), Duration::from_millis(1));
    }

    #[test]
    fn timer_reaches_zero_after_one_second_at_any_cpu_rate() {
        for ips in [1, 60, 500, 700, 1000] {
            let mut chip8 = spin_forever();
            // load the timers before any wall time passes
            for _ in 0..3 {
                chip8.step().unwrap();
            }
            assert_eq!(chip8.registers().dt, 60);

            let mut clock = Clock::new(ips);
            let mut timer_ticks = 0;
            for slice in one_second_in(ips as u64) {
                timer_ticks += clock.run(&mut chip8, slice).unwrap().timer_ticks;
                if timer_ticks < 60 {
                    assert!(chip8.registers().dt > 0);
                }
            }
            assert_eq!(timer_ticks, 60, "{ips} steps/sec");
            assert_eq!(chip8.registers().dt, 0);
            assert!(!chip8.tone_active());

            // more time doesn't take it below zero
            clock.run(&mut chip8, Duration::from_millis(100)).unwrap();
            assert_eq!(chip8.registers().dt, 0);
        }
    }

    #[test]
    fn run_stops_stepping_on_fault() {
        let mut chip8 = Chip8::with_rng(Config::default(), Box::new(Sequence::new(vec![0])));
        chip8.load(Rom::with_code(vec![0x00, 0xEE]).unwrap()).unwrap();
        let mut clock = Clock::new(1000);
        let result = clock.run(&mut chip8, Duration::from_millis(10));
        assert_eq!(result, Err(Fault::StackUnderflow { pc: 0x200 }));
        assert_eq!(chip8.registers().pc, 0x200);
    }
}
