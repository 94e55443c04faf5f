pub const KEYS: usize = 16;

/// The 16-key hex keypad plus the state of a pending `Fx0A`.
///
/// While waiting, the first key that goes from down to up is latched and the
/// wait ends; the waiting instruction picks the key up on its next execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keypad {
    down: [bool; KEYS],
    waiting: bool,
    released: Option<u8>,
}

impl Keypad {
    pub fn new() -> Self {
        Self::default()
    }

    /// Updates one key. Returns false if `code` is not a keypad key.
    pub fn set(&mut self, code: u8, down: bool) -> bool {
        let Some(slot) = self.down.get_mut(code as usize) else {
            return false;
        };
        let was_down = std::mem::replace(slot, down);
        if self.waiting && was_down && !down {
            self.released = Some(code);
            self.waiting = false;
        }
        true
    }

    pub fn is_down(&self, code: u8) -> bool {
        self.down[(code & 0x0F) as usize]
    }

    /// Consumes the latched release, or enters (or stays in) the waiting state.
    pub fn take_release(&mut self) -> Option<u8> {
        let key = self.released.take();
        if key.is_none() {
            self.waiting = true;
        }
        key
    }

    pub fn is_waiting(&self) -> bool {
        self.waiting
    }
}
