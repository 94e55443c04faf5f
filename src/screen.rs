use std::fmt;

pub const WIDTH: usize = 64;
pub const HEIGHT: usize = 32;

/// The 64x32 monochrome display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screen {
    pixels: [[bool; WIDTH]; HEIGHT],
}

impl Screen {
    pub fn new() -> Self {
        Screen { pixels: [[false; WIDTH]; HEIGHT] }
    }

    pub fn clear(&mut self) {
        self.pixels.fill([false; WIDTH]);
    }

    /// XORs each sprite row onto the screen with its top-left corner at (`x`, `y`).
    ///
    /// Both the origin and every pixel wrap around the edges. Returns true if any
    /// pixel was turned off.
    pub fn draw(&mut self, x: u8, y: u8, sprite: &[u8]) -> bool {
        let mut collision = false;
        for (row, bits) in sprite.iter().enumerate() {
            let py = (y as usize + row) % HEIGHT;
            for col in 0..8 {
                if bits & (0x80 >> col) == 0 {
                    continue;
                }
                let px = (x as usize + col) % WIDTH;
                let pixel = &mut self.pixels[py][px];
                collision |= *pixel;
                *pixel = !*pixel;
            }
        }
        collision
    }

    /// Returns the pixel at (`x`, `y`); both wrap.
    pub fn pixel(&self, x: usize, y: usize) -> bool {
        self.pixels[y % HEIGHT][x % WIDTH]
    }

    pub fn rows(&self) -> &[[bool; WIDTH]; HEIGHT] {
        &self.pixels
    }

    /// Number of lit pixels.
    pub fn lit(&self) -> usize {
        self.pixels.iter().flatten().filter(|&&p| p).count()
    }
}

impl Default for Screen {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.pixels {
            for &on in row {
                f.write_str(if on { "\u{2587} " } else { "_ " })?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
