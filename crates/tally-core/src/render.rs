//! Tally-to-strip render loop
//!
//! Every frame is recomputed from the split point alone: pixels below it take
//! the lower colour, the rest the upper colour. Frames are filled into the
//! back half of a two-buffer arena and handed to the strip driver; the halves
//! swap roles after each transmission.

use embedded_hal_async::delay::DelayNs;
use log::{info, warn};
use smart_leds::{RGB8, SmartLedsWrite};

use crate::config::{BLUE, RED, RENDER_PERIOD};
use crate::tally::TallyStore;

/// Colours on either side of the split point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub below: RGB8,
    pub above: RGB8,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            below: RED,
            above: BLUE,
        }
    }
}

/// Paint `frame` as a two-colour split at `split_point`.
pub fn fill_split(frame: &mut [RGB8], split_point: usize, palette: Palette) {
    for (index, pixel) in frame.iter_mut().enumerate() {
        *pixel = if index < split_point {
            palette.below
        } else {
            palette.above
        };
    }
}

/// Two pixel buffers: the front one belongs to the driver, the back one to
/// the renderer.
pub struct FrameArena<const N: usize> {
    frames: [[RGB8; N]; 2],
    front: usize,
}

impl<const N: usize> Default for FrameArena<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> FrameArena<N> {
    pub const fn new() -> Self {
        Self {
            frames: [[RGB8::new(0, 0, 0); N]; 2],
            front: 0,
        }
    }

    /// Last transmitted frame.
    pub fn front(&self) -> &[RGB8; N] {
        &self.frames[self.front]
    }

    /// Frame being prepared.
    pub fn back_mut(&mut self) -> &mut [RGB8; N] {
        &mut self.frames[self.front ^ 1]
    }

    pub fn back(&self) -> &[RGB8; N] {
        &self.frames[self.front ^ 1]
    }

    /// Promote the back frame to front. Only an index changes.
    pub fn swap(&mut self) {
        self.front ^= 1;
    }
}

/// Owns the frame arena and the strip driver.
pub struct Renderer<D, const N: usize> {
    driver: D,
    arena: FrameArena<N>,
    palette: Palette,
    failing: bool,
}

impl<D, const N: usize> Renderer<D, N>
where
    D: SmartLedsWrite,
    RGB8: Into<D::Color>,
    D::Error: core::fmt::Debug,
{
    pub fn new(driver: D, palette: Palette) -> Self {
        Self {
            driver,
            arena: FrameArena::new(),
            palette,
            failing: false,
        }
    }

    pub fn arena(&self) -> &FrameArena<N> {
        &self.arena
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Fill the back frame for `split_point` and transmit it.
    ///
    /// The arena only swaps once the driver accepted the frame, so a failed
    /// write never becomes the front frame.
    pub fn render_frame(&mut self, split_point: usize) -> Result<(), D::Error> {
        let palette = self.palette;
        fill_split(self.arena.back_mut(), split_point, palette);
        self.driver.write(self.arena.back().iter().copied())?;
        self.arena.swap();
        Ok(())
    }

    /// Render one frame from the current tally.
    ///
    /// Transmission errors are logged once per failure streak and the loop
    /// keeps going.
    pub fn tick(&mut self, tally: &TallyStore) {
        let split_point = tally.read_snapshot().split_point;
        match self.render_frame(split_point) {
            Err(e) if !self.failing => {
                warn!("LED strip write failed: {:?}", e);
                self.failing = true;
            }
            Ok(()) if self.failing => {
                info!("LED strip write recovered");
                self.failing = false;
            }
            _ => {}
        }
    }

    /// Render forever at [`RENDER_PERIOD`].
    pub async fn run<T: DelayNs>(&mut self, tally: &TallyStore, delay: &mut T) -> ! {
        info!("LED strip started ({} pixels)", N);
        loop {
            self.tick(tally);
            delay.delay_ms(RENDER_PERIOD.as_millis() as u32).await;
        }
    }
}
