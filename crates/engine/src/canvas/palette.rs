/// Size of the colour index space. Every colour byte on a canvas must be below this.
pub const PALETTE_SIZE: usize = 64;

/// Number of distinct colours the display hardware can show at once.
pub const MAX_SIMULTANEOUS_COLOURS: usize = 16;

/// Maps colour indices to RGBA for presentation.
///
/// The default palette is the 2-bits-per-channel cube: index `r << 4 | g << 2 | b`
/// with each channel level in `0..4`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    entries: [[u8; 4]; PALETTE_SIZE],
}

impl Default for Palette {
    fn default() -> Self {
        Self::rgb222()
    }
}

impl Palette {
    pub fn rgb222() -> Self {
        let mut entries = [[0u8; 4]; PALETTE_SIZE];
        for (index, entry) in entries.iter_mut().enumerate() {
            let r = ((index >> 4) & 0b11) as u8;
            let g = ((index >> 2) & 0b11) as u8;
            let b = (index & 0b11) as u8;
            *entry = [r * 85, g * 85, b * 85, 255];
        }
        Self { entries }
    }

    pub fn rgba(&self, index: u8) -> [u8; 4] {
        self.entries
            .get(index as usize)
            .copied()
            .unwrap_or([0, 0, 0, 255])
    }

    /// Nearest entry by squared RGB distance; ties resolve to the lower index.
    pub fn nearest(&self, rgb: [u8; 3]) -> u8 {
        let mut best_index = 0usize;
        let mut best_distance = u32::MAX;
        for (index, entry) in self.entries.iter().enumerate() {
            let distance = (0..3)
                .map(|channel| {
                    let delta = entry[channel] as i32 - rgb[channel] as i32;
                    (delta * delta) as u32
                })
                .sum::<u32>();
            if distance < best_distance {
                best_distance = distance;
                best_index = index;
            }
        }
        best_index as u8
    }
}

/// Builds a colour index from 2-bit channel levels (`0..=3` each).
pub const fn rgb(r: u8, g: u8, b: u8) -> u8 {
    ((r & 0b11) << 4) | ((g & 0b11) << 2) | (b & 0b11)
}
