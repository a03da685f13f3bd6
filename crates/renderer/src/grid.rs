//! Host-side generation textures and the reference transition kernel.
//!
//! A [`Generation`] stores RGBA8 texels exactly as the GPU textures do:
//! RGB is always zero and alpha is 255 for a live cell, 0 for a dead one.
//! [`step_into`] evaluates the same rule as the compute program, including
//! its sampling model: neighbours are fetched at `tex_coord ± delta` with
//! nearest filtering and clamp-to-edge addressing, so border cells see
//! their own edge duplicated outward instead of wrapping.

use rand::distributions::{Bernoulli, Distribution};
use rand::Rng;

use crate::error::RendererError;
use crate::types::{DeltaUniform, GridSize};

pub const BYTES_PER_TEXEL: usize = 4;

const ALIVE: u8 = u8::MAX;

/// Offsets of the eight neighbours in texel units.
const NEIGHBOURS: [(f32, f32); 8] = [
    (1.0, 0.0),
    (-1.0, 0.0),
    (0.0, 1.0),
    (0.0, -1.0),
    (1.0, 1.0),
    (-1.0, 1.0),
    (1.0, -1.0),
    (-1.0, -1.0),
];

/// Classic B3/S23 transition on a real-valued neighbour count. Mirrors
/// [`crate::COMPUTE_FRAGMENT_GLSL`].
pub fn next_state(alive: bool, neighbours: f32) -> bool {
    (alive && (neighbours == 2.0 || neighbours == 3.0)) || (!alive && neighbours == 3.0)
}

/// Per-cell seeding distribution; rejects NaN and anything outside [0, 1].
pub fn seed_distribution(probability: f64) -> Result<Bernoulli, RendererError> {
    Bernoulli::new(probability).map_err(|_| RendererError::InvalidProbability(probability))
}

/// Fills `texels` with transparent black RGB and an alpha that is 1.0 with
/// the given probability, independently per texel.
pub fn fill_random<R: Rng + ?Sized>(
    texels: &mut [u8],
    probability: f64,
    rng: &mut R,
) -> Result<(), RendererError> {
    let cells = seed_distribution(probability)?;
    for texel in texels.chunks_exact_mut(BYTES_PER_TEXEL) {
        texel[..3].fill(0);
        texel[3] = if cells.sample(rng) { ALIVE } else { 0 };
    }
    Ok(())
}

#[derive(Clone, PartialEq, Eq)]
pub struct Generation {
    size: GridSize,
    texels: Vec<u8>,
}

impl std::fmt::Debug for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Generation")
            .field("size", &self.size)
            .field("population", &self.population())
            .finish()
    }
}

impl Generation {
    pub fn dead(size: GridSize) -> Self {
        Self {
            size,
            texels: vec![0; size.texel_count() * BYTES_PER_TEXEL],
        }
    }

    pub fn seeded<R: Rng + ?Sized>(
        size: GridSize,
        probability: f64,
        rng: &mut R,
    ) -> Result<Self, RendererError> {
        let mut generation = Self::dead(size);
        fill_random(&mut generation.texels, probability, rng)?;
        Ok(generation)
    }

    /// Builds a generation whose only live cells are `alive`.
    ///
    /// Coordinates outside the grid are ignored.
    pub fn from_cells<I>(size: GridSize, alive: I) -> Self
    where
        I: IntoIterator<Item = (u32, u32)>,
    {
        let mut generation = Self::dead(size);
        for (x, y) in alive {
            if x < size.width() && y < size.height() {
                generation.set_alive(x, y, true);
            }
        }
        generation
    }

    /// Wraps raw RGBA8 texel data.
    pub fn from_texels(size: GridSize, texels: Vec<u8>) -> Result<Self, RendererError> {
        let expected = size.texel_count() * BYTES_PER_TEXEL;
        if texels.len() != expected {
            return Err(RendererError::UploadSize {
                size,
                expected,
                actual: texels.len(),
            });
        }
        Ok(Self { size, texels })
    }

    pub fn size(&self) -> GridSize {
        self.size
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.size.width() as usize + x as usize) * BYTES_PER_TEXEL
    }

    pub fn texel(&self, x: u32, y: u32) -> [u8; 4] {
        let offset = self.offset(x, y);
        let mut texel = [0; 4];
        texel.copy_from_slice(&self.texels[offset..offset + BYTES_PER_TEXEL]);
        texel
    }

    pub fn is_alive(&self, x: u32, y: u32) -> bool {
        self.texel(x, y)[3] == ALIVE
    }

    pub fn set_alive(&mut self, x: u32, y: u32, alive: bool) {
        let offset = self.offset(x, y);
        self.texels[offset..offset + 3].fill(0);
        self.texels[offset + 3] = if alive { ALIVE } else { 0 };
    }

    pub fn population(&self) -> usize {
        self.texels
            .chunks_exact(BYTES_PER_TEXEL)
            .filter(|texel| texel[3] == ALIVE)
            .count()
    }

    pub fn alive_fraction(&self) -> f64 {
        self.population() as f64 / self.size.texel_count() as f64
    }

    /// True when every texel is `(0, 0, 0, 0)` or `(0, 0, 0, 1)`.
    pub fn is_binary(&self) -> bool {
        self.texels.chunks_exact(BYTES_PER_TEXEL).all(|texel| {
            texel[..3].iter().all(|&channel| channel == 0) && (texel[3] == 0 || texel[3] == ALIVE)
        })
    }

    /// Live cells in row-major order.
    pub fn live_cells(&self) -> Vec<(u32, u32)> {
        let width = self.size.width();
        self.texels
            .chunks_exact(BYTES_PER_TEXEL)
            .enumerate()
            .filter(|(_, texel)| texel[3] == ALIVE)
            .map(|(index, _)| (index as u32 % width, index as u32 / width))
            .collect()
    }

    /// Alpha in `[0, 1]` at normalised coordinates, nearest filtering with
    /// clamp-to-edge addressing.
    pub fn sample(&self, u: f32, v: f32) -> f32 {
        let x = texel_index(u, self.size.width());
        let y = texel_index(v, self.size.height());
        f32::from(self.texel(x, y)[3]) / f32::from(ALIVE)
    }

    /// Sum of neighbour aliveness as seen by the compute program.
    pub fn neighbour_count(&self, x: u32, y: u32, delta: DeltaUniform) -> f32 {
        let (u, v) = texel_centre(self.size, x, y);
        NEIGHBOURS
            .iter()
            .map(|(dx, dy)| self.sample(u + dx * delta.delta[0], v + dy * delta.delta[1]))
            .sum()
    }

    /// Next generation computed with this grid's own delta.
    pub fn step(&self) -> Generation {
        let mut next = Generation::dead(self.size);
        step_into(self, &mut next, self.size.delta());
        next
    }
}

fn texel_centre(size: GridSize, x: u32, y: u32) -> (f32, f32) {
    (
        (x as f32 + 0.5) / size.width() as f32,
        (y as f32 + 0.5) / size.height() as f32,
    )
}

fn texel_index(coord: f32, extent: u32) -> u32 {
    let scaled = (coord * extent as f32).floor();
    scaled.clamp(0.0, (extent - 1) as f32) as u32
}

/// Evaluates one compute pass: samples `source`, writes every texel of
/// `target` as `(0, 0, 0, aliveness)`.
///
/// `target` is reallocated when its size differs from `source`.
pub fn step_into(source: &Generation, target: &mut Generation, delta: DeltaUniform) {
    if target.size != source.size {
        *target = Generation::dead(source.size);
    }
    for y in 0..source.size.height() {
        for x in 0..source.size.width() {
            let (u, v) = texel_centre(source.size, x, y);
            let current = source.sample(u, v) == 1.0;
            let neighbours = source.neighbour_count(x, y, delta);
            target.set_alive(x, y, next_state(current, neighbours));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn size(width: u32, height: u32) -> GridSize {
        GridSize::new(width, height).unwrap()
    }

    /// 3x3 neighbourhood in the middle of a 7x7 grid so no sample is clamped.
    fn neighbourhood(centre: bool, live_neighbours: usize) -> Generation {
        let ring = [
            (2, 2),
            (3, 2),
            (4, 2),
            (4, 3),
            (4, 4),
            (3, 4),
            (2, 4),
            (2, 3),
        ];
        let mut cells: Vec<(u32, u32)> = ring.iter().copied().take(live_neighbours).collect();
        if centre {
            cells.push((3, 3));
        }
        Generation::from_cells(size(7, 7), cells)
    }

    #[test]
    fn live_centre_survives_with_two_or_three_neighbours() {
        for count in 0..=8 {
            let next = neighbourhood(true, count).step();
            assert_eq!(
                next.is_alive(3, 3),
                count == 2 || count == 3,
                "live centre with {count} neighbours"
            );
        }
    }

    #[test]
    fn dead_centre_is_born_with_exactly_three_neighbours() {
        for count in 0..=8 {
            let next = neighbourhood(false, count).step();
            assert_eq!(next.is_alive(3, 3), count == 3, "dead centre with {count}");
        }
    }

    #[test]
    fn transition_table_matches_classic_life() {
        for count in 0..=8 {
            let neighbours = count as f32;
            assert_eq!(next_state(true, neighbours), count == 2 || count == 3);
            assert_eq!(next_state(false, neighbours), count == 3);
        }
        assert!(!next_state(false, 2.5));
    }

    #[test]
    fn block_is_a_still_life() {
        let block = Generation::from_cells(size(6, 6), [(2, 2), (3, 2), (2, 3), (3, 3)]);
        assert_eq!(block.step(), block);
    }

    #[test]
    fn blinker_has_period_two() {
        let blinker = Generation::from_cells(size(5, 5), [(1, 2), (2, 2), (3, 2)]);
        let once = blinker.step();
        assert_eq!(once.live_cells(), vec![(2, 1), (2, 2), (2, 3)]);
        assert_ne!(once, blinker);
        assert_eq!(once.step(), blinker);
    }

    #[test]
    fn output_is_always_binary() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut generation = Generation::seeded(size(40, 30), 0.25, &mut rng).unwrap();
        for _ in 0..10 {
            generation = generation.step();
            assert!(generation.is_binary());
        }
    }

    #[test]
    fn edge_cell_counts_its_clamped_duplicate() {
        let grid = Generation::from_cells(size(5, 5), [(0, 1), (0, 2)]);
        let delta = grid.size().delta();
        // (-1, 0) clamps onto the cell itself and (-1, +1) onto (0, 2).
        assert_eq!(grid.neighbour_count(0, 1, delta), 3.0);
        assert!(grid.step().is_alive(0, 1));
    }

    #[test]
    fn corner_cell_does_not_wrap_to_opposite_corner() {
        let grid = Generation::from_cells(size(6, 4), [(0, 0)]);
        let delta = grid.size().delta();
        assert_eq!(grid.neighbour_count(0, 0, delta), 3.0);
        assert_eq!(grid.neighbour_count(5, 3, delta), 0.0);

        let next = grid.step();
        assert!(next.is_alive(0, 0));
        assert_eq!(next.population(), 1);
    }

    #[test]
    fn stale_delta_samples_wrong_neighbours() {
        let grid = Generation::from_cells(size(8, 8), [(3, 3), (4, 3), (5, 3)]);
        let stale = GridSize::new(2, 2).unwrap().delta();
        assert_ne!(
            grid.neighbour_count(4, 2, stale),
            grid.neighbour_count(4, 2, grid.size().delta())
        );
    }

    #[test]
    fn seeding_honours_probability() {
        let mut rng = StdRng::seed_from_u64(1234);
        let generation = Generation::seeded(size(256, 256), 0.25, &mut rng).unwrap();
        assert!(generation.is_binary());
        assert!((generation.alive_fraction() - 0.25).abs() < 0.01);
    }

    #[test]
    fn seeding_rejects_out_of_range_probability() {
        let mut rng = StdRng::seed_from_u64(1);
        for probability in [1.5, -0.1, f64::NAN] {
            let err = Generation::seeded(size(4, 4), probability, &mut rng).unwrap_err();
            assert!(matches!(err, RendererError::InvalidProbability(_)));
        }
        assert_eq!(
            Generation::seeded(size(4, 4), 0.0, &mut rng).unwrap().population(),
            0
        );
    }

    #[test]
    fn from_texels_checks_length() {
        let err = Generation::from_texels(size(2, 2), vec![0; 3]).unwrap_err();
        assert!(matches!(
            err,
            RendererError::UploadSize {
                expected: 16,
                actual: 3,
                ..
            }
        ));
    }
}
