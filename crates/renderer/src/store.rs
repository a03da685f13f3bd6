use rand::Rng;

use crate::backend::GraphicsBackend;
use crate::error::RendererError;
use crate::grid::{fill_random, BYTES_PER_TEXEL};
use crate::types::{GridSize, Slot};

/// The two generation textures plus the selector naming which one is
/// "current" (sampled by the compute pass). The other is "next", the
/// compute pass's write target and the render pass's input.
///
/// Swapping roles flips the selector; texture data never moves.
#[derive(Debug)]
pub struct TextureStore<T> {
    textures: [T; 2],
    current: Slot,
    size: GridSize,
}

impl<T> TextureStore<T> {
    /// Allocates both textures at `size`. Contents stay undefined until the
    /// first [`resize`](Self::resize), [`clear`](Self::clear) or
    /// [`reseed`](Self::reseed).
    pub fn create<B>(backend: &mut B, size: GridSize) -> Result<Self, RendererError>
    where
        B: GraphicsBackend<Texture = T>,
    {
        let first = backend.create_texture(size)?;
        let second = backend.create_texture(size)?;
        Ok(Self {
            textures: [first, second],
            current: Slot::A,
            size,
        })
    }

    pub fn size(&self) -> GridSize {
        self.size
    }

    pub fn current_slot(&self) -> Slot {
        self.current
    }

    pub fn next_slot(&self) -> Slot {
        self.current.other()
    }

    pub fn get(&self, slot: Slot) -> &T {
        &self.textures[slot.index()]
    }

    pub fn current(&self) -> &T {
        self.get(self.current_slot())
    }

    pub fn next(&self) -> &T {
        self.get(self.next_slot())
    }

    /// Mutable access to the texture in `target` alongside shared access to
    /// the other one.
    pub fn split(&mut self, target: Slot) -> (&mut T, &T) {
        let [a, b] = &mut self.textures;
        match target {
            Slot::A => (a, &*b),
            Slot::B => (b, &*a),
        }
    }

    pub fn swap(&mut self) {
        self.current = self.current.other();
    }

    /// Sets every texel of `slot` to transparent black.
    pub fn clear<B>(&mut self, backend: &mut B, slot: Slot) -> Result<(), RendererError>
    where
        B: GraphicsBackend<Texture = T>,
    {
        let texels = dead_texels(self.size);
        backend.upload(&mut self.textures[slot.index()], self.size, &texels)
    }

    /// Fills `slot` with a fresh random generation.
    pub fn reseed<B, R>(
        &mut self,
        backend: &mut B,
        slot: Slot,
        probability: f64,
        rng: &mut R,
    ) -> Result<(), RendererError>
    where
        B: GraphicsBackend<Texture = T>,
        R: Rng + ?Sized,
    {
        let texels = seeded_texels(self.size, probability, rng)?;
        backend.upload(&mut self.textures[slot.index()], self.size, &texels)
    }

    /// Reallocates both textures at `size`: the next-generation texture is
    /// cleared and the current one reseeded. Prior contents are lost.
    ///
    /// The recorded size only changes once both uploads have succeeded.
    pub fn resize<B, R>(
        &mut self,
        backend: &mut B,
        size: GridSize,
        probability: f64,
        rng: &mut R,
    ) -> Result<(), RendererError>
    where
        B: GraphicsBackend<Texture = T>,
        R: Rng + ?Sized,
    {
        let seeded = seeded_texels(size, probability, rng)?;
        let next = self.next_slot().index();
        let current = self.current_slot().index();
        backend.upload(&mut self.textures[next], size, &dead_texels(size))?;
        backend.upload(&mut self.textures[current], size, &seeded)?;
        self.size = size;
        Ok(())
    }
}

fn dead_texels(size: GridSize) -> Vec<u8> {
    vec![0; size.texel_count() * BYTES_PER_TEXEL]
}

fn seeded_texels<R: Rng + ?Sized>(
    size: GridSize,
    probability: f64,
    rng: &mut R,
) -> Result<Vec<u8>, RendererError> {
    let mut texels = dead_texels(size);
    fill_random(&mut texels, probability, rng)?;
    Ok(texels)
}
