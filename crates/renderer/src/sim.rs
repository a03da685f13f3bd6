use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use scheduler::{FrameHost, FrameScheduler, Tick};

use crate::backend::{FrameStatus, GraphicsBackend};
use crate::error::RendererError;
use crate::framebuffer::Framebuffer;
use crate::grid;
use crate::store::TextureStore;
use crate::types::{GridSize, SimulationOptions};

/// What a single host frame invocation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Arrived before the frame interval elapsed; nothing was drawn.
    Throttled,
    /// One generation was computed, drawn and made current.
    Executed { generation: u64 },
    /// The presentation target was unavailable; state is untouched.
    Skipped,
}

/// All simulation state for one window: the backend, both generation
/// textures, the compute framebuffer, frame pacing and the reseed RNG.
pub struct Simulation<B: GraphicsBackend> {
    backend: B,
    store: TextureStore<B::Texture>,
    framebuffer: Framebuffer,
    scheduler: FrameScheduler,
    rng: StdRng,
    seed_probability: f64,
    generation: u64,
}

impl<B: GraphicsBackend> Simulation<B> {
    /// Allocates the textures and performs the initial resize, so the
    /// first frame already has a seeded current generation.
    pub fn new(
        mut backend: B,
        size: GridSize,
        options: &SimulationOptions,
    ) -> Result<Self, RendererError> {
        grid::seed_distribution(options.seed_probability)?;
        let store = TextureStore::create(&mut backend, size)?;
        let mut framebuffer = Framebuffer::new();
        framebuffer.attach(store.next_slot());
        let rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut simulation = Self {
            backend,
            store,
            framebuffer,
            scheduler: FrameScheduler::new(options.frame_interval),
            rng,
            seed_probability: options.seed_probability,
            generation: 0,
        };
        simulation.resize(size.width(), size.height())?;
        Ok(simulation)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn store(&self) -> &TextureStore<B::Texture> {
        &self.store
    }

    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }

    pub fn size(&self) -> GridSize {
        self.store.size()
    }

    /// Generations computed since the last resize.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Discards both generations and starts over at `width` x `height`.
    ///
    /// Returns `false` without touching anything when either side is zero.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<bool, RendererError> {
        let Some(size) = GridSize::new(width, height) else {
            tracing::debug!(width, height, "ignoring degenerate resize");
            return Ok(false);
        };

        self.store
            .resize(&mut self.backend, size, self.seed_probability, &mut self.rng)?;
        self.backend.set_viewport(size)?;
        self.backend.set_delta(size.delta())?;
        self.generation = 0;

        tracing::info!(
            %size,
            probability = self.seed_probability,
            "reseeded generation"
        );
        Ok(true)
    }

    /// Host per-frame callback.
    ///
    /// On success the host is always asked for another frame. Errors are
    /// fatal; the host is not re-registered.
    pub fn on_frame<H>(&mut self, timestamp: Duration, host: &H) -> Result<FrameOutcome, RendererError>
    where
        H: FrameHost + ?Sized,
    {
        let outcome = match self.scheduler.begin(timestamp)? {
            Tick::Throttled => FrameOutcome::Throttled,
            Tick::Execute => match self.step() {
                Ok(FrameStatus::Ready) => {
                    self.scheduler.complete()?;
                    self.generation += 1;
                    FrameOutcome::Executed {
                        generation: self.generation,
                    }
                }
                Ok(FrameStatus::Skip) => {
                    self.scheduler.abandon();
                    FrameOutcome::Skipped
                }
                Err(err) => {
                    self.scheduler.abandon();
                    return Err(err);
                }
            },
        };
        host.request_frame();
        Ok(outcome)
    }

    fn step(&mut self) -> Result<FrameStatus, RendererError> {
        if self.backend.begin_frame()? == FrameStatus::Skip {
            return Ok(FrameStatus::Skip);
        }

        let current = self.store.current_slot();
        self.framebuffer.attach(self.store.next_slot());
        let target = self.framebuffer.bind(current)?;
        let (next, source) = self.store.split(target);
        self.backend.compute_pass(next, source)?;
        self.framebuffer.unbind();

        self.backend.render_pass(self.store.get(target))?;
        self.backend.end_frame()?;
        self.store.swap();
        Ok(FrameStatus::Ready)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::CpuBackend;
    use crate::grid::Generation;
    use crate::types::Slot;
    use std::cell::Cell;

    #[derive(Default)]
    struct CountingHost {
        requests: Cell<u32>,
    }

    impl FrameHost for CountingHost {
        fn request_frame(&self) {
            self.requests.set(self.requests.get() + 1);
        }
    }

    fn options() -> SimulationOptions {
        SimulationOptions {
            frame_interval: Duration::from_millis(10),
            seed_probability: 0.25,
            seed: Some(99),
        }
    }

    fn simulation(width: u32, height: u32) -> Simulation<CpuBackend> {
        let size = GridSize::new(width, height).unwrap();
        Simulation::new(CpuBackend::new(), size, &options()).unwrap()
    }

    #[test]
    fn new_simulation_is_freshly_seeded() {
        let sim = simulation(64, 48);
        assert_eq!(sim.store().next().population(), 0);
        assert!(sim.store().current().population() > 0);
        assert_eq!(sim.backend().viewport(), GridSize::new(64, 48));
        assert_eq!(sim.backend().delta(), GridSize::new(64, 48).unwrap().delta());
    }

    #[test]
    fn startup_uploads_each_texture_once() {
        let sim = simulation(64, 48);
        assert_eq!(sim.backend().uploads(), 2);
    }

    #[test]
    fn out_of_range_probability_is_an_error() {
        let size = GridSize::new(4, 4).unwrap();
        for seed_probability in [1.5, f64::NAN] {
            let options = SimulationOptions {
                seed_probability,
                ..options()
            };
            let err = Simulation::new(CpuBackend::new(), size, &options)
                .err()
                .expect("probability should be rejected");
            assert!(matches!(err, RendererError::InvalidProbability(_)));
        }
    }

    #[test]
    fn executed_frame_advances_one_generation_and_swaps() {
        let mut sim = simulation(32, 32);
        let host = CountingHost::default();
        let before = sim.store().current().clone();
        let before_slot = sim.store().current_slot();

        let outcome = sim.on_frame(Duration::ZERO, &host).unwrap();
        assert_eq!(outcome, FrameOutcome::Executed { generation: 1 });
        assert_eq!(sim.store().current_slot(), before_slot.other());
        assert_eq!(sim.store().current(), &before.step());
        assert_eq!(sim.backend().presented(), Some(sim.store().current()));
        assert_eq!(host.requests.get(), 1);
    }

    #[test]
    fn throttled_frame_changes_nothing_but_reschedules() {
        let mut sim = simulation(16, 16);
        let host = CountingHost::default();
        sim.on_frame(Duration::ZERO, &host).unwrap();
        let snapshot = sim.store().current().clone();
        let slot = sim.store().current_slot();

        let outcome = sim.on_frame(Duration::from_millis(4), &host).unwrap();
        assert_eq!(outcome, FrameOutcome::Throttled);
        assert_eq!(sim.store().current_slot(), slot);
        assert_eq!(sim.store().current(), &snapshot);
        assert_eq!(sim.backend().compute_passes(), 1);
        assert_eq!(host.requests.get(), 2);
    }

    #[test]
    fn degenerate_resize_is_ignored() {
        let mut sim = simulation(8, 8);
        let snapshot = sim.store().current().clone();
        assert!(!sim.resize(0, 600).unwrap());
        assert!(!sim.resize(800, 0).unwrap());
        assert_eq!(sim.size(), GridSize::new(8, 8).unwrap());
        assert_eq!(sim.store().current(), &snapshot);
    }

    #[test]
    fn resize_after_running_reseeds_from_scratch() {
        let mut sim = simulation(20, 20);
        let host = CountingHost::default();
        for frame in 0..5u64 {
            sim.on_frame(Duration::from_millis(frame * 20), &host).unwrap();
        }
        assert_eq!(sim.generation(), 5);

        assert!(sim.resize(300, 200).unwrap());
        assert_eq!(sim.generation(), 0);
        assert_eq!(sim.store().next().population(), 0);
        assert_eq!(sim.store().current().size(), GridSize::new(300, 200).unwrap());
        assert!((sim.store().current().alive_fraction() - 0.25).abs() < 0.02);
        assert_eq!(sim.backend().delta(), GridSize::new(300, 200).unwrap().delta());
    }

    #[test]
    fn framebuffer_targets_next_slot_each_frame() {
        let mut sim = simulation(8, 8);
        let host = CountingHost::default();
        for frame in 0..4u64 {
            let next = sim.store().next_slot();
            sim.on_frame(Duration::from_millis(frame * 10), &host).unwrap();
            assert_eq!(sim.framebuffer.attachment(), Some(next));
            assert!(!sim.framebuffer.is_bound());
        }
        assert_eq!(sim.store().current_slot(), Slot::A);
    }

    #[test]
    fn still_life_survives_the_frame_loop() {
        let size = GridSize::new(6, 6).unwrap();
        let mut sim = simulation(6, 6);
        let block = Generation::from_cells(size, [(2, 2), (3, 2), (2, 3), (3, 3)]);
        let slot = sim.store.current_slot();
        let (texture, _) = sim.store.split(slot);
        *texture = block.clone();

        let host = CountingHost::default();
        sim.on_frame(Duration::ZERO, &host).unwrap();
        assert_eq!(sim.store().current(), &block);
    }
}
