//! Ambient particle field
//!
//! Sized by the tier's particle multiplier and generated on a worker pool no
//! larger than the device's concurrency budget. Output depends only on the base
//! count, the record and the seed.

use crate::RenderError;
use bytemuck::{Pod, Zeroable};
use prism_core::math::DeterministicRng;
use prism_core::CapabilityRecord;
use rayon::prelude::*;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ParticleInstance {
    pub position: [f32; 3],
    pub size: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParticleField {
    instances: Vec<ParticleInstance>,
}

impl ParticleField {
    pub fn generate(
        base: u32,
        capabilities: &CapabilityRecord,
        seed: u64,
    ) -> Result<Self, RenderError> {
        let count = capabilities.scaled_particle_count(base) as u64;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(capabilities.concurrency_budget() as usize)
            .build()?;

        let instances = pool.install(|| {
            (0..count)
                .into_par_iter()
                .map(|index| {
                    let mut rng = DeterministicRng::for_index(seed, index);
                    ParticleInstance {
                        position: [
                            rng.next_f32() * 2.0 - 1.0,
                            rng.next_f32() * 2.0 - 1.0,
                            rng.next_f32() * 2.0 - 1.0,
                        ],
                        size: 0.5 + rng.next_f32(),
                    }
                })
                .collect()
        });

        Ok(Self { instances })
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn instances(&self) -> &[ParticleInstance] {
        &self.instances
    }
}
