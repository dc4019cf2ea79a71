use crate::models::config::FramingPolicy;

/// Cuts captured blocks into the frame granularity the decode engine expects.
///
/// Under `FixedChunk { samples: n }` each block is split into consecutive
/// frames of exactly `n` samples and any tail shorter than `n` is dropped.
/// Nothing is carried over between blocks, so a block shorter than `n`
/// yields no frames at all. This trades sample loss for zero added latency
/// and no cross-block state; use `PassThrough` when the engine accepts
/// variable-length input.
///
/// Frames are borrowed slices of the input block: no allocation on the
/// audio callback path.
#[derive(Debug, Clone)]
pub struct FrameReassembler {
    policy: FramingPolicy,
    discarded_samples: u64,
}

impl FrameReassembler {
    pub fn new(policy: FramingPolicy) -> Self {
        let policy = match policy {
            FramingPolicy::FixedChunk { samples: 0 } => {
                log::warn!("fixed chunk size of 0 requested, falling back to pass-through");
                FramingPolicy::PassThrough
            }
            other => other,
        };
        Self {
            policy,
            discarded_samples: 0,
        }
    }

    pub fn policy(&self) -> FramingPolicy {
        self.policy
    }

    /// Split `block` per the policy, handing each frame to `emit` in sample order.
    ///
    /// Returns the number of frames emitted.
    pub fn push<F>(&mut self, block: &[f32], mut emit: F) -> usize
    where
        F: FnMut(&[f32]),
    {
        match self.policy {
            FramingPolicy::PassThrough => {
                if block.is_empty() {
                    return 0;
                }
                emit(block);
                1
            }
            FramingPolicy::FixedChunk { samples } => {
                let chunks = block.chunks_exact(samples);
                self.discarded_samples += chunks.remainder().len() as u64;
                let mut emitted = 0;
                for chunk in chunks {
                    emit(chunk);
                    emitted += 1;
                }
                emitted
            }
        }
    }

    /// Samples dropped as block tails since construction.
    pub fn discarded_samples(&self) -> u64 {
        self.discarded_samples
    }
}
