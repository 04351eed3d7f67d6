//! Chunk planning for overlap-chunked parallel filtering.
//!
//! Pure functions for partitioning a media duration into overlapping
//! time spans. Each chunk overlaps only its immediate neighbour, by the
//! configured overlap duration, so the merge stage can hide filter-edge
//! artifacts with crossfades.

use serde::{Deserialize, Serialize};

/// One planned chunk: a time span within the source track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkSpan {
    /// Chunk index, counted from the start of the track.
    pub index: usize,
    /// Start time in seconds.
    pub start_time: f64,
    /// Span duration in seconds.
    pub duration: f64,
}

impl ChunkSpan {
    /// End time of this chunk in seconds.
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }
}

/// Calculate overlapping chunk spans covering `[0, total_duration]`.
///
/// Pure function - no I/O, deterministic output.
///
/// Every chunk starts at `i * (total_duration / chunk_count)` and runs for
/// the uniform span plus `overlap_duration`, except the last chunk, which
/// is clipped so its end lands exactly on `total_duration`. A chunk never
/// extends past the end of the track.
///
/// Preconditions (validated upstream in the configuration layer):
/// `total_duration > 0`, `chunk_count >= 1`, `overlap_duration >= 0`.
pub fn plan_chunks(total_duration: f64, chunk_count: u32, overlap_duration: f64) -> Vec<ChunkSpan> {
    let chunk_count = chunk_count as usize;
    let base_duration = total_duration / chunk_count as f64;

    let mut plan = Vec::with_capacity(chunk_count);
    for index in 0..chunk_count {
        let start_time = index as f64 * base_duration;
        let mut duration = base_duration + overlap_duration;

        // Only the last chunk can run past the end; clip it back.
        if start_time + duration > total_duration {
            duration = total_duration - start_time;
        }

        plan.push(ChunkSpan {
            index,
            start_time,
            duration,
        });
    }

    plan
}
