//! Crossfade-based reconstruction of filtered segments.
//!
//! Adjacent segments share `overlap_duration` seconds of audio by
//! construction, so instead of concatenating at the midpoints (which would
//! expose the model's ramp-up/ramp-down at every seam) the segments are
//! blended pairwise with symmetric triangular crossfades. Each crossfade
//! consumes the running intermediate stream and the next raw segment,
//! strictly left to right, and the last intermediate becomes the output.

use std::path::Path;

use crate::filter::ProcessedSegment;
use crate::logging::RunLogger;
use crate::media::ffmpeg::{self, format_seconds, FfmpegError, FfmpegResult};

/// Build the chained-crossfade filter graph for `count` segments.
///
/// Returns `None` when fewer than two segments exist - no crossfade is
/// needed and the merge stage passes the single segment through unchanged.
///
/// The graph is stateless text, recomputed from the segment count and the
/// overlap duration each time. For four segments it reads:
///
/// ```text
/// [0:a][1:a]acrossfade=d=0.500000:c1=tri:c2=tri[a0];
/// [a0][2:a]acrossfade=d=0.500000:c1=tri:c2=tri[a1];
/// [a1][3:a]acrossfade=d=0.500000:c1=tri:c2=tri[a2];
/// [a2]amerge=inputs=1[outa]
/// ```
pub fn build_crossfade_graph(count: usize, overlap_duration: f64) -> Option<String> {
    if count < 2 {
        return None;
    }

    let fade = format_seconds(overlap_duration);
    let mut graph = String::new();

    for i in 0..count - 1 {
        if i == 0 {
            // First pair crossfades two raw segments.
            graph.push_str(&format!(
                "[0:a][1:a]acrossfade=d={}:c1=tri:c2=tri[a0]; ",
                fade
            ));
        } else {
            // Every later crossfade consumes the previous intermediate,
            // never a raw segment, preserving chronological order.
            graph.push_str(&format!(
                "[a{}][{}:a]acrossfade=d={}:c1=tri:c2=tri[a{}]; ",
                i - 1,
                i + 1,
                fade,
                i
            ));
        }
    }

    // Relabel the last intermediate as the final output stream.
    graph.push_str(&format!("[a{}]amerge=inputs=1[outa]", count - 2));

    Some(graph)
}

/// Merge processed segments, in index order, into one continuous track.
///
/// `processed` must already be sorted by chunk index. A failure of the
/// encode subprocess fails the whole pipeline; no partial merge is valid.
pub fn merge_segments(
    ffmpeg: &str,
    processed: &[ProcessedSegment],
    overlap_duration: f64,
    output: &Path,
    logger: &RunLogger,
) -> FfmpegResult<()> {
    match processed {
        [] => Err(FfmpegError::EmptyGraph { segments: 0 }),
        // Single segment: pass it through unchanged.
        [segment] => {
            std::fs::copy(&segment.path, output).map_err(|e| FfmpegError::Io {
                operation: format!("copying single segment to {}", output.display()),
                source: e,
            })?;
            Ok(())
        }
        _ => match build_crossfade_graph(processed.len(), overlap_duration) {
            Some(graph) => {
                let inputs: Vec<_> = processed.iter().map(|s| s.path.clone()).collect();
                ffmpeg::merge_with_crossfade(ffmpeg, &inputs, &graph, output, logger)
            }
            None => Err(FfmpegError::EmptyGraph {
                segments: processed.len(),
            }),
        },
    }
}
