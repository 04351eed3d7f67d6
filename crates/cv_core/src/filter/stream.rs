//! Frame streaming for the in-process backend.
//!
//! Pipeline audio is always 16-bit PCM, so samples are widened to f32 for
//! the model and clamped back on the way out. The model dictates the frame
//! size; the final partial frame is zero-padded to that size and the output
//! is trimmed back so the filtered file has exactly as many samples as the
//! input.

use std::path::Path;

use super::model::FilterModel;
use super::FilterResult;

/// Stream one segment file through an in-process model.
pub fn filter_file(
    model: &mut dyn FilterModel,
    input: &Path,
    output: &Path,
) -> FilterResult<()> {
    let mut reader = hound::WavReader::open(input)?;
    let spec = reader.spec();

    let samples: Vec<f32> = reader
        .samples::<i16>()
        .map(|s| s.map(f32::from))
        .collect::<Result<_, _>>()?;

    let filtered = process_samples(model, &samples)?;

    let mut writer = hound::WavWriter::create(output, spec)?;
    for sample in &filtered {
        writer.write_sample(clamp_to_i16(*sample))?;
    }
    writer.finalize()?;

    Ok(())
}

/// Run all samples through the model in fixed-size frames.
fn process_samples(model: &mut dyn FilterModel, samples: &[f32]) -> FilterResult<Vec<f32>> {
    let frame_length = model.frame_length();
    let mut filtered = Vec::with_capacity(samples.len());

    for frame in samples.chunks(frame_length) {
        let processed = if frame.len() == frame_length {
            model.process_frame(frame)?
        } else {
            // Zero-pad the tail frame up to the model's frame size.
            let mut padded = frame.to_vec();
            padded.resize(frame_length, 0.0);
            model.process_frame(&padded)?
        };
        filtered.extend_from_slice(&processed);
    }

    // Drop the padding so output length matches input length exactly.
    filtered.truncate(samples.len());
    Ok(filtered)
}

fn clamp_to_i16(sample: f32) -> i16 {
    sample.round().clamp(f32::from(i16::MIN), f32::from(i16::MAX)) as i16
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterError;

    /// Scales every sample by a fixed gain; counts frames it was fed.
    struct GainModel {
        gain: f32,
        frame_length: usize,
        frames_seen: usize,
    }

    impl FilterModel for GainModel {
        fn frame_length(&self) -> usize {
            self.frame_length
        }

        fn process_frame(&mut self, input: &[f32]) -> FilterResult<Vec<f32>> {
            assert_eq!(input.len(), self.frame_length);
            self.frames_seen += 1;
            Ok(input.iter().map(|s| s * self.gain).collect())
        }
    }

    struct FailingModel;

    impl FilterModel for FailingModel {
        fn frame_length(&self) -> usize {
            4
        }

        fn process_frame(&mut self, _input: &[f32]) -> FilterResult<Vec<f32>> {
            Err(FilterError::Frame("model rejected frame".into()))
        }
    }

    fn mono_spec() -> hound::WavSpec {
        hound::WavSpec {
            channels: 1,
            sample_rate: 48_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        }
    }

    fn write_wav(path: &Path, samples: &[i16]) {
        let mut writer = hound::WavWriter::create(path, mono_spec()).unwrap();
        for s in samples {
            writer.write_sample(*s).unwrap();
        }
        writer.finalize().unwrap();
    }

    fn read_wav(path: &Path) -> Vec<i16> {
        hound::WavReader::open(path)
            .unwrap()
            .samples::<i16>()
            .collect::<Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn output_length_matches_input_with_partial_tail_frame() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.wav");
        let output = dir.path().join("out.wav");

        // 10 samples with a frame size of 4: two full frames plus a
        // zero-padded tail of 2.
        write_wav(&input, &[100, -100, 200, -200, 300, -300, 400, -400, 500, -500]);

        let mut model = GainModel {
            gain: 1.0,
            frame_length: 4,
            frames_seen: 0,
        };
        filter_file(&mut model, &input, &output).unwrap();

        assert_eq!(model.frames_seen, 3);
        let out = read_wav(&output);
        assert_eq!(out.len(), 10);
        assert_eq!(out, vec![100, -100, 200, -200, 300, -300, 400, -400, 500, -500]);
    }

    #[test]
    fn samples_pass_through_the_model() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.wav");
        let output = dir.path().join("out.wav");

        write_wav(&input, &[1000, 2000, -1000, -2000]);

        let mut model = GainModel {
            gain: 0.5,
            frame_length: 4,
            frames_seen: 0,
        };
        filter_file(&mut model, &input, &output).unwrap();

        assert_eq!(read_wav(&output), vec![500, 1000, -500, -1000]);
    }

    #[test]
    fn overdriven_samples_clamp_instead_of_wrapping() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.wav");
        let output = dir.path().join("out.wav");

        write_wav(&input, &[30_000, -30_000]);

        let mut model = GainModel {
            gain: 2.0,
            frame_length: 2,
            frames_seen: 0,
        };
        filter_file(&mut model, &input, &output).unwrap();

        assert_eq!(read_wav(&output), vec![i16::MAX, i16::MIN]);
    }

    #[test]
    fn model_failure_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.wav");
        let output = dir.path().join("out.wav");

        write_wav(&input, &[1, 2, 3, 4]);

        let err = filter_file(&mut FailingModel, &input, &output).unwrap_err();
        assert!(matches!(err, FilterError::Frame(_)));
    }
}
