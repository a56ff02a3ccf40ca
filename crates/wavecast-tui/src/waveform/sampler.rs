// Amplitude sampler: turns the analyser's latest time-domain frame into one
// half-bar height per tick.

use super::WaveformHistory;
use crate::audio::AudioGraph;

/// Unsigned 8-bit PCM centre line.
pub const PCM_MIDPOINT: u8 = 128;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleOutcome {
    Pushed(f64),
    /// No frame available yet; try again next tick.
    NoData,
    /// Playback is not active or the graph is suspended; the sampler should stop.
    Inactive,
}

/// Normalised peak deviation from the midpoint, in `[0, 1]`.
pub fn frame_peak(frame: &[u8]) -> f64 {
    let max_dev = frame
        .iter()
        .map(|&s| (i16::from(s) - i16::from(PCM_MIDPOINT)).unsigned_abs())
        .max()
        .unwrap_or(0);
    (f64::from(max_dev) / f64::from(PCM_MIDPOINT)).min(1.0)
}

pub struct WaveformSampler {
    frame: Vec<u8>,
    amplitude_scale: f64,
}

impl WaveformSampler {
    pub fn new(fft_size: usize, amplitude_scale: f64) -> Self {
        Self {
            frame: vec![PCM_MIDPOINT; fft_size.max(1)],
            amplitude_scale,
        }
    }

    pub fn half_height(&self, peak: f64, canvas_height: f64) -> f64 {
        peak * self.amplitude_scale * canvas_height
    }

    /// One sampler tick.  Never reads from a stopped or suspended graph.
    pub fn sample<A: AudioGraph>(
        &mut self,
        graph: &A,
        playing: bool,
        canvas_height: f64,
        history: &mut WaveformHistory,
    ) -> SampleOutcome {
        if !playing || !graph.has_graph() || graph.is_suspended() {
            return SampleOutcome::Inactive;
        }
        if !graph.read_time_domain(&mut self.frame) {
            return SampleOutcome::NoData;
        }
        let half = self.half_height(frame_peak(&self.frame), canvas_height);
        history.push(half);
        SampleOutcome::Pushed(half)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeGraph;

    #[test]
    fn test_frame_peak() {
        assert_eq!(frame_peak(&[128; 256]), 0.0);
        assert_eq!(frame_peak(&[128, 192, 100]), 0.5);
        assert_eq!(frame_peak(&[0, 128]), 1.0);
        assert_eq!(frame_peak(&[255]), 127.0 / 128.0);
        assert_eq!(frame_peak(&[]), 0.0);
    }

    #[test]
    fn test_sample_pushes_scaled_half_height() {
        let mut graph = FakeGraph::default();
        graph.created = true;
        graph.frame = Some(vec![128, 192, 64, 128]);

        let mut sampler = WaveformSampler::new(4, 0.45);
        let mut history = WaveformHistory::with_capacity(10);
        let out = sampler.sample(&graph, true, 100.0, &mut history);

        assert_eq!(out, SampleOutcome::Pushed(0.5 * 0.45 * 100.0));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_sample_inactive_when_stopped_or_suspended() {
        let mut graph = FakeGraph::default();
        graph.created = true;
        graph.frame = Some(vec![200; 4]);
        let mut sampler = WaveformSampler::new(4, 0.45);
        let mut history = WaveformHistory::with_capacity(10);

        assert_eq!(
            sampler.sample(&graph, false, 100.0, &mut history),
            SampleOutcome::Inactive
        );

        graph.suspended = true;
        assert_eq!(
            sampler.sample(&graph, true, 100.0, &mut history),
            SampleOutcome::Inactive
        );
        assert!(history.is_empty());
        assert_eq!(graph.reads.get(), 0, "must not read from a frozen graph");
    }

    #[test]
    fn test_sample_without_frame_is_no_data() {
        let mut graph = FakeGraph::default();
        graph.created = true;
        let mut sampler = WaveformSampler::new(4, 0.45);
        let mut history = WaveformHistory::with_capacity(10);
        assert_eq!(
            sampler.sample(&graph, true, 100.0, &mut history),
            SampleOutcome::NoData
        );
    }
}
