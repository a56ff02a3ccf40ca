// Analyser tap: an ffmpeg child decoding the stream to unsigned 8-bit mono
// PCM, keeping the most recent `fft_size` samples for the waveform sampler.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub const TAP_SAMPLE_RATE: u32 = 11_025;

type SampleRing = Arc<Mutex<VecDeque<u8>>>;

pub struct AnalyserTap {
    ffmpeg: PathBuf,
    capacity: usize,
    ring: SampleRing,
    running: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
    url: Option<String>,
}

impl AnalyserTap {
    pub fn new(ffmpeg: PathBuf, capacity: usize) -> Self {
        Self {
            ffmpeg,
            capacity: capacity.max(1),
            ring: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            running: Arc::new(AtomicBool::new(false)),
            task: None,
            url: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// (Re)start decoding `url`.  Any previous decoder is killed first and the
    /// ring is emptied.
    pub fn start(&mut self, url: &str) -> anyhow::Result<()> {
        self.stop();
        let runtime = tokio::runtime::Handle::try_current()?;

        let running = Arc::new(AtomicBool::new(true));
        self.running = running.clone();
        self.url = Some(url.to_string());

        let ffmpeg = self.ffmpeg.clone();
        let ring = self.ring.clone();
        let capacity = self.capacity;
        let url = url.to_string();
        self.task = Some(runtime.spawn(async move {
            match run_tap(&ffmpeg, &url, &ring, capacity).await {
                Ok(()) => info!("[audio] tap: stream ended"),
                Err(e) => warn!("[audio] tap: {}", e),
            }
            running.store(false, Ordering::Release);
        }));
        debug!("[audio] tap: started");
        Ok(())
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("[audio] tap: stopped");
        }
        self.running.store(false, Ordering::Release);
        lock_ring(&self.ring).clear();
    }

    /// Copy the newest `out.len()` samples into `out`.  False until that many
    /// samples have arrived.
    pub fn read_latest(&self, out: &mut [u8]) -> bool {
        let ring = lock_ring(&self.ring);
        if out.is_empty() || ring.len() < out.len() {
            return false;
        }
        let skip = ring.len() - out.len();
        for (dst, src) in out.iter_mut().zip(ring.iter().skip(skip)) {
            *dst = *src;
        }
        true
    }

    #[cfg(test)]
    fn feed(&self, samples: &[u8]) {
        push_samples(&self.ring, samples, self.capacity);
    }
}

impl Drop for AnalyserTap {
    fn drop(&mut self) {
        self.stop();
    }
}

fn lock_ring(ring: &SampleRing) -> std::sync::MutexGuard<'_, VecDeque<u8>> {
    ring.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn push_samples(ring: &SampleRing, samples: &[u8], capacity: usize) {
    let mut ring = lock_ring(ring);
    ring.extend(samples.iter().copied());
    let excess = ring.len().saturating_sub(capacity);
    ring.drain(..excess);
}

async fn run_tap(
    ffmpeg: &PathBuf,
    url: &str,
    ring: &SampleRing,
    capacity: usize,
) -> anyhow::Result<()> {
    let rate = TAP_SAMPLE_RATE.to_string();
    let mut child = Command::new(ffmpeg)
        .args([
            "-hide_banner",
            "-loglevel",
            "error",
            "-nostdin",
            "-fflags",
            "nobuffer",
            "-flags",
            "low_delay",
            "-probesize",
            "64k",
            "-analyzeduration",
            "200000",
            "-i",
            url,
            "-vn",
            "-ac",
            "1",
            "-ar",
            &rate,
            "-f",
            "u8",
            "pipe:1",
        ])
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::null())
        .kill_on_drop(true)
        .spawn()?;

    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow::anyhow!("ffmpeg stdout not captured"))?;
    let mut buf = vec![0u8; capacity];
    loop {
        let n = stdout.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        push_samples(ring, &buf[..n], capacity);
    }

    let status = child.wait().await?;
    if !status.success() {
        anyhow::bail!("ffmpeg exited: {}", status);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_keeps_latest_samples() {
        let tap = AnalyserTap::new(PathBuf::from("ffmpeg"), 4);
        let mut out = [0u8; 4];
        tap.feed(&[1, 2, 3]);
        assert!(!tap.read_latest(&mut out), "not enough samples yet");

        tap.feed(&[4, 5, 6]);
        assert!(tap.read_latest(&mut out));
        assert_eq!(out, [3, 4, 5, 6]);

        let mut short = [0u8; 2];
        assert!(tap.read_latest(&mut short));
        assert_eq!(short, [5, 6]);
    }

    #[tokio::test]
    async fn test_failed_spawn_clears_running() {
        let mut tap = AnalyserTap::new(PathBuf::from("/nonexistent/ffmpeg-for-tests"), 4);
        tap.start("http://127.0.0.1:9/stream").expect("start on runtime");
        assert_eq!(tap.url(), Some("http://127.0.0.1:9/stream"));

        for _ in 0..100 {
            if !tap.is_running() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(!tap.is_running());
    }

    #[tokio::test]
    async fn test_stop_clears_ring() {
        let mut tap = AnalyserTap::new(PathBuf::from("ffmpeg"), 2);
        tap.feed(&[9, 9]);
        tap.stop();
        let mut out = [0u8; 2];
        assert!(!tap.read_latest(&mut out));
        assert!(!tap.is_running());
    }
}
