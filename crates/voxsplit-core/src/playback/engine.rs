//! Streaming playback engine
//!
//! Plays a raw PCM file on repeat through an [`OutputBackend`].
//!
//! ```text
//!   Idle ──start()──► Starting ──device ok──► Playing ──stop()──► Stopping ──join──► Idle
//!                        │
//!                        └── open/device failure ──► Idle (error returned to caller)
//! ```
//!
//! Each session owns one worker thread. The worker opens the device, reads a
//! device-sized chunk, writes it, and rewinds the file on EOF. The
//! cancellation token is the only state shared with the caller; `stop()`
//! cancels it and joins the worker, which releases the device before it
//! exits.

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::pcm::{convert, PcmFileReader, PcmStream, SampleEncoding};

use super::cancel::CancellationToken;
use super::device::{OutputBackend, OutputDevice};
use super::error::{PlaybackError, PlaybackResult};

/// Playback engine state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Starting,
    Playing,
    Stopping,
}

/// Counters reported when a session ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackSummary {
    /// Chunks handed to the device
    pub chunks_written: u64,
    /// Bytes of source data accepted by the device
    pub bytes_written: u64,
    /// Times the source was rewound after reaching EOF
    pub loops: u64,
}

struct PlaybackSession {
    path: PathBuf,
    stream: PcmStream,
    cancel: CancellationToken,
    worker: JoinHandle<PlaybackResult<PlaybackSummary>>,
}

/// Plays one PCM file at a time on repeat
pub struct StreamingPlaybackEngine {
    backend: Arc<dyn OutputBackend>,
    state: PlaybackState,
    session: Option<PlaybackSession>,
}

impl StreamingPlaybackEngine {
    pub fn new(backend: Arc<dyn OutputBackend>) -> Self {
        Self {
            backend,
            state: PlaybackState::Idle,
            session: None,
        }
    }

    /// Current state
    ///
    /// A session whose loop ended on its own (I/O failure) reports `Idle`;
    /// its error is returned by the next `stop()`.
    pub fn state(&self) -> PlaybackState {
        match &self.session {
            Some(session) if session.worker.is_finished() => PlaybackState::Idle,
            _ => self.state,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.state() == PlaybackState::Playing
    }

    /// Path and parameters of the active session
    pub fn current(&self) -> Option<(&Path, PcmStream)> {
        self.session
            .as_ref()
            .map(|s| (s.path.as_path(), s.stream))
    }

    /// Start looping playback of `path`
    ///
    /// Returns once the device has been allocated. Source and device errors
    /// are reported here and leave the engine `Idle`.
    pub fn start(&mut self, path: impl AsRef<Path>, stream: PcmStream) -> PlaybackResult<()> {
        let path = path.as_ref();

        if let Some(session) = &self.session {
            if !session.worker.is_finished() {
                log::info!("Player already started, ignoring start for {:?}", path);
                return Err(PlaybackError::AlreadyPlaying);
            }
            // Previous loop ended by itself; collect it before starting over
            if let Err(e) = self.stop() {
                log::warn!("Previous playback session ended with error: {}", e);
            }
        }

        self.state = PlaybackState::Starting;
        match self.spawn_session(path, stream) {
            Ok(session) => {
                log::info!("Playback started: {:?} ({})", path, stream);
                self.session = Some(session);
                self.state = PlaybackState::Playing;
                Ok(())
            }
            Err(e) => {
                log::error!("Failed to start playback of {:?}: {}", path, e);
                self.state = PlaybackState::Idle;
                Err(e)
            }
        }
    }

    fn spawn_session(&self, path: &Path, stream: PcmStream) -> PlaybackResult<PlaybackSession> {
        let stream = PcmStream::new(stream.sample_rate, stream.channels, stream.encoding)?;

        let reader = PcmFileReader::open(path)?;
        let frame = stream.bytes_per_frame() as u64;
        if reader.len() < frame {
            return Err(PlaybackError::InvalidArgument(format!(
                "{:?} holds no whole {} byte frame, nothing to play",
                path, frame
            )));
        }
        if reader.len() % frame != 0 {
            log::warn!(
                "{:?} ends with a partial frame; the last {} bytes are skipped",
                path,
                reader.len() % frame
            );
        }

        let cancel = CancellationToken::new();
        let (ready_tx, ready_rx) = mpsc::sync_channel::<usize>(1);
        let backend = self.backend.clone();
        let worker_cancel = cancel.clone();

        let worker = std::thread::Builder::new()
            .name("pcm-playback".to_string())
            .spawn(move || run_session(backend, reader, stream, worker_cancel, ready_tx))?;

        match ready_rx.recv() {
            Ok(buffer_size) => {
                log::debug!("Playback worker ready, chunk size {} bytes", buffer_size);
                Ok(PlaybackSession {
                    path: path.to_path_buf(),
                    stream,
                    cancel,
                    worker,
                })
            }
            // Worker exited without signalling ready: the device never opened
            Err(_) => match worker.join() {
                Ok(Err(e)) => Err(e),
                Ok(Ok(_)) | Err(_) => Err(PlaybackError::WorkerPanicked),
            },
        }
    }

    /// Stop the active session and wait for the device to be released
    ///
    /// Returns the session's completion result: its counters, or the error
    /// that ended the loop.
    pub fn stop(&mut self) -> PlaybackResult<PlaybackSummary> {
        let session = self.session.take().ok_or(PlaybackError::NotPlaying)?;

        self.state = PlaybackState::Stopping;
        session.cancel.cancel();
        let result = session
            .worker
            .join()
            .map_err(|_| PlaybackError::WorkerPanicked)
            .and_then(|r| r);
        self.state = PlaybackState::Idle;

        match &result {
            Ok(summary) => log::info!(
                "Playback stopped: {:?} ({} bytes, {} loops)",
                session.path,
                summary.bytes_written,
                summary.loops
            ),
            Err(e) => log::warn!("Playback of {:?} ended with error: {}", session.path, e),
        }
        result
    }
}

impl Drop for StreamingPlaybackEngine {
    fn drop(&mut self) {
        if self.session.is_some() {
            if let Err(e) = self.stop() {
                log::warn!("Playback session ended with error on drop: {}", e);
            }
        }
    }
}

/// Worker thread body: owns the device for the whole session
fn run_session(
    backend: Arc<dyn OutputBackend>,
    mut reader: PcmFileReader,
    stream: PcmStream,
    cancel: CancellationToken,
    ready: mpsc::SyncSender<usize>,
) -> PlaybackResult<PlaybackSummary> {
    let mut device = backend.open(&stream)?;

    let buffer_size = device.min_buffer_size();
    if buffer_size == 0 || !stream.is_frame_aligned(buffer_size) {
        return Err(PlaybackError::DeviceUnavailable(format!(
            "{} reported unusable buffer size {} for {}",
            backend.name(),
            buffer_size,
            stream
        )));
    }

    // Caller may have given up waiting; playback still runs until cancelled
    let _ = ready.send(buffer_size);
    drop(ready);

    let result = playback_loop(device.as_mut(), &mut reader, &stream, &cancel, buffer_size);

    device.stop();
    drop(device);
    log::debug!("Output device released for {:?}", reader.path());

    result
}

fn playback_loop(
    device: &mut dyn OutputDevice,
    reader: &mut PcmFileReader,
    stream: &PcmStream,
    cancel: &CancellationToken,
    buffer_size: usize,
) -> PlaybackResult<PlaybackSummary> {
    let frame = stream.bytes_per_frame();
    let mut data = vec![0u8; buffer_size];
    let mut summary = PlaybackSummary::default();
    let mut device_started = false;
    let mut rewound_without_data = false;

    while !cancel.is_cancelled() {
        // Whole frames only; a partial frame can only be the file's tail
        let read = reader.read_into(&mut data)?;
        let read = read - read % frame;
        if read == 0 {
            if rewound_without_data {
                return Err(PlaybackError::InvalidArgument(format!(
                    "{:?} has no data after rewind",
                    reader.path()
                )));
            }
            log::debug!("End of file, looping {:?}", reader.path());
            reader.rewind()?;
            summary.loops += 1;
            rewound_without_data = true;
            continue;
        }
        rewound_without_data = false;

        let written = match stream.encoding {
            SampleEncoding::Int16 => device.write_bytes(&data[..read], cancel)?,
            SampleEncoding::Float32 => {
                let samples = convert::bytes_to_f32(&data, 0, read)?;
                device.write_f32(&samples, cancel)? * 4
            }
        };

        if written > 0 && !device_started {
            device.play()?;
            device_started = true;
            log::debug!("Output device started after first write");
        }

        summary.chunks_written += 1;
        summary.bytes_written += written as u64;
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    /// What the fake device saw, shared with the test
    #[derive(Default)]
    struct DeviceLog {
        opened: AtomicUsize,
        released: AtomicUsize,
        writes: AtomicUsize,
        /// Writes observed before `play()` was called
        writes_before_play: AtomicUsize,
        play_calls: AtomicUsize,
        /// First bytes written, capped to keep memory bounded
        bytes: Mutex<Vec<u8>>,
        /// f32 samples received, capped
        samples: Mutex<Vec<f32>>,
    }

    const CAPTURE_LIMIT: usize = 4096;

    struct FakeBackend {
        log: Arc<DeviceLog>,
        buffer_size: usize,
        fail_open: bool,
        /// Block every write until cancelled, like a stalled device
        stall: bool,
        fail_after_writes: Option<usize>,
    }

    impl FakeBackend {
        fn new(buffer_size: usize) -> Self {
            Self {
                log: Arc::new(DeviceLog::default()),
                buffer_size,
                fail_open: false,
                stall: false,
                fail_after_writes: None,
            }
        }
    }

    impl OutputBackend for FakeBackend {
        fn open(&self, _stream: &PcmStream) -> PlaybackResult<Box<dyn OutputDevice>> {
            if self.fail_open {
                return Err(PlaybackError::DeviceUnavailable("fake device busy".to_string()));
            }
            self.log.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeDevice {
                log: self.log.clone(),
                buffer_size: self.buffer_size,
                playing: AtomicBool::new(false),
                stall: self.stall,
                fail_after_writes: self.fail_after_writes,
            }))
        }

        fn name(&self) -> &'static str {
            "fake"
        }
    }

    struct FakeDevice {
        log: Arc<DeviceLog>,
        buffer_size: usize,
        playing: AtomicBool,
        stall: bool,
        fail_after_writes: Option<usize>,
    }

    impl FakeDevice {
        fn record_write(&self, cancel: &CancellationToken) -> PlaybackResult<bool> {
            let count = self.log.writes.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(limit) = self.fail_after_writes {
                if count > limit {
                    return Err(PlaybackError::Io(std::io::Error::new(
                        std::io::ErrorKind::BrokenPipe,
                        "fake device unplugged",
                    )));
                }
            }
            if !self.playing.load(Ordering::SeqCst) {
                self.log.writes_before_play.fetch_add(1, Ordering::SeqCst);
            }
            if self.stall && self.playing.load(Ordering::SeqCst) {
                while !cancel.wait_timeout(Duration::from_millis(50)) {}
                return Ok(false);
            }
            // Pace the loop roughly like a real device would
            std::thread::sleep(Duration::from_micros(200));
            Ok(true)
        }
    }

    impl OutputDevice for FakeDevice {
        fn min_buffer_size(&self) -> usize {
            self.buffer_size
        }

        fn write_bytes(&mut self, data: &[u8], cancel: &CancellationToken) -> PlaybackResult<usize> {
            if !self.record_write(cancel)? {
                return Ok(0);
            }
            let mut bytes = self.log.bytes.lock().unwrap();
            let room = CAPTURE_LIMIT.saturating_sub(bytes.len());
            bytes.extend_from_slice(&data[..data.len().min(room)]);
            Ok(data.len())
        }

        fn write_f32(&mut self, samples: &[f32], cancel: &CancellationToken) -> PlaybackResult<usize> {
            if !self.record_write(cancel)? {
                return Ok(0);
            }
            let mut captured = self.log.samples.lock().unwrap();
            let room = CAPTURE_LIMIT.saturating_sub(captured.len());
            captured.extend_from_slice(&samples[..samples.len().min(room)]);
            Ok(samples.len())
        }

        fn play(&mut self) -> PlaybackResult<()> {
            self.playing.store(true, Ordering::SeqCst);
            self.log.play_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    impl Drop for FakeDevice {
        fn drop(&mut self) {
            self.log.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn int16_stereo() -> PcmStream {
        PcmStream::new(44100, 2, SampleEncoding::Int16).unwrap()
    }

    fn wait_for(mut cond: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !cond() {
            assert!(Instant::now() < deadline, "timed out waiting for condition");
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    fn fixture(dir: &tempfile::TempDir, data: &[u8]) -> PathBuf {
        let path = dir.path().join("input.pcm");
        std::fs::write(&path, data).unwrap();
        path
    }

    #[test]
    fn test_int16_playback_loops_source() {
        let dir = tempfile::tempdir().unwrap();
        let data: Vec<u8> = (0..40u8).collect();
        let path = fixture(&dir, &data);

        let backend = FakeBackend::new(16);
        let log = backend.log.clone();
        let mut engine = StreamingPlaybackEngine::new(Arc::new(backend));

        engine.start(&path, int16_stereo()).unwrap();
        assert_eq!(engine.state(), PlaybackState::Playing);

        wait_for(|| log.bytes.lock().unwrap().len() >= 120);
        let summary = engine.stop().unwrap();
        assert!(summary.loops >= 2);

        let bytes = log.bytes.lock().unwrap();
        // Chunks of 16, 16, 8 then the file again from the start
        assert_eq!(&bytes[..40], &data[..]);
        assert_eq!(&bytes[40..80], &data[..]);
        assert_eq!(engine.state(), PlaybackState::Idle);
    }

    #[test]
    fn test_device_starts_on_first_write_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture(&dir, &[0u8; 64]);

        let backend = FakeBackend::new(16);
        let log = backend.log.clone();
        let mut engine = StreamingPlaybackEngine::new(Arc::new(backend));

        engine.start(&path, int16_stereo()).unwrap();
        wait_for(|| log.writes.load(Ordering::SeqCst) >= 5);
        engine.stop().unwrap();

        assert_eq!(log.play_calls.load(Ordering::SeqCst), 1);
        assert_eq!(log.writes_before_play.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_float_path_converts_little_endian() {
        let dir = tempfile::tempdir().unwrap();
        let samples = [0.25f32, -0.5, 1.0, -1.0];
        let path = fixture(&dir, &convert::f32_to_bytes(&samples));

        let backend = FakeBackend::new(8);
        let log = backend.log.clone();
        let mut engine = StreamingPlaybackEngine::new(Arc::new(backend));

        let stream = PcmStream::new(48000, 2, SampleEncoding::Float32).unwrap();
        engine.start(&path, stream).unwrap();
        wait_for(|| log.samples.lock().unwrap().len() >= 8);
        engine.stop().unwrap();

        let captured = log.samples.lock().unwrap();
        assert_eq!(&captured[..4], &samples);
        assert_eq!(&captured[4..8], &samples);
    }

    #[test]
    fn test_stop_releases_device() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture(&dir, &[1u8; 256]);

        let backend = FakeBackend::new(32);
        let log = backend.log.clone();
        let mut engine = StreamingPlaybackEngine::new(Arc::new(backend));

        engine.start(&path, int16_stereo()).unwrap();
        assert_eq!(log.released.load(Ordering::SeqCst), 0);
        engine.stop().unwrap();

        assert_eq!(log.opened.load(Ordering::SeqCst), 1);
        assert_eq!(log.released.load(Ordering::SeqCst), 1);
        assert!(matches!(engine.stop(), Err(PlaybackError::NotPlaying)));
    }

    #[test]
    fn test_stop_wakes_blocked_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture(&dir, &[0u8; 64]);

        let mut backend = FakeBackend::new(16);
        backend.stall = true;
        let log = backend.log.clone();
        let mut engine = StreamingPlaybackEngine::new(Arc::new(backend));

        engine.start(&path, int16_stereo()).unwrap();
        wait_for(|| log.writes.load(Ordering::SeqCst) >= 2);

        let begin = Instant::now();
        engine.stop().unwrap();
        assert!(begin.elapsed() < Duration::from_secs(2));
        assert_eq!(log.released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_second_start_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture(&dir, &[0u8; 64]);

        let backend = FakeBackend::new(16);
        let log = backend.log.clone();
        let mut engine = StreamingPlaybackEngine::new(Arc::new(backend));

        engine.start(&path, int16_stereo()).unwrap();
        assert!(matches!(
            engine.start(&path, int16_stereo()),
            Err(PlaybackError::AlreadyPlaying)
        ));
        assert!(engine.is_playing());
        engine.stop().unwrap();
        assert_eq!(log.opened.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_device_failure_leaves_engine_idle() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture(&dir, &[0u8; 64]);

        let mut backend = FakeBackend::new(16);
        backend.fail_open = true;
        let mut engine = StreamingPlaybackEngine::new(Arc::new(backend));

        assert!(matches!(
            engine.start(&path, int16_stereo()),
            Err(PlaybackError::DeviceUnavailable(_))
        ));
        assert_eq!(engine.state(), PlaybackState::Idle);
        assert!(engine.current().is_none());
    }

    #[test]
    fn test_misaligned_device_buffer_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture(&dir, &[0u8; 64]);

        let backend = FakeBackend::new(6);
        let log = backend.log.clone();
        let mut engine = StreamingPlaybackEngine::new(Arc::new(backend));

        assert!(matches!(
            engine.start(&path, int16_stereo()),
            Err(PlaybackError::DeviceUnavailable(_))
        ));
        assert_eq!(log.released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_missing_and_empty_sources() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = StreamingPlaybackEngine::new(Arc::new(FakeBackend::new(16)));

        assert!(matches!(
            engine.start(dir.path().join("nope.pcm"), int16_stereo()),
            Err(PlaybackError::NotFound(_))
        ));

        let empty = fixture(&dir, &[]);
        assert!(matches!(
            engine.start(&empty, int16_stereo()),
            Err(PlaybackError::InvalidArgument(_))
        ));
        assert_eq!(engine.state(), PlaybackState::Idle);
    }

    #[test]
    fn test_write_failure_ends_session_with_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture(&dir, &[0u8; 64]);

        let mut backend = FakeBackend::new(16);
        backend.fail_after_writes = Some(3);
        let log = backend.log.clone();
        let mut engine = StreamingPlaybackEngine::new(Arc::new(backend));

        engine.start(&path, int16_stereo()).unwrap();
        wait_for(|| engine.state() == PlaybackState::Idle);
        assert_eq!(log.released.load(Ordering::SeqCst), 1);
        assert!(matches!(engine.stop(), Err(PlaybackError::Io(_))));

        // The engine accepts a new session afterwards
        engine.start(&path, int16_stereo()).unwrap();
        wait_for(|| engine.state() == PlaybackState::Idle);
        assert!(engine.stop().is_err());
        assert_eq!(log.opened.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_partial_frame_tail_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        // One stereo int16 frame plus half of the next
        let path = fixture(&dir, &[1, 2, 3, 4, 5, 6]);

        let backend = FakeBackend::new(4);
        let log = backend.log.clone();
        let mut engine = StreamingPlaybackEngine::new(Arc::new(backend));

        engine.start(&path, int16_stereo()).unwrap();
        wait_for(|| log.bytes.lock().unwrap().len() >= 12);
        let summary = engine.stop().unwrap();

        assert_eq!(summary.bytes_written % 4, 0);
        let bytes = log.bytes.lock().unwrap();
        assert_eq!(&bytes[..12], &[1, 2, 3, 4, 1, 2, 3, 4, 1, 2, 3, 4]);
    }

    #[test]
    fn test_float_tail_keeps_channel_order() {
        let dir = tempfile::tempdir().unwrap();
        // Two stereo f32 frames and a dangling sample
        let samples = [0.1f32, -0.1, 0.2, -0.2, 0.3];
        let path = fixture(&dir, &convert::f32_to_bytes(&samples));

        let backend = FakeBackend::new(8);
        let log = backend.log.clone();
        let mut engine = StreamingPlaybackEngine::new(Arc::new(backend));

        let stream = PcmStream::new(44100, 2, SampleEncoding::Float32).unwrap();
        engine.start(&path, stream).unwrap();
        wait_for(|| log.samples.lock().unwrap().len() >= 8);
        engine.stop().unwrap();

        let captured = log.samples.lock().unwrap();
        assert_eq!(&captured[..8], &[0.1, -0.1, 0.2, -0.2, 0.1, -0.1, 0.2, -0.2]);
    }

    #[test]
    fn test_source_shorter_than_a_frame_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture(&dir, &[1, 2]);
        let backend = FakeBackend::new(4);
        let log = backend.log.clone();
        let mut engine = StreamingPlaybackEngine::new(Arc::new(backend));

        assert!(matches!(
            engine.start(&path, int16_stereo()),
            Err(PlaybackError::InvalidArgument(_))
        ));
        assert_eq!(log.opened.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_drop_collects_failed_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture(&dir, &[0u8; 64]);

        let mut backend = FakeBackend::new(16);
        backend.fail_after_writes = Some(1);
        let log = backend.log.clone();
        let mut engine = StreamingPlaybackEngine::new(Arc::new(backend));

        engine.start(&path, int16_stereo()).unwrap();
        wait_for(|| engine.state() == PlaybackState::Idle);
        assert!(engine.current().is_some());
        drop(engine);

        assert_eq!(log.opened.load(Ordering::SeqCst), 1);
        assert_eq!(log.released.load(Ordering::SeqCst), 1);
    }
}
