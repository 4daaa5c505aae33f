//! Separation orchestrator - runs one job end to end
//!
//! A job reads the whole input into memory, hands it to the engine, sizes
//! the output buffers, asks the engine to separate, and replaces both
//! output files. The engine handle is scoped to the job and released on
//! every exit path.
//!
//! One orchestrator runs at most one job at a time. A second request while a
//! job is active is rejected with [`SeparationError::JobInProgress`], never
//! queued, since both jobs would contend for the same engine.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use crate::pcm::{time_duration, PcmFileReader, PcmStream};

use super::engine::{EngineParams, SeparationEngine};
use super::error::{Result, SeparationError};
use super::handle::EngineHandle;
use super::job::{output_capacity, JobOutcome, SeparationJob, SeparationReport};
use super::output::replace_files;

/// Marks the orchestrator busy for as long as it lives
struct ActiveJob {
    flag: Arc<AtomicBool>,
}

impl ActiveJob {
    fn acquire(flag: &Arc<AtomicBool>) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| SeparationError::JobInProgress)?;
        Ok(Self { flag: flag.clone() })
    }
}

impl Drop for ActiveJob {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Runs separation jobs against one engine, one at a time
pub struct SeparationOrchestrator<E: SeparationEngine> {
    engine: Arc<E>,
    active: Arc<AtomicBool>,
}

impl<E: SeparationEngine> SeparationOrchestrator<E> {
    pub fn new(engine: Arc<E>) -> Self {
        Self {
            engine,
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether a job is currently running
    pub fn is_busy(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Run `job` on the calling thread
    pub fn run(&self, job: &SeparationJob) -> Result<SeparationReport> {
        let _active = ActiveJob::acquire(&self.active).inspect_err(|_| {
            log::warn!("Separation already running, rejecting job for {:?}", job.input)
        })?;
        run_job(self.engine.as_ref(), job)
    }

    /// Run `job` on its own thread
    ///
    /// The orchestrator is marked busy before this returns, so an immediate
    /// second call is rejected.
    pub fn spawn(&self, job: SeparationJob) -> Result<SeparationTask> {
        let active = ActiveJob::acquire(&self.active).inspect_err(|_| {
            log::warn!("Separation already running, rejecting job for {:?}", job.input)
        })?;
        let engine = self.engine.clone();

        let handle = std::thread::Builder::new()
            .name("separation".to_string())
            .spawn(move || {
                let _active = active;
                let result = run_job(engine.as_ref(), &job);
                if let Err(e) = &result {
                    log::error!("Separation of {:?} failed: {}", job.input, e);
                }
                result
            })?;

        Ok(SeparationTask { handle })
    }
}

/// A job running on its own thread
pub struct SeparationTask {
    handle: JoinHandle<Result<SeparationReport>>,
}

impl SeparationTask {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the job and return its result
    pub fn join(self) -> Result<SeparationReport> {
        self.handle
            .join()
            .map_err(|_| SeparationError::WorkerPanicked)?
    }
}

fn validate(job: &SeparationJob) -> Result<PcmStream> {
    PcmStream::new(job.stream.sample_rate, job.stream.channels, job.stream.encoding)
        .map_err(SeparationError::from)
}

fn run_job<E: SeparationEngine>(engine: &E, job: &SeparationJob) -> Result<SeparationReport> {
    let started = Instant::now();
    let stream = validate(job)?;
    log::info!("Separating {:?} ({}) with {} engine", job.input, stream, engine.name());

    let input = {
        let mut reader = PcmFileReader::open(&job.input)?;
        reader.read_to_end()?
    };
    let input_bytes = input.len() as u64;
    let duration_secs = time_duration(input_bytes, &stream);
    log::info!("Input {:?}: {} bytes, {:.2}s", job.input, input_bytes, duration_secs);

    if input.is_empty() {
        log::warn!("Input {:?} is empty, nothing to separate", job.input);
        return Ok(SeparationReport {
            outcome: JobOutcome::EmptyInput,
            input_bytes: 0,
            output_bytes: 0,
            duration_secs: 0.0,
            processing_time: started.elapsed(),
        });
    }
    if !stream.is_frame_aligned(input.len()) {
        log::warn!(
            "Input length {} is not a whole number of {} byte frames",
            input.len(),
            stream.bytes_per_frame()
        );
    }

    for model in [&job.vocal_model, &job.bgm_model] {
        if !model.is_file() {
            return Err(SeparationError::ModelNotFound(model.clone()));
        }
    }

    let params = EngineParams {
        vocal_model: &job.vocal_model,
        bgm_model: &job.bgm_model,
        stream,
    };
    let mut handle = EngineHandle::acquire(engine, &params)?;

    let ingested = handle.add_frames(&input)?;
    drop(input);

    let capacity = output_capacity(ingested, &stream);
    log::debug!("Engine ingested input, {} bytes per output, buffers of {}", ingested, capacity);

    let mut vocal = vec![0u8; capacity];
    let mut bgm = vec![0u8; capacity];
    let valid = handle.separate(&mut vocal, &mut bgm)?;
    handle.release();

    replace_files(&[
        (job.vocal_output.as_path(), &vocal[..valid]),
        (job.bgm_output.as_path(), &bgm[..valid]),
    ])?;

    let processing_time = started.elapsed();
    log::info!(
        "Separation complete: {} bytes per output in {:.2}s",
        valid,
        processing_time.as_secs_f32()
    );

    Ok(SeparationReport {
        outcome: JobOutcome::Completed,
        input_bytes,
        output_bytes: valid,
        duration_secs,
        processing_time,
    })
}
