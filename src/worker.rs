//! Serialized background worker for the two expensive rebuilds: the display
//! mask recompute (on commit) and the folder composite rebuild (on layer
//! toggles).
//!
//! One worker thread per session; jobs run strictly one at a time in
//! submission order. A generation counter implements cancel-on-supersede:
//! switching sources bumps the generation, and any result that comes back
//! carrying an older generation is dropped on receipt instead of being
//! applied to the wrong source.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use image::RgbaImage;

use crate::error::Error;

/// What a finished job produced.
pub enum JobOutput {
    /// A freshly derived display mask (commit).
    DisplayMask(RgbaImage),
    /// A rebuilt audience composite (layer visibility change).
    Composite(RgbaImage),
}

/// A job result tagged with the generation it was submitted under.
pub struct JobResult {
    pub generation: u64,
    pub output: Result<JobOutput, Error>,
}

type JobFn = Box<dyn FnOnce() -> Result<JobOutput, Error> + Send + 'static>;

struct Job {
    generation: u64,
    run: JobFn,
}

pub struct Worker {
    sender: Sender<Job>,
    results: Receiver<JobResult>,
    generation: u64,
    /// Jobs submitted under the current generation and not yet returned.
    pending: usize,
}

impl Worker {
    pub fn spawn() -> Self {
        let (job_tx, job_rx) = mpsc::channel::<Job>();
        let (result_tx, result_rx) = mpsc::channel();
        thread::spawn(move || {
            while let Ok(job) = job_rx.recv() {
                let output = (job.run)();
                if result_tx
                    .send(JobResult {
                        generation: job.generation,
                        output,
                    })
                    .is_err()
                {
                    break;
                }
            }
        });
        Self {
            sender: job_tx,
            results: result_rx,
            generation: 0,
            pending: 0,
        }
    }

    /// Queue a job behind any already-queued work.
    pub fn submit(&mut self, job: impl FnOnce() -> Result<JobOutput, Error> + Send + 'static) {
        let sent = self
            .sender
            .send(Job {
                generation: self.generation,
                run: Box::new(job),
            })
            .is_ok();
        if sent {
            self.pending += 1;
        }
    }

    /// True while current-generation work is queued or running.
    pub fn is_busy(&self) -> bool {
        self.pending > 0
    }

    /// Invalidate all outstanding work; results from before this call will
    /// be discarded when they arrive.
    pub fn supersede(&mut self) {
        self.generation += 1;
        self.pending = 0;
    }

    /// Collect finished results without blocking. Superseded results are
    /// dropped here.
    pub fn poll(&mut self) -> Vec<JobResult> {
        let mut fresh = Vec::new();
        while let Ok(result) = self.results.try_recv() {
            if result.generation == self.generation {
                self.pending = self.pending.saturating_sub(1);
                fresh.push(result);
            }
        }
        fresh
    }
}
