//! Quantization job management service.

use std::sync::Arc;

use dashmap::DashMap;
use image::RgbImage;
use mediancut::Quantizer;
use serde::Deserialize;
use tokio::{
    sync::{mpsc, oneshot, Semaphore},
    task::JoinHandle,
};
use tracing::{debug, info, trace};

use crate::common::{Error, Mode, OutputFormat};

#[derive(Deserialize, Clone)]
pub struct QuantizeServiceConfig {
    /// The maximum number of quantization jobs that are allowed to run at a time.
    pub max_jobs: usize,
    /// Palette size used when a request does not specify one.
    #[serde(default = "default_colors")]
    pub default_colors: usize,
    /// Mapping mode used when a request does not specify one.
    #[serde(default)]
    pub default_mode: Mode,
}

fn default_colors() -> usize {
    mediancut::MAX_COLORS
}

/// Identifies a job. Concurrent requests with the same key share a single run.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobKey {
    pub image_id: String,
    pub colors: usize,
    pub mode: Mode,
    pub format: OutputFormat,
}

type JobResult = Result<Vec<u8>, Arc<Error>>;

struct QueueRequest {
    key: JobKey,
    image: Arc<RgbImage>,
    responder: oneshot::Sender<JobResult>,
}

pub struct QuantizeService {
    queues: DashMap<JobKey, Vec<oneshot::Sender<JobResult>>>,
    jobs: Semaphore,
}

impl QuantizeService {
    pub fn spawn(config: QuantizeServiceConfig) -> QuantizeServiceHandle {
        Self::spawn_with_task(config).0
    }

    /// Spawns the management task. It exits once every handle is dropped and the jobs that were
    /// still running have reported back.
    fn spawn_with_task(config: QuantizeServiceConfig) -> (QuantizeServiceHandle, JoinHandle<()>) {
        let (requests_tx, mut requests_rx) = mpsc::channel(32);
        let (completed_tx, mut completed_rx) = mpsc::channel(8);

        let service = Arc::new(QuantizeService {
            queues: DashMap::new(),
            jobs: Semaphore::new(config.max_jobs.max(1)),
        });
        let task = tokio::spawn(async move {
            info!("quantization management task is ready");
            // Jobs hold clones of this sender, so `completed_rx` only closes once it is dropped.
            let mut completed_tx = Some(completed_tx);
            loop {
                tokio::select! {
                    request = requests_rx.recv(), if completed_tx.is_some() => match request {
                        Some(request) => {
                            if let Some(completed) = &completed_tx {
                                service.handle_request(request, completed)
                            }
                        }
                        None => {
                            debug!(running = service.queues.len(), "all handles dropped");
                            completed_tx = None;
                        }
                    },
                    Some((key, result)) = completed_rx.recv() => {
                        service.handle_complete_job(key, result)
                    },
                    else => break,
                }
            }
            info!("quantization management task exited");
        });

        let handle = QuantizeServiceHandle {
            requests: requests_tx,
            config: Arc::new(config),
        };
        (handle, task)
    }

    fn handle_request(
        self: &Arc<Self>,
        request: QueueRequest,
        completed: &mpsc::Sender<(JobKey, JobResult)>,
    ) {
        let QueueRequest {
            key,
            image,
            responder,
        } = request;
        trace!(?key, "got queue request");

        let mut queue = self.queues.entry(key.clone()).or_default();
        let start_job = queue.is_empty();
        queue.push(responder);
        drop(queue);

        if start_job {
            trace!("queue is empty, starting job");
            let service = Arc::clone(self);
            let completed = completed.clone();
            tokio::spawn(async move {
                let result = service.run_job(&key, image).await.map_err(Arc::new);
                // Should be fine if we discard the error.
                let _ = completed.send((key, result)).await;
            });
        }
    }

    fn handle_complete_job(&self, key: JobKey, result: JobResult) {
        if let Some((_, queue)) = self.queues.remove(&key) {
            trace!(?key, waiting = queue.len(), "job complete");
            for waiting in queue {
                // Ignore error if the requester went away.
                let _ = waiting.send(result.clone());
            }
        }
    }

    async fn run_job(&self, key: &JobKey, image: Arc<RgbImage>) -> Result<Vec<u8>, Error> {
        // The semaphore is never closed, so acquiring cannot fail.
        let _permit = self
            .jobs
            .acquire()
            .await
            .map_err(|_| Error::QuantizeServiceOffline)?;

        debug!(?key, "starting quantization");
        let job = key.clone();
        let bytes = tokio::task::spawn_blocking(move || quantize_and_encode(&image, &job))
            .await
            .map_err(|_| Error::JobPanicked)??;
        debug!(?key, bytes = bytes.len(), "quantization complete");

        Ok(bytes)
    }
}

fn quantize_and_encode(image: &RgbImage, job: &JobKey) -> Result<Vec<u8>, Error> {
    let quantizer = Quantizer::new(job.colors, job.mode.into())?;
    let paletted = quantizer.quantize(image)?;
    let bytes = match job.format {
        OutputFormat::Png => mediancut::encode_png(&paletted)?,
        OutputFormat::Gif => mediancut::encode_gif(&paletted)?,
    };
    Ok(bytes)
}

#[derive(Clone)]
pub struct QuantizeServiceHandle {
    requests: mpsc::Sender<QueueRequest>,
    config: Arc<QuantizeServiceConfig>,
}

impl QuantizeServiceHandle {
    pub fn config(&self) -> &QuantizeServiceConfig {
        &self.config
    }

    /// Quantizes and encodes `image`, or waits for an identical job that is already running.
    pub async fn quantize(&self, key: JobKey, image: Arc<RgbImage>) -> JobResult {
        let (tx, rx) = oneshot::channel();
        self.requests
            .send(QueueRequest {
                key,
                image,
                responder: tx,
            })
            .await
            .map_err(|_| Arc::new(Error::QuantizeServiceOffline))?;
        rx.await.map_err(|_| Arc::new(Error::JobExited))?
    }
}
