//! # Bin service
//!
//! Native async front end. The kernel and the result cache live on one
//! dedicated worker thread; callers send commands over a channel and await
//! the reply. Kernel calls are therefore strictly serialized.
//!
//! Every call enqueues its command before it returns the future, so the
//! worker sees requests in call order. Model requests carry a sequence
//! number; one that is no longer the newest when the worker reaches it, or
//! when its build completes, is answered with [`ServiceError::Superseded`].

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;

use gridbin_engine::{CacheStats, ModelMesh, PipelineConfig};
use gridbin_kernel::{Kernel, KernelError};
use parking_lot::Mutex;
use tokio::sync::{oneshot, watch};
use tracing::{debug, info, warn};

use crate::engine_state::{BridgeError, EngineState};
use crate::messages::BuildRequest;

/// Outcome of a kernel bootstrap, `None` while it is running.
type InitOutcome = Option<Result<(), String>>;

/// Kernel bootstrap lifecycle.
#[derive(Debug)]
enum InitState {
    Uninitialized,
    /// Concurrent callers share this receiver instead of starting another
    /// bootstrap.
    Initializing(watch::Receiver<InitOutcome>),
    Ready,
    Failed(String),
}

type Reply<T> = oneshot::Sender<Result<T, ServiceError>>;

enum Command {
    Initialize(watch::Sender<InitOutcome>),
    Generate {
        seq: u64,
        request: BuildRequest,
        reply: Reply<Option<ModelMesh>>,
    },
    Export {
        request: BuildRequest,
        reply: Reply<Vec<u8>>,
    },
    ClearCache(Reply<()>),
    Stats(Reply<CacheStats>),
    Shutdown,
}

/// Errors from the async service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("kernel bootstrap failed: {0}")]
    Bootstrap(String),

    #[error("request {seq} superseded by request {latest}")]
    Superseded { seq: u64, latest: u64 },

    #[error("engine worker is not running")]
    WorkerGone,

    #[error("failed to start engine worker: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("bridge error: {0}")]
    Bridge(#[from] BridgeError),
}

/// Async handle to the pipeline worker thread.
pub struct BinService {
    commands: mpsc::Sender<Command>,
    init: Arc<Mutex<InitState>>,
    latest: Arc<AtomicU64>,
    worker: Option<JoinHandle<()>>,
}

impl BinService {
    /// Start the worker thread. The kernel is not created until
    /// [`BinService::initialize`] runs `bootstrap` on the worker.
    pub fn spawn<K, F>(config: PipelineConfig, bootstrap: F) -> Result<Self, ServiceError>
    where
        K: Kernel + 'static,
        F: FnMut() -> Result<K, KernelError> + Send + 'static,
    {
        let (commands, inbox) = mpsc::channel();
        let init = Arc::new(Mutex::new(InitState::Uninitialized));
        let latest = Arc::new(AtomicU64::new(0));

        let worker = {
            let init = Arc::clone(&init);
            let latest = Arc::clone(&latest);
            std::thread::Builder::new()
                .name("gridbin-worker".into())
                .spawn(move || {
                    let state = EngineState::new(config, bootstrap);
                    run_worker(state, inbox, &init, &latest);
                })?
        };

        Ok(Self {
            commands,
            init,
            latest,
            worker: Some(worker),
        })
    }

    fn send(&self, command: Command) -> Result<(), ServiceError> {
        self.commands
            .send(command)
            .map_err(|_| ServiceError::WorkerGone)
    }

    /// Bootstrap the kernel. Idempotent; callers arriving while a bootstrap
    /// is running wait for the same one. After a failure the next call
    /// retries.
    pub fn initialize(&self) -> impl Future<Output = Result<(), ServiceError>> + Send + 'static {
        let waiter = self.begin_initialize();
        async move {
            let mut outcome = match waiter? {
                Some(outcome) => outcome,
                None => return Ok(()),
            };
            loop {
                let current = outcome.borrow_and_update().clone();
                if let Some(result) = current {
                    return result.map_err(ServiceError::Bootstrap);
                }
                if outcome.changed().await.is_err() {
                    return Err(ServiceError::WorkerGone);
                }
            }
        }
    }

    fn begin_initialize(&self) -> Result<Option<watch::Receiver<InitOutcome>>, ServiceError> {
        let mut state = self.init.lock();
        match &*state {
            InitState::Ready => Ok(None),
            InitState::Initializing(outcome) => Ok(Some(outcome.clone())),
            InitState::Uninitialized | InitState::Failed(_) => {
                let (done, outcome) = watch::channel(None);
                if self.commands.send(Command::Initialize(done)).is_err() {
                    *state = InitState::Failed("engine worker is not running".into());
                    return Err(ServiceError::WorkerGone);
                }
                *state = InitState::Initializing(outcome.clone());
                Ok(Some(outcome))
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(*self.init.lock(), InitState::Ready)
    }

    /// The last bootstrap error, if the most recent attempt failed.
    pub fn init_error(&self) -> Option<String> {
        match &*self.init.lock() {
            InitState::Failed(reason) => Some(reason.clone()),
            _ => None,
        }
    }

    /// Build the bin and return its preview buffers, `None` for no outlines.
    pub fn generate_model(
        &self,
        request: BuildRequest,
    ) -> impl Future<Output = Result<Option<ModelMesh>, ServiceError>> + Send + 'static {
        let seq = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        let (reply, response) = oneshot::channel();
        let sent = self.send(Command::Generate {
            seq,
            request,
            reply,
        });
        async move {
            sent?;
            response.await.map_err(|_| ServiceError::WorkerGone)?
        }
    }

    /// Build the bin and return it as STEP bytes.
    pub fn export_step(
        &self,
        request: BuildRequest,
    ) -> impl Future<Output = Result<Vec<u8>, ServiceError>> + Send + 'static {
        let (reply, response) = oneshot::channel();
        let sent = self.send(Command::Export { request, reply });
        async move {
            sent?;
            response.await.map_err(|_| ServiceError::WorkerGone)?
        }
    }

    pub fn clear_cache(&self) -> impl Future<Output = Result<(), ServiceError>> + Send + 'static {
        let (reply, response) = oneshot::channel();
        let sent = self.send(Command::ClearCache(reply));
        async move {
            sent?;
            response.await.map_err(|_| ServiceError::WorkerGone)?
        }
    }

    pub fn cache_stats(
        &self,
    ) -> impl Future<Output = Result<CacheStats, ServiceError>> + Send + 'static {
        let (reply, response) = oneshot::channel();
        let sent = self.send(Command::Stats(reply));
        async move {
            sent?;
            response.await.map_err(|_| ServiceError::WorkerGone)?
        }
    }
}

impl Drop for BinService {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("engine worker panicked");
            }
        }
    }
}

fn run_worker<K: Kernel + 'static>(
    mut state: EngineState<K>,
    inbox: mpsc::Receiver<Command>,
    init: &Mutex<InitState>,
    latest: &AtomicU64,
) {
    debug!("engine worker started");
    while let Ok(command) = inbox.recv() {
        match command {
            Command::Initialize(done) => {
                let outcome = state.initialize().map_err(|e| e.to_string());
                *init.lock() = match &outcome {
                    Ok(()) => InitState::Ready,
                    Err(reason) => {
                        warn!(%reason, "kernel bootstrap failed");
                        InitState::Failed(reason.clone())
                    }
                };
                done.send_replace(Some(outcome));
            }

            Command::Generate {
                seq,
                request,
                reply,
            } => {
                let newest = latest.load(Ordering::SeqCst);
                if seq < newest {
                    debug!(seq, newest, "skipping superseded request");
                    let _ = reply.send(Err(ServiceError::Superseded {
                        seq,
                        latest: newest,
                    }));
                    continue;
                }
                let result = state.generate_model(&request);
                let newest = latest.load(Ordering::SeqCst);
                let result = if seq < newest {
                    debug!(seq, newest, "dropping stale result");
                    Err(ServiceError::Superseded {
                        seq,
                        latest: newest,
                    })
                } else {
                    result.map_err(ServiceError::from)
                };
                let _ = reply.send(result);
            }

            Command::Export { request, reply } => {
                let _ = reply.send(state.export_step(&request).map_err(ServiceError::from));
            }

            Command::ClearCache(reply) => {
                state.clear_cache();
                let _ = reply.send(Ok(()));
            }

            Command::Stats(reply) => {
                let _ = reply.send(Ok(state.cache_stats()));
            }

            Command::Shutdown => break,
        }
    }
    state.clear_cache();
    info!(live_solids = state.live_solids(), "engine worker stopped");
}
