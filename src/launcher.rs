use crate::error::{LaunchError, WorkerError};
use crate::model::{Config, WorkerState};
use crate::worker::worker;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::collections::HashMap;
use tokio::task::{Id, JoinError, JoinSet};
use tracing::{debug, info, warn};

/// How a single worker ended.
#[derive(Debug)]
pub enum Outcome {
    Finished(WorkerState),
    Failed(WorkerError),
    Panicked(JoinError),
}

/// The running workers, keyed back to their rank.
pub struct Workers {
    set: JoinSet<Result<WorkerState, WorkerError>>,
    ranks: HashMap<Id, usize>,
}

impl Workers {
    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    /// Next worker to end, with its rank. `None` once all have been joined.
    pub async fn next(&mut self) -> Option<(usize, Outcome)> {
        let (id, outcome) = match self.set.join_next_with_id().await? {
            Ok((id, Ok(state))) => (id, Outcome::Finished(state)),
            Ok((id, Err(e))) => (id, Outcome::Failed(e)),
            Err(e) => (e.id(), Outcome::Panicked(e)),
        };
        // every spawned task was registered in `launch`
        let rank = self.ranks.remove(&id)?;
        Some((rank, outcome))
    }
}

/// Spawns `config.threads` workers and returns without waiting for them.
pub fn launch(config: &Config, m: &MultiProgress) -> Workers {
    let sty = ProgressStyle::with_template("{spinner} [{prefix}] {elapsed} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());

    let mut set = JoinSet::new();
    let mut ranks = HashMap::with_capacity(config.threads);
    for rank in 0..config.threads {
        let pb = m.add(ProgressBar::new_spinner());
        pb.set_style(sty.clone());
        pb.set_prefix(rank.to_string());
        let handle = set.spawn(worker(rank, config.clone(), pb));
        ranks.insert(handle.id(), rank);
    }
    Workers { set, ranks }
}

/// Waits for every worker and logs how each one ended.
pub async fn join(mut workers: Workers, m: &MultiProgress) {
    while let Some((rank, outcome)) = workers.next().await {
        m.suspend(|| match outcome {
            Outcome::Finished(state) => debug!(
                rank,
                requests = state.requests,
                elapsed_ms = (state.end - state.begin).num_milliseconds(),
                "worker finished"
            ),
            Outcome::Failed(e) => warn!(rank, error = %e, "worker stopped"),
            Outcome::Panicked(e) => warn!(rank, error = %e, "worker panicked"),
        });
    }
}

/// Runs a whole load test on a runtime with one thread per worker.
pub fn run(config: Config) -> Result<(), LaunchError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.threads.max(1))
        .thread_name("load-worker")
        .enable_all()
        .build()?;

    info!(
        uri = %config.uri,
        threads = config.threads,
        minutes = config.minutes,
        sleepms = config.sleepms,
        "starting load"
    );

    let m = MultiProgress::new();
    runtime.block_on(async {
        let workers = launch(&config, &m);
        join(workers, &m).await;
    });
    Ok(())
}
