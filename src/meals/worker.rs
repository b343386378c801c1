use std::future::Future;
use std::pin::Pin;

use tracing::{info_span, Instrument};

pub type BoxTask = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Runs work after the request that triggered it has been answered.
/// Tasks are detached: nothing awaits or cancels them.
pub trait MealWorker: Send + Sync {
    fn spawn_detached(&self, name: &'static str, task: BoxTask);
}

#[derive(Debug, Default, Clone)]
pub struct TokioWorker;

impl MealWorker for TokioWorker {
    fn spawn_detached(&self, name: &'static str, task: BoxTask) {
        tokio::spawn(task.instrument(info_span!("background_task", task = name)));
    }
}
