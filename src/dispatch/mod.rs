//! The dispatch pipeline: per-region work queue, backlog pusher, probe
//! classifier and the worker loop that drains batches into ticks.

pub mod catalog;
pub mod probe;
pub mod pusher;
pub mod queue;
pub mod worker;

use thiserror::Error;

use crate::dispatch::catalog::CatalogError;
use crate::dispatch::queue::QueueError;

/// Errors surfaced by the pusher and worker entry points. Queue and catalog
/// failures abort the current dispatch call; probe failures never appear
/// here, they classify into `Down` ticks instead.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error(transparent)]
    Queue(#[from] QueueError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}
