//! Event dispatcher driving the reconciler.
//!
//! The controller keeps the informer cache current, maps each event to the
//! tenant keys it affects and runs one reconciliation per key on a blocking
//! worker thread. Attempts for distinct keys run concurrently up to the
//! configured limit. A key is never reconciled twice at once: an event for a
//! key that is in flight marks it dirty, and the key is reconciled again from
//! the latest snapshot once the current attempt finishes.

use std::any::Any;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::domain::ports::{InformerCache, InformerCacheError, TenantStoreError};
use crate::domain::{ResourceKey, TenantDescriptor, TenantReconciler, tenants_depending_on};

use super::events::{ResourceEvent, admits};

/// Errors raised while applying an event to the informer cache.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    /// The cache rejected an update.
    #[error(transparent)]
    Cache(#[from] InformerCacheError),
    /// The cache could not be read while correlating an event.
    #[error(transparent)]
    Store(#[from] TenantStoreError),
}

/// Dispatch limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Upper bound on reconciliations running at once across keys.
    pub max_concurrent_reconciles: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_reconciles: 4,
        }
    }
}

#[derive(Debug, Default)]
struct DispatchState {
    running: BTreeSet<ResourceKey>,
    dirty: BTreeSet<ResourceKey>,
}

/// Routes resource events to the reconciler.
pub struct Controller<K, R> {
    cache: Arc<K>,
    reconciler: Arc<R>,
    permits: Arc<Semaphore>,
    dispatch: Arc<Mutex<DispatchState>>,
}

impl<K, R> Clone for Controller<K, R> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            reconciler: Arc::clone(&self.reconciler),
            permits: Arc::clone(&self.permits),
            dispatch: Arc::clone(&self.dispatch),
        }
    }
}

impl<K, R> Controller<K, R>
where
    K: InformerCache + 'static,
    R: TenantReconciler + 'static,
{
    /// Build a controller over `cache` and `reconciler`.
    pub fn new(cache: Arc<K>, reconciler: Arc<R>, config: ControllerConfig) -> Self {
        Self {
            cache,
            reconciler,
            permits: Arc::new(Semaphore::new(config.max_concurrent_reconciles.max(1))),
            dispatch: Arc::new(Mutex::new(DispatchState::default())),
        }
    }

    /// Apply `event` to the cache and return the tenant keys to reconcile.
    ///
    /// Descriptor events schedule the descriptor itself. Credential events
    /// schedule every descriptor in the holder's namespace that references
    /// the holder. Deleting a descriptor only evicts it from the cache; the
    /// role and database it provisioned are left in place.
    pub fn handle(&self, event: ResourceEvent) -> Result<BTreeSet<ResourceKey>, ControllerError> {
        let admitted = admits(&event);
        match event {
            ResourceEvent::TenantApplied(descriptor) => {
                let key = descriptor.key.clone();
                self.cache.apply_tenant(descriptor)?;
                if !admitted {
                    debug!(tenant = %key, "Ignoring descriptor without a body");
                    return Ok(BTreeSet::new());
                }
                Ok(BTreeSet::from([key]))
            }
            ResourceEvent::TenantDeleted(key) => {
                if self.cache.remove_tenant(&key)?.is_some() {
                    info!(tenant = %key, "Descriptor deleted; server objects are retained");
                }
                Ok(BTreeSet::new())
            }
            ResourceEvent::CredentialApplied(holder) => {
                let key = holder.key.clone();
                self.cache.apply_credential(holder)?;
                self.dependants_of(&key)
            }
            ResourceEvent::CredentialDeleted(key) => {
                self.cache.remove_credential(&key)?;
                self.dependants_of(&key)
            }
        }
    }

    fn dependants_of(&self, holder: &ResourceKey) -> Result<BTreeSet<ResourceKey>, ControllerError> {
        let descriptors = self.cache.tenants_in(holder.namespace.as_str())?;
        let keys = tenants_depending_on(holder, &descriptors);
        debug!(holder = %holder, dependants = keys.len(), "Correlated credential event");
        Ok(keys)
    }

    /// Consume `events` until the channel closes, then wait for in-flight
    /// reconciliations to finish.
    pub async fn run(&self, mut events: mpsc::Receiver<ResourceEvent>) {
        let mut tasks = JoinSet::new();
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.dispatch(event, &mut tasks),
                    None => break,
                },
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    log_task_exit(joined);
                }
            }
        }
        while let Some(joined) = tasks.join_next().await {
            log_task_exit(joined);
        }
        info!("Watch stream closed; controller stopped");
    }

    fn dispatch(&self, event: ResourceEvent, tasks: &mut JoinSet<()>) {
        let resource = event.key().clone();
        match self.handle(event) {
            Ok(keys) => {
                for key in keys {
                    self.schedule(key, tasks);
                }
            }
            Err(err) => error!(resource = %resource, error = %err, "Failed to apply event"),
        }
    }

    fn schedule(&self, key: ResourceKey, tasks: &mut JoinSet<()>) {
        {
            let mut state = self.dispatch.lock().unwrap_or_else(PoisonError::into_inner);
            if state.running.contains(&key) {
                debug!(tenant = %key, "Reconciliation in flight; marking dirty");
                state.dirty.insert(key);
                return;
            }
            state.running.insert(key.clone());
        }
        let controller = self.clone();
        tasks.spawn(async move { controller.drive(key).await });
    }

    async fn drive(self, key: ResourceKey) {
        loop {
            self.attempt(&key).await;
            let mut state = self.dispatch.lock().unwrap_or_else(PoisonError::into_inner);
            if !state.dirty.remove(&key) {
                state.running.remove(&key);
                return;
            }
        }
    }

    async fn attempt(&self, key: &ResourceKey) {
        let Ok(_permit) = Arc::clone(&self.permits).acquire_owned().await else {
            warn!(tenant = %key, "Dispatch permits closed");
            return;
        };

        let descriptor = match self.cache.tenant(key) {
            Ok(Some(descriptor)) => descriptor,
            Ok(None) => {
                debug!(tenant = %key, "Descriptor no longer observed");
                return;
            }
            Err(err) => {
                error!(tenant = %key, error = %err, "Failed to read descriptor");
                return;
            }
        };

        let reconciler = Arc::clone(&self.reconciler);
        let snapshot = descriptor.clone();
        let joined = tokio::task::spawn_blocking(move || reconciler.reconcile(&snapshot)).await;
        match joined {
            Ok(Ok(outcome)) => debug!(tenant = %key, ?outcome, "Reconciliation finished"),
            Ok(Err(err)) => error!(tenant = %key, error = %err, "Reconciliation failed"),
            Err(join_error) if join_error.is_panic() => {
                let message = format!(
                    "reconciliation panicked: {}",
                    panic_message(join_error.into_panic().as_ref())
                );
                self.report_panic(descriptor, message).await;
            }
            Err(join_error) => warn!(tenant = %key, error = %join_error, "Reconciliation cancelled"),
        }
    }

    async fn report_panic(&self, descriptor: TenantDescriptor, message: String) {
        let reconciler = Arc::clone(&self.reconciler);
        let key = descriptor.key.clone();
        let reported =
            tokio::task::spawn_blocking(move || reconciler.report_failure(&descriptor, &message))
                .await;
        match reported {
            Ok(Ok(_)) => {}
            Ok(Err(err)) => error!(tenant = %key, error = %err, "Failed to report panic"),
            Err(join_error) => error!(tenant = %key, error = %join_error, "Failed to report panic"),
        }
    }
}

fn log_task_exit(joined: Result<(), tokio::task::JoinError>) {
    if let Err(join_error) = joined {
        error!(error = %join_error, "Dispatch task aborted");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}
