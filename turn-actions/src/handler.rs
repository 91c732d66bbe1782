//! Action handlers invoked for DO commands.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::ActionResult;

/// Sentinel returned by a handler to stop processing the rest of the plan.
pub const STOP_COMMAND: &str = "STOP";

/// Handles one DO command.
///
/// `C` is the host's turn context and `S` its turn state. The returned string
/// is [`STOP_COMMAND`] to halt the plan or anything else to continue.
#[async_trait]
pub trait ActionHandler<C, S>: Send + Sync
where
    C: ?Sized + Send + Sync + 'static,
    S: ?Sized + Send + Sync + 'static,
{
    /// Runs the action.
    ///
    /// # Errors
    ///
    /// Any error aborts the remainder of the plan and is returned to the caller.
    async fn handle(
        &self,
        context: Arc<C>,
        state: Arc<S>,
        parameters: Map<String, Value>,
        action: String,
    ) -> ActionResult<String>;
}

#[async_trait]
impl<C, S, F, Fut> ActionHandler<C, S> for F
where
    C: ?Sized + Send + Sync + 'static,
    S: ?Sized + Send + Sync + 'static,
    F: Send + Sync + Fn(Arc<C>, Arc<S>, Map<String, Value>, String) -> Fut,
    Fut: Future<Output = ActionResult<String>> + Send,
{
    async fn handle(
        &self,
        context: Arc<C>,
        state: Arc<S>,
        parameters: Map<String, Value>,
        action: String,
    ) -> ActionResult<String> {
        (self)(context, state, parameters, action).await
    }
}

/// Default handler for names with no registration: logs a warning and stops
/// the plan.
pub struct UnknownActionHandler<C: ?Sized, S: ?Sized> {
    _marker: PhantomData<fn(&C, &S)>,
}

impl<C: ?Sized, S: ?Sized> Default for UnknownActionHandler<C, S> {
    fn default() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<C: ?Sized, S: ?Sized> std::fmt::Debug for UnknownActionHandler<C, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("UnknownActionHandler")
    }
}

#[async_trait]
impl<C, S> ActionHandler<C, S> for UnknownActionHandler<C, S>
where
    C: ?Sized + Send + Sync + 'static,
    S: ?Sized + Send + Sync + 'static,
{
    async fn handle(
        &self,
        _context: Arc<C>,
        _state: Arc<S>,
        _parameters: Map<String, Value>,
        action: String,
    ) -> ActionResult<String> {
        warn!(action = %action, "no handler registered for action; stopping plan");
        Ok(STOP_COMMAND.to_owned())
    }
}
