//! Name → handler registry populated by the host at startup.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, RwLock};

use serde_json::{Map, Value};

use crate::error::{ActionError, ActionResult};
use crate::handler::{ActionHandler, UnknownActionHandler};

/// Registry of DO handlers keyed by action name.
///
/// Lookups of unregistered names resolve to the unknown-action handler, which
/// defaults to [`UnknownActionHandler`].
pub struct ActionRegistry<C: ?Sized, S: ?Sized> {
    handlers: RwLock<HashMap<String, Arc<dyn ActionHandler<C, S>>>>,
    unknown: Arc<dyn ActionHandler<C, S>>,
}

impl<C, S> Default for ActionRegistry<C, S>
where
    C: ?Sized + Send + Sync + 'static,
    S: ?Sized + Send + Sync + 'static,
{
    fn default() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            unknown: Arc::new(UnknownActionHandler::<C, S>::default()),
        }
    }
}

impl<C: ?Sized, S: ?Sized> fmt::Debug for ActionRegistry<C, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers = self.handlers.read().expect("action registry poisoned");
        let mut names: Vec<_> = handlers.keys().cloned().collect();
        names.sort();
        f.debug_struct("ActionRegistry")
            .field("registered", &names)
            .finish_non_exhaustive()
    }
}

impl<C, S> ActionRegistry<C, S>
where
    C: ?Sized + Send + Sync + 'static,
    S: ?Sized + Send + Sync + 'static,
{
    /// Creates an empty registry with the default unknown-action handler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the handler for `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::DuplicateAction`] if the name is already present.
    ///
    /// # Panics
    ///
    /// Panics if the internal registry lock is poisoned.
    pub fn register<H>(&self, name: impl Into<String>, handler: H) -> ActionResult<()>
    where
        H: ActionHandler<C, S> + 'static,
    {
        let mut handlers = self.handlers.write().expect("action registry poisoned");
        let name = name.into();
        if handlers.contains_key(&name) {
            return Err(ActionError::DuplicateAction { name });
        }
        handlers.insert(name, Arc::new(handler));
        Ok(())
    }

    /// Registers an async closure as the handler for `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::DuplicateAction`] if the name is already present.
    ///
    /// # Panics
    ///
    /// Panics if the internal registry lock is poisoned.
    pub fn register_fn<F, Fut>(&self, name: impl Into<String>, handler: F) -> ActionResult<()>
    where
        F: Fn(Arc<C>, Arc<S>, Map<String, Value>, String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ActionResult<String>> + Send + 'static,
    {
        self.register(name, handler)
    }

    /// Replaces the handler used for unregistered names.
    #[must_use]
    pub fn with_unknown_handler<H>(mut self, handler: H) -> Self
    where
        H: ActionHandler<C, S> + 'static,
    {
        self.unknown = Arc::new(handler);
        self
    }

    /// Returns `true` when a handler is registered for `name`.
    ///
    /// # Panics
    ///
    /// Panics if the internal registry lock is poisoned.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.handlers
            .read()
            .expect("action registry poisoned")
            .contains_key(name)
    }

    /// Returns the handler for `name`, or the unknown-action handler together
    /// with `false` when the name is not registered.
    ///
    /// # Panics
    ///
    /// Panics if the internal registry lock is poisoned.
    #[must_use]
    pub fn resolve(&self, name: &str) -> (Arc<dyn ActionHandler<C, S>>, bool) {
        let handlers = self.handlers.read().expect("action registry poisoned");
        handlers.get(name).map_or_else(
            || (Arc::clone(&self.unknown), false),
            |handler| (Arc::clone(handler), true),
        )
    }

    /// Lists the registered action names in sorted order.
    ///
    /// # Panics
    ///
    /// Panics if the internal registry lock is poisoned.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let handlers = self.handlers.read().expect("action registry poisoned");
        let mut names: Vec<_> = handlers.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::handler::STOP_COMMAND;

    type Registry = ActionRegistry<(), ()>;

    #[tokio::test]
    async fn registers_and_resolves_handlers() {
        let registry = Registry::new();
        registry
            .register_fn("lights_on", |_ctx, _state, _params, action| async move {
                Ok(format!("{action} done"))
            })
            .unwrap();

        let err = registry
            .register_fn("lights_on", |_ctx, _state, _params, _action| async {
                Ok(String::new())
            })
            .expect_err("duplicate");
        assert!(matches!(err, ActionError::DuplicateAction { .. }));

        let (handler, known) = registry.resolve("lights_on");
        assert!(known);
        let output = handler
            .handle(Arc::new(()), Arc::new(()), Map::new(), "lights_on".to_owned())
            .await
            .unwrap();
        assert_eq!(output, "lights_on done");
        assert_eq!(registry.names(), vec!["lights_on".to_owned()]);
    }

    #[tokio::test]
    async fn unknown_names_stop_by_default() {
        let registry = Registry::new();
        let (handler, known) = registry.resolve("launch");
        assert!(!known);
        let output = handler
            .handle(Arc::new(()), Arc::new(()), Map::new(), "launch".to_owned())
            .await
            .unwrap();
        assert_eq!(output, STOP_COMMAND);
    }
}
