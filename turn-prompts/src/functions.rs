//! Registry of functions callable from templates.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde_json::Value;
use turn_memory::Memory;
use turn_primitives::Tokenizer;

use crate::error::{PromptError, PromptResult};

/// Borrowed turn resources handed to template functions.
#[derive(Clone, Copy)]
pub struct FunctionContext<'a> {
    /// Turn memory; functions may read and write it.
    pub memory: &'a dyn Memory,
    /// Tokenizer used for the render pass.
    pub tokenizer: &'a dyn Tokenizer,
}

/// Function invoked by `{{name arg ...}}` template expressions.
#[async_trait]
pub trait PromptFunction: Send + Sync {
    /// Produces a JSON value; strings render verbatim, other values as JSON.
    async fn invoke(&self, ctx: &FunctionContext<'_>, args: &[String]) -> PromptResult<Value>;
}

struct SyncFunction<F>(F);

#[async_trait]
impl<F> PromptFunction for SyncFunction<F>
where
    F: Fn(&dyn Memory, &[String]) -> PromptResult<Value> + Send + Sync,
{
    async fn invoke(&self, ctx: &FunctionContext<'_>, args: &[String]) -> PromptResult<Value> {
        (self.0)(ctx.memory, args)
    }
}

/// Name-keyed registry of template functions.
#[derive(Default)]
pub struct PromptFunctions {
    inner: RwLock<HashMap<String, Arc<dyn PromptFunction>>>,
}

impl std::fmt::Debug for PromptFunctions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read().expect("prompt functions poisoned");
        let mut names: Vec<_> = inner.keys().cloned().collect();
        names.sort();
        f.debug_struct("PromptFunctions")
            .field("registered", &names)
            .finish()
    }
}

impl PromptFunctions {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a function implementation.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::DuplicateFunction`] if the name is already present.
    ///
    /// # Panics
    ///
    /// Panics if the internal registry lock is poisoned.
    pub fn register<T>(&self, name: impl Into<String>, function: T) -> PromptResult<()>
    where
        T: PromptFunction + 'static,
    {
        let name = name.into();
        let mut inner = self.inner.write().expect("prompt functions poisoned");
        if inner.contains_key(&name) {
            return Err(PromptError::DuplicateFunction { name });
        }
        inner.insert(name, Arc::new(function));
        Ok(())
    }

    /// Registers a synchronous closure over memory and arguments.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::DuplicateFunction`] if the name is already present.
    pub fn register_fn<F>(&self, name: impl Into<String>, function: F) -> PromptResult<()>
    where
        F: Fn(&dyn Memory, &[String]) -> PromptResult<Value> + Send + Sync + 'static,
    {
        self.register(name, SyncFunction(function))
    }

    /// Returns `true` when a function with `name` is registered.
    ///
    /// # Panics
    ///
    /// Panics if the internal registry lock is poisoned.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.inner
            .read()
            .expect("prompt functions poisoned")
            .contains_key(name)
    }

    /// Invokes the function registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::UnknownFunction`] when the name is not registered and
    /// propagates failures from the function itself.
    ///
    /// # Panics
    ///
    /// Panics if the internal registry lock is poisoned.
    pub async fn invoke(
        &self,
        name: &str,
        ctx: &FunctionContext<'_>,
        args: &[String],
    ) -> PromptResult<Value> {
        let function = self
            .inner
            .read()
            .expect("prompt functions poisoned")
            .get(name)
            .cloned()
            .ok_or_else(|| PromptError::UnknownFunction {
                name: name.to_owned(),
            })?;
        function.invoke(ctx, args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use turn_memory::TurnState;
    use turn_primitives::CharTokenizer;

    struct Upper;

    #[async_trait]
    impl PromptFunction for Upper {
        async fn invoke(
            &self,
            _ctx: &FunctionContext<'_>,
            args: &[String],
        ) -> PromptResult<Value> {
            Ok(Value::String(args.join(" ").to_uppercase()))
        }
    }

    #[tokio::test]
    async fn invokes_registered_functions() {
        let functions = PromptFunctions::new();
        functions.register("upper", Upper).unwrap();
        functions
            .register_fn("greeting", |memory, _args| {
                let name = memory.get_value("user.name").unwrap_or(json!("there"));
                Ok(json!(format!("hi {}", name.as_str().unwrap_or_default())))
            })
            .unwrap();

        let state = TurnState::new();
        state.set_value("user.name", json!("Ada")).unwrap();
        let ctx = FunctionContext {
            memory: &state,
            tokenizer: &CharTokenizer,
        };

        let upper = functions
            .invoke("upper", &ctx, &["a".to_owned(), "b".to_owned()])
            .await
            .unwrap();
        assert_eq!(upper, json!("A B"));
        let greeting = functions.invoke("greeting", &ctx, &[]).await.unwrap();
        assert_eq!(greeting, json!("hi Ada"));
    }

    #[tokio::test]
    async fn unknown_and_duplicate_functions_error() {
        let functions = PromptFunctions::new();
        functions.register("upper", Upper).unwrap();
        let err = functions.register("upper", Upper).expect_err("duplicate");
        assert!(matches!(err, PromptError::DuplicateFunction { name } if name == "upper"));

        let state = TurnState::new();
        let ctx = FunctionContext {
            memory: &state,
            tokenizer: &CharTokenizer,
        };
        let err = functions
            .invoke("missing", &ctx, &[])
            .await
            .expect_err("unknown");
        assert!(matches!(err, PromptError::UnknownFunction { .. }));
    }
}
