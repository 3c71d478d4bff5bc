//! Execution context handed to every hook.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Caller-supplied context for one configuration run.
///
/// The engine only passes the context through. Cancellation is cooperative:
/// hooks and providers that block may check [`is_cancelled`](Self::is_cancelled).
#[derive(Clone, Default)]
pub struct Context {
    cancelled: Arc<AtomicBool>,
    extensions: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a typed value, replacing any previous value of the same type.
    pub fn with<T: Any + Send + Sync>(mut self, value: T) -> Self {
        self.extensions.insert(TypeId::of::<T>(), Arc::new(value));
        self
    }

    pub fn get<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T>())
    }

    /// Request cancellation. Visible to every clone of this context.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("cancelled", &self.is_cancelled())
            .field("extensions", &self.extensions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct RequestId(u64);

    #[test]
    fn test_extensions() {
        let ctx = Context::new().with(RequestId(7)).with("tenant".to_string());

        assert_eq!(ctx.get::<RequestId>(), Some(&RequestId(7)));
        assert_eq!(ctx.get::<String>().map(String::as_str), Some("tenant"));
        assert!(ctx.get::<u32>().is_none());
    }

    #[test]
    fn test_cancel_is_shared_between_clones() {
        let ctx = Context::new();
        let clone = ctx.clone();
        assert!(!clone.is_cancelled());

        ctx.cancel();
        assert!(clone.is_cancelled());
    }
}
