//! Post-binding initialization of records.

use crate::context::Context;
use crate::field::FieldRef;
use crate::processor::Hook;
use anyhow::Context as _;
use tracing::trace;

/// A record that finishes its own setup once its members are bound.
///
/// Declare it with `#[fieldwire(init)]` on the record and implement this
/// trait. The `initialize` hook calls [`init`](Initialize::init) after every
/// value has been bound and before injected values are shared.
pub trait Initialize {
    fn init(&mut self, ctx: &Context) -> anyhow::Result<()>;
}

/// Hook calling [`Initialize::init`] on every field that supports it.
#[derive(Debug, Clone, Copy, Default)]
pub struct InitializeHook;

impl Hook for InitializeHook {
    fn name(&self) -> &str {
        "initialize"
    }

    fn call(&self, ctx: &Context, field: &mut FieldRef<'_>) -> anyhow::Result<()> {
        let path = field.path().to_string();
        let value = field.value()?;
        let Some(target) = value.as_initialize() else {
            return Ok(());
        };

        trace!(path = %path, "Initializing field");
        target.init(ctx).context("initializing field")
    }
}
