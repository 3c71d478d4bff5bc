//! The hook pipeline.
//!
//! A run validates the record, builds its field tree, wires injections,
//! resolves the processing order and marks configurable fields. If help was
//! requested on the command line the usage is rendered and the run stops.
//! Otherwise injection targets are emptied and every hook runs over every
//! resolved field, hook by hook.

use crate::context::Context;
use crate::error::{ConfigError, ConfigResult};
use crate::field::{self, Field, FieldId, FieldRef, FieldTree};
use crate::inject::{self, wire};
use crate::mark::mark;
use crate::provider::ArgsProvider;
use crate::resolve::resolve;
use crate::usage::{UsageMode, render_usage};
use crate::value::Value;
use std::sync::Arc;
use tracing::{debug, info};

/// A unit of work applied to every resolved field.
pub trait Hook: Send + Sync {
    /// Name reported when the hook fails.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn call(&self, ctx: &Context, field: &mut FieldRef<'_>) -> anyhow::Result<()>;
}

impl<F> Hook for F
where
    F: Fn(&Context, &mut FieldRef<'_>) -> anyhow::Result<()> + Send + Sync,
{
    fn call(&self, ctx: &Context, field: &mut FieldRef<'_>) -> anyhow::Result<()> {
        self(ctx, field)
    }
}

/// A closure hook with a name.
pub struct FnHook<F> {
    name: String,
    f: F,
}

/// Build a named hook from a closure.
pub fn hook_fn<F>(name: impl Into<String>, f: F) -> FnHook<F>
where
    F: Fn(&Context, &mut FieldRef<'_>) -> anyhow::Result<()> + Send + Sync,
{
    FnHook {
        name: name.into(),
        f,
    }
}

impl<F> Hook for FnHook<F>
where
    F: Fn(&Context, &mut FieldRef<'_>) -> anyhow::Result<()> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn call(&self, ctx: &Context, field: &mut FieldRef<'_>) -> anyhow::Result<()> {
        (self.f)(ctx, field)
    }
}

/// Result of a successful run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Every hook ran over every resolved field.
    Configured,
    /// Help was requested. The usage was rendered and no hook ran.
    HelpDisplayed,
}

/// Field tree of a record together with its processing order.
#[derive(Debug, Clone)]
pub struct Plan {
    pub tree: FieldTree,
    pub order: Vec<FieldId>,
}

impl Plan {
    /// Resolved fields, in processing order.
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.order.iter().map(|id| self.tree.get(*id))
    }

    /// Position of `path` in the processing order.
    pub fn position(&self, path: &str) -> Option<usize> {
        self.fields().position(|field| field.path() == path)
    }
}

/// Build, wire, resolve and mark the field tree of `record`.
pub fn plan(record: &mut dyn Value) -> ConfigResult<Plan> {
    let mut tree = field::build(record)?;
    let dependencies = wire(&mut tree, record)?;
    let order = resolve(&tree, dependencies)?;
    mark(&mut tree);
    Ok(Plan { tree, order })
}

type UsageFn = Box<dyn Fn(UsageMode, &[&Field]) + Send + Sync>;

/// Runs hooks over the fields of a record.
pub struct Processor {
    hooks: Vec<Arc<dyn Hook>>,
    help: Option<Arc<ArgsProvider>>,
    usage: Option<UsageFn>,
}

impl Processor {
    pub fn new() -> Self {
        Self {
            hooks: Vec::new(),
            help: None,
            usage: None,
        }
    }

    /// Check `args` for the help flag before running hooks.
    pub fn with_help(mut self, args: Arc<ArgsProvider>) -> Self {
        self.help = Some(args);
        self
    }

    /// Replace the default usage renderer.
    pub fn with_usage<F>(mut self, usage: F) -> Self
    where
        F: Fn(UsageMode, &[&Field]) + Send + Sync + 'static,
    {
        self.usage = Some(Box::new(usage));
        self
    }

    pub fn with_hook(mut self, hook: impl Hook + 'static) -> Self {
        self.add_hook(hook);
        self
    }

    pub fn add_hook(&mut self, hook: impl Hook + 'static) {
        self.hooks.push(Arc::new(hook));
    }

    pub fn add_shared_hook(&mut self, hook: Arc<dyn Hook>) {
        self.hooks.push(hook);
    }

    pub fn hook_names(&self) -> Vec<&str> {
        self.hooks.iter().map(|hook| hook.name()).collect()
    }

    /// Configure `record` in place.
    ///
    /// The first failing hook aborts the run. Values already written by
    /// earlier hooks are kept.
    pub fn process(&self, ctx: &Context, record: &mut dyn Value) -> ConfigResult<Outcome> {
        let Plan { mut tree, order } = plan(record)?;

        if let Some(mode) = self.help.as_ref().and_then(|args| args.help()) {
            let mode = UsageMode::from_value(&mode);
            let fields: Vec<&Field> = order.iter().map(|id| tree.get(*id)).collect();
            match &self.usage {
                Some(usage) => usage(mode, &fields),
                None => print!("{}", render_usage(mode, &fields)),
            }
            info!("Help requested, skipping hooks");
            return Ok(Outcome::HelpDisplayed);
        }

        inject::release(&tree, &mut *record)?;
        for hook in &self.hooks {
            debug!(hook = hook.name(), fields = order.len(), "Running hook");
            for &id in &order {
                let mut field = FieldRef::new(&mut tree, id, &mut *record);
                hook.call(ctx, &mut field)
                    .map_err(|source| ConfigError::HookExecution {
                        path: tree.get(id).path().to_string(),
                        phase: hook.name().to_string(),
                        source,
                    })?;
            }
        }

        Ok(Outcome::Configured)
    }
}

impl Default for Processor {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Processor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Processor")
            .field("hooks", &self.hook_names())
            .field("help", &self.help.is_some())
            .finish()
    }
}
