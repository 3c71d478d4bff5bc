//! Entry point assembling providers, parsers and hooks.

use crate::context::Context;
use crate::error::ConfigResult;
use crate::field::Field;
use crate::init::InitializeHook;
use crate::inject::InjectHook;
use crate::parser::{Parser, default_parsers};
use crate::processor::{Hook, Outcome, Processor};
use crate::provider::{ArgsProvider, EnvProvider, Provider};
use crate::repository::Repository;
use crate::usage::UsageMode;
use crate::value::Value;
use std::sync::Arc;
use tracing::info;

/// A configuration context: the providers, parsers and hooks used to
/// configure records.
///
/// ```no_run
/// use fieldwire::{Fieldwire, Record};
///
/// #[derive(Debug, Default, Record)]
/// pub struct Service {
///     #[fieldwire(key = "workers", default = "4")]
///     pub workers: u32,
/// }
///
/// let mut service = Service::default();
/// Fieldwire::standard().configure(&mut service)?;
/// # Ok::<(), fieldwire::ConfigError>(())
/// ```
#[derive(Debug)]
pub struct Fieldwire {
    repository: Arc<Repository>,
    processor: Processor,
}

impl Fieldwire {
    pub fn builder() -> FieldwireBuilder {
        FieldwireBuilder::default()
    }

    /// Process arguments and environment as providers, the default parsers,
    /// and the binding, initialization and injection hooks.
    pub fn standard() -> Self {
        Self::builder().args(ArgsProvider::from_env()).env(EnvProvider::from_env()).build()
    }

    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    pub fn processor(&self) -> &Processor {
        &self.processor
    }

    /// Configure `record` in place with an empty context.
    pub fn configure<T: Value>(&self, record: &mut T) -> ConfigResult<Outcome> {
        self.configure_with(&Context::new(), record)
    }

    pub fn configure_with(&self, ctx: &Context, record: &mut dyn Value) -> ConfigResult<Outcome> {
        let outcome = self.processor.process(ctx, record)?;
        info!(outcome = ?outcome, "Configuration complete");
        Ok(outcome)
    }
}

type UsageFn = Box<dyn Fn(UsageMode, &[&Field]) + Send + Sync>;

/// Builder for [`Fieldwire`].
#[derive(Default)]
pub struct FieldwireBuilder {
    args: Option<Arc<ArgsProvider>>,
    providers: Vec<Arc<dyn Provider>>,
    parsers: Vec<Arc<dyn Parser>>,
    hooks: Vec<Arc<dyn Hook>>,
    usage: Option<UsageFn>,
    skip_default_parsers: bool,
}

impl FieldwireBuilder {
    /// Use `args` as a provider and as the source of the help flag.
    pub fn args(mut self, args: ArgsProvider) -> Self {
        let args = Arc::new(args);
        self.providers.push(args.clone());
        self.args = Some(args);
        self
    }

    pub fn env(self, env: EnvProvider) -> Self {
        self.provider(env)
    }

    pub fn provider(mut self, provider: impl Provider + 'static) -> Self {
        self.providers.push(Arc::new(provider));
        self
    }

    /// Add a parser, tried before the default ones.
    pub fn parser(mut self, parser: impl Parser + 'static) -> Self {
        self.parsers.push(Arc::new(parser));
        self
    }

    /// Register only the parsers added with [`parser`](Self::parser).
    pub fn without_default_parsers(mut self) -> Self {
        self.skip_default_parsers = true;
        self
    }

    /// Add a hook, run after the built-in ones.
    pub fn hook(mut self, hook: impl Hook + 'static) -> Self {
        self.hooks.push(Arc::new(hook));
        self
    }

    pub fn usage<F>(mut self, usage: F) -> Self
    where
        F: Fn(UsageMode, &[&Field]) + Send + Sync + 'static,
    {
        self.usage = Some(Box::new(usage));
        self
    }

    pub fn build(self) -> Fieldwire {
        let mut repository = Repository::new();
        for provider in self.providers {
            repository.add_shared_provider(provider);
        }
        repository.add_parsers(self.parsers);
        if !self.skip_default_parsers {
            repository.add_parsers(default_parsers());
        }
        let repository = Arc::new(repository);

        let mut processor = Processor::new();
        if let Some(args) = self.args {
            processor = processor.with_help(args);
        }
        if let Some(usage) = self.usage {
            processor = processor.with_usage(usage);
        }
        processor.add_shared_hook(repository.clone());
        processor.add_hook(InitializeHook);
        processor.add_hook(InjectHook);
        for hook in self.hooks {
            processor.add_shared_hook(hook);
        }

        Fieldwire {
            repository,
            processor,
        }
    }
}
