//! Injection registry, wiring and the injection hook.

use crate::context::Context;
use crate::error::{ConfigError, ConfigResult, Phase};
use crate::field::{Field, FieldId, FieldRef, FieldTree, NodeKind, locate, locate_ref};
use crate::processor::Hook;
use crate::resolve::Dependencies;
use crate::value::Value;
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// Record structural and injection dependencies of every field.
///
/// Injection sources are registered on the way and every target is checked
/// against its source. Each source field receives the list of targets it
/// feeds.
pub fn wire(tree: &mut FieldTree, root: &dyn Value) -> ConfigResult<Dependencies<FieldId>> {
    let mut dependencies = Dependencies::new();
    let mut sources: BTreeMap<&'static str, FieldId> = BTreeMap::new();
    let mut targets: BTreeMap<FieldId, &'static str> = BTreeMap::new();

    let mut stack = vec![FieldId::ROOT];
    while let Some(id) = stack.pop() {
        let field = tree.get(id);
        stack.extend(field.children().iter().rev().copied());
        dependencies.add(id, field.children().iter().copied());

        if let Some(key) = field.tags().inject_as {
            if let Some(existing) = sources.get(key) {
                return Err(ConfigError::DuplicateInjectionSource {
                    key: key.to_string(),
                    path: field.path().to_string(),
                    existing: tree.get(*existing).path().to_string(),
                });
            }

            let storage = locate_ref(root, field.route())
                .map_err(|e| ConfigError::storage(Phase::Wire, field.path(), e))?;
            if !storage.shareable() {
                return Err(ConfigError::NonShareableInjectionSource {
                    path: field.path().to_string(),
                    type_name: field.storage_type().name(),
                });
            }
            sources.insert(key, id);
        }

        if let Some(key) = field.tags().inject {
            targets.insert(id, key);
        }
    }

    for (target, key) in targets {
        let Some(&source) = sources.get(key) else {
            return Err(ConfigError::UndefinedInjectionSource {
                key: key.to_string(),
                path: tree.get(target).path().to_string(),
            });
        };

        let target_field = tree.get(target);
        let source_field = tree.get(source);
        let storage = locate_ref(root, target_field.route())
            .map_err(|e| ConfigError::storage(Phase::Wire, target_field.path(), e))?;
        let source_storage = locate_ref(root, source_field.route())
            .map_err(|e| ConfigError::storage(Phase::Wire, source_field.path(), e))?;
        let shares_interface = storage
            .interface()
            .is_some_and(|interface| source_storage.shares_as(interface));
        if !storage.accepts(source_field.storage_type()) && !shares_interface {
            return Err(ConfigError::InjectionTypeMismatch {
                path: target_field.path().to_string(),
                source_path: source_field.path().to_string(),
                source_type: source_field.storage_type().name(),
                target_type: target_field.storage_type().name(),
            });
        }

        trace!(source = %source_field.path(), target = %target_field.path(), key, "Wired injection");
        tree.get_mut(source).injection_targets.push(target);
        dependencies.add(target, [source]);
    }

    debug!(sources = sources.len(), "Wired injection sources");
    Ok(dependencies)
}

/// Empty every injection target that can hold nothing, so that sources
/// shared by a previous run are owned by their record again.
///
/// A target nested under a source that another target still shares is
/// retried once that target is emptied. Returns the number of targets that
/// held a value.
pub fn release(tree: &FieldTree, root: &mut dyn Value) -> ConfigResult<usize> {
    let mut pending: Vec<&Field> = tree
        .iter()
        .filter(|f| f.kind() == NodeKind::InjectionTarget)
        .collect();
    let mut released = 0;

    while !pending.is_empty() {
        let before = pending.len();
        let mut failure = None;
        pending.retain(|field| match locate(&mut *root, field.route()) {
            Ok(storage) => {
                if storage.release() {
                    released += 1;
                }
                false
            }
            Err(e) => {
                failure = Some(ConfigError::storage(Phase::Hooks, field.path(), e));
                true
            }
        });

        if pending.len() == before {
            if let Some(err) = failure {
                return Err(err);
            }
        }
    }

    debug!(released, "Released injection targets");
    Ok(released)
}

/// Hook copying every injection source into its targets.
///
/// Runs after binding so that sources hold their final values.
#[derive(Debug, Clone, Copy, Default)]
pub struct InjectHook;

impl Hook for InjectHook {
    fn name(&self) -> &str {
        "inject"
    }

    fn call(&self, _ctx: &Context, field: &mut FieldRef<'_>) -> anyhow::Result<()> {
        if field.injection_targets().is_empty() {
            return Ok(());
        }

        let targets = field.injection_targets().to_vec();
        for target in targets {
            let path = field.tree().get(target).path().to_string();
            let (accepts, interface) = {
                let storage = field.storage_ref_of(target)?;
                (storage.accepts(field.field().storage_type()), storage.interface())
            };

            let source = field.value_ref()?;
            let snapshot = if accepts {
                source.snapshot()
            } else {
                interface.and_then(|interface| source.snapshot_as(interface))
            };
            let snapshot = snapshot.ok_or_else(|| ConfigError::NonShareableInjectionSource {
                path: field.path().to_string(),
                type_name: field.field().storage_type().name(),
            })?;

            field
                .storage_of(target)?
                .inject(snapshot)
                .map_err(|e| ConfigError::storage(Phase::Hooks, path.clone(), e))?;
            trace!(source = %field.path(), target = %path, "Injected value");
        }

        Ok(())
    }
}
