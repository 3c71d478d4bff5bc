//! Depth-first construction of the field tree.

use super::{Field, FieldId, FieldTree, NodeKind, ROOT_PATH, locate, locate_ref};
use crate::error::{ConfigError, ConfigResult, Phase};
use crate::record::{Member, Tags};
use crate::value::{StorageError, Value};
use tracing::{debug, trace};

/// Walk `root` and build its field tree.
///
/// Storage that is already allocated is only read, so members behind shared
/// pointers can be walked. Nil pointer members are allocated in place.
/// Private members are skipped, injection targets and members whose type
/// already appears among their ancestors become leaves.
pub fn build(root: &mut dyn Value) -> ConfigResult<FieldTree> {
    let storage_type = root.type_info();
    let target = reach(&mut *root, &[], ROOT_PATH)?;
    let target_type = target.type_info();

    if target.as_record().is_none() {
        return Err(ConfigError::InputShape {
            type_name: storage_type.name(),
        });
    }

    let mut tree = FieldTree::new(Field {
        id: FieldId::ROOT,
        path: ROOT_PATH.to_string(),
        parent: None,
        children: Vec::new(),
        route: Vec::new(),
        tags: Tags::default(),
        anonymous: true,
        kind: NodeKind::Composite,
        storage_type,
        target_type,
        configurable: false,
        configuration_key: None,
        injection_targets: Vec::new(),
        provider: None,
    });

    visit(&mut tree, FieldId::ROOT, root)?;

    debug!(fields = tree.len(), root = %target_type, "Built field tree");
    Ok(tree)
}

/// Storage behind the pointers of the location at `route`.
///
/// Nil pointers on the way are allocated first; otherwise the storage is
/// only read.
fn reach<'a>(root: &'a mut dyn Value, route: &[usize], path: &str) -> ConfigResult<&'a dyn Value> {
    let error = |e| ConfigError::storage(Phase::Build, path, e);

    let allocated = locate_ref(&*root, route)
        .map_err(error)?
        .deref_storage()
        .is_some();
    if !allocated {
        trace!(path, "Allocating nil pointer");
        locate(&mut *root, route)
            .and_then(|storage| storage.deref_allocating().map(|_| ()))
            .map_err(error)?;
    }

    let storage = locate_ref(root, route).map_err(error)?;
    storage.deref_storage().ok_or_else(|| {
        error(StorageError::Nil {
            type_name: storage.type_info().name(),
        })
    })
}

fn visit(tree: &mut FieldTree, id: FieldId, root: &mut dyn Value) -> ConfigResult<()> {
    let parent_route = tree.get(id).route.clone();
    let parent_path = tree.get(id).path.clone();
    let parent = reach(&mut *root, &parent_route, &parent_path)?;
    let members = match parent.as_record() {
        Some(record) => record.members(),
        None => {
            let type_name = parent.type_info().name();
            return Err(ConfigError::storage(
                Phase::Build,
                parent_path,
                StorageError::NotComposite { type_name },
            ));
        }
    };

    for (index, member) in members.into_iter().enumerate() {
        if !member.public {
            continue;
        }

        let path = format!("{parent_path}.{}", member.name);
        validate_tags(&path, &member)?;

        let target_type = member.target_type();
        let recursive = tree
            .ancestry(id)
            .any(|ancestor| ancestor.target_type == target_type);

        let mut route = parent_route.clone();
        route.push(index);

        let storage_type = locate_ref(&*root, &route)
            .map_err(|e| ConfigError::storage(Phase::Build, path.as_str(), e))?
            .type_info();

        let kind = if member.tags.inject.is_some() {
            NodeKind::InjectionTarget
        } else if recursive {
            trace!(path = %path, "Self-referential member kept as leaf");
            NodeKind::Leaf
        } else if reach(&mut *root, &route, &path)?.as_record().is_some() {
            NodeKind::Composite
        } else {
            NodeKind::Leaf
        };

        let child = tree.push(Field {
            id,
            path,
            parent: Some(id),
            children: Vec::new(),
            route,
            tags: member.tags,
            anonymous: member.anonymous,
            kind,
            storage_type,
            target_type,
            configurable: false,
            configuration_key: None,
            injection_targets: Vec::new(),
            provider: None,
        });

        if kind == NodeKind::Composite {
            visit(tree, child, &mut *root)?;
        }
    }

    Ok(())
}

fn validate_tags(path: &str, member: &Member) -> ConfigResult<()> {
    let tags = &member.tags;
    for (tag, value) in [
        ("key", tags.key),
        ("inject_as", tags.inject_as),
        ("inject", tags.inject),
    ] {
        if value == Some("") {
            return Err(ConfigError::InvalidEmptyKey {
                path: path.to_string(),
                tag,
            });
        }
    }
    Ok(())
}
