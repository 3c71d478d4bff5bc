//! The field tree: one node per addressable location of a host record.

mod builder;
mod handle;

pub use builder::build;
pub use handle::{FieldRef, locate, locate_ref};

use crate::record::Tags;
use crate::value::TypeInfo;
use std::fmt;

/// Path of the root field.
pub const ROOT_PATH: &str = "$";

/// Index of a field in its [`FieldTree`], in depth-first build order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldId(pub(crate) usize);

impl FieldId {
    pub const ROOT: FieldId = FieldId(0);

    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How a field takes part in the traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// A record whose members were visited.
    Composite,
    /// A value the traversal stops at.
    Leaf,
    /// A value populated only by injection. Never recursed into.
    InjectionTarget,
}

/// One node of the field tree.
#[derive(Debug, Clone)]
pub struct Field {
    pub(crate) id: FieldId,
    pub(crate) path: String,
    pub(crate) parent: Option<FieldId>,
    pub(crate) children: Vec<FieldId>,
    /// Member indices leading from the root record to this field.
    pub(crate) route: Vec<usize>,
    pub(crate) tags: Tags,
    pub(crate) anonymous: bool,
    pub(crate) kind: NodeKind,
    pub(crate) storage_type: TypeInfo,
    pub(crate) target_type: TypeInfo,
    pub(crate) configurable: bool,
    pub(crate) configuration_key: Option<String>,
    pub(crate) injection_targets: Vec<FieldId>,
    pub(crate) provider: Option<String>,
}

impl Field {
    pub fn id(&self) -> FieldId {
        self.id
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn parent(&self) -> Option<FieldId> {
        self.parent
    }

    pub fn children(&self) -> &[FieldId] {
        &self.children
    }

    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    /// Own configuration key segment.
    pub fn key(&self) -> Option<&'static str> {
        self.tags.key
    }

    pub fn is_anonymous(&self) -> bool {
        self.anonymous
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn is_leaf(&self) -> bool {
        self.kind != NodeKind::Composite
    }

    /// Whether the field is injected and publishes nothing itself.
    pub fn is_pure_injection_target(&self) -> bool {
        self.kind == NodeKind::InjectionTarget && self.tags.inject_as.is_none()
    }

    /// Type of the storage location itself.
    pub fn storage_type(&self) -> TypeInfo {
        self.storage_type
    }

    /// Type found after dereferencing pointer storage.
    pub fn target_type(&self) -> TypeInfo {
        self.target_type
    }

    pub fn is_configurable(&self) -> bool {
        self.configurable
    }

    /// Dotted configuration key, set on configurable fields.
    pub fn configuration_key(&self) -> Option<&str> {
        self.configuration_key.as_deref()
    }

    pub fn injection_targets(&self) -> &[FieldId] {
        &self.injection_targets
    }

    /// Name of the provider that supplied the bound value, or `"default"`
    /// when the default literal was used.
    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    pub(crate) fn route(&self) -> &[usize] {
        &self.route
    }
}

/// Arena of fields built from one host record.
#[derive(Debug, Clone)]
pub struct FieldTree {
    fields: Vec<Field>,
}

impl FieldTree {
    pub(crate) fn new(root: Field) -> Self {
        Self { fields: vec![root] }
    }

    pub(crate) fn push(&mut self, mut field: Field) -> FieldId {
        let id = FieldId(self.fields.len());
        field.id = id;
        if let Some(parent) = field.parent {
            self.fields[parent.0].children.push(id);
        }
        self.fields.push(field);
        id
    }

    pub fn root(&self) -> &Field {
        &self.fields[0]
    }

    pub fn get(&self, id: FieldId) -> &Field {
        &self.fields[id.0]
    }

    pub(crate) fn get_mut(&mut self, id: FieldId) -> &mut Field {
        &mut self.fields[id.0]
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fields in build order.
    pub fn iter(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }

    pub fn find(&self, path: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.path == path)
    }

    /// The field and every ancestor up to the root.
    pub fn ancestry(&self, id: FieldId) -> impl Iterator<Item = &Field> {
        std::iter::successors(Some(self.get(id)), |field| {
            field.parent.map(|parent| self.get(parent))
        })
    }
}

impl std::ops::Index<FieldId> for FieldTree {
    type Output = Field;

    fn index(&self, id: FieldId) -> &Field {
        self.get(id)
    }
}
