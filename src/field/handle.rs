//! Storage access for fields of a built tree.

use super::{Field, FieldId, FieldTree};
use crate::error::{ConfigError, ConfigResult, Phase};
use crate::record::Tags;
use crate::value::{StorageError, Value};

/// Follow `route` from `root` to the storage of a field, for writing.
///
/// Pointers along the route must already be allocated, which the tree
/// builder guarantees.
pub fn locate<'a>(root: &'a mut dyn Value, route: &[usize]) -> Result<&'a mut dyn Value, StorageError> {
    let mut value = root;
    for &index in route {
        let target = value.deref_storage_mut()?;
        let type_name = target.type_info().name();
        let record = target
            .as_record_mut()
            .ok_or(StorageError::NotComposite { type_name })?;
        value = record
            .member_mut(index)
            .ok_or(StorageError::MissingMember { type_name, index })?;
    }
    Ok(value)
}

/// Follow `route` from `root` to the storage of a field, for reading.
pub fn locate_ref<'a>(root: &'a dyn Value, route: &[usize]) -> Result<&'a dyn Value, StorageError> {
    let mut value = root;
    for &index in route {
        let type_name = value.type_info().name();
        let target = value.deref_storage().ok_or(StorageError::Nil { type_name })?;
        let type_name = target.type_info().name();
        let record = target
            .as_record()
            .ok_or(StorageError::NotComposite { type_name })?;
        value = record
            .member(index)
            .ok_or(StorageError::MissingMember { type_name, index })?;
    }
    Ok(value)
}

/// A field of the tree together with access to its storage in the host
/// record. Handed to every hook.
pub struct FieldRef<'a> {
    tree: &'a mut FieldTree,
    id: FieldId,
    root: &'a mut dyn Value,
}

impl<'a> FieldRef<'a> {
    pub fn new(tree: &'a mut FieldTree, id: FieldId, root: &'a mut dyn Value) -> Self {
        Self { tree, id, root }
    }

    pub fn field(&self) -> &Field {
        self.tree.get(self.id)
    }

    pub fn tree(&self) -> &FieldTree {
        self.tree
    }

    pub fn id(&self) -> FieldId {
        self.id
    }

    pub fn path(&self) -> &str {
        self.field().path()
    }

    pub fn configuration_key(&self) -> Option<&str> {
        self.field().configuration_key()
    }

    pub fn tags(&self) -> &Tags {
        self.field().tags()
    }

    pub fn injection_targets(&self) -> &[FieldId] {
        self.field().injection_targets()
    }

    /// Record the provider that supplied this field's value.
    pub fn set_provider(&mut self, provider: impl Into<String>) {
        self.tree.get_mut(self.id).provider = Some(provider.into());
    }

    /// Storage of this field, as declared on the record.
    pub fn value(&mut self) -> ConfigResult<&mut dyn Value> {
        let id = self.id;
        self.storage_of(id)
    }

    /// Read-only storage of this field.
    pub fn value_ref(&self) -> ConfigResult<&dyn Value> {
        self.storage_ref_of(self.id)
    }

    /// Storage of this field after dereferencing pointers.
    pub fn target(&mut self) -> ConfigResult<&mut dyn Value> {
        let path = self.path().to_string();
        self.value()?
            .deref_storage_mut()
            .map_err(|e| ConfigError::storage(Phase::Hooks, path, e))
    }

    /// Storage of any field of the same tree.
    pub fn storage_of(&mut self, id: FieldId) -> ConfigResult<&mut dyn Value> {
        let field = self.tree.get(id);
        locate(&mut *self.root, field.route())
            .map_err(|e| ConfigError::storage(Phase::Hooks, field.path(), e))
    }

    pub fn storage_ref_of(&self, id: FieldId) -> ConfigResult<&dyn Value> {
        let field = self.tree.get(id);
        locate_ref(&*self.root, field.route())
            .map_err(|e| ConfigError::storage(Phase::Hooks, field.path(), e))
    }
}

impl std::fmt::Debug for FieldRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldRef")
            .field("path", &self.path())
            .field("key", &self.configuration_key())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Record;
    use crate::field::build;

    #[derive(Debug, Default, Record)]
    pub struct Server {
        #[fieldwire(key = "http")]
        pub http: Option<Box<Http>>,
        #[fieldwire(key = "name", default = "api")]
        pub name: String,
    }

    #[derive(Debug, Default, Record)]
    pub struct Http {
        #[fieldwire(key = "port")]
        pub port: Option<u16>,
    }

    #[test]
    fn test_locate_follows_routes_through_pointers() {
        let mut server = Server::default();
        let tree = build(&mut server).unwrap();
        let port = tree.find("$.http.port").unwrap();
        assert_eq!(port.route(), &[0, 0]);

        let storage = locate(&mut server, port.route()).unwrap();
        *storage.deref_storage_mut().unwrap().downcast_mut::<u16>().unwrap() = 8080;

        assert_eq!(server.http.as_ref().and_then(|h| h.port), Some(8080));
    }

    #[test]
    fn test_field_ref_exposes_metadata_and_storage() {
        let mut server = Server::default();
        let mut tree = build(&mut server).unwrap();
        let id = tree.find("$.name").unwrap().id();

        let mut field = FieldRef::new(&mut tree, id, &mut server);
        assert_eq!(field.path(), "$.name");
        assert_eq!(field.tags().default, Some("api"));

        *field.target().unwrap().downcast_mut::<String>().unwrap() = "edge".to_string();
        field.set_provider("args");
        assert_eq!(
            field.value_ref().unwrap().downcast_ref::<String>().map(String::as_str),
            Some("edge")
        );

        assert_eq!(tree.get(id).provider(), Some("args"));
        assert_eq!(server.name, "edge");
    }

    #[test]
    fn test_locate_reports_missing_member() {
        let mut server = Server::default();
        let err = locate(&mut server, &[9]).err();
        assert!(matches!(err, Some(StorageError::MissingMember { index: 9, .. })));
    }
}
