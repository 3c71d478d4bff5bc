//! Composite records and their member descriptors.
//!
//! `#[derive(Record)]` generates the [`Record`] implementation from the
//! struct definition and its `#[fieldwire(...)]` attributes:
//!
//! ```
//! use fieldwire::Record;
//! use std::sync::Arc;
//!
//! #[derive(Debug, Default, Record)]
//! pub struct Service {
//!     #[fieldwire(key = "workers", default = "4", description = "Number of workers")]
//!     pub workers: u32,
//!     #[fieldwire(key = "database", inject_as = "database")]
//!     pub database: Arc<Database>,
//! }
//!
//! #[derive(Debug, Default, Record)]
//! pub struct Database {
//!     #[fieldwire(key = "url", default = "sqlite://local.db")]
//!     pub url: String,
//! }
//! ```

use crate::value::{TypeInfo, Value};

/// Declarative metadata attached to a record member.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tags {
    /// Configuration key segment.
    pub key: Option<&'static str>,
    /// Symbolic key this member publishes for injection.
    pub inject_as: Option<&'static str>,
    /// Symbolic key this member is injected from.
    pub inject: Option<&'static str>,
    /// Literal used when no provider supplies the key.
    pub default: Option<&'static str>,
    pub description: Option<&'static str>,
    pub example: Option<&'static str>,
}

/// Descriptor of one member of a record.
#[derive(Debug, Clone, Copy)]
pub struct Member {
    pub name: &'static str,
    /// Only public members are visited.
    pub public: bool,
    /// Flattened members contribute no key segment of their own.
    pub anonymous: bool,
    pub tags: Tags,
    /// Dereferenced type of the member, used to detect self-referential
    /// shapes before the member is visited.
    pub target: fn() -> TypeInfo,
}

impl Member {
    pub fn target_type(&self) -> TypeInfo {
        (self.target)()
    }
}

/// A composite value whose members the engine can visit.
pub trait Record: Value {
    /// Member descriptors, in declaration order.
    fn members(&self) -> Vec<Member>;

    /// Storage of the member at `index` in [`members`](Self::members).
    fn member(&self, index: usize) -> Option<&dyn Value>;

    fn member_mut(&mut self, index: usize) -> Option<&mut dyn Value>;
}

#[cfg(test)]
mod tests {
    use crate::Record;
    use crate::value::{TypeInfo, Value};
    use std::sync::Arc;

    #[derive(Debug, Default, Record)]
    pub struct Service {
        #[fieldwire(key = "workers", default = "4", description = "Number of workers")]
        pub workers: u32,
        #[fieldwire(key = "database", inject_as = "database")]
        pub database: Arc<Database>,
        #[fieldwire(flatten)]
        pub limits: Limits,
        #[allow(dead_code)]
        secret: String,
        #[fieldwire(skip)]
        pub runtime: u8,
    }

    #[derive(Debug, Default, Record)]
    pub struct Database {
        #[fieldwire(key = "url")]
        pub url: String,
    }

    #[derive(Debug, Default, Record)]
    pub struct Limits {
        #[fieldwire(key = "max-connections")]
        pub max_connections: u64,
    }

    #[test]
    fn test_derived_members() {
        let service = Service::default();
        let members = crate::record::Record::members(&service);

        let names: Vec<&str> = members.iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["workers", "database", "limits", "secret"]);

        assert_eq!(members[0].tags.key, Some("workers"));
        assert_eq!(members[0].tags.default, Some("4"));
        assert_eq!(members[0].tags.description, Some("Number of workers"));
        assert_eq!(members[1].tags.inject_as, Some("database"));
        assert_eq!(members[1].target_type(), TypeInfo::of::<Database>());
        assert!(members[2].anonymous);
        assert!(!members[3].public);
        assert!(members[0].public);
    }

    #[test]
    fn test_member_access_by_index() {
        let mut service = Service::default();
        let record: &mut dyn crate::record::Record = &mut service;

        *record
            .member_mut(0)
            .and_then(|v| v.downcast_mut::<u32>())
            .unwrap() = 12;
        assert!(record.member(4).is_none());
        assert_eq!(
            record.member(0).and_then(|v| v.downcast_ref::<u32>()),
            Some(&12)
        );
        assert_eq!(service.workers, 12);
    }

    #[test]
    fn test_record_is_composite() {
        let mut service = Service::default();
        let value: &mut dyn Value = &mut service;
        assert_eq!(value.kind(), crate::value::Kind::Composite);
        assert!(value.as_record_mut().is_some());
        assert!(!value.shareable());
    }
}
