//! Uniform storage handles over the host record.
//!
//! Every location the engine can visit implements [`Value`]: scalars are
//! plain leaves, records (see [`crate::record`]) are composites, and
//! `Option`, `Box` and `Arc` are pointer-like storage that the engine
//! dereferences, allocating nil `Option`s on the way. [`Interface`] holds an
//! injected trait object.

use crate::init::Initialize;
use crate::record::Record;
use std::any::{Any, TypeId};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Runtime identity of a storage type.
#[derive(Debug, Clone, Copy)]
pub struct TypeInfo {
    id: TypeId,
    name: &'static str,
}

impl TypeInfo {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeInfo {}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Structural kind of a storage location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// A value the engine never looks into.
    Scalar,
    /// A record with members.
    Composite,
    /// Storage that refers to another value (`Option`, `Box`, `Arc`).
    Pointer,
}

/// Failure to read or write a storage location.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("{type_name} is shared and cannot be written")]
    Shared { type_name: &'static str },

    #[error("{type_name} holds no value")]
    Nil { type_name: &'static str },

    #[error("{type_name} is not a record")]
    NotComposite { type_name: &'static str },

    #[error("{type_name} has no member at index {index}")]
    MissingMember {
        type_name: &'static str,
        index: usize,
    },

    #[error("cannot assign injected value into {target}")]
    Mismatch { target: &'static str },
}

/// A storage location inside a host record.
///
/// Implemented for scalars, `Vec<T>`, `Option<T>`, `Box<T>`, `Arc<T>`, and
/// by `#[derive(Record)]` for records.
pub trait Value: Any {
    /// Type of this storage location.
    fn type_info(&self) -> TypeInfo;

    /// Type found after dereferencing every pointer layer, known without a
    /// value at hand.
    fn static_target() -> TypeInfo
    where
        Self: Sized;

    /// Whether values of this type can be snapshotted for injection.
    fn static_shareable() -> bool
    where
        Self: Sized;

    fn kind(&self) -> Kind {
        Kind::Scalar
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn as_record(&self) -> Option<&dyn Record> {
        None
    }

    fn as_record_mut(&mut self) -> Option<&mut dyn Record> {
        None
    }

    /// Value behind a pointer, if any.
    fn pointee(&self) -> Option<&dyn Value> {
        None
    }

    /// Writable value behind a pointer, if any.
    fn pointee_mut(&mut self) -> Result<Option<&mut dyn Value>, StorageError> {
        Ok(None)
    }

    /// Allocate the pointee of a nil pointer. Returns whether an allocation
    /// happened.
    fn allocate(&mut self) -> Result<bool, StorageError> {
        Ok(false)
    }

    fn shareable(&self) -> bool {
        false
    }

    /// A boxed copy of this storage, of the same type, for injection.
    fn snapshot(&self) -> Option<Box<dyn Any>> {
        None
    }

    /// Whether a snapshot of `source` can be injected here.
    fn accepts(&self, source: TypeInfo) -> bool {
        source == self.type_info()
    }

    /// Shared trait object type this storage receives, e.g. `Arc<dyn Store>`
    /// for an `Interface<dyn Store>`.
    fn interface(&self) -> Option<TypeInfo> {
        None
    }

    /// Whether this storage can be shared as the trait object `interface`.
    fn shares_as(&self, _interface: TypeInfo) -> bool {
        false
    }

    /// A boxed `interface` handle to this storage, for injection.
    fn snapshot_as(&self, _interface: TypeInfo) -> Option<Box<dyn Any>> {
        None
    }

    /// Whether the record implements the trait object `interface`. Emitted
    /// by `#[fieldwire(provides(...))]`.
    fn provides(_interface: TypeInfo) -> bool
    where
        Self: Sized,
    {
        false
    }

    /// `this` coerced to the trait object `interface`, boxed.
    fn arc_as(_this: &Arc<Self>, _interface: TypeInfo) -> Option<Box<dyn Any>>
    where
        Self: Sized,
    {
        None
    }

    /// Drop an injected value so the storage holds nothing. Returns whether
    /// anything was dropped.
    fn release(&mut self) -> bool {
        false
    }

    /// Overwrite this storage with an injected snapshot.
    fn inject(&mut self, snapshot: Box<dyn Any>) -> Result<(), StorageError>;

    fn as_initialize(&mut self) -> Option<&mut dyn Initialize> {
        None
    }
}

impl dyn Value {
    pub fn downcast_ref<T: Value>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Value>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }

    /// Follow pointer storage down to the first non-pointer value.
    pub fn deref_storage(&self) -> Option<&dyn Value> {
        let mut value: &dyn Value = self;
        while value.kind() == Kind::Pointer {
            value = value.pointee()?;
        }
        Some(value)
    }

    /// Follow pointer storage down to the first non-pointer value, for
    /// writing. Nil pointers are an error.
    pub fn deref_storage_mut(&mut self) -> Result<&mut dyn Value, StorageError> {
        let mut value: &mut dyn Value = self;
        while value.kind() == Kind::Pointer {
            let type_name = value.type_info().name();
            value = match value.pointee_mut()? {
                Some(inner) => inner,
                None => return Err(StorageError::Nil { type_name }),
            };
        }
        Ok(value)
    }

    /// Like [`deref_storage_mut`](Self::deref_storage_mut), allocating nil
    /// pointers on the way.
    pub fn deref_allocating(&mut self) -> Result<&mut dyn Value, StorageError> {
        let mut value: &mut dyn Value = self;
        while value.kind() == Kind::Pointer {
            let type_name = value.type_info().name();
            value.allocate()?;
            value = match value.pointee_mut()? {
                Some(inner) => inner,
                None => return Err(StorageError::Nil { type_name }),
            };
        }
        Ok(value)
    }
}

/// Replace `slot` with an injected snapshot of the same type.
pub fn assign<T: 'static>(slot: &mut T, snapshot: Box<dyn Any>) -> Result<(), StorageError> {
    match snapshot.downcast::<T>() {
        Ok(value) => {
            *slot = *value;
            Ok(())
        }
        Err(_) => Err(StorageError::Mismatch {
            target: std::any::type_name::<T>(),
        }),
    }
}

/// Implement [`Value`] for plain leaf types.
///
/// The types must be `Clone`. A parser for them can be registered with
/// [`parser::from_str`](crate::parser::from_str) or
/// [`parser::typed`](crate::parser::typed).
///
/// ```
/// #[derive(Debug, Clone, Default)]
/// pub struct Level(u8);
///
/// fieldwire::scalar_value!(Level);
/// ```
#[macro_export]
macro_rules! scalar_value {
    ($($ty:ty),* $(,)?) => {$(
        impl $crate::Value for $ty {
            fn type_info(&self) -> $crate::TypeInfo {
                $crate::TypeInfo::of::<Self>()
            }

            fn static_target() -> $crate::TypeInfo {
                $crate::TypeInfo::of::<Self>()
            }

            fn static_shareable() -> bool {
                true
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
                self
            }

            fn shareable(&self) -> bool {
                true
            }

            fn snapshot(&self) -> ::std::option::Option<::std::boxed::Box<dyn ::std::any::Any>> {
                ::std::option::Option::Some(::std::boxed::Box::new(::std::clone::Clone::clone(self)))
            }

            fn inject(
                &mut self,
                snapshot: ::std::boxed::Box<dyn ::std::any::Any>,
            ) -> ::std::result::Result<(), $crate::StorageError> {
                $crate::value::assign(self, snapshot)
            }
        }
    )*};
}

scalar_value!(
    bool,
    char,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    f32,
    f64,
    String,
    PathBuf,
    Duration,
    SocketAddr,
    IpAddr,
    Ipv4Addr,
    Ipv6Addr,
    chrono::DateTime<chrono::Utc>,
    regex_lite::Regex,
);

impl<T: Clone + 'static> Value for Vec<T> {
    fn type_info(&self) -> TypeInfo {
        TypeInfo::of::<Self>()
    }

    fn static_target() -> TypeInfo {
        TypeInfo::of::<Self>()
    }

    fn static_shareable() -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn shareable(&self) -> bool {
        true
    }

    fn snapshot(&self) -> Option<Box<dyn Any>> {
        Some(Box::new(self.clone()))
    }

    fn inject(&mut self, snapshot: Box<dyn Any>) -> Result<(), StorageError> {
        assign(self, snapshot)
    }
}

/// Snapshot the inner value of a pointer as a concrete `T`.
fn snapshot_inner<T: Value>(inner: &T) -> Option<T> {
    inner
        .snapshot()
        .and_then(|snapshot| snapshot.downcast::<T>().ok())
        .map(|value| *value)
}

// `None` is the nil pointer: the engine allocates it with `T::default()`.
impl<T: Value + Default> Value for Option<T> {
    fn type_info(&self) -> TypeInfo {
        TypeInfo::of::<Self>()
    }

    fn static_target() -> TypeInfo {
        T::static_target()
    }

    fn static_shareable() -> bool {
        T::static_shareable()
    }

    fn kind(&self) -> Kind {
        Kind::Pointer
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn pointee(&self) -> Option<&dyn Value> {
        self.as_ref().map(|inner| inner as &dyn Value)
    }

    fn pointee_mut(&mut self) -> Result<Option<&mut dyn Value>, StorageError> {
        Ok(self.as_mut().map(|inner| inner as &mut dyn Value))
    }

    fn allocate(&mut self) -> Result<bool, StorageError> {
        if self.is_some() {
            return Ok(false);
        }
        *self = Some(T::default());
        Ok(true)
    }

    fn shareable(&self) -> bool {
        T::static_shareable()
    }

    fn snapshot(&self) -> Option<Box<dyn Any>> {
        match self {
            None => Some(Box::new(None::<T>)),
            Some(inner) => snapshot_inner(inner).map(|value| Box::new(Some(value)) as Box<dyn Any>),
        }
    }

    fn accepts(&self, source: TypeInfo) -> bool {
        source == TypeInfo::of::<Self>() || source == TypeInfo::of::<T>()
    }

    fn inject(&mut self, snapshot: Box<dyn Any>) -> Result<(), StorageError> {
        let snapshot = match snapshot.downcast::<Self>() {
            Ok(value) => {
                *self = *value;
                return Ok(());
            }
            Err(other) => other,
        };
        match snapshot.downcast::<T>() {
            Ok(value) => {
                *self = Some(*value);
                Ok(())
            }
            Err(_) => Err(StorageError::Mismatch {
                target: std::any::type_name::<Self>(),
            }),
        }
    }

    fn shares_as(&self, interface: TypeInfo) -> bool {
        self.as_ref().is_some_and(|inner| inner.shares_as(interface))
    }

    fn snapshot_as(&self, interface: TypeInfo) -> Option<Box<dyn Any>> {
        self.as_ref().and_then(|inner| inner.snapshot_as(interface))
    }

    fn release(&mut self) -> bool {
        self.take().is_some()
    }

    fn as_initialize(&mut self) -> Option<&mut dyn Initialize> {
        self.as_mut().and_then(|inner| inner.as_initialize())
    }
}

impl<T: Value> Value for Box<T> {
    fn type_info(&self) -> TypeInfo {
        TypeInfo::of::<Self>()
    }

    fn static_target() -> TypeInfo {
        T::static_target()
    }

    fn static_shareable() -> bool {
        T::static_shareable()
    }

    fn kind(&self) -> Kind {
        Kind::Pointer
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn pointee(&self) -> Option<&dyn Value> {
        Some(&**self as &dyn Value)
    }

    fn pointee_mut(&mut self) -> Result<Option<&mut dyn Value>, StorageError> {
        Ok(Some(&mut **self as &mut dyn Value))
    }

    fn shareable(&self) -> bool {
        T::static_shareable()
    }

    fn snapshot(&self) -> Option<Box<dyn Any>> {
        snapshot_inner(&**self).map(|value| Box::new(Box::new(value)) as Box<dyn Any>)
    }

    fn accepts(&self, source: TypeInfo) -> bool {
        source == TypeInfo::of::<Self>() || source == TypeInfo::of::<T>()
    }

    fn inject(&mut self, snapshot: Box<dyn Any>) -> Result<(), StorageError> {
        let snapshot = match snapshot.downcast::<Self>() {
            Ok(value) => {
                *self = *value;
                return Ok(());
            }
            Err(other) => other,
        };
        match snapshot.downcast::<T>() {
            Ok(value) => {
                *self = value;
                Ok(())
            }
            Err(_) => Err(StorageError::Mismatch {
                target: std::any::type_name::<Self>(),
            }),
        }
    }

    fn as_initialize(&mut self) -> Option<&mut dyn Initialize> {
        (**self).as_initialize()
    }
}

// An `Arc` is writable while it is uniquely owned. A shared one is detached
// into a private copy when its pointee can be snapshotted. Injecting it
// shares the allocation between source and targets.
impl<T: Value> Value for Arc<T> {
    fn type_info(&self) -> TypeInfo {
        TypeInfo::of::<Self>()
    }

    fn static_target() -> TypeInfo {
        T::static_target()
    }

    fn static_shareable() -> bool {
        true
    }

    fn kind(&self) -> Kind {
        Kind::Pointer
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn pointee(&self) -> Option<&dyn Value> {
        Some(&**self as &dyn Value)
    }

    fn pointee_mut(&mut self) -> Result<Option<&mut dyn Value>, StorageError> {
        let shared = StorageError::Shared {
            type_name: std::any::type_name::<Self>(),
        };
        if Arc::get_mut(self).is_none() {
            let copy = snapshot_inner(&**self).ok_or(shared.clone())?;
            *self = Arc::new(copy);
        }
        match Arc::get_mut(self) {
            Some(inner) => Ok(Some(inner as &mut dyn Value)),
            None => Err(shared),
        }
    }

    fn shareable(&self) -> bool {
        true
    }

    fn snapshot(&self) -> Option<Box<dyn Any>> {
        Some(Box::new(Arc::clone(self)))
    }

    fn accepts(&self, source: TypeInfo) -> bool {
        source == TypeInfo::of::<Self>() || source == TypeInfo::of::<T>()
    }

    fn inject(&mut self, snapshot: Box<dyn Any>) -> Result<(), StorageError> {
        let snapshot = match snapshot.downcast::<Self>() {
            Ok(value) => {
                *self = *value;
                return Ok(());
            }
            Err(other) => other,
        };
        match snapshot.downcast::<T>() {
            Ok(value) => {
                *self = Arc::new(*value);
                Ok(())
            }
            Err(_) => Err(StorageError::Mismatch {
                target: std::any::type_name::<Self>(),
            }),
        }
    }

    fn shares_as(&self, interface: TypeInfo) -> bool {
        T::provides(interface)
    }

    fn snapshot_as(&self, interface: TypeInfo) -> Option<Box<dyn Any>> {
        T::arc_as(self, interface)
    }

    fn as_initialize(&mut self) -> Option<&mut dyn Initialize> {
        Arc::get_mut(self).and_then(|inner| inner.as_initialize())
    }
}

/// Injection target holding a shared trait object, such as
/// `Interface<dyn Store>`.
///
/// It receives another `Interface` of the same trait, or any `Arc` source
/// whose record declares the trait with `#[fieldwire(provides(Store))]`.
pub struct Interface<T: ?Sized>(Option<Arc<T>>);

impl<T: ?Sized> Interface<T> {
    pub fn new(value: Arc<T>) -> Self {
        Self(Some(value))
    }

    pub fn get(&self) -> Option<&Arc<T>> {
        self.0.as_ref()
    }

    pub fn is_set(&self) -> bool {
        self.0.is_some()
    }

    pub fn into_inner(self) -> Option<Arc<T>> {
        self.0
    }
}

impl<T: ?Sized> Default for Interface<T> {
    fn default() -> Self {
        Self(None)
    }
}

impl<T: ?Sized> Clone for Interface<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: ?Sized> fmt::Debug for Interface<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.is_set() { "set" } else { "unset" };
        f.debug_tuple("Interface")
            .field(&std::any::type_name::<T>())
            .field(&state)
            .finish()
    }
}

impl<T: ?Sized + 'static> Value for Interface<T> {
    fn type_info(&self) -> TypeInfo {
        TypeInfo::of::<Self>()
    }

    fn static_target() -> TypeInfo {
        TypeInfo::of::<Self>()
    }

    fn static_shareable() -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn shareable(&self) -> bool {
        true
    }

    fn snapshot(&self) -> Option<Box<dyn Any>> {
        Some(Box::new(self.clone()))
    }

    fn interface(&self) -> Option<TypeInfo> {
        Some(TypeInfo::of::<Arc<T>>())
    }

    fn inject(&mut self, snapshot: Box<dyn Any>) -> Result<(), StorageError> {
        let snapshot = match snapshot.downcast::<Self>() {
            Ok(value) => {
                *self = *value;
                return Ok(());
            }
            Err(other) => other,
        };
        match snapshot.downcast::<Arc<T>>() {
            Ok(value) => {
                self.0 = Some(*value);
                Ok(())
            }
            Err(_) => Err(StorageError::Mismatch {
                target: std::any::type_name::<Self>(),
            }),
        }
    }

    fn release(&mut self) -> bool {
        self.0.take().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deref_allocates_nil_option() {
        let mut slot: Option<Box<u16>> = None;
        let value: &mut dyn Value = &mut slot;

        let inner = value.deref_allocating().unwrap();
        assert_eq!(inner.type_info(), TypeInfo::of::<u16>());
        *inner.downcast_mut::<u16>().unwrap() = 7;

        assert_eq!(slot, Some(Box::new(7)));
    }

    #[test]
    fn test_deref_storage_mut_rejects_nil() {
        let mut slot: Option<u16> = None;
        let value: &mut dyn Value = &mut slot;

        assert!(matches!(
            value.deref_storage_mut().err(),
            Some(StorageError::Nil { .. })
        ));
    }

    #[derive(Debug, Default, crate::Record)]
    pub struct Pool {
        #[fieldwire(key = "size")]
        pub size: u32,
    }

    #[test]
    fn test_shared_arc_is_not_writable() {
        let mut slot = Arc::new(Pool { size: 3 });
        let other = Arc::clone(&slot);
        let value: &mut dyn Value = &mut slot;

        assert!(matches!(
            value.deref_allocating().err(),
            Some(StorageError::Shared { .. })
        ));
        assert_eq!(
            value.deref_storage().and_then(|v| v.downcast_ref::<Pool>()).map(|p| p.size),
            Some(3)
        );
        assert!(Arc::ptr_eq(&slot, &other));
    }

    #[test]
    fn test_shared_copyable_arc_is_detached_on_write() {
        let mut slot = Arc::new(3u8);
        let other = Arc::clone(&slot);
        let value: &mut dyn Value = &mut slot;

        *value.deref_storage_mut().unwrap().downcast_mut::<u8>().unwrap() = 9;

        assert_eq!(*slot, 9);
        assert_eq!(*other, 3);
    }

    #[test]
    fn test_release_empties_option() {
        let mut target = Some(Arc::new(1u8));
        assert!(target.release());
        assert!(target.is_none());
        assert!(!target.release());

        let mut scalar = 5u8;
        assert!(!scalar.release());
    }

    trait Greeter {
        fn greet(&self) -> String;
    }

    #[derive(Debug, Default, crate::Record)]
    #[fieldwire(provides(Greeter))]
    pub struct English {
        #[fieldwire(key = "name")]
        pub name: String,
    }

    impl Greeter for English {
        fn greet(&self) -> String {
            format!("hello {}", self.name)
        }
    }

    #[test]
    fn test_interface_receives_provided_trait_object() {
        let source = Arc::new(English {
            name: "ada".to_string(),
        });
        let mut target: Interface<dyn Greeter> = Interface::default();
        let interface = target.interface().unwrap();

        assert!(!target.accepts(source.type_info()));
        assert!(source.shares_as(interface));
        assert!(!Arc::new(Pool::default()).shares_as(interface));

        target.inject(source.snapshot_as(interface).unwrap()).unwrap();
        let greeter = target.get().unwrap();
        assert_eq!(greeter.greet(), "hello ada");
        assert!(std::ptr::addr_eq(Arc::as_ptr(greeter), Arc::as_ptr(&source)));

        assert!(target.release());
        assert!(!target.is_set());
    }

    #[test]
    fn test_static_target_unwraps_pointers() {
        assert_eq!(<Option<Box<String>> as Value>::static_target(), TypeInfo::of::<String>());
        assert_eq!(<Arc<u8> as Value>::static_target(), TypeInfo::of::<u8>());
        assert_eq!(<Vec<u8> as Value>::static_target(), TypeInfo::of::<Vec<u8>>());
    }

    #[test]
    fn test_option_accepts_inner_type() {
        let mut target: Option<Arc<String>> = None;
        let source = Arc::new("hello".to_string());

        assert!(target.accepts(source.type_info()));
        assert!(!target.accepts(TypeInfo::of::<String>()));

        target.inject(source.snapshot().unwrap()).unwrap();
        assert!(Arc::ptr_eq(target.as_ref().unwrap(), &source));
    }

    #[test]
    fn test_scalar_injection_mismatch() {
        let mut target = String::new();
        assert!(!target.accepts(TypeInfo::of::<i64>()));

        let err = target.inject(Box::new(5i64)).unwrap_err();
        assert!(matches!(err, StorageError::Mismatch { .. }));
    }
}
