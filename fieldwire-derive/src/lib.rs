//! Derive macro for fieldwire configuration records.
//!
//! `#[derive(Record)]` implements `fieldwire::Value` and `fieldwire::Record`
//! for a struct with named fields, turning its `#[fieldwire(...)]`
//! attributes into member descriptors.

mod record;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Derive `Record` for a struct with named fields.
///
/// # Container attributes
/// - `#[fieldwire(shared)]` - the record is `Clone` and may be used by value
///   as an injection source
/// - `#[fieldwire(init)]` - the record implements `fieldwire::Initialize`
/// - `#[fieldwire(provides(Store, ...))]` - an `Arc` of the record can be
///   injected into `fieldwire::Interface<dyn Store>` targets
///
/// # Field attributes
/// - `key = "..."` - configuration key segment
/// - `inject_as = "..."` - publish this field under an injection key
/// - `inject = "..."` - receive the value published under an injection key
/// - `default = "..."` - literal used when no provider has the key
/// - `description = "..."`, `example = "..."` - shown in the usage
/// - `flatten` - the field contributes no key segment of its own
/// - `skip` - the field is invisible to fieldwire
///
/// Fields that are not `pub` are listed but never visited.
///
/// ```ignore
/// #[derive(Debug, Default, Record)]
/// pub struct Service {
///     #[fieldwire(key = "workers", default = "4", description = "Worker threads")]
///     pub workers: u32,
///     #[fieldwire(key = "database", inject_as = "database")]
///     pub database: Arc<Database>,
/// }
/// ```
#[proc_macro_derive(Record, attributes(fieldwire))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    record::generate_impl(&input).into()
}
