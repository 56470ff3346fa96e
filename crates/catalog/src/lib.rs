//! Catalog lookup boundary: customers and products as seen by the invoice core.
//!
//! Customer and product records are owned by an external collaborator. The core
//! only reads them, by identifier, through [`CatalogLookup`], and copies what it
//! needs into line items at selection time.

pub mod customer;
pub mod in_memory;
pub mod lookup;
pub mod product;

pub use customer::Customer;
pub use in_memory::InMemoryCatalog;
pub use lookup::{CatalogLookup, LookupError, RecordKind};
pub use product::{CatalogProduct, ProductSnapshot};
