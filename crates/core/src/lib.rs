//! `invoiceforge-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no IO, no collaborator code).

pub mod aggregate;
pub mod context;
pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use context::RequestContext;
pub use entity::Entity;
pub use error::{DomainError, DomainResult, FieldError, ValidationErrors};
pub use id::{CustomerId, InvoiceId, ProductId, TenantId, UserId};
pub use value_object::ValueObject;
