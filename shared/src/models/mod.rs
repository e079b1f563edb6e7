//! Wire Models
//!
//! API-facing representations of the catalog and invoice entities.
//! Record links are rendered as `"table:id"` strings.

pub mod category;
pub mod invoice;
pub mod product;

// Re-exports
pub use category::Category;
pub use invoice::{Invoice, InvoiceItem, InvoiceStatus};
pub use product::{Product, ProductVariant};
