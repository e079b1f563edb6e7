//! Database Models
//!
//! SurrealDB 表结构对应的模型定义。
//! API 层通过 `api::convert` 把这些模型转换为对外的 wire 类型。

pub mod account;
pub mod category;
pub mod invoice;
pub mod product;
pub mod serde_helpers;

pub use account::Account;
pub use category::{Category, CategoryCreate, CategoryId, CategoryUpdate};
pub use invoice::{
    Invoice, InvoiceCreate, InvoiceId, InvoiceItem, InvoiceItemCreate, InvoiceStatusUpdate,
};
pub use product::{Product, ProductCreate, ProductId, ProductUpdate, ProductVariant};
