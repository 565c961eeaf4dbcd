mod business;
mod client;
pub mod dates;
mod error;
mod invoice;
mod product;

pub use business::{Business, BusinessFields};
pub use client::{Client, ClientFields};
pub use error::ModelError;
pub use invoice::{
    DEFAULT_LANGUAGE, Invoice, InvoiceField, Totals, validate_date, validate_date_order,
    validate_invoice_no,
};
pub use product::{Product, ProductAttribute, ProductFields};

use uuid::Uuid;

/// Primary keys are random UUIDs
pub fn generate_uuid() -> Uuid {
    Uuid::new_v4()
}

fn require(value: Option<String>, field: &'static str) -> Result<String, ModelError> {
    value.ok_or(ModelError::MissingField(field))
}
