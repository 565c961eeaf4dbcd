mod invoice_entity;

pub use invoice_entity::{EntityError, InvoiceEntity};
