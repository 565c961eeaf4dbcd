pub mod components;
pub mod invoice_details;
