pub mod businesses;
pub mod clients;
pub mod invoices;
