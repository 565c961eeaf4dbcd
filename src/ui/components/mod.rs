pub mod date_input;
