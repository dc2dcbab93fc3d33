//! Warehouse-side callables.
//!
//! Each entry point reads the packaged settings file through a
//! [`ConfigLocator`](snowglue_core::ConfigLocator) and formats a greeting.

pub mod greeting;

pub use greeting::{format_greeting, hello_function, hello_procedure, print_hello, Greeter, ADDED_WORD_KEY};
