//! # Utility Modules
//!
//! Supporting utilities that sit next to the codec.
//!
//! ## Components
//! - **Logging**: Structured logging configuration

pub mod logging;

pub use logging::init_logging;
