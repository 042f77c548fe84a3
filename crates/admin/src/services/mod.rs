//! Admin services.

pub mod email;

pub use email::{AdminNotifier, EmailError, EmailService};
