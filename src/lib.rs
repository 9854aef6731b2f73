//! Declaration Desk - fill, sign and export a household self-declaration
//!
//! Serves a single legal form: a self-declaration from the Head of Family (HoF)
//! for sharing an address with a family member at the same address.
//!
//! ## Components
//!
//! - **Auth**: shared-password gate and the `form_authenticated` session cookie
//! - **Form**: the ten field values, Edit/Preview mode and the signature
//! - **Signature**: freehand strokes or an uploaded image, never both
//! - **Render**: the declaration as a visual tree, serialized to HTML
//! - **Export**: 2× rasterization of the preview onto one A4 PDF page
//! - **Server**: hyper HTTP/1 front end for all of the above

pub mod auth;
pub mod config;
pub mod export;
pub mod form;
pub mod render;
pub mod routes;
pub mod server;
pub mod signature;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{FormError, Result};
