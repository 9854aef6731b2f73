//! Declaration form state

pub mod fields;
pub mod session;

pub use fields::{FieldName, FormFields, InputKind, MAX_FIELD_CHARS};
pub use session::{FormSession, FormSubmission, Mode, PageOptions, DEFAULT_MAX_UPLOAD_BYTES};
