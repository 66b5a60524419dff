pub mod email;
pub mod phone;

pub use email::extract_email;
pub use phone::canonicalize_phone;
