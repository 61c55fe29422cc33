//! API Request and Response Types
//!
//! Serialisable payloads produced by [`crate::PortalApi`]. Everything here is
//! plain data; conversion from engine results happens in `From` impls.

// Catalog browsing types
mod product;
pub use product::*;

// Variant configuration types
mod variant;
pub use variant::*;
