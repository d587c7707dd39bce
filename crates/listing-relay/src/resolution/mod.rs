//! Public listing URL -> vendor API addressing.

pub mod url_resolver;
