//! Network-facing acquisition: the sitemap, the vendor listing API and the
//! webform the normalized records are delivered to.

pub mod delivery;
pub mod http_client;
pub mod listing_client;
pub mod sitemap;
