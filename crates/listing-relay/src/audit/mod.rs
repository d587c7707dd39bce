//! Flat-file bookkeeping of which URLs have been handled.

pub mod url_log;
