//! AtomPub / CMIS helpers
//!
//! - Namespace table for the AtomPub binding's prefixes
//! - Lenient XPath value extraction (errors become empty values)
//! - Promotion of a feed entry to a standalone document

pub mod extract;
pub mod namespaces;
pub mod promote;

pub use extract::{get_xpath_value, get_xpath_values};
pub use namespaces::{register_namespaces, APP, ATOM, CMIS, CMISRA, CMIS_MESSAGING, NAMESPACES, XSI};
pub use promote::wrap_in_doc;
