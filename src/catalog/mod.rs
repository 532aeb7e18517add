mod error;
mod fetch;
mod parsing;

pub use error::CatalogError;
pub use fetch::{CatalogSource, HttpCatalogSource};
pub use parsing::{Catalog, OrbitalRecord};
