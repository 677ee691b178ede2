pub mod catalog;

pub use catalog::{new_route, CatalogError, RouteCatalog};
