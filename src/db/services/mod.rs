//! High-level data-access API over the catalog tables. HTTP handlers and
//! the dispatch pipeline go through these functions instead of touching
//! entities directly; the dispatch core only sees the `DispatchCatalog`
//! trait implementation in `dispatch_catalog`.

pub mod dispatch_catalog;
pub mod region_service;
pub mod tick_service;
pub mod website_service;
