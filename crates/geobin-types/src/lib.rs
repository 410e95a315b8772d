//! Shared type definitions for Geobin.
//!
//! This crate is the single source of truth for the records that flow
//! between the detection engine, storage, and the HTTP API. Types defined
//! here flow downstream to `TypeScript` via `ts-rs` for the web frontend.
//!
//! # Modules
//!
//! - [`geo`] -- Discovered points ([`Geo`]) and document paths ([`GeoPath`])
//! - [`request`] -- Stored request records and bin metadata

pub mod geo;
pub mod request;

// Re-export all public types at crate root for convenience.
pub use geo::{point_geometry, Geo, GeoPath, PathSegment};
pub use request::{BinCreated, GeobinRequest};

#[cfg(test)]
mod tests {
    //! `TypeScript` binding generation.

    #[test]
    fn export_bindings() {
        // ts-rs generates TypeScript bindings when types with
        // #[ts(export)] are used. The files are written to the
        // `bindings/` directory relative to the crate root.
        use ts_rs::TS;

        let _ = crate::geo::PathSegment::export_all();
        let _ = crate::geo::GeoPath::export_all();
        let _ = crate::geo::Geo::export_all();
        let _ = crate::request::GeobinRequest::export_all();
        let _ = crate::request::BinCreated::export_all();
    }
}
