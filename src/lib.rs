//! # geoharvest
//!
//! Extracts settlement and feature records embedded in third-party web
//! payloads and normalizes them into portable GIS formats.
//!
//! Two sources are supported:
//!
//! - **Know Your City settlement pages**: HTML pages carrying an inline
//!   `var settlement = {...};` attribute object and a `var shape = [[...]];`
//!   array of `[lat, lon]` degree pairs. Exported as a zipped shapefile.
//! - **ArcGIS web-map exports**: JSON documents with embedded feature
//!   collections in Web Mercator. Exported as one GeoJSON file per layer.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌──────────┐   ┌────────────────────┐   ┌──────────┐
//! │  catalog  │──▶│ extract  │──▶│ projection+geometry│──▶│  record  │
//! │  + fetch  │   │ markers  │   │ 3857→4326, rings   │   │ coercion │
//! └───────────┘   └──────────┘   └────────────────────┘   └────┬─────┘
//!                                                              ▼
//!                              ┌──────────┐            ┌─────────────┐
//!                              │  bundle  │◀───────────│  pipeline   │
//!                              │  export  │            │ batch/layer │
//!                              └──────────┘            └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! geoharvest kyc --country Nigeria --output out/kyc_nigeria
//! geoharvest webmap --input data/webmap.json --output-dir out/atlas
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`error`] | Error taxonomy |
//! | [`catalog`] | Settlement discovery from the filter endpoint |
//! | [`fetch`] | Page fetching abstraction and HTTP client |
//! | [`extract`] | Embedded payload location and decoding |
//! | [`projection`] | Web Mercator inversion and degree parsing |
//! | [`geometry`] | Canonical geometry normalization |
//! | [`record`] | Attribute coercion and record building |
//! | [`pipeline`] | Batch and layer orchestration |
//! | [`bundle`] | Zipped shapefile writer |
//! | [`export`] | GeoJSON layer writer |
//! | [`progress`] | Progress reporting on stderr |

pub mod bundle;
pub mod catalog;
pub mod config;
pub mod error;
pub mod export;
pub mod extract;
pub mod fetch;
pub mod geometry;
pub mod models;
pub mod pipeline;
pub mod progress;
pub mod projection;
pub mod record;
