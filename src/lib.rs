//! Service library backing Bunkmate, the off-campus sublease marketplace
//! for Rice students: the listing draft wizard, per-section completion
//! gating, and the submission workflow spanning the managed data store,
//! object storage, and the geocoding/routing services.

pub mod config;
pub mod error;
pub mod listings;
pub mod telemetry;
