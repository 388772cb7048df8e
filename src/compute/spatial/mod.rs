//! Spatial primitives and the proximity detector.

pub mod distance;
pub mod proximity;
pub mod window_index;

pub use distance::{EARTH_RADIUS_KM, haversine_km};
pub use proximity::{ProximityDetector, ProximityPair};
pub use window_index::{WindowIndex, WindowPoint};
