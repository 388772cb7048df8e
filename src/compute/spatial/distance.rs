//! Great-circle distance on a spherical Earth.

use geo::{Distance, Haversine, Point};

/// Mean Earth radius in kilometres (IUGG), the radius `geo::Haversine` uses.
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Haversine surface distance in kilometres between two
/// `(latitude, longitude)` positions in degrees.
///
/// ```
/// use quake_query::compute::spatial::distance::haversine_km;
///
/// // One degree of latitude is about 111.2 km.
/// let d = haversine_km(0.0, 0.0, 1.0, 0.0);
/// assert!((d - 111.195).abs() < 0.01);
/// ```
#[inline]
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let p1 = Point::new(lon1, lat1);
    let p2 = Point::new(lon2, lat2);
    Haversine.distance(p1, p2) / 1000.0
}

/// Straight-line chord length in kilometres subtending a surface arc of
/// `surface_km`. Arcs beyond half the circumference clamp to the diameter.
#[inline]
pub fn chord_km(surface_km: f64) -> f64 {
    let angle = (surface_km / EARTH_RADIUS_KM).min(std::f64::consts::PI);
    2.0 * EARTH_RADIUS_KM * (angle / 2.0).sin()
}

/// Earth-centred cartesian position in kilometres.
#[inline]
pub fn to_cartesian(latitude: f64, longitude: f64) -> [f64; 3] {
    let (lat, lon) = (latitude.to_radians(), longitude.to_radians());
    [
        EARTH_RADIUS_KM * lat.cos() * lon.cos(),
        EARTH_RADIUS_KM * lat.cos() * lon.sin(),
        EARTH_RADIUS_KM * lat.sin(),
    ]
}
