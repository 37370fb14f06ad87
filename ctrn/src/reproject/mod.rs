//! Reprojection Gauss-Boaga Est (Roma 40) vers WGS84
//!
//! Le chemin par défaut est en Rust pur :
//! - projection Transverse Mercator inverse sur l'ellipsoïde International 1924
//! - changement de datum par Helmert 7 paramètres (paramètres régionaux FVG)
//!
//! Avec le feature `proj`, la même définition est confiée à PROJ.

mod ellipsoid;
mod helmert;
mod tmerc;

pub use ellipsoid::Ellipsoid;
pub use helmert::Helmert;
pub use tmerc::TransverseMercator;

use crate::geometry::Coord3;
use crate::CtrnError;

/// Définition PROJ du système source
pub const GAUSS_BOAGA_PROJ4: &str = "+proj=tmerc +lat_0=0 +lon_0=15 +k=0.999600 +x_0=2520000 +y_0=0 +ellps=intl +units=m +towgs84=-128.6633,-30.2694,-6.12,-1.05572,-2.6951,-2.28808,-16.9352";

/// EPSG des coordonnées projetées
pub const PROJECTED_EPSG: u32 = 3004;
/// EPSG des coordonnées géographiques
pub const GEOGRAPHIC_EPSG: u32 = 4326;

/// Point en coordonnées géographiques (radians)
#[derive(Debug, Clone, Copy)]
pub struct Geographic {
    /// Longitude en radians
    pub lon: f64,
    /// Latitude en radians
    pub lat: f64,
}

impl Geographic {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Convertit en degrés
    pub fn to_degrees(self) -> (f64, f64) {
        (self.lon.to_degrees(), self.lat.to_degrees())
    }

    /// Crée depuis des degrés
    pub fn from_degrees(lon_deg: f64, lat_deg: f64) -> Self {
        Self {
            lon: lon_deg.to_radians(),
            lat: lat_deg.to_radians(),
        }
    }
}

/// Implémentation de reprojection à utiliser
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReprojectionBackend {
    /// Rust pur
    #[default]
    Lite,
    /// PROJ (feature `proj`)
    Proj,
}

impl std::str::FromStr for ReprojectionBackend {
    type Err = CtrnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lite" => Ok(Self::Lite),
            "proj" => Ok(Self::Proj),
            other => Err(CtrnError::Reprojection(format!(
                "unknown backend '{other}' (expected 'lite' or 'proj')"
            ))),
        }
    }
}

/// Transformation Gauss-Boaga Est vers WGS84 (lon, lat en degrés, hauteur en mètres)
pub enum Reprojector {
    Lite {
        projection: TransverseMercator,
        datum_shift: Helmert,
    },
    #[cfg(feature = "proj")]
    Proj(proj::Proj),
}

impl std::fmt::Debug for Reprojector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lite { .. } => f.write_str("Reprojector::Lite"),
            #[cfg(feature = "proj")]
            Self::Proj(_) => f.write_str("Reprojector::Proj"),
        }
    }
}

impl Reprojector {
    /// Reprojector Rust pur
    pub fn new() -> Result<Self, CtrnError> {
        Ok(Self::Lite {
            projection: TransverseMercator::GAUSS_BOAGA_EAST,
            datum_shift: Helmert::ROMA40_FVG,
        })
    }

    /// Reprojector pour l'implémentation demandée
    pub fn for_backend(backend: ReprojectionBackend) -> Result<Self, CtrnError> {
        match backend {
            ReprojectionBackend::Lite => Self::new(),
            #[cfg(feature = "proj")]
            ReprojectionBackend::Proj => {
                let proj = proj::Proj::new_known_crs(GAUSS_BOAGA_PROJ4, "EPSG:4326", None)
                    .map_err(|e| CtrnError::Reprojection(e.to_string()))?;
                Ok(Self::Proj(proj))
            }
            #[cfg(not(feature = "proj"))]
            ReprojectionBackend::Proj => Err(CtrnError::Reprojection(
                "the PROJ backend requires the 'proj' feature. \
                 Build with: cargo build --features proj"
                    .to_string(),
            )),
        }
    }

    /// Vérifie si le backend PROJ est disponible
    pub fn proj_available() -> bool {
        cfg!(feature = "proj")
    }

    /// Transforme un triplet projeté en (lon, lat, h)
    pub fn transform(&self, x: f64, y: f64, z: f64) -> Result<Coord3, CtrnError> {
        if !(x.is_finite() && y.is_finite() && z.is_finite()) {
            return Err(CtrnError::Reprojection(format!(
                "non-finite coordinate ({x}, {y}, {z})"
            )));
        }

        match self {
            Self::Lite {
                projection,
                datum_shift,
            } => {
                let local = projection.inverse(x, y);
                let ecef = helmert::to_geocentric(local, z, &projection.ellipsoid);
                let shifted = datum_shift.apply(ecef);
                let (wgs84, h) = helmert::from_geocentric(shifted, &Ellipsoid::WGS84);
                let (lon, lat) = wgs84.to_degrees();
                Ok(Coord3::new(lon, lat, h))
            }
            #[cfg(feature = "proj")]
            Self::Proj(proj) => {
                // Hauteur conservée telle quelle
                let (lon, lat) = proj
                    .convert((x, y))
                    .map_err(|e| CtrnError::Reprojection(e.to_string()))?;
                Ok(Coord3::new(lon, lat, z))
            }
        }
    }
}
