//! Changement de datum par transformation de Helmert à 7 paramètres

use super::ellipsoid::Ellipsoid;
use super::Geographic;

const ARC_SECOND: f64 = std::f64::consts::PI / (180.0 * 3600.0);

/// Paramètres `towgs84` (convention "position vector", comme PROJ)
#[derive(Debug, Clone, Copy)]
pub struct Helmert {
    /// Translations en mètres
    pub tx: f64,
    pub ty: f64,
    pub tz: f64,
    /// Rotations en secondes d'arc
    pub rx: f64,
    pub ry: f64,
    pub rz: f64,
    /// Facteur d'échelle en ppm
    pub scale_ppm: f64,
}

impl Helmert {
    /// Roma 40 vers WGS84 pour le Frioul-Vénétie Julienne (paramètres A. Beinat, Université d'Udine)
    pub const ROMA40_FVG: Helmert = Helmert {
        tx: -128.6633,
        ty: -30.2694,
        tz: -6.12,
        rx: -1.05572,
        ry: -2.6951,
        rz: -2.28808,
        scale_ppm: -16.9352,
    };

    /// Applique la transformation à des coordonnées géocentriques
    pub fn apply(&self, (x, y, z): (f64, f64, f64)) -> (f64, f64, f64) {
        let rx = self.rx * ARC_SECOND;
        let ry = self.ry * ARC_SECOND;
        let rz = self.rz * ARC_SECOND;
        let m = 1.0 + self.scale_ppm * 1e-6;

        (
            self.tx + m * (x - rz * y + ry * z),
            self.ty + m * (rz * x + y - rx * z),
            self.tz + m * (-ry * x + rx * y + z),
        )
    }
}

/// Géodésique (radians, hauteur ellipsoïdale) vers géocentrique
pub fn to_geocentric(geo: Geographic, h: f64, ellipsoid: &Ellipsoid) -> (f64, f64, f64) {
    let n = ellipsoid.prime_vertical_radius(geo.lat);
    let e2 = ellipsoid.e2();
    (
        (n + h) * geo.lat.cos() * geo.lon.cos(),
        (n + h) * geo.lat.cos() * geo.lon.sin(),
        (n * (1.0 - e2) + h) * geo.lat.sin(),
    )
}

/// Géocentrique vers géodésique, par itérations sur la latitude
pub fn from_geocentric((x, y, z): (f64, f64, f64), ellipsoid: &Ellipsoid) -> (Geographic, f64) {
    let e2 = ellipsoid.e2();
    let lon = y.atan2(x);
    let p = x.hypot(y);

    let mut lat = z.atan2(p * (1.0 - e2));
    let mut h = 0.0;
    for _ in 0..10 {
        let n = ellipsoid.prime_vertical_radius(lat);
        h = p / lat.cos() - n;
        let next = z.atan2(p * (1.0 - e2 * n / (n + h)));
        if (next - lat).abs() < 1e-14 {
            lat = next;
            break;
        }
        lat = next;
    }
    let n = ellipsoid.prime_vertical_radius(lat);
    h = if lat.cos().abs() > 1e-12 { p / lat.cos() - n } else { h };

    (Geographic::new(lon, lat), h)
}
