use geo::CoordsIter;
use proj::Transform;

use crate::error::{CaptureError, Result};

use super::crs_utils::{epsg_code_to_authority_string, EpsgCode};

/// Reprojects geometries between two fixed coordinate reference systems.
///
/// Building the PROJ pipeline is comparatively expensive, so the capture loop creates one
/// transformer per CRS pair and reuses it for every feature.
pub struct GeometryTransformer {
    from: EpsgCode,
    to: EpsgCode,
    projection: proj::Proj,
}

impl GeometryTransformer {
    pub fn new(from: EpsgCode, to: EpsgCode) -> Result<Self> {
        let projection = proj::Proj::new_known_crs(
            &epsg_code_to_authority_string(from),
            &epsg_code_to_authority_string(to),
            None,
        )
        .map_err(|err| CaptureError::Reprojection {
            from,
            to,
            reason: err.to_string(),
        })?;
        Ok(Self {
            from,
            to,
            projection,
        })
    }

    pub fn to_crs(&self) -> EpsgCode {
        self.to
    }

    /// Return a reprojected copy of `geometry`. The input is left untouched.
    ///
    /// Coordinates that PROJ maps to infinity or NaN (e.g. the poles in Web Mercator) are
    /// reported as errors rather than passed on.
    pub fn transform(&self, geometry: &geo::Geometry) -> Result<geo::Geometry> {
        let transformed = geometry
            .transformed(&self.projection)
            .map_err(|err| self.error(err.to_string()))?;
        if let Some(coord) = transformed
            .coords_iter()
            .find(|coord| !coord.x.is_finite() || !coord.y.is_finite())
        {
            return Err(self.error(format!(
                "coordinate ({}, {}) is outside the valid domain",
                coord.x, coord.y
            )));
        }
        Ok(transformed)
    }

    pub fn transform_point(&self, point: geo::Point) -> Result<geo::Point> {
        match self.transform(&geo::Geometry::Point(point))? {
            geo::Geometry::Point(point) => Ok(point),
            other => Err(self.error(format!("expected a point, got {:?}", other))),
        }
    }

    fn error(&self, reason: String) -> CaptureError {
        CaptureError::Reprojection {
            from: self.from,
            to: self.to,
            reason,
        }
    }
}

/// One-off reprojection of a single geometry.
pub fn transform_geometry(
    geometry: &geo::Geometry,
    from: EpsgCode,
    to: EpsgCode,
) -> Result<geo::Geometry> {
    GeometryTransformer::new(from, to)?.transform(geometry)
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use geo::CoordsIter;
    use std::iter::zip;

    use crate::crs::crs_utils::{WEB_MERCATOR, WGS84};
    use crate::error::CaptureError;

    use super::{transform_geometry, GeometryTransformer};

    #[test]
    fn test_transform_point_to_utm() {
        // EPSG 4326 coordinate in Tokyo.
        let point = geo::Point::new(139.7895073, 35.6862101);
        let transformer = GeometryTransformer::new(WGS84, 32654).unwrap(); // UTM zone 54N
        let projected = transformer.transform_point(point).unwrap();

        // Millimeter tolerance.
        assert_abs_diff_eq!(projected.x(), 390467.986, epsilon = 1e-3);
        assert_abs_diff_eq!(projected.y(), 3949820.494, epsilon = 1e-3);
    }

    #[test]
    fn test_transform_to_web_mercator() {
        let point = geo::Geometry::Point(geo::Point::new(0.0, 0.0));
        let projected = transform_geometry(&point, WGS84, WEB_MERCATOR).unwrap();
        let coord = projected.coords_iter().next().unwrap();
        assert_abs_diff_eq!(coord.x, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(coord.y, 0.0, epsilon = 1e-6);

        let point = geo::Geometry::Point(geo::Point::new(180.0, 0.0));
        let projected = transform_geometry(&point, WGS84, WEB_MERCATOR).unwrap();
        let coord = projected.coords_iter().next().unwrap();
        assert_abs_diff_eq!(coord.x, 20037508.342789244, epsilon = 1e-3);
    }

    #[test]
    fn test_round_trip_polygon() {
        let polygon: geo::Polygon = geo::Polygon::new(
            vec![
                (8.5410, 47.3686),
                (8.5480, 47.3686),
                (8.5480, 47.3730),
                (8.5410, 47.3730),
                (8.5410, 47.3686),
            ]
            .into(),
            vec![],
        );
        let original = geo::Geometry::Polygon(polygon);

        let there = GeometryTransformer::new(WGS84, WEB_MERCATOR).unwrap();
        let back = GeometryTransformer::new(WEB_MERCATOR, WGS84).unwrap();
        let round_trip = back.transform(&there.transform(&original).unwrap()).unwrap();

        assert_eq!(original.coords_count(), round_trip.coords_count());
        for (expected, actual) in zip(original.coords_iter(), round_trip.coords_iter()) {
            assert_abs_diff_eq!(expected.x, actual.x, epsilon = 1e-9);
            assert_abs_diff_eq!(expected.y, actual.y, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_input_is_not_mutated() {
        let original = geo::Geometry::Point(geo::Point::new(13.4, 52.5));
        let copy = original.clone();
        transform_geometry(&original, WGS84, WEB_MERCATOR).unwrap();
        assert_eq!(original, copy);
    }

    #[test]
    fn test_pole_is_out_of_domain() {
        let pole = geo::Geometry::Point(geo::Point::new(0.0, 90.0));
        let result = transform_geometry(&pole, WGS84, WEB_MERCATOR);
        assert!(matches!(result, Err(CaptureError::Reprojection { .. })));
    }

    #[test]
    fn test_unknown_crs() {
        let result = GeometryTransformer::new(WGS84, 999999);
        assert!(matches!(
            result,
            Err(CaptureError::Reprojection { to: 999999, .. })
        ));
    }
}
