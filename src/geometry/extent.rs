use geo::BoundingRect;

use crate::crs::crs_utils::{EpsgCode, WEB_MERCATOR};
use crate::crs::transform::GeometryTransformer;
use crate::error::{CaptureError, Result};

/// Computes capture extents in the metric projected CRS for geometries of one source CRS.
pub struct BufferExtentCalculator {
    transformer: GeometryTransformer,
}

impl BufferExtentCalculator {
    pub fn new(source_crs: EpsgCode) -> Result<Self> {
        Ok(Self {
            transformer: GeometryTransformer::new(source_crs, WEB_MERCATOR)?,
        })
    }

    /// CRS of the extents returned by [`BufferExtentCalculator::extent`].
    pub fn crs(&self) -> EpsgCode {
        self.transformer.to_crs()
    }

    /// Reproject `geometry` and pad it by `buffer_meters` on every side.
    ///
    /// A single point yields a square of side `2 * buffer_meters` centered on it, any other
    /// geometry its bounding box grown by `buffer_meters`. A zero buffer is accepted and yields
    /// the unpadded (for points degenerate) extent.
    pub fn extent(&self, geometry: &geo::Geometry, buffer_meters: f64) -> Result<geo::Rect> {
        let projected = self.transformer.transform(geometry)?;
        padded_bounds(&projected, buffer_meters)
    }
}

/// One-off variant of [`BufferExtentCalculator::extent`].
pub fn buffer_extent(
    geometry: &geo::Geometry,
    buffer_meters: f64,
    source_crs: EpsgCode,
) -> Result<geo::Rect> {
    BufferExtentCalculator::new(source_crs)?.extent(geometry, buffer_meters)
}

fn padded_bounds(geometry: &geo::Geometry, buffer: f64) -> Result<geo::Rect> {
    match geometry {
        geo::Geometry::Point(point) => Ok(geo::Rect::new(
            (point.x() - buffer, point.y() - buffer),
            (point.x() + buffer, point.y() + buffer),
        )),
        other => {
            let bounds = other.bounding_rect().ok_or(CaptureError::EmptyGeometry)?;
            Ok(geo::Rect::new(
                (bounds.min().x - buffer, bounds.min().y - buffer),
                (bounds.max().x + buffer, bounds.max().y + buffer),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use rstest::rstest;

    use crate::crs::crs_utils::{WEB_MERCATOR, WGS84};
    use crate::crs::transform::transform_geometry;
    use crate::error::CaptureError;

    use super::{buffer_extent, BufferExtentCalculator};

    #[rstest]
    #[case(0.0, 0.0, 50.0)]
    #[case(950000.0, 6000000.0, 200.0)]
    #[case(-1234.5, 42.0, 0.5)]
    fn test_point_extent_is_square(#[case] x: f64, #[case] y: f64, #[case] buffer: f64) {
        let point = geo::Geometry::Point(geo::Point::new(x, y));
        let extent = buffer_extent(&point, buffer, WEB_MERCATOR).unwrap();

        assert_abs_diff_eq!(extent.width(), 2.0 * buffer, epsilon = 1e-6);
        assert_abs_diff_eq!(extent.height(), 2.0 * buffer, epsilon = 1e-6);
        assert_abs_diff_eq!(extent.center().x, x, epsilon = 1e-6);
        assert_abs_diff_eq!(extent.center().y, y, epsilon = 1e-6);
    }

    #[test]
    fn test_geographic_point_is_centered_on_projected_point() {
        let point = geo::Geometry::Point(geo::Point::new(8.54, 47.37));
        let calculator = BufferExtentCalculator::new(WGS84).unwrap();
        assert_eq!(calculator.crs(), WEB_MERCATOR);

        let extent = calculator.extent(&point, 100.0).unwrap();
        let projected = match transform_geometry(&point, WGS84, WEB_MERCATOR).unwrap() {
            geo::Geometry::Point(point) => point,
            other => panic!("Unexpected geometry {:?}", other),
        };

        assert_abs_diff_eq!(extent.min().x, projected.x() - 100.0, epsilon = 1e-6);
        assert_abs_diff_eq!(extent.max().x, projected.x() + 100.0, epsilon = 1e-6);
        assert_abs_diff_eq!(extent.min().y, projected.y() - 100.0, epsilon = 1e-6);
        assert_abs_diff_eq!(extent.max().y, projected.y() + 100.0, epsilon = 1e-6);
    }

    #[test]
    fn test_polygon_extent_is_padded_bounding_box() {
        let polygon = geo::Polygon::new(
            vec![
                (100.0, 200.0),
                (400.0, 250.0),
                (300.0, 600.0),
                (100.0, 200.0),
            ]
            .into(),
            vec![],
        );
        let extent = buffer_extent(&polygon.into(), 50.0, WEB_MERCATOR).unwrap();

        assert_abs_diff_eq!(extent.min().x, 50.0, epsilon = 1e-6);
        assert_abs_diff_eq!(extent.min().y, 150.0, epsilon = 1e-6);
        assert_abs_diff_eq!(extent.max().x, 450.0, epsilon = 1e-6);
        assert_abs_diff_eq!(extent.max().y, 650.0, epsilon = 1e-6);
    }

    #[test]
    fn test_line_extent_with_zero_buffer() {
        let line = geo::LineString::from(vec![(10.0, 20.0), (30.0, 5.0)]);
        let extent = buffer_extent(&line.into(), 0.0, WEB_MERCATOR).unwrap();

        assert_abs_diff_eq!(extent.min().x, 10.0, epsilon = 1e-6);
        assert_abs_diff_eq!(extent.min().y, 5.0, epsilon = 1e-6);
        assert_abs_diff_eq!(extent.max().x, 30.0, epsilon = 1e-6);
        assert_abs_diff_eq!(extent.max().y, 20.0, epsilon = 1e-6);
    }

    #[test]
    fn test_point_with_zero_buffer_is_degenerate() {
        let point = geo::Geometry::Point(geo::Point::new(5.0, 7.0));
        let extent = buffer_extent(&point, 0.0, WEB_MERCATOR).unwrap();
        assert_eq!(extent.width(), 0.0);
        assert_eq!(extent.height(), 0.0);
    }

    #[test]
    fn test_reprojection_error_is_propagated() {
        let pole = geo::Geometry::Point(geo::Point::new(0.0, 90.0));
        assert!(matches!(
            buffer_extent(&pole, 10.0, WGS84),
            Err(CaptureError::Reprojection { .. })
        ));
    }

    #[test]
    fn test_empty_geometry() {
        let empty = geo::Geometry::LineString(geo::LineString::new(vec![]));
        assert!(matches!(
            buffer_extent(&empty, 10.0, WEB_MERCATOR),
            Err(CaptureError::EmptyGeometry)
        ));
    }
}
