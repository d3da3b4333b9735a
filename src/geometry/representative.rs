use geo::{Centroid, InteriorPoint};

use super::kind::GeometryKind;

/// Single point standing in for a geometry, in the geometry's own CRS.
///
/// - points: the point itself (the centroid for multi-points),
/// - polygons: a point guaranteed to lie on the surface,
/// - lines: the centroid.
///
/// Returns `None` for empty geometries.
pub fn representative_point(geometry: &geo::Geometry) -> Option<geo::Point> {
    match GeometryKind::of(geometry)? {
        GeometryKind::Point => match geometry {
            geo::Geometry::Point(point) => Some(*point),
            other => other.centroid(),
        },
        GeometryKind::Polygon => geometry.interior_point(),
        GeometryKind::Line => geometry.centroid(),
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use geo::{Centroid, Contains};

    use super::representative_point;

    #[test]
    fn test_point_is_identity() {
        let point = geo::Point::new(8.54, 47.37);
        assert_eq!(representative_point(&point.into()), Some(point));
    }

    #[test]
    fn test_line_uses_centroid() {
        let line = geo::LineString::from(vec![(0.0, 0.0), (2.0, 0.0)]);
        let point = representative_point(&line.into()).unwrap();
        assert_abs_diff_eq!(point.x(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(point.y(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_polygon_point_is_on_surface() {
        // U-shaped polygon whose centroid falls into the gap between the arms.
        let polygon = geo::Polygon::new(
            vec![
                (0.0, 0.0),
                (3.0, 0.0),
                (3.0, 3.0),
                (2.0, 3.0),
                (2.0, 1.0),
                (1.0, 1.0),
                (1.0, 3.0),
                (0.0, 3.0),
                (0.0, 0.0),
            ]
            .into(),
            vec![],
        );
        let centroid = polygon.centroid().unwrap();
        assert!(!polygon.contains(&centroid));

        let point = representative_point(&polygon.clone().into()).unwrap();
        assert!(polygon.contains(&point));
    }

    #[test]
    fn test_empty_geometry() {
        let empty = geo::LineString::<f64>::new(vec![]);
        assert_eq!(representative_point(&empty.into()), None);
    }
}
