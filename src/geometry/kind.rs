use geo::dimensions::{Dimensions, HasDimensions};

/// Coarse geometry class that decides how a feature is summarised by a single point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryKind {
    Point,
    Line,
    Polygon,
}

impl GeometryKind {
    /// Classify a geometry by its topological dimension. Empty geometries have no kind.
    ///
    /// Collections take the highest dimension of their members.
    pub fn of(geometry: &geo::Geometry) -> Option<Self> {
        match geometry.dimensions() {
            Dimensions::Empty => None,
            Dimensions::ZeroDimensional => Some(GeometryKind::Point),
            Dimensions::OneDimensional => Some(GeometryKind::Line),
            Dimensions::TwoDimensional => Some(GeometryKind::Polygon),
        }
    }
}
