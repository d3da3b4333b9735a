use crate::error::Result;
use crate::geofile::feature::{Feature, FeatureLayer};

use super::expression::FilterExpression;

/// Select the features of `layer` matching `expression`, in layer order.
///
/// The expression is parsed and checked against the layer schema once, before any feature is
/// evaluated, so a bad expression fails the whole request. `limit` keeps only the first
/// `limit` matches; `None` means unlimited.
pub fn select_features<'a>(
    layer: &'a FeatureLayer,
    expression: &str,
    limit: Option<usize>,
) -> Result<Vec<&'a Feature>> {
    let expression = FilterExpression::parse(expression)?;
    expression.validate_fields(&layer.field_names)?;
    if expression.is_match_all() {
        log::debug!("No filter, selecting all features");
    }

    let selected: Vec<&Feature> = layer
        .features
        .iter()
        .filter(|feature| expression.matches(feature))
        .take(limit.unwrap_or(usize::MAX))
        .collect();
    log::info!(
        "Selected {} of {} features",
        selected.len(),
        layer.features.len()
    );
    Ok(selected)
}
