use std::fmt;

use crate::crs::crs_utils::EpsgCode;

/// Scalar attribute value of a feature.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Null,
    Integer(i64),
    Real(f64),
    String(String),
    Boolean(bool),
}

impl fmt::Display for AttributeValue {
    /// Null is rendered as an empty string, which is also how it ends up in the CSV.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Null => Ok(()),
            AttributeValue::Integer(value) => write!(f, "{}", value),
            AttributeValue::Real(value) => write!(f, "{}", value),
            AttributeValue::String(value) => write!(f, "{}", value),
            AttributeValue::Boolean(value) => write!(f, "{}", value),
        }
    }
}

/// Attribute name/value pairs in schema order.
pub type Attributes = Vec<(String, AttributeValue)>;

#[derive(Debug, Clone)]
pub struct Feature {
    pub id: u64,
    pub geometry: Option<geo::Geometry>,
    pub attributes: Attributes,
}

impl Feature {
    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }
}

/// In-memory snapshot of a vector layer.
///
/// Every feature's attributes follow `field_names`, in that order, so all features share the
/// same schema.
#[derive(Debug, Clone)]
pub struct FeatureLayer {
    pub features: Vec<Feature>,
    pub crs: EpsgCode,
    pub field_names: Vec<String>,
}

impl FeatureLayer {
    /// Build a layer, aligning each feature's attributes to `field_names`. Missing attributes
    /// become null, attributes not in the schema are dropped.
    pub fn new(features: Vec<Feature>, crs: EpsgCode, field_names: Vec<String>) -> Self {
        let features = features
            .into_iter()
            .map(|mut feature| {
                feature.attributes = align_attributes(feature.attributes, &field_names);
                feature
            })
            .collect();
        Self {
            features,
            crs,
            field_names,
        }
    }
}

fn align_attributes(mut attributes: Attributes, field_names: &[String]) -> Attributes {
    field_names
        .iter()
        .map(|name| {
            let value = match attributes.iter().position(|(key, _)| key == name) {
                Some(index) => attributes.swap_remove(index).1,
                None => AttributeValue::Null,
            };
            (name.clone(), value)
        })
        .collect()
}
