pub mod extent;
pub mod kind;
pub mod representative;
pub mod wkt;
