pub mod expression;
pub mod select;
pub mod simple;
