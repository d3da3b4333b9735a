//! The `field=value, other=value` shorthand typed by users.

/// Compile the shorthand filter into an expression for [`super::expression::FilterExpression`].
///
/// Each comma separated `field=value` clause becomes a case-insensitive, whitespace-trimmed
/// equality test and clauses are combined with AND:
///
/// `status = Active, kind=road` → `lower(trim("status")) = 'active' AND lower(trim("kind")) = 'road'`
///
/// Clauses without `=` are ignored. An empty input yields an empty expression.
pub fn compile_simple_filter(input: &str) -> String {
    let mut conditions = Vec::new();
    for part in input.split(',') {
        let Some((field, value)) = part.split_once('=') else {
            if !part.trim().is_empty() {
                log::warn!("Ignoring filter clause '{}' without '='", part.trim());
            }
            continue;
        };
        let field = field.trim().replace('"', "\"\"");
        let value = value.trim().to_lowercase().replace('\'', "''");
        conditions.push(format!("lower(trim(\"{}\")) = '{}'", field, value));
    }
    conditions.join(" AND ")
}
