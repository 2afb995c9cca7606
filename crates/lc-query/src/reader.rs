//! Scalar extraction from a finished result set.
//!
//! The engine returns column names as the first row. That row is skipped by
//! position, never inspected.

use crate::{QueryError, QueryExecutor, QueryHandle, ResultRow, ScalarKind, ScalarValue};

/// Fetch the rows of `handle` and return the first cell of the first data
/// row, typed as `kind`.
pub async fn read_scalar<E>(
    executor: &E,
    handle: &QueryHandle,
    kind: ScalarKind,
) -> Result<ScalarValue, QueryError>
where
    E: QueryExecutor + ?Sized,
{
    let rows = executor.result_rows(handle).await?;
    extract_scalar(handle, &rows, kind)
}

/// Pure half of [`read_scalar`].
pub fn extract_scalar(
    handle: &QueryHandle,
    rows: &[ResultRow],
    kind: ScalarKind,
) -> Result<ScalarValue, QueryError> {
    let no_result = |reason: &str| QueryError::NoResult {
        handle: handle.clone(),
        reason: reason.to_string(),
    };

    let data_row = rows
        .get(1)
        .ok_or_else(|| no_result("result set has no data row"))?;
    let cell = data_row
        .first()
        .ok_or_else(|| no_result("first data row has no columns"))?;
    let raw = cell
        .as_deref()
        .ok_or_else(|| no_result("first column of first data row is NULL"))?;

    kind.parse(raw).ok_or_else(|| QueryError::TypeConversion {
        handle: handle.clone(),
        raw: raw.to_string(),
        expected: kind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[Option<&str>]) -> ResultRow {
        cells.iter().map(|c| c.map(str::to_string)).collect()
    }

    fn h() -> QueryHandle {
        QueryHandle::new("q1")
    }

    #[test]
    fn skips_header_row() {
        let rows = vec![row(&[Some("_col0")]), row(&[Some("1000")])];
        assert_eq!(
            extract_scalar(&h(), &rows, ScalarKind::Integer),
            Ok(ScalarValue::Integer(1000))
        );
    }

    #[test]
    fn header_is_skipped_even_when_numeric() {
        // positional convention: row 0 is never read
        let rows = vec![row(&[Some("7")]), row(&[Some("8")])];
        assert_eq!(
            extract_scalar(&h(), &rows, ScalarKind::Integer),
            Ok(ScalarValue::Integer(8))
        );
    }

    #[test]
    fn only_first_column_is_read() {
        let rows = vec![
            row(&[Some("a"), Some("b")]),
            row(&[Some("12.5"), Some("garbage")]),
            row(&[Some("99")]),
        ];
        assert_eq!(
            extract_scalar(&h(), &rows, ScalarKind::Float),
            Ok(ScalarValue::Float(12.5))
        );
    }

    #[test]
    fn header_only_is_no_result() {
        let rows = vec![row(&[Some("_col0")])];
        let err = extract_scalar(&h(), &rows, ScalarKind::Integer).unwrap_err();
        assert_eq!(err.code(), "NO_RESULT");
    }

    #[test]
    fn empty_result_is_no_result() {
        let err = extract_scalar(&h(), &[], ScalarKind::Integer).unwrap_err();
        assert_eq!(err.code(), "NO_RESULT");
    }

    #[test]
    fn null_cell_is_no_result() {
        let rows = vec![row(&[Some("_col0")]), row(&[None])];
        let err = extract_scalar(&h(), &rows, ScalarKind::Float).unwrap_err();
        assert!(err.to_string().contains("NULL"));
    }

    #[test]
    fn empty_data_row_is_no_result() {
        let rows = vec![row(&[Some("_col0")]), row(&[])];
        let err = extract_scalar(&h(), &rows, ScalarKind::Float).unwrap_err();
        assert_eq!(err.code(), "NO_RESULT");
    }

    #[test]
    fn unparseable_integer_is_type_conversion() {
        let rows = vec![row(&[Some("_col0")]), row(&[Some("1000.5")])];
        let err = extract_scalar(&h(), &rows, ScalarKind::Integer).unwrap_err();
        assert_eq!(
            err,
            QueryError::TypeConversion {
                handle: h(),
                raw: "1000.5".to_string(),
                expected: ScalarKind::Integer,
            }
        );
    }
}
