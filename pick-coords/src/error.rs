#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PickError {
    #[error("invalid micrograph dimension: width = {width}, height = {height}")]
    InvalidDimension { width: i64, height: i64 },

    #[error("missing column `{column}`")]
    MissingColumn { column: Box<str> },

    #[error("cannot parse `{value}` in column `{column}` (row {row})")]
    InvalidValue {
        column: Box<str>,
        row: usize,
        value: Box<str>,
    },

    #[error(transparent)]
    StarSyntax(#[from] star_util::star::StarSyntaxError),
}
