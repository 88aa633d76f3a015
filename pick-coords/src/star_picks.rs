use crate::error::PickError;
use star_util::star::StarTable;

pub const MICROGRAPH_NAME: &str = "rlnMicrographName";
pub const COORDINATE_X: &str = "rlnCoordinateX";
pub const COORDINATE_Y: &str = "rlnCoordinateY";
pub const FIGURE_OF_MERIT: &str = "rlnAutopickFigureOfMerit";

/// One row of a picking tool's STAR output, in pixels
#[derive(Debug, Clone, PartialEq)]
pub struct StarPick {
    /// `None` when the table carries no `MicrographName` column
    /// (one file per micrograph)
    pub micrograph_name: Option<Box<str>>,
    pub x: f64,
    pub y: f64,
    pub figure_of_merit: Option<f64>,
}

fn float_column(table: &StarTable, label: &str) -> Option<Result<Vec<f64>, PickError>> {
    table.parse_column::<f64>(label).map(|parsed| {
        parsed.map_err(|(row, value)| PickError::InvalidValue {
            column: label.into(),
            row,
            value,
        })
    })
}

/// Read typed pick rows from a STAR loop. Coordinates are required;
/// micrograph name and figure of merit are optional columns.
pub fn star_picks_from_table(table: &StarTable) -> Result<Vec<StarPick>, PickError> {
    let missing = |label: &str| PickError::MissingColumn {
        column: label.into(),
    };

    let xx = float_column(table, COORDINATE_X).ok_or_else(|| missing(COORDINATE_X))??;
    let yy = float_column(table, COORDINATE_Y).ok_or_else(|| missing(COORDINATE_Y))??;
    let merit = float_column(table, FIGURE_OF_MERIT).transpose()?;
    let names = table.column(MICROGRAPH_NAME);

    Ok((0..table.nrows())
        .map(|i| StarPick {
            micrograph_name: names.as_ref().map(|x| x[i].into()),
            x: xx[i],
            y: yy[i],
            figure_of_merit: merit.as_ref().map(|x| x[i]),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use star_util::star::StarFile;

    fn table(text: &str) -> StarTable {
        let star: StarFile = text.parse().unwrap();
        star.main_table().unwrap().clone()
    }

    #[test]
    fn reads_all_columns() {
        let t = table("data_\nloop_\n_rlnMicrographName #1\n_rlnCoordinateX #2\n_rlnCoordinateY #3\n_rlnAutopickFigureOfMerit #4\na.mrc 10 20 0.7\n");
        let picks = star_picks_from_table(&t).unwrap();
        assert_eq!(
            picks,
            vec![StarPick {
                micrograph_name: Some("a.mrc".into()),
                x: 10.0,
                y: 20.0,
                figure_of_merit: Some(0.7)
            }]
        );
    }

    #[test]
    fn optional_columns_may_be_absent() {
        let t = table("data_\nloop_\n_rlnCoordinateX #1\n_rlnCoordinateY #2\n1.5 2.5\n");
        let picks = star_picks_from_table(&t).unwrap();
        assert_eq!(picks[0].micrograph_name, None);
        assert_eq!(picks[0].figure_of_merit, None);
    }

    #[test]
    fn missing_coordinate_is_fatal() {
        let t = table("data_\nloop_\n_rlnCoordinateX #1\n_rlnAutopickFigureOfMerit #2\n1 0.5\n");
        assert_eq!(
            star_picks_from_table(&t),
            Err(PickError::MissingColumn {
                column: COORDINATE_Y.into()
            })
        );
    }

    #[test]
    fn unparsable_value() {
        let t = table("data_\nloop_\n_rlnCoordinateX #1\n_rlnCoordinateY #2\n1 2\n3 abc\n");
        assert_eq!(
            star_picks_from_table(&t),
            Err(PickError::InvalidValue {
                column: COORDINATE_Y.into(),
                row: 1,
                value: "abc".into()
            })
        );
    }
}
