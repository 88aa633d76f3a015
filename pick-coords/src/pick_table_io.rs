use crate::coords::MicrographShape;
use crate::error::PickError;
use crate::records::{ParticlePick, PickTable};
use star_util::common_io::{mkdir_parent, open_buf_writer, read_lines_of_words_delim};
use star_util::parquet::{read_parquet_columns, write_parquet_columns, ColumnData};
use std::io::Write;

pub const MICROGRAPH_UID: &str = "location/micrograph_uid";
pub const MICROGRAPH_PATH: &str = "location/micrograph_path";
pub const MICROGRAPH_SHAPE: &str = "location/micrograph_shape";
pub const CENTER_X_FRAC: &str = "location/center_x_frac";
pub const CENTER_Y_FRAC: &str = "location/center_y_frac";
pub const NCC_SCORE: &str = "pick_stats/ncc_score";
pub const POWER: &str = "pick_stats/power";

pub const PICK_TABLE_COLUMNS: [&str; 7] = [
    MICROGRAPH_UID,
    MICROGRAPH_PATH,
    MICROGRAPH_SHAPE,
    CENTER_X_FRAC,
    CENTER_Y_FRAC,
    NCC_SCORE,
    POWER,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickTableFormat {
    Tsv,
    Parquet,
}

impl PickTableFormat {
    /// `.parquet` is parquet; anything else (`.tsv`, `.tsv.gz`, `stdout`)
    /// is tab-separated text
    pub fn from_path(file_path: &str) -> Self {
        if file_path.ends_with(".parquet") {
            PickTableFormat::Parquet
        } else {
            PickTableFormat::Tsv
        }
    }
}

fn score_to_f64(x: Option<f64>) -> f64 {
    x.unwrap_or(f64::NAN)
}

fn score_from_f64(x: f64) -> Option<f64> {
    if x.is_nan() {
        None
    } else {
        Some(x)
    }
}

///
/// Write picks with the platform's `location/*` and `pick_stats/*`
/// columns; the format follows the file extension
///
pub fn write_pick_table(table: &PickTable, file_path: &str) -> anyhow::Result<()> {
    if !file_path.eq_ignore_ascii_case("stdout") {
        mkdir_parent(file_path)?;
    }
    match PickTableFormat::from_path(file_path) {
        PickTableFormat::Tsv => write_pick_table_tsv(table, file_path),
        PickTableFormat::Parquet => write_pick_table_parquet(table, file_path),
    }
}

pub fn read_pick_table(file_path: &str) -> anyhow::Result<PickTable> {
    match PickTableFormat::from_path(file_path) {
        PickTableFormat::Tsv => read_pick_table_tsv(file_path),
        PickTableFormat::Parquet => read_pick_table_parquet(file_path),
    }
}

fn write_pick_table_tsv(table: &PickTable, file_path: &str) -> anyhow::Result<()> {
    let mut buf = open_buf_writer(file_path)?;
    writeln!(buf, "{}", PICK_TABLE_COLUMNS.join("\t"))?;
    for p in table {
        writeln!(
            buf,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            p.micrograph_uid,
            p.micrograph_path,
            p.micrograph_shape,
            p.center_x_frac,
            p.center_y_frac,
            score_to_f64(p.ncc_score),
            score_to_f64(p.power),
        )?;
    }
    buf.flush()?;
    Ok(())
}

fn write_pick_table_parquet(table: &PickTable, file_path: &str) -> anyhow::Result<()> {
    let picks = table.picks();
    let text = |f: &dyn Fn(&ParticlePick) -> Box<str>| -> ColumnData {
        ColumnData::Utf8(picks.iter().map(f).collect())
    };
    let number = |f: &dyn Fn(&ParticlePick) -> f64| -> ColumnData {
        ColumnData::Double(picks.iter().map(f).collect())
    };

    let columns: Vec<(Box<str>, ColumnData)> = vec![
        (MICROGRAPH_UID.into(), text(&|p| p.micrograph_uid.clone())),
        (MICROGRAPH_PATH.into(), text(&|p| p.micrograph_path.clone())),
        (
            MICROGRAPH_SHAPE.into(),
            text(&|p| p.micrograph_shape.to_string().into_boxed_str()),
        ),
        (CENTER_X_FRAC.into(), number(&|p| p.center_x_frac)),
        (CENTER_Y_FRAC.into(), number(&|p| p.center_y_frac)),
        (NCC_SCORE.into(), number(&|p| score_to_f64(p.ncc_score))),
        (POWER.into(), number(&|p| score_to_f64(p.power))),
    ];

    write_parquet_columns(file_path, &columns)
}

/// Row-wise view over named text cells, shared by both readers
struct PickRows<'a> {
    header: &'a [Box<str>],
    file_path: &'a str,
}

impl PickRows<'_> {
    fn index(&self, column: &str) -> Result<usize, PickError> {
        self.header
            .iter()
            .position(|h| h.as_ref() == column)
            .ok_or(PickError::MissingColumn {
                column: column.into(),
            })
    }

    fn parse<T: std::str::FromStr>(
        &self,
        column: &str,
        row: usize,
        value: &str,
    ) -> anyhow::Result<T> {
        value.trim().parse::<T>().map_err(|_| {
            anyhow::anyhow!(
                "{}: {}",
                self.file_path,
                PickError::InvalidValue {
                    column: column.into(),
                    row,
                    value: value.into(),
                }
            )
        })
    }
}

fn read_pick_table_tsv(file_path: &str) -> anyhow::Result<PickTable> {
    let data = read_lines_of_words_delim(file_path, "\t", 0)?;
    let rows = PickRows {
        header: &data.header,
        file_path,
    };

    let mut jj = [0_usize; 7];
    for (j, column) in PICK_TABLE_COLUMNS.iter().enumerate() {
        jj[j] = rows.index(column)?;
    }

    let picks = data
        .lines
        .iter()
        .enumerate()
        .map(|(i, words)| -> anyhow::Result<ParticlePick> {
            if words.len() != data.header.len() {
                return Err(anyhow::anyhow!(
                    "{}: row {} has {} fields, expected {}",
                    file_path,
                    i,
                    words.len(),
                    data.header.len()
                ));
            }
            let cell = |j: usize| words[jj[j]].as_ref();
            Ok(ParticlePick {
                micrograph_uid: cell(0).into(),
                micrograph_path: cell(1).into(),
                micrograph_shape: cell(2)
                    .parse::<MicrographShape>()
                    .map_err(|e| anyhow::anyhow!("{}: row {}: {}", file_path, i, e))?,
                center_x_frac: rows.parse(CENTER_X_FRAC, i, cell(3))?,
                center_y_frac: rows.parse(CENTER_Y_FRAC, i, cell(4))?,
                ncc_score: score_from_f64(rows.parse(NCC_SCORE, i, cell(5))?),
                power: score_from_f64(rows.parse(POWER, i, cell(6))?),
            })
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(PickTable::new(picks))
}

fn text_column<'a>(
    columns: &'a [(Box<str>, ColumnData)],
    rows: &PickRows,
    column: &str,
) -> anyhow::Result<&'a [Box<str>]> {
    match &columns[rows.index(column)?].1 {
        ColumnData::Utf8(x) => Ok(x.as_slice()),
        ColumnData::Double(_) => Err(anyhow::anyhow!("{} should be text", column)),
    }
}

fn number_column<'a>(
    columns: &'a [(Box<str>, ColumnData)],
    rows: &PickRows,
    column: &str,
) -> anyhow::Result<&'a [f64]> {
    match &columns[rows.index(column)?].1 {
        ColumnData::Double(x) => Ok(x.as_slice()),
        ColumnData::Utf8(_) => Err(anyhow::anyhow!("{} should be numeric", column)),
    }
}

fn read_pick_table_parquet(file_path: &str) -> anyhow::Result<PickTable> {
    let columns = read_parquet_columns(file_path)?;
    let header: Vec<Box<str>> = columns.iter().map(|(name, _)| name.clone()).collect();
    let rows = PickRows {
        header: &header,
        file_path,
    };

    let uid = text_column(&columns, &rows, MICROGRAPH_UID)?;
    let path = text_column(&columns, &rows, MICROGRAPH_PATH)?;
    let shape = text_column(&columns, &rows, MICROGRAPH_SHAPE)?;
    let xx = number_column(&columns, &rows, CENTER_X_FRAC)?;
    let yy = number_column(&columns, &rows, CENTER_Y_FRAC)?;
    let ncc = number_column(&columns, &rows, NCC_SCORE)?;
    let power = number_column(&columns, &rows, POWER)?;

    let picks = (0..uid.len())
        .map(|i| -> anyhow::Result<ParticlePick> {
            Ok(ParticlePick {
                micrograph_uid: uid[i].clone(),
                micrograph_path: path[i].clone(),
                micrograph_shape: rows.parse(MICROGRAPH_SHAPE, i, &shape[i])?,
                center_x_frac: xx[i],
                center_y_frac: yy[i],
                ncc_score: score_from_f64(ncc[i]),
                power: score_from_f64(power[i]),
            })
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(PickTable::new(picks))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> PickTable {
        PickTable::new(vec![
            ParticlePick {
                micrograph_uid: "10".into(),
                micrograph_path: "J1/mic001.mrc".into(),
                micrograph_shape: MicrographShape::new(4096, 4096),
                center_x_frac: 0.5,
                center_y_frac: 0.25,
                ncc_score: Some(0.5),
                power: None,
            },
            ParticlePick {
                micrograph_uid: "11".into(),
                micrograph_path: "J1/mic002.mrc".into(),
                micrograph_shape: MicrographShape::new(3000, 4000),
                center_x_frac: 1.0 / 3.0,
                center_y_frac: 0.1,
                ncc_score: Some(0.91),
                power: Some(0.91),
            },
        ])
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(PickTableFormat::from_path("a.parquet"), PickTableFormat::Parquet);
        assert_eq!(PickTableFormat::from_path("a.tsv.gz"), PickTableFormat::Tsv);
        assert_eq!(PickTableFormat::from_path("stdout"), PickTableFormat::Tsv);
    }

    #[test]
    fn tsv_and_parquet_read_back() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        for name in ["picks.tsv", "picks.tsv.gz", "picks.parquet"] {
            let file = dir.path().join(name);
            let file = file.to_str().unwrap();
            write_pick_table(&table(), file)?;
            assert_eq!(read_pick_table(file)?, table());
        }
        Ok(())
    }

    #[test]
    fn tsv_header_and_missing_score() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let file = dir.path().join("picks.tsv");
        let file = file.to_str().unwrap();
        write_pick_table(&table(), file)?;

        let text = std::fs::read_to_string(file)?;
        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), PICK_TABLE_COLUMNS.join("\t"));
        assert_eq!(
            lines.next().unwrap(),
            "10\tJ1/mic001.mrc\t4096,4096\t0.5\t0.25\t0.5\tNaN"
        );
        Ok(())
    }

    #[test]
    fn missing_column_is_reported() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let file = dir.path().join("picks.tsv");
        let file = file.to_str().unwrap();
        std::fs::write(file, "location/micrograph_uid\tlocation/micrograph_path\n1\ta.mrc\n")?;

        let err = read_pick_table(file).unwrap_err();
        assert!(err.to_string().contains(MICROGRAPH_SHAPE));
        Ok(())
    }
}
