use crate::error::PickError;
use crate::records::PickTable;
use crate::star_picks::{COORDINATE_X, COORDINATE_Y};

use log::info;
use star_util::common_io::file_stem;
use star_util::star::{write_star, StarBlock, StarFile, StarTable};
use std::path::{Path, PathBuf};

/// Pixel coordinates of one micrograph's picks, ready to be written as
/// `<micrograph stem>.star`
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationFile {
    pub micrograph_path: Box<str>,
    pub file_name: Box<str>,
    pub star: StarFile,
}

/// Turn training picks into per-micrograph pixel annotations, sorted by
/// micrograph path. Each pick is scaled by its own micrograph shape.
pub fn training_annotations(table: &PickTable) -> Result<Vec<AnnotationFile>, PickError> {
    table
        .split_by_micrograph_path()
        .into_iter()
        .map(|(micrograph_path, picks)| -> Result<AnnotationFile, PickError> {
            let mut loop_table = StarTable::new(&[COORDINATE_X, COORDINATE_Y]);
            for p in picks {
                let (x, y) = p.micrograph_shape.to_pixel(p.center_x_frac, p.center_y_frac)?;
                loop_table.push_row(vec![x.to_string().into(), y.to_string().into()])?;
            }
            Ok(AnnotationFile {
                micrograph_path: micrograph_path.into(),
                file_name: format!("{}.star", file_stem(micrograph_path)).into(),
                star: StarFile {
                    blocks: vec![StarBlock::with_table("", loop_table)],
                },
            })
        })
        .collect()
}

///
/// Write one STAR annotation file per micrograph into `out_dir`
///
/// * returns the written files in micrograph-path order
///
pub fn write_training_annotations(table: &PickTable, out_dir: &str) -> anyhow::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(out_dir)?;

    let files = training_annotations(table)?;
    let mut written = Vec::with_capacity(files.len());

    for file in files.iter() {
        let path = Path::new(out_dir).join(file.file_name.as_ref());
        let path_str = path
            .to_str()
            .ok_or(anyhow::anyhow!("non-UTF-8 path under {}", out_dir))?;
        write_star(&file.star, path_str)?;
        written.push(path);
    }

    info!(
        "wrote {} annotation files ({} picks) to {}",
        written.len(),
        table.len(),
        out_dir
    );
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::MicrographShape;
    use crate::records::ParticlePick;

    fn pick(path: &str, shape: MicrographShape, fx: f64, fy: f64) -> ParticlePick {
        ParticlePick {
            micrograph_uid: "0".into(),
            micrograph_path: path.into(),
            micrograph_shape: shape,
            center_x_frac: fx,
            center_y_frac: fy,
            ncc_score: None,
            power: None,
        }
    }

    #[test]
    fn grouped_and_scaled() {
        let wide = MicrographShape::new(1000, 2000);
        let table = PickTable::new(vec![
            pick("J9/mics/b.mrc", wide, 0.5, 0.5),
            pick("J9/mics/a.mrc", wide, 0.25, 0.1),
            pick("J9/mics/b.mrc", wide, 0.0, 1.0),
        ]);

        let files = training_annotations(&table).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].file_name.as_ref(), "a.star");
        assert_eq!(files[1].file_name.as_ref(), "b.star");

        let b = files[1].star.main_table().unwrap();
        assert_eq!(b.labels()[0].as_ref(), COORDINATE_X);
        let x: Vec<f64> = b.parse_column("CoordinateX").unwrap().unwrap();
        let y: Vec<f64> = b.parse_column("CoordinateY").unwrap().unwrap();
        assert_eq!(x, vec![1000.0, 0.0]);
        assert_eq!(y, vec![500.0, 1000.0]);
    }

    #[test]
    fn bad_shape_is_an_error() {
        let table = PickTable::new(vec![pick("a.mrc", MicrographShape::new(10, 0), 0.5, 0.5)]);
        assert!(matches!(
            training_annotations(&table),
            Err(PickError::InvalidDimension { .. })
        ));
    }
}
