use crate::error::PickError;
use crate::records::{Micrograph, PickTable};
use crate::star_picks::{star_picks_from_table, StarPick, MICROGRAPH_NAME};
use crate::translate::{translate_combined, translate_micrograph, ScorePolicy};

use indicatif::ParallelProgressIterator;
use log::info;
use rayon::prelude::*;
use star_util::star::read_star;
use std::path::Path;

/// Where a picking tool left its coordinates
#[derive(Debug, Clone, PartialEq)]
pub enum PickSource {
    /// one STAR table for every micrograph, rows tagged by `MicrographName`
    Combined { star_file: Box<str> },
    /// `<micrograph stem>.star` per micrograph inside `dir`
    PerMicrograph { dir: Box<str> },
}

/// `combined` tables are joined through `MicrographName`, so they
/// must carry it
fn read_star_picks(star_file: &str, combined: bool) -> anyhow::Result<Vec<StarPick>> {
    let star = read_star(star_file)?;
    let table = star
        .main_table()
        .ok_or(anyhow::anyhow!("{}: no loop table", star_file))?;

    if combined && table.column_index(MICROGRAPH_NAME).is_none() {
        return Err(anyhow::anyhow!(
            "{}: {}",
            star_file,
            PickError::MissingColumn {
                column: MICROGRAPH_NAME.into()
            }
        ));
    }
    star_picks_from_table(table).map_err(|e| anyhow::anyhow!("{}: {}", star_file, e))
}

///
/// Read a picking tool's STAR output and translate it into a pick
/// table for `micrographs`. Both sources give the same columns, in
/// micrograph order.
///
pub fn ingest_picks(
    micrographs: &[Micrograph],
    source: &PickSource,
    policy: &ScorePolicy,
) -> anyhow::Result<PickTable> {
    let table = match source {
        PickSource::Combined { star_file } => {
            let picks = read_star_picks(star_file, true)?;
            info!("read {} picks from {}", picks.len(), star_file);
            translate_combined(micrographs, &picks, policy)?
        }
        PickSource::PerMicrograph { dir } => {
            let njobs = micrographs.len() as u64;
            let tables = micrographs
                .par_iter()
                .progress_count(njobs)
                .map(|mic| ingest_one_micrograph(mic, dir, policy))
                .collect::<anyhow::Result<Vec<_>>>()?;
            PickTable::concat(tables)
        }
    };

    let mut counts = std::collections::HashMap::<&str, usize>::new();
    for p in table.iter() {
        *counts.entry(p.micrograph_uid.as_ref()).or_default() += 1;
    }
    for mic in micrographs {
        if !counts.contains_key(mic.uid.as_ref()) {
            info!("no picks on {}", mic.path);
        }
    }

    info!(
        "translated {} picks over {} micrographs",
        table.len(),
        micrographs.len()
    );
    Ok(table)
}

fn ingest_one_micrograph(
    mic: &Micrograph,
    dir: &str,
    policy: &ScorePolicy,
) -> anyhow::Result<PickTable> {
    let star_file = Path::new(dir).join(mic.star_file_name());
    let star_file = star_file
        .to_str()
        .ok_or(anyhow::anyhow!("non-UTF-8 path under {}", dir))?;

    // crYOLO writes no file for a micrograph without picks
    if !Path::new(star_file).exists() {
        return Ok(PickTable::default());
    }

    let picks = read_star_picks(star_file, false)?;
    let picks: Vec<&StarPick> = picks.iter().collect();
    let picks = translate_micrograph(mic, &picks, policy)
        .map_err(|e| anyhow::anyhow!("{}: {}", mic.path, e))?;
    Ok(PickTable::new(picks))
}
