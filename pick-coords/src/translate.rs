use crate::error::PickError;
use crate::join::group_picks_by_micrograph;
use crate::records::{Micrograph, ParticlePick, PickTable};
use crate::star_picks::StarPick;
use rayon::prelude::*;

/// Where `pick_stats/power` comes from
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PowerPolicy {
    /// copy whatever `ncc_score` ends up as
    SameAsNcc,
    Fixed(f64),
    /// leave it unset
    Absent,
}

/// How to fill the two pick scores from a tool's figure of merit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScorePolicy {
    /// `ncc_score` for rows without a figure of merit
    pub default_ncc: f64,
    pub power: PowerPolicy,
}

impl Default for ScorePolicy {
    fn default() -> Self {
        Self {
            default_ncc: 0.5,
            power: PowerPolicy::SameAsNcc,
        }
    }
}

impl ScorePolicy {
    /// `(ncc_score, power)`
    pub fn scores(&self, figure_of_merit: Option<f64>) -> (Option<f64>, Option<f64>) {
        let ncc = figure_of_merit.unwrap_or(self.default_ncc);
        let power = match self.power {
            PowerPolicy::SameAsNcc => Some(ncc),
            PowerPolicy::Fixed(x) => Some(x),
            PowerPolicy::Absent => None,
        };
        (Some(ncc), power)
    }
}

/// Convert pixel picks on one micrograph into platform records
pub fn translate_micrograph(
    micrograph: &Micrograph,
    picks: &[&StarPick],
    policy: &ScorePolicy,
) -> Result<Vec<ParticlePick>, PickError> {
    picks
        .iter()
        .map(|p| -> Result<ParticlePick, PickError> {
            let (center_x_frac, center_y_frac) = micrograph.shape.to_fractional(p.x, p.y)?;
            let (ncc_score, power) = policy.scores(p.figure_of_merit);
            Ok(ParticlePick {
                micrograph_uid: micrograph.uid.clone(),
                micrograph_path: micrograph.path.clone(),
                micrograph_shape: micrograph.shape,
                center_x_frac,
                center_y_frac,
                ncc_score,
                power,
            })
        })
        .collect()
}

/// Combined-table mode: every micrograph takes the rows whose
/// `MicrographName` equals its file name. Output follows the order of
/// `micrographs`, then the row order of `picks`. Picks are grouped once,
/// then micrographs are translated in parallel.
pub fn translate_combined(
    micrographs: &[Micrograph],
    picks: &[StarPick],
    policy: &ScorePolicy,
) -> Result<PickTable, PickError> {
    let groups = group_picks_by_micrograph(picks);
    let tables = micrographs
        .par_iter()
        .map(|mic| match groups.get(mic.file_name()) {
            Some(joined) => translate_micrograph(mic, joined, policy).map(PickTable::new),
            None => Ok(PickTable::default()),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(PickTable::concat(tables))
}
