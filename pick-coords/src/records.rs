use crate::coords::MicrographShape;
use star_util::common_io::{file_name, file_stem};
use std::collections::BTreeMap;

/// A single exposure as the job platform tracks it
#[derive(Debug, Clone, PartialEq)]
pub struct Micrograph {
    /// opaque id, copied through untouched
    pub uid: Box<str>,
    pub path: Box<str>,
    pub shape: MicrographShape,
}

impl Micrograph {
    pub fn new(uid: &str, path: &str, shape: MicrographShape) -> Self {
        Self {
            uid: uid.into(),
            path: path.into(),
            shape,
        }
    }

    /// `mic001.mrc` for `J3/motioncorrected/mic001.mrc`; this is what
    /// picking tools write into `MicrographName`
    pub fn file_name(&self) -> &str {
        file_name(&self.path)
    }

    /// `mic001.star` for `J3/motioncorrected/mic001.mrc`
    pub fn star_file_name(&self) -> String {
        format!("{}.star", file_stem(&self.path))
    }
}

/// One picked particle in platform form. The two scores are independent:
/// a picker may report only one of them.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticlePick {
    pub micrograph_uid: Box<str>,
    pub micrograph_path: Box<str>,
    pub micrograph_shape: MicrographShape,
    pub center_x_frac: f64,
    pub center_y_frac: f64,
    pub ncc_score: Option<f64>,
    pub power: Option<f64>,
}

/// Ordered picks across any number of micrographs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PickTable {
    picks: Vec<ParticlePick>,
}

impl PickTable {
    pub fn new(picks: Vec<ParticlePick>) -> Self {
        Self { picks }
    }

    /// Concatenate per-micrograph tables, keeping their order
    pub fn concat(tables: Vec<PickTable>) -> Self {
        Self {
            picks: tables.into_iter().flat_map(|t| t.picks).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.picks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.picks.is_empty()
    }

    pub fn picks(&self) -> &[ParticlePick] {
        &self.picks
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ParticlePick> {
        self.picks.iter()
    }

    /// Group picks by `micrograph_path`, sorted by path
    pub fn split_by_micrograph_path(&self) -> BTreeMap<&str, Vec<&ParticlePick>> {
        let mut groups: BTreeMap<&str, Vec<&ParticlePick>> = BTreeMap::new();
        for pick in self.picks.iter() {
            groups
                .entry(pick.micrograph_path.as_ref())
                .or_default()
                .push(pick);
        }
        groups
    }
}

impl<'a> IntoIterator for &'a PickTable {
    type Item = &'a ParticlePick;
    type IntoIter = std::slice::Iter<'a, ParticlePick>;

    fn into_iter(self) -> Self::IntoIter {
        self.picks.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pick(path: &str, x: f64) -> ParticlePick {
        ParticlePick {
            micrograph_uid: "1".into(),
            micrograph_path: path.into(),
            micrograph_shape: MicrographShape::new(10, 10),
            center_x_frac: x,
            center_y_frac: 0.0,
            ncc_score: None,
            power: None,
        }
    }

    #[test]
    fn micrograph_names() {
        let mic = Micrograph::new("7", "J2/motioncorrected/0001_mic.mrc", MicrographShape::new(4, 4));
        assert_eq!(mic.file_name(), "0001_mic.mrc");
        assert_eq!(mic.star_file_name(), "0001_mic.star");
    }

    #[test]
    fn split_keeps_row_order_within_groups() {
        let table = PickTable::concat(vec![
            PickTable::new(vec![pick("b.mrc", 0.1), pick("a.mrc", 0.2)]),
            PickTable::new(vec![pick("b.mrc", 0.3)]),
        ]);

        assert_eq!(table.len(), 3);
        let groups = table.split_by_micrograph_path();
        let keys: Vec<&str> = groups.keys().copied().collect();
        assert_eq!(keys, vec!["a.mrc", "b.mrc"]);

        let xs: Vec<f64> = groups["b.mrc"].iter().map(|p| p.center_x_frac).collect();
        assert_eq!(xs, vec![0.1, 0.3]);
    }
}
