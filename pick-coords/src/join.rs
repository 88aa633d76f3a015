use crate::star_picks::StarPick;
use std::collections::HashMap;

/// Picks of a combined table that belong to `micrograph_name`, by exact
/// match against each row's `MicrographName`. Rows without a name never
/// match. No match is an empty result.
pub fn join_picks_to_micrograph<'a>(
    picks: &'a [StarPick],
    micrograph_name: &str,
) -> Vec<&'a StarPick> {
    picks
        .iter()
        .filter(|p| p.micrograph_name.as_deref() == Some(micrograph_name))
        .collect()
}

/// Picks of a combined table keyed by `MicrographName`, each group in
/// row order. Rows without a name are left out.
pub fn group_picks_by_micrograph(picks: &[StarPick]) -> HashMap<&str, Vec<&StarPick>> {
    let mut groups: HashMap<&str, Vec<&StarPick>> = HashMap::new();
    for p in picks {
        if let Some(name) = p.micrograph_name.as_deref() {
            groups.entry(name).or_default().push(p);
        }
    }
    groups
}
