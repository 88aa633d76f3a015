//! Particle-stack references in converted STAR files. cryoSPARC writes
//! extracted particles as `.mrc` stacks; RELION expects `.mrcs`.

use crate::error::PickError;
use star_util::common_io::dir_name;
use star_util::star::{StarFile, StarTable};

pub const IMAGE_NAME: &str = "rlnImageName";

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Replace every `.mrc` that ends a token with `.mrcs`. References that
/// already end in `.mrcs` are left alone, so the rewrite is idempotent.
pub fn rewrite_stack_extension(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len() + 64);
    let mut last = 0;

    for (i, _) in text.match_indices(".mrc") {
        let end = i + ".mrc".len();
        if bytes.get(end).map(|&b| is_word_byte(b)).unwrap_or(false) {
            continue;
        }
        out.push_str(&text[last..end]);
        out.push('s');
        last = end;
    }
    out.push_str(&text[last..]);
    out
}

/// First table with an `ImageName` column (RELION 3.1 files put an
/// optics table ahead of the particles)
pub fn particle_table(star: &StarFile) -> Option<&StarTable> {
    star.blocks
        .iter()
        .filter_map(|b| b.table.as_ref())
        .find(|t| t.column_index(IMAGE_NAME).is_some())
}

/// Directory of the particle stack named in the first row's
/// `ImageName` (`000001@J7/extract/stack.mrcs` gives `J7/extract`).
/// `None` for a table without rows.
pub fn particle_stack_dir(table: &StarTable) -> Result<Option<Box<str>>, PickError> {
    let names = table.column(IMAGE_NAME).ok_or(PickError::MissingColumn {
        column: IMAGE_NAME.into(),
    })?;

    Ok(names.first().map(|name| {
        let path = name.split_once('@').map(|(_, p)| p).unwrap_or(*name);
        dir_name(path).into()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_whole_extensions_change() {
        let text = "000001@J7/extract/a_particles.mrc 1.0\n000002@J7/extract/b.mrcs 2.0\nx.mrc_old y.mrc\n";
        let out = rewrite_stack_extension(text);
        assert_eq!(
            out,
            "000001@J7/extract/a_particles.mrcs 1.0\n000002@J7/extract/b.mrcs 2.0\nx.mrc_old y.mrcs\n"
        );
        assert_eq!(rewrite_stack_extension(&out), out);
    }

    #[test]
    fn stack_dir_from_first_row() {
        let star: StarFile = "data_particles\nloop_\n_rlnImageName #1\n_rlnDefocusU #2\n000001@J7/extract/s1.mrcs 1\n000002@J8/extract/s2.mrcs 1\n"
            .parse()
            .unwrap();
        let table = star.main_table().unwrap();
        assert_eq!(particle_stack_dir(table).unwrap().as_deref(), Some("J7/extract"));
    }

    #[test]
    fn particles_after_optics() {
        let star: StarFile = "data_optics\nloop_\n_rlnOpticsGroup #1\n1\n\ndata_particles\nloop_\n_rlnImageName #1\n000001@J7/extract/s1.mrcs\n"
            .parse()
            .unwrap();
        let table = particle_table(&star).unwrap();
        assert_eq!(particle_stack_dir(table).unwrap().as_deref(), Some("J7/extract"));

        let optics_only: StarFile = "data_optics\nloop_\n_rlnOpticsGroup #1\n1\n".parse().unwrap();
        assert!(particle_table(&optics_only).is_none());
    }

    #[test]
    fn stack_dir_needs_image_names() {
        let table = StarTable::new(&["rlnDefocusU"]);
        assert_eq!(
            particle_stack_dir(&table),
            Err(PickError::MissingColumn {
                column: IMAGE_NAME.into()
            })
        );
        assert_eq!(particle_stack_dir(&StarTable::new(&[IMAGE_NAME])), Ok(None));
    }
}
