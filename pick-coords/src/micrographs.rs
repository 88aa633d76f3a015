use crate::coords::MicrographShape;
use crate::records::Micrograph;
use star_util::common_io::read_lines_of_words_delim;

pub const MICROGRAPH_LIST_COLUMNS: [&str; 4] = ["uid", "path", "height", "width"];

///
/// Read a tab-separated micrograph list with a `uid path height width`
/// header (any column order)
///
pub fn read_micrograph_list(file_path: &str) -> anyhow::Result<Vec<Micrograph>> {
    let data = read_lines_of_words_delim(file_path, "\t", 0)?;

    let index = |name: &str| -> anyhow::Result<usize> {
        data.header
            .iter()
            .position(|h| h.trim() == name)
            .ok_or(anyhow::anyhow!("{}: no `{}` column", file_path, name))
    };

    let mut jj = [0_usize; 4];
    for (j, name) in MICROGRAPH_LIST_COLUMNS.iter().enumerate() {
        jj[j] = index(name)?;
    }
    let [uid, path, height, width] = jj;
    let ncols = data.header.len();

    data.lines
        .iter()
        .enumerate()
        .map(|(i, words)| -> anyhow::Result<Micrograph> {
            if words.len() != ncols {
                return Err(anyhow::anyhow!(
                    "{}: row {} has {} fields, expected {}",
                    file_path,
                    i + 1,
                    words.len(),
                    ncols
                ));
            }
            let shape = MicrographShape::new(
                words[height].trim().parse()?,
                words[width].trim().parse()?,
            );
            Ok(Micrograph::new(words[uid].trim(), words[path].trim(), shape))
        })
        .collect()
}
