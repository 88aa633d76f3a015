use flate2::read::GzDecoder;
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

///
/// Read the whole input_file into one string
///
/// * `input_file` - file name--either gzipped or not
///
pub fn read_to_string(input_file_path: &str) -> anyhow::Result<String> {
    let mut buf: Box<dyn BufRead> = open_buf_reader(input_file_path)?;
    let mut text = String::new();
    buf.read_to_string(&mut text)?;
    Ok(text)
}

///
/// Write every line into the output_file
///
/// * `lines` - vector of lines
/// * `output_file` - file name--either gzipped or not
///
pub fn write_lines<T>(lines: &[T], output_file_path: &str) -> anyhow::Result<()>
where
    T: std::fmt::Display,
{
    let mut buf = open_buf_writer(output_file_path)?;
    for line in lines {
        if let Err(e) = writeln!(buf, "{}", line) {
            if e.kind() == std::io::ErrorKind::BrokenPipe {
                return Ok(());
            } else {
                return Err(anyhow::anyhow!("unexpected error: {}", e));
            }
        }
    }
    buf.flush()?;
    Ok(())
}

pub struct ReadLinesOut<T: Send> {
    pub lines: Vec<Vec<T>>,
    pub header: Vec<Box<str>>,
}

///
/// Generic function to read lines and parse them into a vector of words or types.
///
/// * `input_file` - file name--either gzipped or not
/// * `hdr_line` - location of a header line (-1 = no header line)
/// * `parse_fn` - function to parse each line into the desired type
///
pub fn read_lines_of_words_generic<T>(
    input_file: &str,
    hdr_line: i64,
    parse_header_fn: impl Fn(&str) -> Vec<Box<str>> + Sync,
    parse_fn: impl Fn(&str) -> Vec<T> + Sync,
) -> anyhow::Result<ReadLinesOut<T>>
where
    T: Send,
{
    let buf_reader: Box<dyn BufRead> = open_buf_reader(input_file)?;

    fn is_data_line(line: &str) -> bool {
        !(line.is_empty() || line.starts_with('#') || line.starts_with('%'))
    }

    let lines_raw: Vec<Box<str>> = buf_reader
        .lines()
        .collect::<std::io::Result<Vec<_>>>()?
        .into_iter()
        .map(|x| x.into_boxed_str())
        .filter(|x| is_data_line(x.as_ref()))
        .collect();

    let mut header = vec![];

    let lines: Vec<Vec<T>> = if hdr_line < 0 {
        lines_raw.par_iter().map(|s| parse_fn(s)).collect()
    } else {
        let n_skip = hdr_line as usize;
        if lines_raw.len() < (n_skip + 1) {
            return Err(anyhow::anyhow!("not enough data in {}", input_file));
        }

        header.extend(parse_header_fn(&lines_raw[n_skip]));

        lines_raw[(n_skip + 1)..]
            .par_iter()
            .map(|s| parse_fn(s))
            .collect()
    };

    Ok(ReadLinesOut { lines, header })
}

///
/// Specialized function to read lines and parse them into a vector of words.
///
/// * `input_file` - file name--either gzipped or not
/// * `delim` - delimiter
/// * `hdr_line` - location of a header line (-1 = no header line)
///
pub fn read_lines_of_words_delim(
    input_file: &str,
    delim: &str,
    hdr_line: i64,
) -> anyhow::Result<ReadLinesOut<Box<str>>> {
    let parse_fn = |line: &str| -> Vec<Box<str>> {
        line.split(delim)
            .map(|x| x.to_owned().into_boxed_str())
            .collect()
    };

    read_lines_of_words_generic(input_file, hdr_line, parse_fn, parse_fn)
}

///
/// Open a file for reading, and return a buffered reader
/// * `input_file` - file name--either gzipped or not
pub fn open_buf_reader(input_file: &str) -> anyhow::Result<Box<dyn BufRead>> {
    let ext = Path::new(input_file).extension().and_then(|x| x.to_str());
    let file = File::open(input_file)
        .map_err(|e| anyhow::anyhow!("failed to open {}: {}", input_file, e))?;
    match ext {
        Some("gz") => Ok(Box::new(BufReader::new(GzDecoder::new(file)))),
        _ => Ok(Box::new(BufReader::new(file))),
    }
}

///
/// Open a file for writing, and return a buffered writer
/// * `output_file` - file name--either gzipped or not
pub fn open_buf_writer(output_file: &str) -> anyhow::Result<Box<dyn Write>> {
    // we can simply override with stdout
    if output_file.eq_ignore_ascii_case("stdout") {
        return Ok(Box::new(BufWriter::new(std::io::stdout())));
    }

    if output_file.eq_ignore_ascii_case("stderr") {
        return Ok(Box::new(BufWriter::new(std::io::stderr())));
    }

    let ext = Path::new(output_file).extension().and_then(|x| x.to_str());
    let file = File::create(output_file)
        .map_err(|e| anyhow::anyhow!("failed to create {}: {}", output_file, e))?;
    match ext {
        Some("gz") => {
            let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
            Ok(Box::new(BufWriter::new(encoder)))
        }
        _ => Ok(Box::new(BufWriter::new(file))),
    }
}

///
/// Create the parent directory of a file if needed
/// * `file` - file name
///
pub fn mkdir_parent(file: &str) -> anyhow::Result<()> {
    if let Some(dir) = Path::new(file).parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
    }
    Ok(())
}

///
/// Take the last component of a `/`-separated path, keeping the extension
/// * `path` - e.g. `J12/motioncorrected/mic001.mrc` gives `mic001.mrc`
///
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

///
/// Take the file name without its last extension
/// * `path` - e.g. `J12/motioncorrected/mic001.mrc` gives `mic001`
///
pub fn file_stem(path: &str) -> &str {
    let name = file_name(path);
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    }
}

///
/// Take the directory part of a `/`-separated path (empty if none)
/// * `path` - e.g. `J12/extract/stack.mrcs` gives `J12/extract`
///
pub fn dir_name(path: &str) -> &str {
    match path.rsplit_once('/') {
        Some((dir, _)) => dir,
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_parts() {
        assert_eq!(file_name("J3/motioncorrected/mic001.mrc"), "mic001.mrc");
        assert_eq!(file_stem("J3/motioncorrected/mic001.mrc"), "mic001");
        assert_eq!(file_stem("a.b.mrc"), "a.b");
        assert_eq!(file_stem(".hidden"), ".hidden");
        assert_eq!(dir_name("J3/extract/000001_stack.mrcs"), "J3/extract");
        assert_eq!(dir_name("stack.mrcs"), "");
    }

    #[test]
    fn gz_lines_round_trip() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let file = dir.path().join("lines.txt.gz");
        let file = file.to_str().unwrap();

        write_lines(&["uid\tpath", "1\ta.mrc"], file)?;
        assert_eq!(read_to_string(file)?, "uid\tpath\n1\ta.mrc\n");
        Ok(())
    }

    #[test]
    fn header_and_words() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let file = dir.path().join("table.tsv");
        let file = file.to_str().unwrap();

        write_lines(&["# comment", "a\tb", "1\t2", "", "3\t4"], file)?;
        let out = read_lines_of_words_delim(file, "\t", 0)?;

        assert_eq!(out.header, vec![Box::from("a"), Box::from("b")]);
        assert_eq!(out.lines.len(), 2);
        assert_eq!(out.lines[1][0].as_ref(), "3");
        Ok(())
    }
}
