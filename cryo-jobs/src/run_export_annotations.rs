use crate::common::*;

use pick_coords::annotations::write_training_annotations;
use pick_coords::pick_table_io::read_pick_table;

#[derive(Args, Debug)]
pub struct ExportAnnotationsArgs {
    /// pick table of training particles (`.tsv`, `.tsv.gz` or `.parquet`)
    #[arg(short, long, required = true)]
    picks: Box<str>,

    /// one `<micrograph stem>.star` per micrograph goes here
    #[arg(short, long, required = true)]
    output_dir: Box<str>,
}

/// Pixel-coordinate STAR annotations for picker training
pub fn run_export_annotations(args: &ExportAnnotationsArgs) -> anyhow::Result<()> {
    let table = read_pick_table(&args.picks)?;
    info!("{} training picks in {}", table.len(), args.picks);

    if table.is_empty() {
        warn!("no picks in {}: nothing to annotate", args.picks);
    }

    write_training_annotations(&table, &args.output_dir)?;
    Ok(())
}
