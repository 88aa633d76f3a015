use crate::common::*;

use pick_coords::ingest::{ingest_picks, PickSource};
use pick_coords::micrographs::read_micrograph_list;
use pick_coords::pick_table_io::write_pick_table;
use pick_coords::{PowerPolicy, ScorePolicy};
use rayon::ThreadPoolBuilder;

/// `same-as-ncc`, `absent` or a number
pub fn parse_power(arg: &str) -> Result<PowerPolicy, String> {
    match arg {
        "same-as-ncc" => Ok(PowerPolicy::SameAsNcc),
        "absent" => Ok(PowerPolicy::Absent),
        _ => arg
            .parse::<f64>()
            .map(PowerPolicy::Fixed)
            .map_err(|_| format!("expected `same-as-ncc`, `absent` or a number, got `{}`", arg)),
    }
}

#[derive(Args, Debug)]
pub struct ImportPicksArgs {
    /// micrograph list (`uid path height width`, tab-separated)
    #[arg(short, long, required = true)]
    micrographs: Box<str>,

    /// one STAR file with picks for every micrograph
    #[arg(long, conflicts_with = "star_dir", required_unless_present = "star_dir")]
    combined_star: Option<Box<str>>,

    /// directory of `<micrograph stem>.star` files
    #[arg(long)]
    star_dir: Option<Box<str>>,

    /// `ncc_score` for picks without a figure of merit
    #[arg(long, default_value_t = 0.5)]
    default_ncc: f64,

    /// `power` column: `same-as-ncc`, `absent` or a fixed number
    #[arg(long, default_value = "same-as-ncc", value_parser = parse_power)]
    power: PowerPolicy,

    #[arg(
        long,
        default_value_t = 16,
        help = "Maximum number of threads",
        long_help = "Maximum number of threads to use for parallel processing. \n\
		     Choose the right number in HPC environments."
    )]
    max_threads: usize,

    /// output pick table (`.tsv`, `.tsv.gz` or `.parquet`)
    #[arg(short, long, required = true)]
    output: Box<str>,
}

impl ImportPicksArgs {
    fn source(&self) -> anyhow::Result<PickSource> {
        match (&self.combined_star, &self.star_dir) {
            (Some(star_file), None) => Ok(PickSource::Combined {
                star_file: star_file.clone(),
            }),
            (None, Some(dir)) => Ok(PickSource::PerMicrograph { dir: dir.clone() }),
            _ => Err(anyhow::anyhow!(
                "need exactly one of --combined-star and --star-dir"
            )),
        }
    }

    fn policy(&self) -> ScorePolicy {
        ScorePolicy {
            default_ncc: self.default_ncc,
            power: self.power,
        }
    }
}

pub fn run_import_picks(args: &ImportPicksArgs) -> anyhow::Result<()> {
    let max_threads = num_cpus::get().min(args.max_threads).max(1);

    ThreadPoolBuilder::new()
        .num_threads(max_threads)
        .build_global()?;

    info!("will use {} threads", rayon::current_num_threads());

    let source = args.source()?;
    let micrographs = read_micrograph_list(&args.micrographs)?;
    info!("{} micrographs in {}", micrographs.len(), args.micrographs);

    let table = ingest_picks(&micrographs, &source, &args.policy())?;

    io::mkdir_parent(&args.output)?;
    write_pick_table(&table, &args.output)?;
    info!("wrote {} picks to {}", table.len(), args.output);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_values() {
        assert_eq!(parse_power("same-as-ncc"), Ok(PowerPolicy::SameAsNcc));
        assert_eq!(parse_power("absent"), Ok(PowerPolicy::Absent));
        assert_eq!(parse_power("0.25"), Ok(PowerPolicy::Fixed(0.25)));
        assert!(parse_power("loud").is_err());
    }
}
