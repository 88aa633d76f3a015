use crate::common::*;

use pick_coords::stack::{particle_stack_dir, particle_table, rewrite_stack_extension};
use star_util::star::StarFile;

#[derive(Args, Debug)]
pub struct RelionStackArgs {
    /// STAR file from `csparc2star.py`
    #[arg(short, long, required = true)]
    star: Box<str>,

    /// rewritten STAR file (default: rewrite in place)
    #[arg(short, long)]
    output: Option<Box<str>>,

    /// create the particle stack directory under this RELION project
    #[arg(long)]
    relion_project: Option<Box<str>>,
}

/// Point particle references at `.mrcs` stacks and report where the
/// stacks are expected
pub fn run_relion_stack(args: &RelionStackArgs) -> anyhow::Result<()> {
    let text = io::read_to_string(&args.star)?;
    let rewritten = rewrite_stack_extension(&text);

    // must still parse after the rewrite
    let star: StarFile = rewritten
        .parse()
        .map_err(|e| anyhow::anyhow!("{}: {}", args.star, e))?;

    let output = args.output.as_deref().unwrap_or(args.star.as_ref());
    io::mkdir_parent(output)?;
    io::write_lines(&[rewritten.trim_end_matches('\n')], output)?;
    info!("updated {} to use .mrcs stacks", output);

    let table = particle_table(&star)
        .ok_or(anyhow::anyhow!("{}: no particle table", args.star))?;

    match particle_stack_dir(table)? {
        Some(stack_dir) => {
            if let Some(project) = &args.relion_project {
                let dir = Path::new(project.as_ref()).join(stack_dir.as_ref());
                std::fs::create_dir_all(&dir)?;
                info!("created {}", dir.display());
            }
            println!("{}", stack_dir);
        }
        None => warn!("{}: no particles", args.star),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARTICLES: &str = "
data_optics

loop_
_rlnOpticsGroup #1
_rlnImagePixelSize #2
1 1.06

data_particles

loop_
_rlnImageName #1
_rlnMicrographName #2
000001@J7/extract/stack_a.mrc J2/mics/a.mrc
000002@J7/extract/stack_a.mrc J2/mics/a.mrc
";

    #[test]
    fn rewrites_in_place_and_makes_stack_dir() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let star = dir.path().join("particles_from_cs.star");
        std::fs::write(&star, PARTICLES)?;
        let project = dir.path().join("relion");

        let args = RelionStackArgs {
            star: star.to_str().unwrap().into(),
            output: None,
            relion_project: Some(project.to_str().unwrap().into()),
        };
        run_relion_stack(&args)?;

        let text = std::fs::read_to_string(&star)?;
        assert!(text.contains("000001@J7/extract/stack_a.mrcs J2/mics/a.mrcs"));
        assert!(!text.contains(".mrc "));
        assert!(project.join("J7/extract").is_dir());

        // second pass changes nothing
        run_relion_stack(&args)?;
        assert_eq!(std::fs::read_to_string(&star)?, text);
        Ok(())
    }
}
