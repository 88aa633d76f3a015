use crate::common::*;
use crate::plan::*;
use crate::pyem::Csparc2Star;

#[derive(Args, Debug, Clone)]
pub struct PlanCs2StarArgs {
    /// cryoSPARC project
    project: Box<str>,

    /// Select 2D job with the particles to convert
    select2d_job_id: Box<str>,

    /// RELION project directory
    relion_project_path: Box<str>,

    /// directory of the Select 2D job
    #[arg(long, required = true)]
    job_dir: Box<str>,

    /// cryoSPARC project directory
    #[arg(long, required = true)]
    project_dir: Box<str>,

    /// directory with `csparc2star.py` (default: on `PATH`)
    #[arg(long, default_value = "")]
    pyem_path: Box<str>,

    #[arg(long, default_value = "particles_from_cs")]
    star_file_output_prefix: Box<str>,

    #[command(flatten)]
    platform: PlatformArgs,

    /// plan file (`-` for stdout)
    #[arg(short, long, default_value = "-")]
    output: Box<str>,
}

///
/// cryoSPARC particles to RELION: convert with pyem, point the STAR file
/// at `.mrcs` stacks and link the extracted stacks under the RELION
/// project
///
pub fn cs2star_plan(args: &PlanCs2StarArgs) -> anyhow::Result<JobPlan> {
    let star_file = join_dir(
        &args.relion_project_path,
        &format!("{}.star", args.star_file_output_prefix),
    );

    let cs2star = Csparc2Star {
        pyem_dir: args.pyem_path.clone(),
        job_dir: args.job_dir.clone(),
        job_uid: args.select2d_job_id.clone(),
        output_star: star_file.clone().into(),
    };

    let mut plan = JobPlan::new(
        &format!("{} to RELION", args.select2d_job_id),
        &args.project,
        None,
    );
    plan.wait_for(&args.select2d_job_id)
        .run(cs2star.invocation()?)
        .run(
            self_invocation("relion-stack")
                .opt("--star", &star_file)
                .opt("--relion-project", &args.relion_project_path),
        )
        .link_as_mrcs(
            LinkSource::ParticleStack {
                star_file: star_file.clone().into(),
                project_dir: args.project_dir.clone(),
            },
            &args.relion_project_path,
        )
        .note(&format!("particles ready in {}", star_file));

    Ok(plan)
}

pub fn run_plan_cs2star(args: &PlanCs2StarArgs) -> anyhow::Result<()> {
    let mut plan = cs2star_plan(args)?;
    plan.platform = args.platform.target()?;
    plan.write(&args.output)
}
