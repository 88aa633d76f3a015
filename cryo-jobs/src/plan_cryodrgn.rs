use crate::common::*;
use crate::cryodrgn::*;
use crate::plan::*;

#[derive(Args, Debug, Clone)]
pub struct PlanCryodrgnArgs {
    /// cryoSPARC project
    project: Box<str>,

    /// workspace to create the job in
    workspace: Box<str>,

    /// C1 homogeneous refinement job
    refinement_job_id: Box<str>,

    /// particle downsampling job on the same stack
    downsample_job_id: Box<str>,

    /// directory of the refinement job
    #[arg(long, required = true)]
    refinement_dir: Box<str>,

    /// directory of the downsampling job
    #[arg(long, required = true)]
    downsample_dir: Box<str>,

    /// project directory (root of the particle image paths)
    #[arg(long, required = true)]
    project_dir: Box<str>,

    /// working directory of the new job
    #[arg(long, required = true)]
    job_dir: Box<str>,

    /// number of particles in the downsampled stack
    #[arg(long, required = true)]
    particle_count: usize,

    /// box size (pixels) before downsampling
    #[arg(long, required = true)]
    initial_box: usize,

    /// pixel size (Å) after downsampling
    #[arg(long, required = true)]
    downsampled_apix: f64,

    /// train on this many randomly chosen particles (default: all)
    #[arg(long)]
    particle_subset: Option<usize>,

    #[arg(long, default_value_t = 50)]
    epochs: usize,

    #[arg(long, default_value_t = 8)]
    batch: usize,

    #[arg(long, default_value_t = 8)]
    zdim: usize,

    /// GPUs to train on, e.g. `2,3`
    #[arg(long)]
    multigpu: Option<Box<str>>,

    #[arg(long, default_value_t = 32)]
    numexpr_max_threads: usize,

    #[arg(long, default_value = "cryodrgn")]
    title: Box<str>,

    #[command(flatten)]
    platform: PlatformArgs,

    /// plan file (`-` for stdout)
    #[arg(short, long, default_value = "-")]
    output: Box<str>,
}

///
/// cryoDRGN on a downsampled stack: link the refinement's particle file
/// and the downsampled stack, parse poses and CTF, train and analyze the
/// last epoch
///
/// * `refinement_files`: file names in the refinement job directory
///
pub fn cryodrgn_plan<S: AsRef<str>>(
    args: &PlanCryodrgnArgs,
    refinement_files: &[S],
) -> anyhow::Result<JobPlan> {
    let particles_file = select_particles_file(refinement_files)?;
    let subset = resolve_subset(args.particle_subset, args.particle_count)?;
    let gpus = args
        .multigpu
        .as_deref()
        .map(parse_gpu_list)
        .transpose()?;

    info!("particle file: {}", particles_file);

    let run = CryodrgnRun {
        particles_file: particles_file.into(),
        particle_count: args.particle_count,
        subset,
        initial_box: args.initial_box,
        downsampled_apix: args.downsampled_apix,
        zdim: args.zdim,
        epochs: args.epochs,
        batch: args.batch,
        gpus,
        numexpr_max_threads: args.numexpr_max_threads,
        data_dir: args.project_dir.clone(),
        job_dir: args.job_dir.clone(),
    };
    let invocations = run.invocations()?;

    let mut plan = JobPlan::new(&args.title, &args.project, Some(args.workspace.as_ref()));
    plan.wait_for(&args.refinement_job_id)
        .wait_for(&args.downsample_job_id)
        .link(
            LinkSource::Files {
                files: vec![join_dir(&args.refinement_dir, particles_file).into()],
            },
            &args.job_dir,
        )
        .link(
            LinkSource::Files {
                files: vec![join_dir(&args.downsample_dir, DOWNSAMPLED_PARTICLES).into()],
            },
            &args.job_dir,
        )
        .note(&format!(
            "working with a subset of {} of {} particles",
            subset, args.particle_count
        ));

    for x in invocations {
        plan.run(x);
    }
    plan.note(&format!("results in {}", run.analyze_dir()));
    for (title, file) in run.analyze_plots() {
        plan.note(&format!("plot {}: {}", title, file));
    }

    Ok(plan)
}

fn list_file_names(dir: &str) -> anyhow::Result<Vec<Box<str>>> {
    let mut names = vec![];
    for entry in std::fs::read_dir(dir)
        .map_err(|e| anyhow::anyhow!("failed to list {}: {}", dir, e))?
    {
        let entry = entry?;
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.into());
        }
    }
    Ok(names)
}

pub fn run_plan_cryodrgn(args: &PlanCryodrgnArgs) -> anyhow::Result<()> {
    let files = list_file_names(&args.refinement_dir)?;
    info!("{} files in {}", files.len(), args.refinement_dir);

    let mut plan = cryodrgn_plan(args, &files)?;
    plan.platform = args.platform.target()?;
    plan.write(&args.output)
}
