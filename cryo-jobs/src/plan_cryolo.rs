use crate::common::*;
use crate::cryolo::*;
use crate::plan::*;

use pick_coords::micrographs::read_micrograph_list;
use pick_coords::Micrograph;

#[derive(Args, Debug, Clone)]
pub struct PlanCryoloPickArgs {
    /// cryoSPARC project
    project: Box<str>,

    /// workspace to create the job in
    workspace: Box<str>,

    /// job that curated the micrographs
    curate_exposures_job_id: Box<str>,

    /// box size (pixels)
    box_size: usize,

    /// pretrained crYOLO model (`.h5`)
    model_path: Box<str>,

    /// micrograph list (`uid path height width`) of the curated exposures
    #[arg(short, long, required = true)]
    micrographs: Box<str>,

    /// working directory of the new job
    #[arg(long, required = true)]
    job_dir: Box<str>,

    #[arg(long, default_value = "crYOLO Picks")]
    title: Box<str>,

    /// low-pass filter cutoff
    #[arg(long, default_value_t = 0.2)]
    lowpass: f64,

    /// picking threshold
    #[arg(long, default_value_t = 0.001)]
    threshold: f64,

    #[arg(long, default_value_t = 0)]
    gpu: usize,

    #[command(flatten)]
    platform: PlatformArgs,

    /// plan file (`-` for stdout)
    #[arg(short, long, default_value = "-")]
    output: Box<str>,
}

#[derive(Args, Debug, Clone)]
pub struct PlanCryoloTrainArgs {
    /// cryoSPARC project
    project: Box<str>,

    /// workspace to create the job in
    workspace: Box<str>,

    /// job that curated the micrographs
    curate_exposures_job_id: Box<str>,

    /// job with picked particles for training
    training_particles_job_id: Box<str>,

    /// box size (pixels)
    box_size: usize,

    /// micrograph list of every micrograph to pick
    #[arg(short, long, required = true)]
    micrographs: Box<str>,

    /// micrograph list of the training micrographs
    #[arg(long, required = true)]
    train_micrographs: Box<str>,

    /// pick table of the training particles
    #[arg(long, required = true)]
    train_picks: Box<str>,

    /// working directory of the new job
    #[arg(long, required = true)]
    job_dir: Box<str>,

    #[arg(long, default_value = "crYOLO trained picks")]
    title: Box<str>,

    /// low-pass filter cutoff (no filter if unset)
    #[arg(long)]
    lowpass: Option<f64>,

    /// picking threshold
    #[arg(long, default_value_t = 0.1)]
    threshold: f64,

    #[arg(long, default_value_t = 2)]
    batch_size: usize,

    /// start training from these weights
    #[arg(long)]
    pretrained_weights: Option<Box<str>>,

    #[arg(long, default_value_t = 5)]
    warmup_epochs: usize,

    /// early-stop patience (epochs)
    #[arg(long, default_value_t = 15)]
    early_stop: usize,

    #[arg(long, default_value_t = 0)]
    gpu: usize,

    #[command(flatten)]
    platform: PlatformArgs,

    /// plan file (`-` for stdout)
    #[arg(short, long, default_value = "-")]
    output: Box<str>,
}

fn micrograph_paths(micrographs: &[Micrograph]) -> Vec<Box<str>> {
    micrographs.iter().map(|m| m.path.clone()).collect()
}

///
/// Pretrained picking: link the curated micrographs, configure, predict
/// and translate the combined STAR output back into a pick table
///
pub fn cryolo_pick_plan(
    args: &PlanCryoloPickArgs,
    micrographs: &[Micrograph],
) -> anyhow::Result<JobPlan> {
    let job_dir = args.job_dir.as_ref();
    let mut plan = JobPlan::new(&args.title, &args.project, Some(args.workspace.as_ref()));

    let config = CryoloConfig {
        box_size: args.box_size,
        lowpass_cutoff: Some(args.lowpass),
        training: None,
    };
    let predict = CryoloPredict {
        weights: args.model_path.clone(),
        input_dir: FULL_DATA_DIR.into(),
        output_dir: BOX_DIR.into(),
        gpu: args.gpu,
        threshold: args.threshold,
    };

    plan.wait_for(&args.curate_exposures_job_id)
        .link(
            LinkSource::Files {
                files: micrograph_paths(micrographs),
            },
            &join_dir(job_dir, FULL_DATA_DIR),
        )
        .run(config.invocation(job_dir)?)
        .run(predict.invocation(job_dir)?)
        .run(
            self_invocation("import-picks")
                .opt("--micrographs", &args.micrographs)
                .opt("--combined-star", join_dir(job_dir, COMBINED_STAR))
                .opt("--power", "same-as-ncc")
                .opt("-o", join_dir(job_dir, "predicted_particles.parquet")),
        )
        .note("save predicted_particles.parquet as the job's predicted_particles output");

    Ok(plan)
}

///
/// Train then pick: annotate the training micrographs, train from them
/// and pick every micrograph with the new model
///
pub fn cryolo_train_plan(
    args: &PlanCryoloTrainArgs,
    micrographs: &[Micrograph],
    train_micrographs: &[Micrograph],
) -> anyhow::Result<JobPlan> {
    let job_dir = args.job_dir.as_ref();
    let mut plan = JobPlan::new(&args.title, &args.project, Some(args.workspace.as_ref()));

    let config = CryoloConfig {
        box_size: args.box_size,
        lowpass_cutoff: args.lowpass,
        training: Some(CryoloTraining {
            image_folder: TRAIN_IMAGE_DIR.into(),
            annot_folder: TRAIN_ANNOT_DIR.into(),
            batch_size: args.batch_size,
            pretrained_weights: args.pretrained_weights.clone(),
        }),
    };
    let train = CryoloTrain {
        warmup_epochs: args.warmup_epochs,
        early_stop: args.early_stop,
        gpu: args.gpu,
    };
    let predict = CryoloPredict {
        weights: TRAINED_MODEL.into(),
        input_dir: FULL_DATA_DIR.into(),
        output_dir: BOX_DIR.into(),
        gpu: args.gpu,
        threshold: args.threshold,
    };

    plan.wait_for(&args.curate_exposures_job_id)
        .wait_for(&args.training_particles_job_id)
        .link(
            LinkSource::Files {
                files: micrograph_paths(micrographs),
            },
            &join_dir(job_dir, FULL_DATA_DIR),
        )
        .link(
            LinkSource::Files {
                files: micrograph_paths(train_micrographs),
            },
            &join_dir(job_dir, TRAIN_IMAGE_DIR),
        )
        .run(
            self_invocation("export-annotations")
                .opt("--picks", &args.train_picks)
                .opt("--output-dir", join_dir(job_dir, "train_annot/STAR")),
        )
        .run(config.invocation(job_dir)?)
        .run(train.invocation(job_dir)?)
        .run(predict.invocation(job_dir)?)
        .run(
            self_invocation("import-picks")
                .opt("--micrographs", &args.micrographs)
                .opt("--star-dir", join_dir(job_dir, PER_MICROGRAPH_STAR_DIR))
                .opt("--default-ncc", 0.5)
                .opt("--power", "absent")
                .opt("-o", join_dir(job_dir, "predicted_particles.parquet")),
        )
        .note("save predicted_particles.parquet as the job's predicted_particles output");

    Ok(plan)
}

pub fn run_plan_cryolo_pick(args: &PlanCryoloPickArgs) -> anyhow::Result<()> {
    let micrographs = read_micrograph_list(&args.micrographs)?;
    info!("{} micrographs to pick", micrographs.len());

    let mut plan = cryolo_pick_plan(args, &micrographs)?;
    plan.platform = args.platform.target()?;
    plan.write(&args.output)
}

pub fn run_plan_cryolo_train(args: &PlanCryoloTrainArgs) -> anyhow::Result<()> {
    let micrographs = read_micrograph_list(&args.micrographs)?;
    let train_micrographs = read_micrograph_list(&args.train_micrographs)?;
    info!(
        "{} micrographs to pick, {} for training",
        micrographs.len(),
        train_micrographs.len()
    );

    if train_micrographs.is_empty() {
        return Err(anyhow::anyhow!(
            "no training micrographs in {}",
            args.train_micrographs
        ));
    }

    let mut plan = cryolo_train_plan(args, &micrographs, &train_micrographs)?;
    plan.platform = args.platform.target()?;
    plan.write(&args.output)
}
