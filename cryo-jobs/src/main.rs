mod common;
mod config;
mod cryodrgn;
mod cryolo;
mod invocation;
mod plan;
mod plan_cryodrgn;
mod plan_cryolo;
mod plan_cs2star;
mod pyem;
mod run_export_annotations;
mod run_import_picks;
mod run_relion_stack;

use crate::common::*;
use plan_cryodrgn::*;
use plan_cryolo::*;
use plan_cs2star::*;
use run_export_annotations::*;
use run_import_picks::*;
use run_relion_stack::*;

#[derive(Parser, Debug)]
#[command(version, about, long_about, term_width = 80)]
struct Cli {
    /// show progress messages
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    commands: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate STAR picks into a fractional-coordinate pick table
    ImportPicks(ImportPicksArgs),
    /// Write per-micrograph STAR training annotations from a pick table
    ExportAnnotations(ExportAnnotationsArgs),
    /// Point a converted STAR file at `.mrcs` particle stacks
    RelionStack(RelionStackArgs),
    /// Plan pretrained crYOLO picking
    PlanCryoloPick(PlanCryoloPickArgs),
    /// Plan crYOLO training followed by picking
    PlanCryoloTrain(PlanCryoloTrainArgs),
    /// Plan cryoDRGN training and analysis
    PlanCryodrgn(PlanCryodrgnArgs),
    /// Plan cryoSPARC to RELION particle conversion
    PlanCs2star(PlanCs2StarArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    match &cli.commands {
        Commands::ImportPicks(args) => {
            run_import_picks(args)?;
        }
        Commands::ExportAnnotations(args) => {
            run_export_annotations(args)?;
        }
        Commands::RelionStack(args) => {
            run_relion_stack(args)?;
        }
        Commands::PlanCryoloPick(args) => {
            run_plan_cryolo_pick(args)?;
        }
        Commands::PlanCryoloTrain(args) => {
            run_plan_cryolo_train(args)?;
        }
        Commands::PlanCryodrgn(args) => {
            run_plan_cryodrgn(args)?;
        }
        Commands::PlanCs2star(args) => {
            run_plan_cs2star(args)?;
        }
    }

    Ok(())
}
