extern crate thermal_building_model;

use clap::Parser;
use std::ffi::OsStr;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thermal_building_model::catalog::{EnvelopeCatalog, TabulaCatalog};
use thermal_building_model::output::FileOutput;
use thermal_building_model::run_project;
use tracing::info;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Default, Debug)]
#[clap(author, version, about, long_about = None)]
struct BuildingModelArgs {
    input_file: String,
    /// TABULA building typology export (CSV), needed for buildings taken from the catalog
    #[arg(long, short)]
    catalog: Option<PathBuf>,
    /// directory to write results into, defaults to the directory of the input file
    #[arg(long, short)]
    output_dir: Option<PathBuf>,
    #[arg(long, short, default_value_t = false)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = BuildingModelArgs::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let input_file = Path::new(args.input_file.as_str());
    let input_file_stem = input_file
        .file_stem()
        .and_then(OsStr::to_str)
        .unwrap_or("building");
    let output_dir = match args.output_dir {
        Some(output_dir) => output_dir,
        None => input_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default(),
    };
    let output = FileOutput::new(output_dir, format!("{input_file_stem}_{{}}.csv"));

    let catalog = match args.catalog {
        Some(path) => {
            info!("Reading catalog from {}", path.display());
            Some(TabulaCatalog::from_path(path)?)
        }
        None => None,
    };

    let summary = run_project(
        BufReader::new(File::open(input_file)?),
        catalog.as_ref().map(|catalog| catalog as &dyn EnvelopeCatalog),
        &output,
    )?;
    info!(
        "Heating energy {:.1} kWh, cooling energy {:.1} kWh, {} timesteps with unmet demand",
        summary.heating_energy, summary.cooling_energy, summary.unmet_demand_steps
    );

    Ok(())
}
