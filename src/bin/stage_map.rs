use clap::Parser;
use rocket_stage_optimizer::config::{RunSettings, load_run_settings};
use rocket_stage_optimizer::export::{summary, writer_for_path};
use rocket_stage_optimizer::optimize::{FlightCondition, FuelFamily, Objective};
use rocket_stage_optimizer::run::{Session, write_map_csv};
use std::io::Write;
use std::path::PathBuf;

/// Sweep a (Δv × payload) grid and record the best stage configuration per cell.
#[derive(Parser, Debug)]
#[command(author, version, about = "Stage map CSV generator")]
struct Cli {
    /// Run settings TOML (defaults to built-in settings and configs/ catalogs)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Engine catalog (YAML file or directory of TOML files)
    #[arg(long)]
    engines: Option<PathBuf>,

    /// Tank catalog CSV
    #[arg(long)]
    tanks: Option<PathBuf>,

    /// Propellant constants YAML/TOML
    #[arg(long)]
    fuels: Option<PathBuf>,

    /// Payload range in tons, logarithmically spaced
    #[arg(long, num_args = 2, value_names = ["MIN", "MAX"])]
    payload: Option<Vec<f64>>,

    /// Δv range in m/s, linearly spaced
    #[arg(long, num_args = 2, value_names = ["MIN", "MAX"])]
    delta_v: Option<Vec<f64>>,

    /// Samples per axis
    #[arg(long)]
    span: Option<usize>,

    /// Largest engine count to try
    #[arg(long)]
    max_engines: Option<u32>,

    /// Flight condition: asl or vac
    #[arg(long)]
    condition: Option<FlightCondition>,

    /// Minimum thrust-to-weight ratio
    #[arg(long)]
    twr: Option<f64>,

    /// Objective to minimize: mass or cost
    #[arg(long)]
    objective: Option<Objective>,

    /// Restrict to one fuel family (LF, LFOX, Xenon, SolidFuel)
    #[arg(long)]
    family: Option<FuelFamily>,

    /// Output CSV file (use '-' for stdout)
    #[arg(long, default_value = "artifacts/stage_map.csv")]
    output: PathBuf,

    /// Also write a JSON summary next to the CSV
    #[arg(long, default_value_t = false)]
    summary: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut settings = match &cli.settings {
        Some(path) => load_run_settings(path)?,
        None => RunSettings::default(),
    };
    apply_overrides(&mut settings, &cli);

    let session = Session::load(settings)?;
    for family in session.context.skipped_families() {
        eprintln!("warning: no tank curve for {family} engines; skipping them");
    }

    let map = session.map(cli.family)?;
    let mut writer = writer_for_path(&cli.output)?;
    write_map_csv(&map, &mut writer)?;
    writer.flush()?;

    let stats = session.summarize(&map);
    if stats.extrapolated_cells > 0 {
        eprintln!(
            "warning: {} selected cells need more propellant than the largest tank holds; \
             their tank cost is extrapolated",
            stats.extrapolated_cells
        );
    }
    if cli.output.as_os_str() != "-" {
        println!(
            "Wrote {} cells ({} feasible, {} variants) to {}",
            stats.cells,
            stats.feasible_cells,
            stats.variants.len(),
            cli.output.display()
        );
        if cli.summary {
            let path = summary::write_sidecar(&cli.output, &stats)?;
            println!("Summary written to {}", path.display());
        }
    }
    Ok(())
}

fn apply_overrides(settings: &mut RunSettings, cli: &Cli) {
    if let Some(path) = &cli.engines {
        settings.catalog.engines = path.clone();
    }
    if let Some(path) = &cli.tanks {
        settings.catalog.tanks = path.clone();
    }
    if let Some(path) = &cli.fuels {
        settings.catalog.fuels = Some(path.clone());
    }
    if let Some(&[lo, hi]) = cli.payload.as_deref() {
        settings.grid.payload_t = [lo, hi];
    }
    if let Some(&[lo, hi]) = cli.delta_v.as_deref() {
        settings.grid.delta_v_m_s = [lo, hi];
    }
    if let Some(span) = cli.span {
        settings.grid.span = span;
    }
    if let Some(count) = cli.max_engines {
        settings.requirements.max_engine_count = count;
    }
    if let Some(condition) = cli.condition {
        settings.requirements.condition = condition;
    }
    if let Some(twr) = cli.twr {
        settings.requirements.min_twr = twr;
    }
    if let Some(objective) = cli.objective {
        settings.objective = objective;
    }
}
