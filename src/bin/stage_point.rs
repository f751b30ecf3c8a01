use clap::{Parser, ValueEnum};
use rocket_stage_optimizer::config::{RunSettings, load_run_settings};
use rocket_stage_optimizer::export::candidates::{self, Query};
use rocket_stage_optimizer::optimize::{
    FlightCondition, FuelFamily, Objective, StageCandidate, StageKind,
};
use rocket_stage_optimizer::run::Session;
use std::path::PathBuf;

/// Size the best stage for a single payload and Δv.
#[derive(Parser, Debug)]
#[command(author, version, about = "Single-point stage optimizer")]
struct Cli {
    /// Payload mass in tons
    #[arg(long)]
    payload: f64,

    /// Required Δv in m/s
    #[arg(long)]
    delta_v: f64,

    /// Stage layout
    #[arg(long, value_enum, default_value_t = Layout::Linear)]
    kind: Layout,

    /// Run settings TOML (defaults to built-in settings and configs/ catalogs)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Largest engine count to try
    #[arg(long)]
    max_engines: Option<u32>,

    /// Flight condition: asl or vac
    #[arg(long)]
    condition: Option<FlightCondition>,

    /// Minimum thrust-to-weight ratio
    #[arg(long)]
    twr: Option<f64>,

    /// Objective: mass (single best) or cost (cost/mass trade-off front)
    #[arg(long)]
    objective: Option<Objective>,

    /// Restrict to one fuel family (LF, LFOX, Xenon, SolidFuel)
    #[arg(long)]
    family: Option<FuelFamily>,

    /// Write the candidates as JSON
    #[arg(long)]
    json: Option<PathBuf>,
}

#[derive(Copy, Clone, ValueEnum, Debug)]
enum Layout {
    Payload,
    Linear,
    Asparagus,
}

impl From<Layout> for StageKind {
    fn from(layout: Layout) -> Self {
        match layout {
            Layout::Payload => StageKind::Payload,
            Layout::Linear => StageKind::Linear,
            Layout::Asparagus => StageKind::Asparagus,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut settings = match &cli.settings {
        Some(path) => load_run_settings(path)?,
        None => RunSettings::default(),
    };
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

    let session = Session::load(settings)?;
    let stages = session.point(cli.kind.into(), cli.payload, cli.delta_v, cli.family)?;

    if stages.is_empty() {
        println!(
            "No feasible stage for {:.3} t payload at {:.1} m/s (TWR >= {}, {})",
            cli.payload,
            cli.delta_v,
            session.settings.requirements.min_twr,
            session.settings.requirements.condition
        );
    } else {
        print_table(&stages);
    }

    if let Some(path) = &cli.json {
        let objective = session.objective.to_string();
        let condition = session.settings.requirements.condition.to_string();
        let query = Query {
            payload_t: cli.payload,
            delta_v_m_s: cli.delta_v,
            objective: &objective,
            condition: &condition,
            min_twr: session.settings.requirements.min_twr,
            max_engine_count: session.settings.requirements.max_engine_count,
        };
        candidates::write_json(path, &query, &stages)?;
        println!("Candidates written to {}", path.display());
    }
    Ok(())
}

fn print_table(stages: &[StageCandidate]) {
    println!(
        "| {:^12} | {:^12} | {:^20} | {:^10} | {:^10} | {:^14} |",
        "Mass (t)", "Cost", "Engine", "Delta-V", "Type", "Propellant (t)"
    );
    for stage in stages {
        let kind = match stage.kind {
            StageKind::Payload => "Payload",
            StageKind::Linear => "Linear",
            StageKind::Asparagus => "Asparagus",
        };
        println!(
            "| {:^12.3} | {:^12.1} | {:^20} | {:^10.1} | {:^10} | {:^14.3} |",
            stage.mass_t,
            stage.cost,
            stage.label(),
            stage.delta_v_m_s,
            kind,
            stage.propellant_t
        );
        if stage.extrapolated {
            eprintln!(
                "warning: {} needs more propellant than the largest tank holds; tank cost is extrapolated",
                stage.label()
            );
        }
    }
}
