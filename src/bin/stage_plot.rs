use clap::Parser;
use csv::ReaderBuilder;
use plotters::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Render a stage map CSV as a best-engine region plot"
)]
struct Cli {
    #[arg(long)]
    input: String,
    #[arg(long, default_value = "artifacts/stage_map.png")]
    output: PathBuf,
    #[arg(long, default_value_t = 1200)]
    width: u32,
    #[arg(long, default_value_t = 900)]
    height: u32,
    /// Plot title
    #[arg(long, default_value = "Optimal stage configuration")]
    title: String,
}

#[derive(Debug, Clone)]
struct Cell {
    dv_m_s: f64,
    payload_t: f64,
    label: String,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let (cells, mut dv_vals, mut pl_vals) = read_cells(&cli.input)?;
    if cells.is_empty() {
        return Err(anyhow::anyhow!("No feasible cells in the provided CSV"));
    }

    dv_vals.sort_by(f64::total_cmp);
    dv_vals.dedup();
    pl_vals.sort_by(f64::total_cmp);
    pl_vals.dedup();
    if pl_vals.iter().any(|p| *p <= 0.0) {
        return Err(anyhow::anyhow!("Payload values must be positive for a log axis"));
    }
    let pl_coords: Vec<f64> = pl_vals.iter().map(|p| p.log10()).collect();

    // Stable colors: one per configuration, in first-seen order.
    let mut labels: BTreeMap<String, usize> = BTreeMap::new();
    for cell in &cells {
        let next = labels.len();
        labels.entry(cell.label.clone()).or_insert(next);
    }

    if let Some(parent) = cli.output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let output_str = cli
        .output
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Output path contains invalid UTF-8"))?;
    let root = BitMapBackend::new(output_str, (cli.width, cli.height)).into_drawing_area();
    root.fill(&WHITE)?;

    let font_family = select_font_family();
    let caption_font = FontDesc::new(font_family, 24.0, FontStyle::Bold);
    let label_font = FontDesc::new(font_family, 18.0, FontStyle::Normal);

    let x_edges = cell_edges(&pl_coords);
    let y_edges = cell_edges(&dv_vals);
    let (x0, x1) = (x_edges[0], x_edges[x_edges.len() - 1]);
    let (y0, y1) = (y_edges[0], y_edges[y_edges.len() - 1]);

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .caption(cli.title.clone(), caption_font)
        .x_label_area_size(60)
        .y_label_area_size(90)
        .build_cartesian_2d(x0..x1, y0..y1)?;

    chart
        .configure_mesh()
        .x_desc("Payload (t)")
        .y_desc("Δv (m/s)")
        .label_style(label_font.clone())
        .x_labels(8)
        .y_labels(8)
        .x_label_formatter(&|x| format!("{:.3}", 10f64.powf(*x)))
        .y_label_formatter(&|y| format!("{y:.0}"))
        .draw()?;

    for (label, &color_idx) in &labels {
        let color = Palette99::pick(color_idx).to_rgba();
        let rects: Vec<_> = cells
            .iter()
            .filter(|cell| &cell.label == label)
            .filter_map(|cell| {
                let i = dv_vals.binary_search_by(|v| v.total_cmp(&cell.dv_m_s)).ok()?;
                let j = pl_vals.binary_search_by(|v| v.total_cmp(&cell.payload_t)).ok()?;
                Some(Rectangle::new(
                    [(x_edges[j], y_edges[i]), (x_edges[j + 1], y_edges[i + 1])],
                    color.filled(),
                ))
            })
            .collect();
        chart
            .draw_series(rects)?
            .label(label.clone())
            .legend(move |(x, y)| Rectangle::new([(x, y - 6), (x + 12, y + 6)], color.filled()));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .label_font(label_font)
        .draw()?;

    root.present()?;
    println!(
        "Rendered {} cells with {} configurations to {}",
        cells.len(),
        labels.len(),
        cli.output.display()
    );
    Ok(())
}

fn select_font_family() -> FontFamily<'static> {
    if cfg!(target_os = "macos") {
        FontFamily::Name("Helvetica")
    } else if cfg!(target_os = "windows") {
        FontFamily::Name("Arial")
    } else {
        FontFamily::Name("DejaVu Sans")
    }
}

fn read_cells(path: &str) -> anyhow::Result<(Vec<Cell>, Vec<f64>, Vec<f64>)> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_path(path)?;
    let headers = rdr.headers()?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or_else(|| anyhow::anyhow!("CSV missing '{}' column", name))
    };
    let dv_idx = column("dv_m_s")?;
    let pl_idx = column("payload_t")?;
    let engine_idx = column("engine")?;
    let count_idx = column("count")?;
    let feasible_idx = column("feasible")?;

    let mut cells = Vec::new();
    let mut dv_vals = Vec::new();
    let mut pl_vals = Vec::new();
    for rec in rdr.records() {
        let r = rec?;
        let dv_m_s: f64 = r.get(dv_idx).unwrap_or("").parse().unwrap_or(f64::NAN);
        let payload_t: f64 = r.get(pl_idx).unwrap_or("").parse().unwrap_or(f64::NAN);
        if !(dv_m_s.is_finite() && payload_t.is_finite()) {
            continue;
        }
        dv_vals.push(dv_m_s);
        pl_vals.push(payload_t);
        let feasible = r
            .get(feasible_idx)
            .unwrap_or("false")
            .eq_ignore_ascii_case("true");
        if feasible {
            let label = format!(
                "{} x {}",
                r.get(count_idx).unwrap_or("?"),
                r.get(engine_idx).unwrap_or("?")
            );
            cells.push(Cell {
                dv_m_s,
                payload_t,
                label,
            });
        }
    }
    Ok((cells, dv_vals, pl_vals))
}

/// Cell edges around sorted `centers`: midpoints inside, mirrored half-steps at the ends.
fn cell_edges(centers: &[f64]) -> Vec<f64> {
    let n = centers.len();
    match centers {
        [] => Vec::new(),
        [only] => vec![only - 0.5, only + 0.5],
        _ => {
            let mut edges = Vec::with_capacity(n + 1);
            edges.push(centers[0] - 0.5 * (centers[1] - centers[0]));
            edges.extend(centers.windows(2).map(|w| 0.5 * (w[0] + w[1])));
            edges.push(centers[n - 1] + 0.5 * (centers[n - 1] - centers[n - 2]));
            edges
        }
    }
}
