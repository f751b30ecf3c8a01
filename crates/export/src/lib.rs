//! Export helpers for CSV and JSON artifacts.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Create a writer for the target path, handling stdout (`-`) by convention.
pub fn writer_for_path(path: &Path) -> io::Result<Box<dyn Write>> {
    if path == Path::new("-") {
        return Ok(Box::new(BufWriter::new(io::stdout())));
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = File::create(path)?;
    Ok(Box::new(BufWriter::new(file)))
}

pub mod grid {
    use std::io::{self, Write};

    const HEADER: &str = "dv_m_s,payload_t,variant,engine,count,mass_t,cost,feasible";

    /// Write the stage map CSV header.
    pub fn write_header(writer: &mut dyn Write) -> io::Result<()> {
        writeln!(writer, "{}", HEADER)
    }

    /// One grid cell of a stage map. Infeasible cells carry variant `-1` and infinite values.
    #[derive(Debug, Clone)]
    pub struct Record<'a> {
        pub dv_m_s: f64,
        pub payload_t: f64,
        pub variant: i64,
        pub engine: &'a str,
        pub count: u32,
        pub mass_t: f64,
        pub cost: f64,
        pub feasible: bool,
    }

    impl<'a> Record<'a> {
        pub fn infeasible(dv_m_s: f64, payload_t: f64) -> Self {
            Self {
                dv_m_s,
                payload_t,
                variant: -1,
                engine: "",
                count: 0,
                mass_t: f64::INFINITY,
                cost: f64::INFINITY,
                feasible: false,
            }
        }

        /// Serialize the record to CSV, matching the header ordering.
        pub fn write_to(&self, writer: &mut dyn Write) -> io::Result<()> {
            writeln!(
                writer,
                "{:.3},{:.6},{},{},{},{:.6},{:.3},{}",
                self.dv_m_s,
                self.payload_t,
                self.variant,
                self.engine,
                self.count,
                self.mass_t,
                self.cost,
                if self.feasible { "true" } else { "false" },
            )
        }
    }
}

pub mod candidates {
    use serde::Serialize;
    use serde_json::to_writer_pretty;
    use std::fs::{self, File};
    use std::io;
    use std::path::Path;

    /// Inputs that produced a candidate list.
    #[derive(Debug, Clone, Serialize)]
    pub struct Query<'a> {
        pub payload_t: f64,
        pub delta_v_m_s: f64,
        pub objective: &'a str,
        pub condition: &'a str,
        pub min_twr: f64,
        pub max_engine_count: u32,
    }

    #[derive(Serialize)]
    struct CandidateReport<'a, T: Serialize> {
        query: &'a Query<'a>,
        feasible: bool,
        candidates: &'a [T],
    }

    /// Write the candidates of a point optimization as pretty-printed JSON.
    pub fn write_json<T: Serialize>(
        output: &Path,
        query: &Query<'_>,
        candidates: &[T],
    ) -> io::Result<()> {
        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let report = CandidateReport {
            query,
            feasible: !candidates.is_empty(),
            candidates,
        };
        to_writer_pretty(File::create(output)?, &report)?;
        Ok(())
    }
}

pub mod summary {
    use serde::Serialize;
    use serde_json::to_writer_pretty;
    use std::fs::File;
    use std::io;
    use std::path::Path;

    /// Aggregate statistics written next to a stage map CSV.
    #[derive(Debug, Clone, Serialize)]
    pub struct MapSummary {
        pub objective: String,
        pub condition: String,
        pub min_twr: f64,
        pub max_engine_count: u32,
        pub cells: usize,
        pub feasible_cells: usize,
        pub extrapolated_cells: usize,
        pub variants: Vec<String>,
        pub skipped_families: Vec<String>,
    }

    /// Write `<stem>_summary.json` beside `output`.
    pub fn write_sidecar(output: &Path, summary: &MapSummary) -> io::Result<std::path::PathBuf> {
        let parent = output.parent().unwrap_or_else(|| Path::new("."));
        let stem = output
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("stage_map");
        let path = parent.join(format!("{}_summary.json", stem));
        to_writer_pretty(File::create(&path)?, summary)?;
        Ok(path)
    }
}
