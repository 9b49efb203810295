use std::{error::Error, fs, path::Path};

use clap::Parser;
use nalgebra::DMatrix;
use patch_core::{GridExtent, GridLayers, Real};
use patch_pipeline::{GriddedSurface, LinePair, PatchTest, PatchTestConfig, PatchTestReport};
use serde::{Deserialize, Serialize};

/// Patch-test solve from an already gridded overlap surface.
#[derive(Debug, Parser)]
#[command(author, version, about = "Multibeam patch-test calibration")]
struct Args {
    /// Path to JSON file containing a GridSnapshot.
    #[arg(long)]
    input: String,

    /// Optional path to JSON PatchTestConfig. Defaults are used if omitted.
    #[arg(long)]
    config: Option<String>,

    /// Print the human-readable listing instead of JSON.
    #[arg(long)]
    text: bool,
}

/// One grid layer; `values` are column-major with `null` for empty cells.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LayerSnapshot {
    name: String,
    values: Vec<Option<Real>>,
}

/// Rotated, gridded surface of a line pair as produced by an external gridder.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct GridSnapshot {
    lines: [String; 2],
    extent: GridExtent,
    layers: Vec<LayerSnapshot>,
}

impl GridSnapshot {
    fn into_surface(self) -> Result<GriddedSurface, Box<dyn Error>> {
        let [first, second] = self.lines;
        let lines = LinePair::new(first, second)?;
        let (nx, ny) = self.extent.shape();
        let cells = nx
            .checked_mul(ny)
            .ok_or_else(|| format!("grid extent of {}x{} cells is too large", nx, ny))?;
        let mut layers = GridLayers::new(self.extent);
        for layer in self.layers {
            if layer.values.len() != cells {
                return Err(format!(
                    "layer {:?} has {} values, grid has {}x{} cells",
                    layer.name,
                    layer.values.len(),
                    nx,
                    ny
                )
                .into());
            }
            let values = DMatrix::from_iterator(
                nx,
                ny,
                layer.values.iter().map(|v| v.unwrap_or(Real::NAN)),
            );
            layers.insert(layer.name, values);
        }
        Ok(GriddedSurface { lines, layers })
    }
}

fn load_json_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, Box<dyn Error>> {
    let data = fs::read_to_string(path)?;
    let value = serde_json::from_str(&data)?;
    Ok(value)
}

fn run_patch_test_from_files(
    input_path: &str,
    config_path: Option<&str>,
) -> Result<PatchTestReport, Box<dyn Error>> {
    let snapshot: GridSnapshot = load_json_file(Path::new(input_path))?;
    let config = if let Some(cfg_path) = config_path {
        load_json_file::<PatchTestConfig>(Path::new(cfg_path))?
    } else {
        PatchTestConfig::default()
    };

    let surface = snapshot.into_surface()?;
    log::info!(
        "solving patch test for lines {} on a {:?} grid",
        surface.lines,
        surface.layers.extent.shape()
    );
    let mut patch_test = PatchTest::new(config)?;
    let status = patch_test.run_from_surface(surface)?;
    log::info!("run finished: {:?}", status);
    Ok(patch_test.report())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(err) = try_main() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let report = run_patch_test_from_files(&args.input, args.config.as_deref())?;
    if args.text {
        print!("{}", report);
    } else {
        println!("{}", report.to_json()?);
    }
    Ok(())
}
