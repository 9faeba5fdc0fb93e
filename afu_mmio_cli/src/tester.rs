use std::path::{Path, PathBuf};

use afu_mmio_core::{
    config::{MmioConfig, Region},
    mmio::{
        MmioController,
        header::{DeviceFeatureHeader, HeaderField},
    },
    trace::{Trace, TraceRun, run_trace},
};
use clap::Args;
use color_eyre::eyre::{Result, WrapErr, bail};
use serde::Serialize;
use strum::IntoEnumIterator;
use tracing::{info, warn};

#[derive(Args, Debug)]
#[command(about)]
/// Create scaffolding folder for a new set of traces
pub struct NewArgs {
    /// Name of the new folder containing the scaffolding
    name: PathBuf,
}

#[derive(Args, Debug)]
#[command(about)]
/// Run a single trace and print every response
pub struct RunArgs {
    /// Controller configuration (reference map if omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Trace file to simulate
    trace: PathBuf,
}

///
/// Runs every trace in a folder against a fresh controller, writing the
/// responses of failing traces next to the folder
///
#[derive(Args, Debug)]
#[command(about)]
pub struct TestArgs {
    /// Controller configuration (reference map if omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Folder containing the traces to be run
    #[arg(long, default_value = "traces")]
    traces: PathBuf,
}

#[derive(Args, Debug)]
#[command(about)]
/// Validate a configuration and print its address map
pub struct MapArgs {
    /// Controller configuration (reference map if omitted)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Serialize, Debug, Default)]
struct TestSummary {
    passed: Vec<String>,
    failed: Vec<String>,
}

fn load_config(path: Option<&Path>) -> Result<MmioConfig> {
    let Some(path) = path else {
        return Ok(MmioConfig::default());
    };
    let file = std::fs::File::open(path)
        .wrap_err_with(|| format!("Failed to open config {}", path.display()))?;
    serde_json::from_reader(file)
        .wrap_err_with(|| format!("Failed to parse config {}", path.display()))
}

fn load_trace(path: &Path) -> Result<Trace> {
    let file = std::fs::File::open(path)
        .wrap_err_with(|| format!("Failed to open trace {}", path.display()))?;
    serde_json::from_reader(file)
        .wrap_err_with(|| format!("Failed to parse trace {}", path.display()))
}

fn simulate(config: &MmioConfig, trace: &Trace) -> Result<TraceRun> {
    let mut controller = MmioController::new(config).wrap_err("Invalid controller configuration")?;
    let run = run_trace(&mut controller, trace);
    info!(
        ticks = controller.tick(),
        reads = controller.stats().reads,
        writes = controller.stats().writes,
        dropped_writes = controller.stats().dropped_writes,
        resets = controller.stats().resets,
        "trace finished"
    );
    Ok(run)
}

pub fn new_project(args: NewArgs) -> Result<()> {
    // create the new project folder relative to the current directory
    let project_path = args.name.as_path();
    if project_path.exists() {
        bail!("Folder {} already exists", project_path.display());
    }
    let traces_path = project_path.join("traces");
    std::fs::create_dir_all(&traces_path).wrap_err("Failed to create traces directory")?;

    let config = serde_json::to_string_pretty(&MmioConfig::default())?;
    std::fs::write(project_path.join("config.json"), config)
        .wrap_err("Failed to create config file")?;
    std::fs::write(
        traces_path.join("latency_alignment.json"),
        include_str!("example_trace.json"),
    )
    .wrap_err("Failed to create example trace")?;

    println!("Created {}", project_path.display());
    Ok(())
}

pub fn run_trace_file(args: RunArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let trace = load_trace(&args.trace)?;
    let run = simulate(&config, &trace)?;

    for response in &run.responses {
        println!(
            "tick {:>6}  tid {:#06x}  data {}",
            response.tick, response.transaction_id, response.data
        );
    }
    for mismatch in &run.mismatches {
        println!("MISMATCH {mismatch}");
    }

    if !run.passed() {
        bail!("{} expectation(s) failed", run.mismatches.len());
    }
    Ok(())
}

pub fn run_tests(args: TestArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;

    // every .json file in the traces folder is a test
    let mut trace_files = std::fs::read_dir(&args.traces)
        .wrap_err_with(|| format!("Failed to read traces directory {}", args.traces.display()))?
        .filter_map(|entry| {
            let path = entry.ok()?.path();
            let is_json = path.extension().is_some_and(|ext| ext == "json");
            (path.is_file() && is_json).then_some(path)
        })
        .collect::<Vec<_>>();
    trace_files.sort();

    // check that output dir exists (or create it) and is valid
    let output_path = args
        .traces
        .parent()
        .unwrap_or(Path::new("."))
        .join("test_output");
    std::fs::create_dir_all(&output_path).wrap_err("Failed to create test output directory")?;

    let mut summary = TestSummary::default();
    for path in &trace_files {
        let Some(name) = path.file_stem().and_then(|s| s.to_str()).map(String::from) else {
            continue;
        };
        let result_path = output_path.join(format!("{name}_responses.json"));

        let trace = match load_trace(path) {
            Ok(trace) => trace,
            Err(err) => {
                warn!("Skipping {name}: {err:#}");
                summary.failed.push(name);
                continue;
            }
        };
        let run = simulate(&config, &trace)?;

        if run.passed() {
            println!("PASS {name}");
            let _ = std::fs::remove_file(&result_path);
            summary.passed.push(name);
        } else {
            println!("FAIL {name}");
            for mismatch in &run.mismatches {
                println!("    {mismatch}");
            }
            let json_string = serde_json::to_string_pretty(&run)
                .wrap_err("Couldn't convert trace responses to string")?;
            std::fs::write(&result_path, json_string)
                .wrap_err("Failed to create test output file")?;
            summary.failed.push(name);
        }
    }

    std::fs::write(
        output_path.join("summary.json"),
        serde_json::to_string_pretty(&summary)?,
    )
    .wrap_err("Failed to write test summary")?;
    println!(
        "Passed {}/{}; responses of failing traces are in {}",
        summary.passed.len(),
        trace_files.len(),
        output_path.display()
    );

    if !summary.failed.is_empty() {
        bail!("Failed {:?}", summary.failed);
    }
    Ok(())
}

pub fn print_map(args: MapArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let map = config.validate().wrap_err("Invalid controller configuration")?;

    println!("{:<12} {:>6}  {:>6}  {:>6}", "region", "start", "end", "words");
    for region in Region::iter() {
        let range = map.region(region);
        println!(
            "{:<12} {:#06x}  {:#06x}  {:>6}",
            region.to_string(),
            range.base,
            range.upper(),
            range.words
        );
    }

    println!();
    let rom = map.header_rom();
    for field in HeaderField::iter() {
        println!("{:<10} {:#018x}", field.to_string(), rom.field(field));
    }
    let dfh = DeviceFeatureHeader::from_raw(rom.field(HeaderField::Dfh));
    println!(
        "AFU id {} (DFH eol={} next={:#x} rev={} id={:#x})",
        hex::encode(config.afu_id),
        dfh.end_of_list,
        dfh.next_offset,
        dfh.revision,
        dfh.feature_id
    );
    println!(
        "read latency {} ticks (block native latency {})",
        map.read_latency(),
        map.block_native_latency()
    );
    Ok(())
}
