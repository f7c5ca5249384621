//! Build a bin from an outline file and write it as STEP.
//!
//! ```text
//! gridbin <outlines.json> [--total-height H] [--base-height B] [--out bin.step]
//! ```

use std::path::PathBuf;

use anyhow::{bail, Context};
use gridbin_bridge::logging::init_logging;
use gridbin_bridge::{BuildRequest, EngineState};
use gridbin_engine::PipelineConfig;
use gridbin_kernel::TruckKernel;
use gridbin_types::Outline;
use tracing::info;

const USAGE: &str =
    "usage: gridbin <outlines.json> [--total-height H] [--base-height B] [--out bin.step]";

struct Args {
    input: PathBuf,
    output: PathBuf,
    total_height: Option<f64>,
    base_height: Option<f64>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> anyhow::Result<Args> {
    let mut input = None;
    let mut output = None;
    let mut total_height = None;
    let mut base_height = None;

    while let Some(arg) = args.next() {
        let mut value = |name: &str| {
            args.next()
                .with_context(|| format!("{name} needs a value\n{USAGE}"))
        };
        match arg.as_str() {
            "--total-height" => {
                total_height = Some(value("--total-height")?.parse::<f64>().context("--total-height")?)
            }
            "--base-height" => {
                base_height = Some(value("--base-height")?.parse::<f64>().context("--base-height")?)
            }
            "--out" => output = Some(PathBuf::from(value("--out")?)),
            "-h" | "--help" => bail!("{USAGE}"),
            flag if flag.starts_with("--") => bail!("unknown option {flag}\n{USAGE}"),
            _ if input.is_none() => input = Some(PathBuf::from(&arg)),
            _ => bail!("unexpected argument {arg}\n{USAGE}"),
        }
    }

    let input: PathBuf = input.with_context(|| USAGE.to_string())?;
    let output = output.unwrap_or_else(|| input.with_extension("step"));
    Ok(Args {
        input,
        output,
        total_height,
        base_height,
    })
}

fn main() -> anyhow::Result<()> {
    init_logging()?;
    let args = parse_args(std::env::args().skip(1))?;

    let json = std::fs::read_to_string(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    let outlines: Vec<Outline> = serde_json::from_str(&json)
        .with_context(|| format!("parsing outlines in {}", args.input.display()))?;

    let mut request = BuildRequest::new(outlines);
    request.total_height = args.total_height;
    request.base_height = args.base_height;

    let mut state = EngineState::new(PipelineConfig::default(), || Ok(TruckKernel::new()));
    state.initialize()?;
    let step = state.export_step(&request)?;

    std::fs::write(&args.output, &step)
        .with_context(|| format!("writing {}", args.output.display()))?;
    info!(
        path = %args.output.display(),
        bytes = step.len(),
        "STEP written"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> impl Iterator<Item = String> {
        list.iter().map(|s| s.to_string()).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn test_output_defaults_next_to_input() {
        let parsed = parse_args(args(&["tools/caliper.json", "--total-height", "30"])).unwrap();
        assert_eq!(parsed.output, PathBuf::from("tools/caliper.step"));
        assert_eq!(parsed.total_height, Some(30.0));
        assert_eq!(parsed.base_height, None);
    }

    #[test]
    fn test_bad_arguments_rejected() {
        assert!(parse_args(args(&[])).is_err());
        assert!(parse_args(args(&["a.json", "--base-height"])).is_err());
        assert!(parse_args(args(&["a.json", "--depth", "3"])).is_err());
        assert!(parse_args(args(&["a.json", "b.json"])).is_err());
    }
}
