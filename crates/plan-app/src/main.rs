//! 房屋平面命令行工具
//!
//! 加载文档（文件或内置示例）、归一化、派生墙体，
//! 打印格式、楼层、墙体、屋顶几何与校验结果。校验失败时退出码为 2。

mod logging;
mod report;

use anyhow::{Context, Result};
use clap::Parser;
use plan_core::normalize::detect_format;
use plan_core::session::PlanSession;
use plan_file::native::{load_value, save_path};
use plan_file::samples::{SampleCatalog, DEFAULT_SAMPLE};
use report::PlanReport;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "plan-app")]
#[command(about = "Normalize, derive walls, solve roofs and validate a house plan document")]
struct Args {
    /// Plan document (any supported version); omit to use --sample
    file: Option<PathBuf>,

    /// Built-in sample key (e.g. "v0.4-L"), used when FILE is omitted
    #[arg(long, short = 's')]
    sample: Option<String>,

    /// Directory that holds the sample documents
    #[arg(long, default_value = "samples")]
    samples_dir: PathBuf,

    /// List sample keys and exit
    #[arg(long)]
    list_samples: bool,

    /// Level to show walls for: "<level>" or "<block>:<level>"
    #[arg(long, short = 'l')]
    level: Option<String>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Save the canonical document (with derived walls) to this path
    #[arg(long, short = 'w')]
    write: Option<PathBuf>,
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    logging::init(args.json);

    if args.list_samples {
        for key in SampleCatalog::keys() {
            let file = SampleCatalog::file_name(key).unwrap_or_default();
            let marker = if key == DEFAULT_SAMPLE { " (default)" } else { "" };
            println!("{key:<16} {file}{marker}");
        }
        return Ok(ExitCode::SUCCESS);
    }

    let path = match &args.file {
        Some(path) => path.clone(),
        None => SampleCatalog::new(&args.samples_dir)
            .path(args.sample.as_deref().unwrap_or(DEFAULT_SAMPLE)),
    };
    let raw = load_value(&path).with_context(|| format!("Failed to load {}", path.display()))?;
    let format = detect_format(&raw);
    let mut session = PlanSession::load(&raw);

    if let Some(key) = &args.level {
        let (block_id, level_id) = match key.split_once(':') {
            Some((block, level)) => (Some(block), level),
            None => (None, key.as_str()),
        };
        session
            .select_level(block_id, level_id)
            .with_context(|| format!("Unknown level \"{key}\""))?;
    }

    let selected = session.active_level().map(|l| l.key);
    let report = PlanReport::build(format, session.plan(), selected.as_deref());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{report}");
    }

    if let Some(out) = &args.write {
        save_path(session.plan(), out)
            .with_context(|| format!("Failed to write {}", out.display()))?;
    }

    if report.is_valid() {
        Ok(ExitCode::SUCCESS)
    } else {
        tracing::warn!("{} validation error(s) in {}", report.errors.len(), path.display());
        Ok(ExitCode::from(2))
    }
}
