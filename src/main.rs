#[cfg(target_env = "musl")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::io::prelude::*;
use std::path::{Path, PathBuf};

use anyhow::Result;
use env_logger::Builder;
use epoc_image::prelude::*;
use log::{Level, LevelFilter};
use owo_colors::OwoColorize;

mod identify;
mod menu;
use menu::Modules;

fn color_level(level: Level) -> String {
    match level {
        Level::Error => level.red().to_string(),
        Level::Warn => level.yellow().to_string(),
        Level::Info => level.green().to_string(),
        Level::Debug => level.blue().to_string(),
        Level::Trace => level.purple().to_string(),
    }
}

const fn level_filter(verbose: usize) -> LevelFilter {
    match verbose {
        1 => LevelFilter::Error,
        2 => LevelFilter::Warn,
        3 => LevelFilter::Info,
        4 => LevelFilter::Debug,
        5 => LevelFilter::Trace,
        // default to off
        _ => LevelFilter::Off,
    }
}

fn main() -> Result<()> {
    let args: menu::Symbex = argp::parse_args_or_exit(argp::DEFAULT);

    if args.verbose != 0 {
        Builder::new()
            .format(|buf, record| {
                writeln!(
                    buf,
                    "[{}] {} {}",
                    epoc_core::time::current_time(),
                    color_level(record.level()),
                    record.args()
                )
            })
            .filter(None, level_filter(args.verbose))
            .init();
    }

    match args.nested {
        Modules::Identify(params) => identify::identify_file(&params.input)?,
        Modules::E32(params) => run_e32(&params)?,
        Modules::Sis(params) => run_sis(&params)?,
    }

    Ok(())
}

fn run_e32(params: &menu::E32Option) -> Result<()> {
    log::info!("Loading E32 image {}", params.input);
    let data = std::fs::read(&params.input)?;
    let image = E32Image::load(&data)?;

    let mut ordinals = OrdinalTable::new();
    if let Some(defs_dir) = &params.defs {
        load_ordinal_table(&mut ordinals, Path::new(defs_dir))?;
    }

    let assembly = image.emit_assembly(&ordinals)?;

    std::fs::create_dir_all(&params.output_dir)?;
    let mut output_path = PathBuf::from(&params.output_dir);
    let stem = Path::new(&params.input).file_stem().map_or("out".into(), |s| s.to_string_lossy().into_owned());
    output_path.push(format!("{stem}.s"));

    log::info!("Writing assembly to {}", output_path.display());
    std::fs::write(output_path, assembly)?;
    Ok(())
}

fn run_sis(params: &menu::SisOption) -> Result<()> {
    log::info!("Extracting SIS package {}", params.input);
    let data = std::fs::read(&params.input)?;
    let extracted = epoc_sis::extract_sis(&data, Path::new(&params.output_dir))?;
    log::info!("Extracted {} file(s)", extracted.len());
    Ok(())
}

/// Loads every `*.def` file in `defs_dir` into `ordinals`, keyed by its own file stem (the DLL's
/// basename, matching how `gen-e32def.py` names its output files).
fn load_ordinal_table(ordinals: &mut OrdinalTable, defs_dir: &Path) -> Result<()> {
    for entry in std::fs::read_dir(defs_dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("def") {
            continue;
        }
        let Some(basename) = path.file_stem().and_then(|s| s.to_str()) else { continue };
        let contents = std::fs::read_to_string(&path)?;
        ordinals.parse_def_file(basename, &contents);
    }
    Ok(())
}
