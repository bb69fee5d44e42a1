//! Command-line driver for the weft translator.

use argh::FromArgs;
use std::io::Read;
use std::path::PathBuf;
use std::time::Instant;
use weft_frontend::WeftParser;
use weft_ir::{graph_to_ir, Printer};
use weft_utils::{Error, OutputFile, WeftResult};

#[derive(FromArgs)]
/// Translate a weft package into its target module form.
struct Opts {
    /// input file, read from stdin when omitted
    #[argh(positional)]
    file: Option<PathBuf>,

    /// output file, default is stdout
    #[argh(
        option,
        short = 'o',
        long = "output",
        default = "OutputFile::Stdout"
    )]
    output: OutputFile,

    /// enable debug logging
    #[argh(switch, long = "debug-logging")]
    debug_logging: bool,
}

fn main() -> WeftResult<()> {
    let opts: Opts = argh::from_env();

    env_logger::Builder::new()
        .format_timestamp(None)
        .filter_level(if opts.debug_logging {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Warn
        })
        .target(env_logger::Target::Stderr)
        .init();

    let start = Instant::now();
    let package = match &opts.file {
        Some(path) => WeftParser::parse_file(path)?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            WeftParser::parse_package(&buf)?
        }
    };
    log::info!(
        "parsed package `{}' in {}ms",
        package.name,
        start.elapsed().as_millis()
    );

    let start = Instant::now();
    let module = graph_to_ir(&package)?;
    log::info!(
        "translated package `{}' in {}ms",
        package.name,
        start.elapsed().as_millis()
    );

    let mut out = opts.output.get_write().map_err(Error::write_error)?;
    Printer::write_module(&module, &mut out)
        .map_err(Error::write_error)?;
    Ok(())
}
