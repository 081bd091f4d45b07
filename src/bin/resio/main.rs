//! resio CLI - inspect and concatenate record tables.

use resio::prelude::*;
use std::env;
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

/// Options shared by every command.
struct Options {
    config: SessionConfig,
    family: Family,
    json: bool,
    verbosity: u8,
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();

    let mut opts = Options {
        config: SessionConfig::from_env(),
        family: Family::Dataset,
        json: false,
        verbosity: 1,
    };
    let mut filtered_args: Vec<&str> = Vec::new();
    let mut iter = args[1..].iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-v" | "--verbose" => opts.verbosity = 2,
            "-vv" | "--trace" => opts.verbosity = 3,
            "-q" | "--quiet" => opts.verbosity = 0,
            "-t" | "--text" => opts.family = Family::TextSet,
            "-j" | "--json" => opts.json = true,
            "-e" | "--eof" => opts.config.flags.log_file_boundaries = true,
            "-c" | "--config" => {
                let Some(path) = iter.next() else {
                    eprintln!("Error: --config needs a file argument");
                    return ExitCode::FAILURE;
                };
                match SessionConfig::load(path) {
                    Ok(config) => opts.config = config,
                    Err(e) => {
                        eprintln!("Failed to load {}: {}", path, e);
                        return ExitCode::FAILURE;
                    }
                }
            }
            _ => filtered_args.push(arg),
        }
    }
    init_logging(opts.verbosity);

    if filtered_args.is_empty() {
        print_help();
        return ExitCode::SUCCESS;
    }

    let result = match filtered_args[0] {
        // Info command - bulk read and summarize
        "info" | "i" => {
            if filtered_args.len() < 2 {
                eprintln!("Error: missing file argument");
                eprintln!("Usage: resio info <file>");
                return ExitCode::FAILURE;
            }
            cmd_info(&opts, filtered_args[1])
        }

        // Cat command - record-by-record concatenation to stdout
        "cat" | "c" => {
            if filtered_args.len() < 2 {
                eprintln!("Error: missing file argument");
                eprintln!("Usage: resio cat <file>...");
                return ExitCode::FAILURE;
            }
            cmd_cat(&opts, &filtered_args[1..])
        }

        "help" | "h" | "-h" | "--help" => {
            print_help();
            Ok(())
        }

        other => {
            eprintln!("Unknown command: {}", other);
            eprintln!("Run 'resio help' for usage");
            return ExitCode::FAILURE;
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("{}: {}", opts.config.tag, e);
            if opts.config.flags.no_exit {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

/// `RESIO_LOG` wins over the verbosity flags.
fn init_logging(verbosity: u8) {
    let fallback = match verbosity {
        0 => "error",
        1 => "warn",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env("RESIO_LOG").unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_help() {
    let date = option_env!("RESIO_BUILD_DATE").unwrap_or("unknown");
    let time = option_env!("RESIO_BUILD_TIME").unwrap_or("unknown");
    println!("resio {} ({} {}) - record table toolkit", env!("CARGO_PKG_VERSION"), date, time);
    println!();
    println!("USAGE:");
    println!("    resio [OPTIONS] <COMMAND> [ARGS]");
    println!();
    println!("COMMANDS:");
    println!("    i, info   <file>              Read a table and show table/segment/record counts");
    println!("    c, cat    <file>...           Concatenate tables to stdout record by record");
    println!("    h, help                       Show this help");
    println!();
    println!("OPTIONS:");
    println!("    -t, --text           Treat input as text records");
    println!("    -j, --json           Print info as JSON");
    println!("    -e, --eof            Report file boundaries while reading");
    println!("    -c, --config <file>  Load session settings from JSON");
    println!("    -v, --verbose        Show debug output");
    println!("    -vv, --trace         Show trace output (very verbose)");
    println!("    -q, --quiet          Suppress all output but errors");
    println!();
    println!("ENVIRONMENT:");
    println!("    RESIO_LOG            Log filter (overrides -v/-q)");
    println!("    RESIO_TAG, RESIO_PAD, RESIO_COLMAJOR  Session defaults");
}

fn new_session(opts: &Options) -> Session {
    Session::with_config(opts.config.clone(), Some(Box::new(|msg: &str| eprintln!("{}", msg))))
}

fn cmd_info(opts: &Options, path: &str) -> Result<()> {
    let mut session = new_session(opts);
    let geometry = match opts.family {
        Family::TextSet => Geometry::None,
        _ => Geometry::Point,
    };
    let payload = session.read_data(
        opts.family,
        Method::File,
        geometry,
        IoMode::default(),
        None,
        Some(path),
        None,
    )?;
    tracing::debug!(path, family = %opts.family, "table read");

    let (tables, segments, columns, ranges) = match &payload {
        Payload::Dataset(ds) => {
            let ds = ds.read();
            let ranges: Vec<Option<(f64, f64)>> = (0..ds.n_columns).map(|c| ds.column_range(c)).collect();
            (ds.n_tables(), ds.n_segments(), ds.n_columns, ranges)
        }
        Payload::TextSet(ts) => {
            let ts = ts.read();
            (ts.n_tables(), ts.n_segments(), 0, Vec::new())
        }
        _ => (0, 0, 0, Vec::new()),
    };
    let records = payload.n_records();

    if opts.json {
        let ranges: Vec<serde_json::Value> = ranges
            .iter()
            .map(|r| match r {
                Some((lo, hi)) => serde_json::json!([lo, hi]),
                None => serde_json::Value::Null,
            })
            .collect();
        let summary = serde_json::json!({
            "file": path,
            "family": opts.family.name(),
            "tables": tables,
            "segments": segments,
            "records": records,
            "columns": columns,
            "ranges": ranges,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("File:     {}", path);
        println!("Family:   {}", opts.family);
        println!("Tables:   {}", tables);
        println!("Segments: {}", segments);
        println!("Records:  {}", records);
        if columns > 0 {
            println!("Columns:  {}", columns);
            for (c, range) in ranges.iter().enumerate() {
                match range {
                    Some((lo, hi)) => println!("  [{}] {} .. {}", c, lo, hi),
                    None => println!("  [{}] (all NaN)", c),
                }
            }
        }
    }
    session.destroy()?;
    Ok(())
}

fn cmd_cat(opts: &Options, paths: &[&str]) -> Result<()> {
    let mut session = new_session(opts);
    let geometry = match opts.family {
        Family::TextSet => Geometry::None,
        _ => Geometry::Point,
    };
    for path in paths {
        session.register_io(
            opts.family,
            Method::File,
            geometry,
            Direction::Input,
            None,
            Resource::Path((*path).into()),
        )?;
    }
    session.begin_io(opts.family, Direction::Input, HeaderMode::On)?;
    session.begin_io(opts.family, Direction::Output, HeaderMode::On)?;
    loop {
        match session.get_record(RecordMode::default())? {
            Event::EndOfStream => break,
            Event::EndOfFile => tracing::debug!("source boundary"),
            event => session.put_record(event)?,
        }
    }
    session.end_io(Direction::Input)?;
    session.end_io(Direction::Output)?;

    let counters = session.record_counters(Direction::Input);
    tracing::info!(
        tables = counters.tables,
        segments = counters.segments,
        records = counters.records,
        "concatenated"
    );
    session.destroy()?;
    Ok(())
}
