#![forbid(unsafe_code)]

use std::io::{self, BufWriter, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use log::info;
use structopt::StructOpt;

use gzread::{GzReader, Member};

////////////////////////////////////////////////////////////////////////////////

#[derive(StructOpt, Debug)]
#[structopt(name = "gzread", about = "Decompresses gzip and single-entry zip files to stdout")]
struct Opts {
    /// Verbose logging, repeat for more.
    #[structopt(short = "v", parse(from_occurrences))]
    verbose: usize,

    /// Silences all logging.
    #[structopt(short = "q", long = "quiet")]
    quiet: bool,

    /// Bytes requested per read call.
    #[structopt(long = "chunk-size", default_value = "4096")]
    chunk_size: usize,

    /// Copies the output one line per call.
    #[structopt(long = "lines")]
    lines: bool,

    /// Longest line handed out by a single call with --lines.
    #[structopt(long = "max-line", default_value = "4096")]
    max_line: usize,

    /// Input files. Reads standard input when none are given.
    #[structopt(parse(from_os_str))]
    files: Vec<PathBuf>,
}

fn copy<R: Read, W: Write>(mut reader: GzReader<R>, output: &mut W, opts: &Opts) -> Result<u64> {
    let size = if opts.lines {
        opts.max_line
    } else {
        opts.chunk_size
    };
    let mut buf = vec![0u8; size.max(1)];
    loop {
        let len = if opts.lines {
            reader.read_line(&mut buf)?
        } else {
            reader.read(&mut buf)?
        };
        if len == 0 {
            break;
        }
        output.write_all(&buf[..len])?;
    }

    match reader.header() {
        Some(Member::Gzip(header)) => {
            if let Some(name) = header.name_lossy() {
                info!("original name: {}", name);
            }
        }
        Some(Member::Zip(local)) => {
            info!("zip entry: {}", String::from_utf8_lossy(&local.name));
        }
        None => {}
    }
    let total = reader.total_out();
    reader.close();
    Ok(total)
}

fn main() -> Result<()> {
    let opts = Opts::from_args();
    stderrlog::new()
        .module("gzread")
        .quiet(opts.quiet)
        .verbosity(opts.verbose)
        .init()
        .context("failed to initialize logging")?;

    let stdout = io::stdout();
    let mut output = BufWriter::new(stdout.lock());

    if opts.files.is_empty() {
        let stdin = io::stdin();
        let reader = GzReader::new(stdin.lock()).context("failed to set up decoder")?;
        let total = copy(reader, &mut output, &opts).context("<stdin>")?;
        info!("<stdin>: {} bytes", total);
    }
    for path in &opts.files {
        let reader = GzReader::open(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        let total = copy(reader, &mut output, &opts)
            .with_context(|| format!("{}", path.display()))?;
        info!("{}: {} bytes", path.display(), total);
    }

    output.flush().context("failed to write output")?;
    Ok(())
}
