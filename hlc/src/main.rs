use arch::{Cpu, Mos6502, Mos65C02};
use clap::Parser;
use color_print::ceprintln;
use hlc::{binprint, compile, split, Error, Input, Session};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process;

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum Target {
    #[value(name = "6502")]
    Mos6502,
    #[value(name = "65c02")]
    Mos65C02,
}

impl Target {
    fn cpu(self) -> Box<dyn Cpu> {
        match self {
            Target::Mos6502 => Box::new(Mos6502),
            Target::Mos65C02 => Box::new(Mos65C02),
        }
    }
}

#[derive(Debug, clap::Parser)]
#[clap(author, version, about)]
struct Args {
    /// Input files, compiled in order
    #[clap(required = true)]
    input: Vec<PathBuf>,

    /// Output file
    #[clap(short, long, default_value = "out.bin")]
    output: PathBuf,

    /// Target processor
    #[clap(long, value_enum, default_value = "6502")]
    cpu: Target,

    /// Write the memory map as json
    #[clap(long)]
    map: Option<PathBuf>,

    /// Print the laid out image
    #[clap(short, long)]
    verbose: bool,

    /// Log level on stderr
    #[clap(long, default_value = "warn")]
    log_level: tracing::Level,
}

fn main() {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .with_writer(io::stderr)
        .init();

    if let Err(err) = run(&args) {
        ceprintln!("<red,bold>error</>: {}", err);
        process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Error> {
    let mut inputs: Vec<Input> = Vec::new();
    for path in &args.input {
        let text = fs::read_to_string(path)?;
        let dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();
        let file = path.display().to_string();
        inputs.extend(split(&file, &text, |name| Ok(fs::read(dir.join(name))?))?);
    }

    let mut session = Session::new(args.cpu.cpu());
    let image = compile(&mut session, inputs)?;

    fs::write(&args.output, image.bytes())?;
    if let Some(map) = &args.map {
        let json = image.to_json().map_err(io::Error::from)?;
        fs::write(map, json)?;
    }
    if args.verbose {
        binprint(&image, session.cpu());
    }
    Ok(())
}
