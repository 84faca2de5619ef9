use clap::{ArgAction, Parser, Subcommand};
use std::fs;
use std::path::PathBuf;

use bbdb::{from_json, read_file, to_json, write_file, BbdbError};
use tracing::Level;

#[derive(Parser)]
#[command(name = "bbdb")]
#[command(about = "Convert and check BBDB address book files", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a BBDB file to JSON
    ToJson {
        /// Input BBDB file
        #[arg(short, long)]
        input: PathBuf,

        /// Output `.json` file (if omitted, prints to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Convert a JSON tree back to a BBDB file
    FromJson {
        /// Input `.json` file
        #[arg(short, long)]
        input: PathBuf,

        /// Output BBDB file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Parse and validate a BBDB file
    Check {
        /// Input BBDB file
        #[arg(short, long)]
        input: PathBuf,
    },
}

fn main() -> Result<(), BbdbError> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::ToJson { input, output } => {
            let db = read_file(input)?;
            let json = to_json(&db)?;
            if let Some(out_path) = output {
                fs::write(out_path, &json)?;
                println!("Converted {} → {}", input.display(), out_path.display());
            } else {
                println!("{}", json);
            }
            Ok(())
        }

        Commands::FromJson { input, output } => {
            let text = fs::read_to_string(input)?;
            let db = from_json(&text)?;
            write_file(&db, output)?;
            println!("Converted {} → {}", input.display(), output.display());
            Ok(())
        }

        Commands::Check { input } => {
            let db = read_file(input)?;
            db.validate()?;
            let fields: Vec<&str> = db.user_fields().into_iter().collect();
            println!(
                "{}: {} records, file-version {}, user fields ({})",
                input.display(),
                db.len(),
                db.fileversion(),
                fields.join(" ")
            );
            Ok(())
        }
    }
}
