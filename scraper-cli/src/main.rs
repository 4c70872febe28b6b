//! Command-line interface for the doc-scraper pipeline
//!
//! Usage:
//!   scraper --config <pipeline.yaml>   - Run the declared pipeline
//!   scraper --list-kinds               - List registered stage kinds

use clap::{Arg, ArgAction, Command};

use scraper_pipeline::PipelineBuilder;

fn main() {
    env_logger::init();

    let matches = Command::new("scraper")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Extract structured records from HTML-rendered documents")
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("Pipeline configuration file (YAML)")
                .required_unless_present("list-kinds"),
        )
        .arg(
            Arg::new("list-kinds")
                .long("list-kinds")
                .help("List registered source, transformation and output kinds")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    let builder = PipelineBuilder::new();

    if matches.get_flag("list-kinds") {
        print_kinds(&builder);
        return;
    }

    let config = matches
        .get_one::<String>("config")
        .expect("config is required unless listing kinds");

    let mut pipeline = builder.from_file(config).unwrap_or_else(|err| {
        eprintln!("Failed to load pipeline config: {}", err);
        std::process::exit(1);
    });

    match pipeline.run() {
        Ok(summary) => {
            log::info!(
                "pipeline finished: {} processed, {} failed",
                summary.processed,
                summary.failed
            );
            if summary.failed > 0 {
                std::process::exit(2);
            }
        }
        Err(err) => {
            eprintln!("Pipeline failed: {}", err);
            std::process::exit(1);
        }
    }
}

fn print_kinds(builder: &PipelineBuilder) {
    println!("Sources:");
    for kind in builder.sources.kinds() {
        println!("  {}", kind);
    }
    println!("Transformations:");
    for kind in builder.transforms.kinds() {
        println!("  {}", kind);
    }
    println!("Outputs:");
    for kind in builder.sinks.kinds() {
        println!("  {}", kind);
    }
}
