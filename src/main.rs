// entdef: inspect entity definition (.def) files

use std::fs;
use std::path::PathBuf;
use std::process;

use clap::{Parser, ValueEnum};
use tracing::{debug, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

use entdef::{AttributeDefinition, Color, DefParser, EntityDefinition, TracingStatus, DEFAULT_ENTITY_COLOR};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// One line per entity class
    Summary,
    /// Every class as pretty-printed JSON
    Json,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Parse an entity definition file")]
struct Args {
    /// Definition file to read
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Summary)]
    format: Format,

    /// Color for classes that declare none, as "R G B"
    #[arg(long, value_name = "COLOR")]
    default_color: Option<Color>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    let level = if args.verbose { LevelFilter::DEBUG } else { LevelFilter::WARN };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();

    let source = match fs::read_to_string(&args.file) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Error: cannot read '{}': {}", args.file.display(), e);
            process::exit(1);
        }
    };

    debug!(file = %args.file.display(), "parsing");
    let mut status = TracingStatus::new();
    let default_color = args.default_color.unwrap_or(DEFAULT_ENTITY_COLOR);
    let definitions = match DefParser::new(&source, default_color).parse_definitions(&mut status) {
        Ok(definitions) => definitions,
        Err(e) => {
            eprintln!("{}: {}", args.file.display(), e);
            process::exit(1);
        }
    };

    match args.format {
        Format::Summary => {
            for definition in &definitions {
                println!("{}", summary_line(definition));
            }
            eprintln!(
                "{} entity classes, {} warnings",
                definitions.len(),
                status.warning_count()
            );
        }
        Format::Json => match serde_json::to_string_pretty(&definitions) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error: {e}");
                process::exit(1);
            }
        },
    }
}

fn summary_line(definition: &EntityDefinition) -> String {
    let color = definition.color();
    let mut line = format!(
        "{:<5} {:<24} ({:.2} {:.2} {:.2})",
        if definition.is_point() { "point" } else { "brush" },
        definition.name(),
        color.r,
        color.g,
        color.b
    );

    if let EntityDefinition::Point(point) = definition {
        line.push_str(&format!(" {} {}", point.size.min, point.size.max));
        if let Some(model) = &point.model {
            line.push_str(&format!(" model {model}"));
        }
    }

    let attributes: Vec<String> = definition
        .attributes()
        .iter()
        .map(|attribute| match attribute {
            AttributeDefinition::Flags(flags) => format!("{}[{}]", flags.name, flags.options.len()),
            AttributeDefinition::Choice(choice) => format!("{}<{}>", choice.name, choice.options.len()),
        })
        .collect();
    if !attributes.is_empty() {
        line.push_str(&format!(" {{{}}}", attributes.join(", ")));
    }
    line
}
