use anyhow::Result;
use clap::Parser;
use ldsync::api::LdEnv;
use ldsync::config::Config;
use ldsync::doctor::Doctor;
use ldsync::iri::{is_valid_url, slash_iri};
use ldsync::options::{ErrorPolicy, Follow};
use ldsync::resource::Resource;
use ldsync::transport::{FileTransport, Payload};
use log::{debug, error, info};
use oxigraph::model::NamedNode;
use std::path::PathBuf;

fn check_uri(url: &str) -> Result<String, String> {
    if is_valid_url(url) {
        Ok(url.to_string())
    } else {
        Err(format!("{:?} is not a valid URL", url))
    }
}

#[derive(Debug, Parser)]
#[command(name = "ldsync")]
#[command(version)]
#[command(about = "Crawl Linked Data documents and print the resources they describe")]
#[command(arg_required_else_help = true)]
struct Cli {
    /// URLs to fetch, one after the other
    #[clap(required = true, value_parser = check_uri)]
    urls: Vec<String>,
    /// Crawl the discovered documents this many rounds
    #[clap(long, short, default_value = "0")]
    depth: usize,
    /// Follow every IRI discovered
    #[clap(long, action, conflicts_with = "follow_uri")]
    follow_all: bool,
    /// Follow only objects of this predicate (repeatable)
    #[clap(long, value_parser = check_uri)]
    follow_uri: Vec<String>,
    /// Network timeout in seconds
    #[clap(long)]
    socket_timeout: Option<u64>,
    /// Maximum number of triples of a document that will be processed
    #[clap(long)]
    graph_size_limit: Option<usize>,
    /// Print every resource known after crawling
    #[clap(long, action)]
    print_all_resources: bool,
    /// Only print a short representation of each resource
    #[clap(long, action)]
    only_print_uris: bool,
    /// Only do content negotiation for the given URLs and print what was negotiated
    #[clap(long, short = 'o', action)]
    only_negotiate: bool,
    /// Only print the content retrieved from the given URLs
    #[clap(long, action)]
    only_print_uri_content: bool,
    /// Serve the first URL from this local file instead of the web
    #[clap(long, short)]
    file: Option<PathBuf>,
    /// Load the configuration from a JSON file
    #[clap(long, short)]
    config: Option<PathBuf>,
    /// Offline mode - will not attempt to fetch anything from the web
    #[clap(long, action, default_value = "false")]
    offline: bool,
    /// Verbose mode - sets the RUST_LOG level to info, defaults to warning level
    #[clap(long, short, action, default_value = "false")]
    verbose: bool,
    /// Debug mode - sets the RUST_LOG level to debug, defaults to warning level
    #[clap(long, action, default_value = "false")]
    debug: bool,
}

fn print_resource(resource: &Resource) {
    println!("{}", resource);
    for (name, value) in resource.attributes() {
        let values: Vec<String> = value.values().map(|v| v.to_string()).collect();
        println!("  {}: {}", name, values.join(", "));
    }
}

fn print_negotiation(url: &str, payload: &Payload) {
    println!("{}", url);
    println!(
        "  Content-Type: {}",
        payload.content_type.as_deref().unwrap_or("unknown")
    );
    match payload.format {
        Some(format) => println!("  Format: {}", format.name()),
        None => println!("  Format: none (content negotiation failed)"),
    }
    println!("  Length: {} bytes", payload.bytes.len());
}

fn main() -> Result<()> {
    let cmd = Cli::parse();

    let log_level = if cmd.verbose { "info" } else { "warn" };
    let log_level = if cmd.debug { "debug" } else { log_level };
    std::env::set_var("RUST_LOG", log_level);
    ldsync::init_logging();
    env_logger::init();

    let mut config = match &cmd.config {
        Some(path) => Config::from_file(path)?,
        // the CLI never fetches a document twice within five minutes
        None => Config {
            refetch_interval_secs: Some(300),
            ..Config::default()
        },
    };
    if let Some(timeout) = cmd.socket_timeout {
        info!("Setting socket timeout to {}s", timeout);
        config.timeout_secs = timeout;
    }
    if let Some(limit) = cmd.graph_size_limit {
        config.graph_size_limit = limit;
    }
    config.offline |= cmd.offline;
    if cmd.debug {
        config.print();
    }

    let follow = if cmd.follow_all {
        info!("Following all URIs");
        Follow::All
    } else if !cmd.follow_uri.is_empty() {
        info!("Following values matching: {}", cmd.follow_uri.join(", "));
        Follow::predicates(
            cmd.follow_uri
                .iter()
                .map(|u| NamedNode::new(u.as_str()))
                .collect::<Result<Vec<_>, _>>()?,
        )
    } else {
        Follow::nothing()
    };

    let mut env = LdEnv::new(config);
    let options = env
        .get_options()
        .with_follow(follow)
        .with_errors(ErrorPolicy::Swallow);

    if let Some(path) = &cmd.file {
        let transport = FileTransport::new(path)?;
        env.create_document(&cmd.urls[0], Some(Box::new(transport)))?;
    }

    if cmd.urls.len() > 1 {
        info!("Retrieving content of {} URLs", cmd.urls.len());
    }

    if cmd.only_negotiate || cmd.only_print_uri_content {
        for url in &cmd.urls {
            match env.fetch_raw(url) {
                Ok(payload) => {
                    if cmd.only_negotiate {
                        print_negotiation(url, &payload);
                    }
                    if cmd.only_print_uri_content {
                        println!("\n{}\n", String::from_utf8_lossy(&payload.bytes));
                    }
                }
                Err(e) => println!("{}", e),
            }
        }
        return Ok(());
    }

    for url in &cmd.urls {
        info!("Retrieving content of {}", url);
        match env.get(url, &options) {
            Ok(outcome) => debug!("{}: {:?}", url, outcome),
            Err(e) => error!("{}: {}", url, e),
        }
    }

    if cmd.depth > 0 {
        let report = env.get_all(cmd.depth, &options)?;
        info!(
            "Crawled {} documents in {} rounds, {} failed",
            report.fetched.len(),
            report.rounds,
            report.failed.len()
        );
    }

    for url in &cmd.urls {
        let document = slash_iri(url)?;
        for resource in env.resources().for_document(&document) {
            if resource.subject().iri() == Some(url.as_str()) {
                info!("Printing all available information about {}", url);
                print_resource(resource);
            }
        }
    }

    if cmd.print_all_resources {
        for resource in env.resources().iter() {
            if cmd.only_print_uris {
                println!("{}", resource);
            } else {
                print_resource(resource);
            }
        }
    }

    let stats = env.stats();
    info!(
        "{} documents ({} processed), {} resources, {} triples",
        stats.num_documents, stats.num_processed, stats.num_resources, stats.num_triples
    );

    let problems = Doctor::default().run(&env)?;
    if !problems.is_empty() {
        eprintln!("Found {} problems:", problems.len());
        for problem in problems {
            eprintln!("  - {}", problem);
        }
    }
    Ok(())
}
