// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod console;
mod runtime;

use anyhow::{Context, Result, anyhow};
use config::Config;
use runtime::{ApiBackend, DemoBackend, Host};
use std::env;
use std::path::PathBuf;
use time::OffsetDateTime;
use tripdesk_app::ReservationKind;

const DEMO_SEED: u64 = 42;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tripdesk=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `tripdesk --print-example-config` to generate a v1 template",
            options.config_path.display()
        )
    })?;
    let tick = config.tick()?;

    if options.demo {
        let data = tripdesk_testkit::demo_dataset(DEMO_SEED, OffsetDateTime::now_utc())?;
        let backend = DemoBackend::new(data, Box::new(OffsetDateTime::now_utc));
        if options.check_only {
            return Ok(());
        }
        let mut host = Host::new(
            backend,
            options.kind,
            config.form_settings(),
            config.batch_reconcile(),
        );
        host.set_query(&options.search);
        return console::run(&mut host, tick, options.once, OffsetDateTime::now_utc);
    }

    let client = tripdesk_api::Client::new(config.api_base_url(), config.api_timeout()?)
        .with_context(|| {
            format!(
                "invalid [api] config in {}; fix base_url/timeout values",
                options.config_path.display()
            )
        })?;
    if options.check_only {
        return Ok(());
    }

    tracing::info!(base_url = client.base_url(), kind = options.kind.as_str(), "starting");
    let mut host = Host::new(
        ApiBackend::new(client),
        options.kind,
        config.form_settings(),
        config.batch_reconcile(),
    );
    host.set_query(&options.search);
    console::run(&mut host, tick, options.once, OffsetDateTime::now_utc)
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    print_example: bool,
    demo: bool,
    check_only: bool,
    once: bool,
    kind: ReservationKind,
    search: String,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        print_example: false,
        demo: false,
        check_only: false,
        once: false,
        kind: ReservationKind::Flight,
        search: String::new(),
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--kind" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--kind requires one of: flight, hotel, package"))?;
                options.kind = ReservationKind::parse(value.as_ref()).ok_or_else(|| {
                    anyhow!(
                        "unknown reservation kind {:?}; use one of: flight, hotel, package",
                        value.as_ref()
                    )
                })?;
            }
            "--search" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--search requires a query"))?;
                options.search = value.as_ref().to_owned();
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--demo" => {
                options.demo = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--once" => {
                options.once = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("tripdesk");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a v1 config template");
    println!("  --kind <kind>            Reservation list to watch: flight, hotel, package");
    println!("  --search <query>         Only show rows matching the query");
    println!("  --once                   Print the list once and exit");
    println!("  --demo                   Run against seeded in-memory data");
    println!("  --check                  Validate config and startup dependencies");
    println!("  --help                   Show this help");
}
