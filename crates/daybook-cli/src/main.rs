// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod runtime;

use anyhow::{Context, Result, anyhow, bail};
use config::Config;
use daybook_api::Client;
use daybook_app::{ModuleKind, NoteScope, SortDirection};
use daybook_sync::StateStore;
use runtime::{Assignment, ListOptions, Runtime, ViewOverrides};
use std::env;
use std::io::Write;
use std::path::PathBuf;

fn main() {
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
            "load config {}; run `daybook --print-example-config` to generate a v1 template",
            options.config_path.display()
        )
    })?;

    let state_path = config.state_path()?;
    if options.print_state_path {
        println!("{}", state_path.display());
        return Ok(());
    }

    runtime::init_logging()?;

    let client = Client::new(config.base_url(), config.session_token(), config.timeout()?)
        .with_context(|| {
            format!(
                "invalid [server] config in {}; fix base_url/timeout values",
                options.config_path.display()
            )
        })?;
    let runtime = Runtime::new(client, StateStore::new(state_path), config.save_policy()?);

    if options.check_only {
        runtime.check()?;
        println!("server reachable at {}", config.base_url());
        return Ok(());
    }

    let mut out = std::io::stdout().lock();
    match options.command {
        None => {
            print_help();
            Ok(())
        }
        Some(Command::List { module, options }) => runtime.list(module, &options, &mut out),
        Some(Command::Edit {
            module,
            id,
            assignments,
            view,
        }) => runtime.edit(module, &id, &assignments, &view, &mut out),
        Some(Command::Add {
            module,
            assignments,
        }) => runtime.add(module, &assignments, &mut out),
        Some(Command::Delete { module, id }) => runtime.delete(module, &id, &mut out),
    }?;
    out.flush().context("flush output")
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    List {
        module: ModuleKind,
        options: ListOptions,
    },
    Edit {
        module: ModuleKind,
        id: String,
        assignments: Vec<Assignment>,
        view: ViewOverrides,
    },
    Add {
        module: ModuleKind,
        assignments: Vec<Assignment>,
    },
    Delete {
        module: ModuleKind,
        id: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    print_state_path: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
    command: Option<Command>,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        print_state_path: false,
        print_example: false,
        check_only: false,
        show_help: false,
        command: None,
    };

    let args: Vec<String> = args.into_iter().map(|arg| arg.as_ref().to_owned()).collect();
    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value);
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-state-path" => {
                options.print_state_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            "list" | "edit" | "add" | "delete" => {
                let rest: Vec<String> = iter.by_ref().collect();
                options.command = Some(parse_command(&arg, rest)?);
            }
            unknown => {
                bail!("unknown argument {unknown:?}; run with --help to see supported options");
            }
        }
    }

    Ok(options)
}

fn parse_command(name: &str, args: Vec<String>) -> Result<Command> {
    let mut iter = args.into_iter();
    let module = iter
        .next()
        .ok_or_else(|| anyhow!("{name} requires a module: diary, bill, interest, note, or sport"))?;
    let module = ModuleKind::parse(&module).ok_or_else(|| {
        anyhow!("unknown module {module:?}; use diary, bill, interest, note, or sport")
    })?;

    let mut positional = Vec::new();
    let mut view = ViewOverrides::default();
    let mut filter = None;
    let mut sort = None;
    while let Some(arg) = iter.next() {
        let mut value_for = |flag: &str| {
            iter.next()
                .ok_or_else(|| anyhow!("{flag} requires a value"))
        };
        match arg.as_str() {
            "--month" => view.month = Some(value_for("--month")?),
            "--date" => view.date = Some(value_for("--date")?),
            "--scope" => view.scope = Some(parse_scope(&value_for("--scope")?)?),
            "--category" => {
                let raw = value_for("--category")?;
                view.category = Some(
                    raw.parse()
                        .with_context(|| format!("--category expects a number, got {raw:?}"))?,
                );
            }
            "--filter" => filter = Some(value_for("--filter")?),
            "--sort" => sort = Some(parse_sort(&value_for("--sort")?)?),
            flag if flag.starts_with("--") => {
                bail!("unknown {name} option {flag:?}; run with --help to see supported options");
            }
            _ => positional.push(arg),
        }
    }

    if name != "list" && (filter.is_some() || sort.is_some()) {
        bail!("--filter and --sort only apply to list");
    }

    let mut positional = positional.into_iter();
    match name {
        "list" => {
            if let Some(extra) = positional.next() {
                bail!("unexpected argument {extra:?} after list {}", module.as_str());
            }
            Ok(Command::List {
                module,
                options: ListOptions { view, filter, sort },
            })
        }
        "edit" => {
            let id = positional
                .next()
                .ok_or_else(|| anyhow!("edit requires a record id"))?;
            let assignments = parse_assignments(positional)?;
            if assignments.is_empty() {
                bail!("edit requires at least one field=value");
            }
            Ok(Command::Edit {
                module,
                id,
                assignments,
                view,
            })
        }
        "add" => {
            if view != ViewOverrides::default() {
                bail!("view options do not apply to add");
            }
            Ok(Command::Add {
                module,
                assignments: parse_assignments(positional)?,
            })
        }
        _ => {
            let id = positional
                .next()
                .ok_or_else(|| anyhow!("delete requires a record id"))?;
            if let Some(extra) = positional.next() {
                bail!("unexpected argument {extra:?} after delete {} {id}", module.as_str());
            }
            Ok(Command::Delete { module, id })
        }
    }
}

fn parse_assignments(raw: impl Iterator<Item = String>) -> Result<Vec<Assignment>> {
    raw.map(|arg| Assignment::parse(&arg)).collect()
}

fn parse_scope(raw: &str) -> Result<NoteScope> {
    match raw {
        "all" => Ok(NoteScope::All),
        "doing" => Ok(NoteScope::InProgress),
        "done" => Ok(NoteScope::Done),
        other => bail!("unknown scope {other:?}; use all, doing, or done"),
    }
}

fn parse_sort(raw: &str) -> Result<(String, SortDirection)> {
    let (field, direction) = match raw.split_once(':') {
        Some((field, "asc")) => (field, SortDirection::Asc),
        Some((field, "desc")) => (field, SortDirection::Desc),
        Some((_, other)) => bail!("unknown sort direction {other:?}; use asc or desc"),
        None => (raw, SortDirection::Asc),
    };
    Ok((field.to_owned(), direction))
}

fn print_help() {
    println!("daybook");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-state-path       Print resolved view state path");
    println!("  --print-example-config   Print a v1 config template");
    println!("  --check                  Check that the server answers");
    println!("  --help                   Show this help");
    println!();
    println!("  list <module> [--filter <text|<N|>N>] [--sort <field>[:desc]]");
    println!("       [--month YYYY-MM] [--date YYYY-MM-DD] [--scope all|doing|done] [--category N]");
    println!("  edit <module> <id> <field=value>... [--month YYYY-MM]");
    println!("  add <module> <field=value>...");
    println!("  delete <module> <id>");
    println!();
    println!("  modules: diary, bill, interest, note, sport");
    println!("  DAYBOOK_LOG sets log filters (for example DAYBOOK_LOG=daybook_sync=debug)");
}
