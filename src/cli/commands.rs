//! Command dispatch: one handler per subcommand.

use std::collections::BTreeSet;
use std::io;
use std::path::PathBuf;

use clap::CommandFactory;
use clap_complete::generate;
use itertools::Itertools;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::application::services::BuilderService;
use crate::application::ApplicationError;
use crate::cli::args::{Cli, Commands, ConfigCommands, DraftArgs, SearchCommands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, OutputFormat, Settings};
use crate::domain::{
    parse_updates, summarize, Code, DisplayFilter, Draft, Mark, SearchSelection, Status, StatusMap,
};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::{load_draft, save_draft};

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let settings = Settings::load(cli.config.as_deref())?;
    if !settings.color {
        colored::control::set_override(false);
    }
    debug!("settings: {:?}", settings);

    match &cli.command {
        Some(Commands::Status {
            draft,
            filter,
            json,
        }) => cmd_status(settings, draft, filter.as_deref(), *json),
        Some(Commands::Update {
            draft,
            set,
            write,
            json,
        }) => cmd_update(settings, draft, set, *write, *json),
        Some(Commands::Tree {
            draft,
            search,
            unassigned,
            filter,
            json,
        }) => {
            let selection = match (search, unassigned) {
                (Some(slug), _) => SearchSelection::ExplicitSearch(slug.clone()),
                (None, true) => SearchSelection::UnassignedCodes,
                (None, false) => SearchSelection::NoSelection,
            };
            cmd_tree(settings, draft, selection, filter.as_deref(), *json)
        }
        Some(Commands::Definition { draft, json }) => cmd_definition(settings, draft, *json),
        Some(Commands::Export { draft }) => cmd_export(settings, draft),
        Some(Commands::Search { command }) => cmd_search(settings, command),
        Some(Commands::Config { command }) => cmd_config(&settings, cli, command),
        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        None => Err(CliError::Usage(
            "no command given, see `codelists --help`".to_string(),
        )),
    }
}

/// Service plus the draft it should work on.
struct Session {
    service: BuilderService,
    draft: Draft,
    draft_path: Option<PathBuf>,
    json: bool,
}

/// Resolve terminology, load the draft and layer `-i`/`-x` decisions on top.
///
/// Without `--draft` the draft spans every code of the terminology.
#[instrument(level = "debug", skip(settings))]
fn open_session(settings: Settings, args: &DraftArgs, json: bool) -> CliResult<Session> {
    let json = json || settings.format == OutputFormat::Json;
    let service = open_service(settings, args.terminology.as_ref())?;

    let mut draft = match &args.draft {
        Some(path) => load_draft(path)?,
        None => service.terminology_draft("command line"),
    };

    let included: BTreeSet<&String> = args.include.iter().collect();
    if let Some(code) = args.exclude.iter().find(|c| included.contains(c)) {
        return Err(CliError::InvalidArgs(format!(
            "{code} is both included and excluded"
        )));
    }
    for code in &args.include {
        draft.decisions.apply(code, Mark::Include);
    }
    for code in &args.exclude {
        draft.decisions.apply(code, Mark::Exclude);
    }

    Ok(Session {
        service,
        draft,
        draft_path: args.draft.clone(),
        json,
    })
}

/// Builder service over the given terminology, falling back to the configured one.
fn open_service(settings: Settings, terminology: Option<&PathBuf>) -> CliResult<BuilderService> {
    let terminology_path = terminology
        .cloned()
        .or_else(|| settings.terminology.clone())
        .ok_or_else(|| {
            CliError::Usage("no terminology given and none configured".to_string())
        })?;
    let container = ServiceContainer::new(settings, &terminology_path)?;
    Ok(container.builder_service())
}

fn parse_filter(filter: Option<&str>) -> CliResult<DisplayFilter> {
    Ok(filter
        .map(str::parse::<DisplayFilter>)
        .transpose()?
        .unwrap_or_default())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value).map_err(|e| ApplicationError::OperationFailed {
        context: "serialize output".to_string(),
        source: Box::new(e),
    })?;
    output::info(&text);
    Ok(())
}

fn print_statuses(session: &Session, statuses: &StatusMap) -> CliResult<()> {
    if session.json {
        return print_json(statuses);
    }
    let codes: BTreeSet<Code> = statuses.keys().cloned().collect();
    let terms = session.service.terms(&codes);
    for (code, status) in statuses {
        let term = session.draft.coding_system.lookup_term(code, &terms);
        output::info(&format!("{:>3} {} {}", output::status_token(*status), code, term));
    }
    let summary = summarize(statuses)
        .into_iter()
        .map(|(status, count)| format!("{status} {count}"))
        .join(", ");
    output::header(&format!("{} codes: {}", statuses.len(), summary));
    Ok(())
}

fn cmd_status(settings: Settings, args: &DraftArgs, filter: Option<&str>, json: bool) -> CliResult<()> {
    let filter = parse_filter(filter)?;
    let session = open_session(settings, args, json)?;
    let statuses: StatusMap = session
        .service
        .statuses(&session.draft)?
        .into_iter()
        .filter(|(_, status)| filter.matches(*status))
        .collect();
    print_statuses(&session, &statuses)
}

fn cmd_update(
    settings: Settings,
    args: &DraftArgs,
    set: &[String],
    write: bool,
    json: bool,
) -> CliResult<()> {
    let raw = set
        .iter()
        .map(|entry| {
            entry.split_once('=').ok_or_else(|| {
                CliError::InvalidArgs(format!("expected CODE=MARK, got '{entry}'"))
            })
        })
        .collect::<CliResult<Vec<(&str, &str)>>>()?;
    let updates = parse_updates(&raw)?;

    let mut session = open_session(settings, args, json)?;
    let outcome = session.service.update(&session.draft, &updates)?;

    if write {
        if let Some(path) = session.draft_path.clone() {
            session.draft.decisions = outcome.decisions.clone();
            save_draft(&path, &session.draft)?;
            info!("saved {}", path.display());
        }
    }
    print_statuses(&session, &outcome.statuses)
}

fn cmd_tree(
    settings: Settings,
    args: &DraftArgs,
    selection: SearchSelection,
    filter: Option<&str>,
    json: bool,
) -> CliResult<()> {
    let filter = parse_filter(filter)?;
    let session = open_session(settings, args, json)?;
    let view = session.service.draft_view(&session.draft, &selection, filter)?;
    if session.json {
        return print_json(&view);
    }

    output::header(&format!("{} ({})", view.draft_name, view.coding_system.name()));
    if let Some(label) = view.filter {
        output::detail(&format!("showing {label} codes"));
    }
    for entry in &view.searches {
        let marker = if entry.active { "*" } else { " " };
        output::detail(&format!("{marker} {}", entry.term));
    }
    for table in &view.tree_tables {
        output::info(&"");
        output::header(&table.heading);
        for row in &table.rows {
            let status = view
                .code_to_status
                .get(&row.code)
                .copied()
                .unwrap_or(Status::Unknown);
            output::tree_row(row, status);
        }
    }
    Ok(())
}

fn cmd_definition(settings: Settings, args: &DraftArgs, json: bool) -> CliResult<()> {
    let session = open_session(settings, args, json)?;
    let rows = session.service.definition(&session.draft)?;
    if session.json {
        return print_json(&rows);
    }
    if rows.is_empty() {
        output::warning("no codes are included");
    }
    rows.iter().for_each(output::definition_row);
    Ok(())
}

fn cmd_export(settings: Settings, args: &DraftArgs) -> CliResult<()> {
    let session = open_session(settings, args, false)?;
    output::info(&"code,term");
    for (code, term) in session.service.export(&session.draft)? {
        output::info(&format!("{},{}", csv_field(&code), csv_field(&term)));
    }
    Ok(())
}

fn cmd_search(settings: Settings, command: &SearchCommands) -> CliResult<()> {
    match command {
        SearchCommands::Add {
            draft: path,
            terminology,
            term,
            codes,
        } => {
            let service = open_service(settings, terminology.as_ref())?;
            let mut draft = if path.exists() {
                load_draft(path)?
            } else {
                let name = path
                    .file_stem()
                    .map_or_else(|| "draft".to_string(), |s| s.to_string_lossy().into_owned());
                debug!("creating draft {} at {}", name, path.display());
                Draft::new(name, service.coding_system())
            };
            let search = service.add_search(&mut draft, term, codes.iter().cloned().collect())?;
            save_draft(path, &draft)?;
            output::action("added", &format!("{} ({} codes)", search.slug, search.codes.len()));
        }
        SearchCommands::Remove { draft: path, slug } => {
            let mut draft = load_draft(path)?;
            let search = draft
                .remove_search(slug)
                .ok_or_else(|| ApplicationError::SearchNotFound(slug.clone()))?;
            save_draft(path, &draft)?;
            output::action("removed", &search.slug);
        }
    }
    Ok(())
}

fn cmd_config(settings: &Settings, cli: &Cli, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => output::info(&settings.to_toml()?),
        ConfigCommands::Path => {
            match global_config_path() {
                Some(path) => output::action("global", &path.display()),
                None => output::warning("no home directory, global config disabled"),
            }
            if let Some(local) = &cli.config {
                output::action("local", &local.display());
            }
        }
        ConfigCommands::Template => output::info(&Settings::template()),
    }
    Ok(())
}

/// Quote a CSV field when it contains a separator, quote or newline.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
