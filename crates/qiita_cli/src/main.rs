//! Operator CLI for a Qiita database.
//!
//! # Responsibility
//! - Inspect and create processing parameter sets.
//! - Write QIIME parameter files for OTU picking.
//! - Dump the template context of UI modules for a given user.

use clap::{Args, Parser, Subcommand};
use log::info;
use qiita_db::db::migrations::latest_version;
use qiita_db::db::open_db;
use qiita_db::{
    init_logging, ParamTable, ParameterService, QiitaConfig, RawDataRepository,
    SqliteParameterRepository, SqliteRawDataRepository, SqliteStudyRepository, StudyRepository,
    CONFIG_ENV_VAR,
};
use qiita_pet::{JsonContextRenderer, ModuleEnv, RawDataEditorTab, RawDataTab, UiContext};
use rusqlite::Connection;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(author, version, about = "Qiita database operator CLI")]
struct Cli {
    /// Path to the TOML config; built-in defaults apply when absent.
    #[arg(long, env = CONFIG_ENV_VAR, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Open the database and report versions.
    Ping,
    /// Processing parameter sets.
    #[command(subcommand)]
    Params(ParamsCommand),
    /// Print the template context a UI module would render.
    #[command(subcommand)]
    Ui(UiCommand),
}

#[derive(Subcommand)]
enum ParamsCommand {
    /// List the sets of a table.
    List {
        #[arg(value_parser = parse_table)]
        table: ParamTable,
    },
    /// Print one set as command-line options.
    Show {
        #[arg(value_parser = parse_table)]
        table: ParamTable,
        id: i64,
    },
    /// Report whether a set with exactly these values is stored.
    Exists {
        #[arg(value_parser = parse_table)]
        table: ParamTable,
        #[command(flatten)]
        values: ValueArgs,
    },
    /// Store a new named set.
    Create {
        #[arg(value_parser = parse_table)]
        table: ParamTable,
        name: String,
        #[command(flatten)]
        values: ValueArgs,
    },
    /// Write a SortMeRNA set as a QIIME parameters file.
    QiimeFile { id: i64, out: PathBuf },
}

#[derive(Args)]
struct ValueArgs {
    /// Column value as `column=value`; repeat for every column.
    #[arg(long = "value", value_parser = parse_key_value)]
    values: Vec<(String, String)>,
}

#[derive(Subcommand)]
enum UiCommand {
    /// Raw data tab of a study.
    RawDataTab {
        study_id: i64,
        #[arg(long)]
        user: String,
    },
    /// Raw data editor tab for one raw data record of a study.
    RawDataEditor {
        study_id: i64,
        raw_data_id: i64,
        #[arg(long)]
        user: String,
    },
}

fn parse_table(value: &str) -> Result<ParamTable, String> {
    ParamTable::from_slug(value).ok_or_else(|| {
        let known = ParamTable::ALL
            .iter()
            .map(|table| table.slug())
            .collect::<Vec<_>>()
            .join(", ");
        format!("unknown parameter table `{value}`; expected one of: {known}")
    })
}

fn parse_key_value(value: &str) -> Result<(String, String), String> {
    match value.split_once('=') {
        Some((key, raw)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), raw.to_string()))
        }
        _ => Err(format!("expected `column=value`, got `{value}`")),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), String> {
    let config = match &cli.config {
        Some(path) => QiitaConfig::load(path).map_err(|err| err.to_string())?,
        None => QiitaConfig::default(),
    };
    if let Some(dir) = &config.logging.dir {
        init_logging(config.logging.level, dir)?;
    }

    let conn = open_db(&config.database.path).map_err(|err| err.to_string())?;
    info!(
        "event=cli_start module=cli status=ok db_path={}",
        config.database.path.display()
    );

    match cli.command {
        Command::Ping => {
            println!("qiita_db ping={}", qiita_db::ping());
            println!("qiita_db version={}", qiita_db::core_version());
            println!("schema version={}", latest_version());
            Ok(())
        }
        Command::Params(command) => run_params(&conn, command),
        Command::Ui(command) => run_ui(&conn, &config, command),
    }
}

fn run_params(conn: &Connection, command: ParamsCommand) -> Result<(), String> {
    let repo = SqliteParameterRepository::try_new(conn).map_err(|err| err.to_string())?;
    let service = ParameterService::new(repo);

    match command {
        ParamsCommand::List { table } => {
            for set in service.list(table).map_err(|err| err.to_string())? {
                println!("{}\t{}\t{}", set.id, set.name, set.to_str());
            }
        }
        ParamsCommand::Show { table, id } => {
            println!("{}", service.to_str(table, id).map_err(|err| err.to_string())?);
        }
        ParamsCommand::Exists { table, values } => {
            let parsed = service
                .parse_values(table, values.pairs())
                .map_err(|err| err.to_string())?;
            let exists = service.exists(table, &parsed).map_err(|err| err.to_string())?;
            println!("{exists}");
        }
        ParamsCommand::Create {
            table,
            name,
            values,
        } => {
            let parsed = service
                .parse_values(table, values.pairs())
                .map_err(|err| err.to_string())?;
            let created = service
                .create(table, &name, &parsed)
                .map_err(|err| err.to_string())?;
            println!("{}", created.id);
        }
        ParamsCommand::QiimeFile { id, out } => {
            let mut contents = Vec::new();
            service
                .write_qiime_params(id, &mut contents)
                .map_err(|err| err.to_string())?;
            fs::write(&out, contents)
                .map_err(|err| format!("cannot write `{}`: {err}", out.display()))?;
            println!("{}", out.display());
        }
    }
    Ok(())
}

impl ValueArgs {
    fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

fn run_ui(conn: &Connection, config: &QiitaConfig, command: UiCommand) -> Result<(), String> {
    let studies = SqliteStudyRepository::try_new(conn).map_err(|err| err.to_string())?;
    let renderer = JsonContextRenderer;

    let (study_id, user) = match &command {
        UiCommand::RawDataTab { study_id, user } => (*study_id, user.clone()),
        UiCommand::RawDataEditor { study_id, user, .. } => (*study_id, user.clone()),
    };
    let study = studies
        .get_study(study_id)
        .map_err(|err| err.to_string())?
        .ok_or_else(|| format!("study {study_id} not found"))?;
    let request = UiContext::new(Some(user), "127.0.0.1");
    let env = ModuleEnv::new(conn, &renderer, &request, &config.uploads.roots);

    let rendered = match command {
        UiCommand::RawDataTab { .. } => RawDataTab::new(&env).render(&study),
        UiCommand::RawDataEditor { raw_data_id, .. } => {
            let raw_data = SqliteRawDataRepository::try_new(conn)
                .map_err(|err| err.to_string())?
                .get_raw_data(raw_data_id)
                .map_err(|err| err.to_string())?
                .ok_or_else(|| format!("raw data {raw_data_id} not found"))?;
            RawDataEditorTab::new(&env).render(&study, &raw_data)
        }
    };
    println!("{}", rendered.map_err(|err| err.to_string())?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{parse_key_value, parse_table, run_params, Cli, Command, ParamsCommand};
    use clap::Parser;
    use qiita_db::db::open_db_in_memory;
    use qiita_db::ParamTable;

    #[test]
    fn table_slugs_resolve() {
        assert_eq!(parse_table("sortmerna"), Ok(ParamTable::ProcessedSortmerna));
        assert!(parse_table("uclust").unwrap_err().contains("illumina, 454, sortmerna"));
    }

    #[test]
    fn key_value_requires_column_name() {
        assert_eq!(
            parse_key_value("threads=4"),
            Ok(("threads".to_string(), "4".to_string()))
        );
        assert_eq!(
            parse_key_value("reverse_primers="),
            Ok(("reverse_primers".to_string(), String::new()))
        );
        assert!(parse_key_value("=4").is_err());
        assert!(parse_key_value("threads").is_err());
    }

    #[test]
    fn create_collects_repeated_values() {
        let cli = Cli::try_parse_from([
            "qiita",
            "params",
            "create",
            "sortmerna",
            "eight threads",
            "--value",
            "threads=8",
            "--value",
            "similarity=0.97",
        ])
        .unwrap();

        match cli.command {
            Command::Params(ParamsCommand::Create {
                table,
                name,
                values,
            }) => {
                assert_eq!(table, ParamTable::ProcessedSortmerna);
                assert_eq!(name, "eight threads");
                assert_eq!(values.pairs().count(), 2);
            }
            _ => panic!("unexpected command"),
        }
    }

    #[test]
    fn qiime_file_is_written_only_for_a_loadable_set() {
        let conn = open_db_in_memory().unwrap();
        let dir = tempfile::tempdir().unwrap();

        let missing = dir.path().join("missing.txt");
        let err = run_params(
            &conn,
            ParamsCommand::QiimeFile {
                id: 404,
                out: missing.clone(),
            },
        )
        .unwrap_err();
        assert!(err.contains("not found"));
        assert!(!missing.exists());

        let written = dir.path().join("sortmerna.txt");
        run_params(
            &conn,
            ParamsCommand::QiimeFile {
                id: 1,
                out: written.clone(),
            },
        )
        .unwrap();
        let contents = std::fs::read_to_string(&written).unwrap();
        assert!(contents.contains("pick_otus:otu_picking_method\tsortmerna"));
    }
}
