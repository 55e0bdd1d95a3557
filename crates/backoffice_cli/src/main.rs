//! Back office command line.
//!
//! # Responsibility
//! - Expose task import/listing and vault operations from a terminal.
//! - Report every failure as one `error:` line on stderr with exit code 1.

use std::io::BufRead;
use std::path::PathBuf;
use std::process::ExitCode;

use backoffice_core::db::open_db;
use backoffice_core::{
    init_logging, BackofficeConfig, CsvImportOptions, NewVaultItem, ProjectRepository,
    RemoteVaultCipher, SqliteProjectRepository, SqliteTaskRepository, SqliteVaultRepository,
    SystemClock, TaskListQuery, TaskService, TaskStatus, VaultItemType, VaultListQuery,
    VaultRepository, VaultService,
};
use clap::{Parser, Subcommand};
use log::{error, info};
use rusqlite::Connection;
use uuid::Uuid;

#[derive(Parser)]
#[command(author, version, about = "Portfolio back office CLI")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import tasks from a CSV/TSV export.
    Import {
        file: PathBuf,
        /// Project for rows without a project cell; created if missing once
        /// the file parses.
        #[arg(long)]
        project: Option<String>,
        /// One of `,` `;` `|` or `tab`.
        #[arg(long, default_value = ",")]
        delimiter: String,
    },
    /// List active tasks.
    Tasks {
        #[arg(long)]
        project: Option<String>,
        /// Status identifier, e.g. `in_progress`.
        #[arg(long)]
        status: Option<String>,
    },
    /// List active projects.
    Projects,
    /// Encrypted secrets.
    Vault {
        #[command(subcommand)]
        command: VaultCommand,
    },
}

#[derive(Subcommand)]
enum VaultCommand {
    /// List items without decrypting anything.
    List {
        #[arg(long)]
        search: Option<String>,
    },
    /// Add an item; the secret is read from the first line of stdin.
    Add {
        #[arg(long)]
        name: String,
        /// password | api_key | token | ssh_key | secure_note | other
        #[arg(long = "type", default_value = "password")]
        item_type: String,
        #[arg(long)]
        platform: Option<String>,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Decrypt and print one secret.
    Reveal { id: Uuid },
}

fn main() -> ExitCode {
    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), String> {
    let config = BackofficeConfig::from_env().map_err(|e| e.to_string())?;
    if let Some(log_dir) = &config.log_dir {
        init_logging(&config.log_level, log_dir).map_err(|e| e.to_string())?;
    }
    let conn = open_db(&config.db_path).map_err(|e| e.to_string())?;

    let name = args.command.name();
    info!("event=cli_command module=cli status=start command={name}");
    let result = match args.command {
        Command::Import {
            file,
            project,
            delimiter,
        } => import(&conn, file, project.as_deref(), &delimiter),
        Command::Tasks { project, status } => {
            list_tasks(&conn, project.as_deref(), status.as_deref())
        }
        Command::Projects => {
            let projects = SqliteProjectRepository::new(&conn)
                .list_projects(false)
                .map_err(|e| e.to_string())?;
            for project in projects {
                println!(
                    "{}\t{}\t{}",
                    project.id,
                    project.name,
                    project.description.unwrap_or_default()
                );
            }
            Ok(())
        }
        Command::Vault { command } => vault(&conn, &config, command),
    };
    match &result {
        Ok(()) => info!("event=cli_command module=cli status=ok command={name}"),
        Err(_) => error!("event=cli_command module=cli status=error command={name}"),
    }
    result
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Self::Import { .. } => "import",
            Self::Tasks { .. } => "tasks",
            Self::Projects => "projects",
            Self::Vault {
                command: VaultCommand::List { .. },
            } => "vault_list",
            Self::Vault {
                command: VaultCommand::Add { .. },
            } => "vault_add",
            Self::Vault {
                command: VaultCommand::Reveal { .. },
            } => "vault_reveal",
        }
    }
}

fn import(
    conn: &Connection,
    file: PathBuf,
    project: Option<&str>,
    delimiter: &str,
) -> Result<(), String> {
    let delimiter = parse_delimiter(delimiter)?;
    let text = std::fs::read_to_string(&file)
        .map_err(|e| format!("cannot read `{}`: {e}", file.display()))?;
    let options = CsvImportOptions {
        delimiter,
        default_project_name: project.map(str::to_string),
        ..CsvImportOptions::default()
    };

    let service = TaskService::new(
        SqliteTaskRepository::new(conn),
        SqliteProjectRepository::new(conn),
    );
    let report = service
        .import_csv(&text, &options)
        .map_err(|e| e.to_string())?;

    println!(
        "ok: imported {} task(s), skipped {} row(s)",
        report.imported, report.skipped
    );
    for project in &report.created_projects {
        println!("created project {}", project.name);
    }
    Ok(())
}

fn list_tasks(
    conn: &Connection,
    project: Option<&str>,
    status: Option<&str>,
) -> Result<(), String> {
    let projects = SqliteProjectRepository::new(conn);
    let project_id = match project {
        Some(name) => Some(
            projects
                .find_project_by_name(name)
                .map_err(|e| e.to_string())?
                .ok_or_else(|| format!("no project named `{name}`"))?
                .id,
        ),
        None => None,
    };
    let status = match status {
        Some(raw) => Some(TaskStatus::parse(raw).ok_or_else(|| {
            let known: Vec<&str> = TaskStatus::ALL.iter().map(|s| s.as_str()).collect();
            format!("unknown status `{raw}`; expected one of {}", known.join(", "))
        })?),
        None => None,
    };

    let service = TaskService::new(SqliteTaskRepository::new(conn), projects);
    let tasks = service
        .list_tasks(&TaskListQuery {
            project_id,
            status,
            ..TaskListQuery::default()
        })
        .map_err(|e| e.to_string())?;
    for task in tasks {
        println!(
            "{}\t{}\t{}\t{}\t{}",
            task.id,
            task.status.as_str(),
            task.priority.as_str(),
            task.due_date.map(|d| d.to_string()).unwrap_or_default(),
            task.title
        );
    }
    Ok(())
}

fn vault(
    conn: &Connection,
    config: &BackofficeConfig,
    command: VaultCommand,
) -> Result<(), String> {
    if let VaultCommand::List { search } = command {
        return list_vault(conn, search);
    }

    let settings = config.vault_function().map_err(|e| e.to_string())?;
    let cipher = RemoteVaultCipher::new(
        settings.functions_url,
        settings.function_name,
        settings.api_key,
    )
    .map_err(|e| e.to_string())?;
    let mut service = VaultService::new(
        SqliteVaultRepository::new(conn),
        cipher,
        SystemClock,
        config.reveal_ttl_ms,
    );

    match command {
        VaultCommand::List { search } => list_vault(conn, search),
        VaultCommand::Add {
            name,
            item_type,
            platform,
            username,
            notes,
        } => {
            let item_type = VaultItemType::parse(&item_type)
                .ok_or_else(|| format!("unknown vault item type `{item_type}`"))?;
            let item = service
                .create_item(NewVaultItem {
                    name,
                    item_type,
                    platform,
                    username,
                    secret: read_secret()?,
                    notes,
                })
                .map_err(|e| e.to_string())?;
            println!("ok: stored {}", item.id);
            Ok(())
        }
        VaultCommand::Reveal { id } => {
            let plaintext = service.reveal(id).map_err(|e| e.to_string())?;
            println!("{plaintext}");
            Ok(())
        }
    }
}

fn list_vault(conn: &Connection, search: Option<String>) -> Result<(), String> {
    let items = SqliteVaultRepository::new(conn)
        .list_items(&VaultListQuery {
            item_type: None,
            search,
        })
        .map_err(|e| e.to_string())?;
    for item in items {
        println!(
            "{}\t{}\t{}\t{}",
            item.id,
            item.item_type.as_str(),
            item.platform.unwrap_or_default(),
            item.name
        );
    }
    Ok(())
}

fn parse_delimiter(raw: &str) -> Result<char, String> {
    match raw {
        "tab" | "\\t" => Ok('\t'),
        _ => {
            let mut chars = raw.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(c),
                _ => Err(format!("delimiter must be a single character, got `{raw}`")),
            }
        }
    }
}

fn read_secret() -> Result<String, String> {
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|e| format!("cannot read secret from stdin: {e}"))?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
