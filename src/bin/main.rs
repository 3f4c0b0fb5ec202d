//! sheetsql CLI - stage sheet ranges into SQL and export results back
//!
//! Usage:
//!   sheetsql spreadsheets
//!   sheetsql tabs <spreadsheet>
//!   sheetsql load <spreadsheet> <tab> [--range A1:Z1000]
//!   sheetsql query <sql> [--format table|csv|json]
//!   sheetsql export <sql> [--dest <spreadsheet>]
//!   sheetsql create-dest [--title <title>]
//!   sheetsql run <spreadsheet> <tab> <sql> [--range A1:Z1000] [--dest <spreadsheet>]
//!   sheetsql serve
//!
//! `load`, `query` and `export` share staged data across invocations only
//! when `[engine] path` (or `--database`) names a file.

use clap::{Parser, Subcommand, ValueEnum};
use sheetsql::config::{Backend, Settings, SettingsError};
use sheetsql::engine::{ResultSet, SqliteEngine};
use sheetsql::logging::init_logging;
use sheetsql::pipeline::{LoadReport, Session};
use sheetsql::server;
use sheetsql::sheets::{
    CredentialProvider, EnvToken, GoogleSheets, SheetDestination, SheetSource, StaticToken,
    Workbook,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "sheetsql")]
#[command(about = "Load spreadsheet ranges into an embedded SQL engine, query them, and export the results")]
#[command(version)]
struct Cli {
    /// Path to a sheetsql.toml config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Engine database file (overrides [engine] path)
    #[arg(long, global = true)]
    database: Option<String>,

    /// Workbook JSON file (overrides [sheets] workbook_path)
    #[arg(long, global = true)]
    workbook: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List spreadsheets visible to the source backend
    Spreadsheets,

    /// List the tabs of a spreadsheet
    Tabs {
        /// Spreadsheet id
        spreadsheet: String,
    },

    /// Stage a range into the staging table
    Load {
        /// Spreadsheet id
        spreadsheet: String,

        /// Tab title
        tab: String,

        /// A1 range (configured default if not specified)
        #[arg(short, long)]
        range: Option<String>,
    },

    /// Run SQL against the staged data
    Query {
        sql: String,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Run SQL and export the result to a new tab
    Export {
        sql: String,

        /// Destination spreadsheet id (a new spreadsheet is created if not specified)
        #[arg(short, long)]
        dest: Option<String>,
    },

    /// Create a destination spreadsheet
    CreateDest {
        #[arg(short, long)]
        title: Option<String>,
    },

    /// Load, query and optionally export in one process
    Run {
        /// Spreadsheet id
        spreadsheet: String,

        /// Tab title
        tab: String,

        sql: String,

        #[arg(short, long)]
        range: Option<String>,

        /// Export the result to this spreadsheet
        #[arg(short, long)]
        dest: Option<String>,

        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Answer NDJSON requests on stdin/stdout
    Serve,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Aligned text table
    Table,
    /// RFC 4180 CSV
    Csv,
    /// JSON array of row objects
    Json,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut settings = match load_settings(cli.config.as_ref()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(database) = cli.database {
        settings.engine.path = database;
    }
    if let Some(workbook) = cli.workbook {
        settings.sheets.workbook_path = workbook.display().to_string();
    }

    init_logging(&settings.logging);

    let session = match build_session(&settings).await {
        Ok(s) => s,
        Err(message) => {
            eprintln!("Error: {}", message);
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Spreadsheets => cmd_spreadsheets(&session).await,
        Commands::Tabs { spreadsheet } => cmd_tabs(&session, &spreadsheet).await,
        Commands::Load {
            spreadsheet,
            tab,
            range,
        } => cmd_load(&session, &spreadsheet, &tab, range.as_deref()).await,
        Commands::Query { sql, format } => cmd_query(&session, &sql, format).await,
        Commands::Export { sql, dest } => cmd_export(&session, &sql, dest.as_deref()).await,
        Commands::CreateDest { title } => cmd_create_dest(&session, title.as_deref()).await,
        Commands::Run {
            spreadsheet,
            tab,
            sql,
            range,
            dest,
            format,
        } => {
            let code = cmd_load(&session, &spreadsheet, &tab, range.as_deref()).await;
            if code != ExitCode::SUCCESS {
                return code;
            }
            match dest {
                Some(dest) => cmd_export(&session, &sql, Some(&dest)).await,
                None => cmd_query(&session, &sql, format).await,
            }
        }
        Commands::Serve => cmd_serve(&session).await,
    }
}

fn load_settings(path: Option<&PathBuf>) -> Result<Settings, SettingsError> {
    match path {
        Some(path) => Settings::from_file(path),
        None => Settings::load(),
    }
}

async fn build_session(settings: &Settings) -> Result<Session, String> {
    let db_path = settings.engine.resolved_path().map_err(|e| e.to_string())?;
    let engine = SqliteEngine::open(&db_path)
        .map_err(|e| format!("cannot open engine at '{}': {}", db_path, e))?;

    let (source, destination): (Arc<dyn SheetSource>, Arc<dyn SheetDestination>) =
        match settings.sheets.backend {
            Backend::Workbook => {
                let path = settings
                    .sheets
                    .resolved_workbook_path()
                    .map_err(|e| e.to_string())?;
                let workbook = Workbook::open(&path)
                    .await
                    .map_err(|e| format!("cannot open workbook '{}': {}", path.display(), e))?;
                let workbook = Arc::new(workbook);
                let source: Arc<dyn SheetSource> = workbook.clone();
                (source, workbook as Arc<dyn SheetDestination>)
            }
            Backend::Google => {
                // Unset token variable: read it per request instead.
                let credentials: Arc<dyn CredentialProvider> =
                    match settings.sheets.resolved_token() {
                        Ok(token) => Arc::new(StaticToken::new(token)),
                        Err(SettingsError::MissingEnvVar(var)) => Arc::new(EnvToken::new(var)),
                        Err(e) => return Err(e.to_string()),
                    };
                let client = GoogleSheets::with_endpoints(
                    credentials,
                    &settings.sheets.sheets_api,
                    &settings.sheets.drive_api,
                    Duration::from_secs(settings.sheets.timeout_secs),
                )
                .map_err(|e| e.to_string())?
                .value_input_option(settings.export.value_input_option.clone());
                let client = Arc::new(client);
                let source: Arc<dyn SheetSource> = client.clone();
                (source, client as Arc<dyn SheetDestination>)
            }
        };

    Ok(Session::new(
        Box::new(engine),
        source,
        destination,
        settings.session_settings(),
    ))
}

fn report_error(err: &sheetsql::pipeline::PipelineError) -> ExitCode {
    eprintln!("Error [{}]: {}", err.code(), err.user_message());
    eprintln!("  {}", err.detail());
    ExitCode::FAILURE
}

async fn cmd_spreadsheets(session: &Session) -> ExitCode {
    match session.list_spreadsheets().await {
        Ok(spreadsheets) => {
            if spreadsheets.is_empty() {
                println!("No spreadsheets found.");
            }
            for s in spreadsheets {
                println!("{}\t{}", s.id, s.name);
            }
            ExitCode::SUCCESS
        }
        Err(e) => report_error(&e),
    }
}

async fn cmd_tabs(session: &Session, spreadsheet: &str) -> ExitCode {
    match session.list_tabs(spreadsheet).await {
        Ok(tabs) => {
            for tab in tabs {
                println!("{}", tab.title);
            }
            ExitCode::SUCCESS
        }
        Err(e) => report_error(&e),
    }
}

async fn cmd_load(
    session: &Session,
    spreadsheet: &str,
    tab: &str,
    range: Option<&str>,
) -> ExitCode {
    let selected = match session.select_source(spreadsheet, tab, range).await {
        Ok(r) => r,
        Err(e) => return report_error(&e),
    };
    match session.load(&selected).await {
        Ok(report) => {
            print_load_report(&report);
            ExitCode::SUCCESS
        }
        Err(e) => report_error(&e),
    }
}

fn print_load_report(report: &LoadReport) {
    println!("Loaded {} rows into {}", report.rows_submitted, report.table);
    println!("Columns: {}", report.columns.join(", "));
    if let Some(warning) = &report.warning {
        eprintln!("Warning: {}", warning);
    }
}

async fn cmd_query(session: &Session, sql: &str, format: OutputFormat) -> ExitCode {
    match session.query(sql).await {
        Ok(result) => {
            print_result(&result, format);
            ExitCode::SUCCESS
        }
        Err(e) => report_error(&e),
    }
}

fn print_result(result: &ResultSet, format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if result.has_columns() {
                print!("{}", result.render_table());
                println!("({} rows)", result.len());
            } else {
                println!("OK");
            }
        }
        OutputFormat::Csv => match result.to_csv() {
            Ok(csv) => print!("{}", csv),
            Err(e) => eprintln!("Error encoding result: {}", e),
        },
        OutputFormat::Json => match serde_json::to_string_pretty(&result.records()) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Error encoding result: {}", e),
        },
    }
}

async fn cmd_export(session: &Session, sql: &str, dest: Option<&str>) -> ExitCode {
    let dest = match dest {
        Some(d) => d.to_string(),
        None => match session.create_destination(None).await {
            Ok(created) => {
                println!("Created spreadsheet {} ({})", created.name, created.id);
                created.id
            }
            Err(e) => return report_error(&e),
        },
    };
    match session.query_and_export(sql, Some(&dest)).await {
        Ok(done) => {
            println!(
                "Exported {} rows to '{}' in {}",
                done.export.rows_written, done.export.tab_title, done.export.spreadsheet_id
            );
            ExitCode::SUCCESS
        }
        Err(e) => report_error(&e),
    }
}

async fn cmd_create_dest(session: &Session, title: Option<&str>) -> ExitCode {
    match session.create_destination(title).await {
        Ok(created) => {
            println!("{}\t{}", created.id, created.name);
            ExitCode::SUCCESS
        }
        Err(e) => report_error(&e),
    }
}

async fn cmd_serve(session: &Session) -> ExitCode {
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    match server::serve(session, stdin, stdout).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
