use std::io::{self, BufWriter, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::{Parser, ValueEnum};
use nowdb::{split_statements, ClientConfig, Connection, NowdbError, ResultKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// Fields separated by ';'
    Text,
    /// One JSON array per row
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "nowclient", version)]
#[command(about = "Send statements to a NoWDB server", long_about = None)]
struct Args {
    /// Node name or address
    #[arg(short = 's', long)]
    server: Option<String>,

    /// Port
    #[arg(short, long)]
    port: Option<u16>,

    /// Database to use
    #[arg(short, long)]
    database: Option<String>,

    /// Statement to execute; statements are read from stdin otherwise
    #[arg(short = 'Q', long)]
    query: Option<String>,

    /// Print the processing time of each statement
    #[arg(short, long)]
    timing: bool,

    /// No feedback on stderr
    #[arg(short, long)]
    quiet: bool,

    /// User name
    #[arg(short, long)]
    user: Option<String>,

    #[arg(long)]
    password: Option<String>,

    /// Path to libnowdbclient.so
    #[arg(long)]
    library: Option<PathBuf>,

    /// Output format for rows
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,
}

impl Args {
    fn config(&self) -> Result<ClientConfig, NowdbError> {
        let mut config = ClientConfig::from_env()?;
        if let Some(server) = &self.server {
            config.host = server.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(library) = &self.library {
            config.library = library.clone();
        }
        if self.user.is_some() {
            config.user = self.user.clone();
        }
        if self.password.is_some() {
            config.password = self.password.clone();
        }
        if self.database.is_some() {
            config.database = self.database.clone();
        }
        Ok(config)
    }
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = args.config()?;

    let script = match &args.query {
        Some(query) => format!("{query};"),
        None => {
            let mut input = String::new();
            io::stdin().read_to_string(&mut input)?;
            input
        }
    };
    let statements = split_statements(&script)?;

    let con = Connection::connect(&config).map_err(|e| match &config.database {
        Some(db) if matches!(e, NowdbError::Server { .. }) => {
            format!("cannot use database {db}: {e}")
        }
        _ => format!("cannot get connection: {e}"),
    })?;

    let result = statements
        .iter()
        .try_for_each(|stmt| handle_statement(&con, stmt, args));
    con.close()?;
    result
}

fn handle_statement(
    con: &Connection,
    stmt: &str,
    args: &Args,
) -> Result<(), Box<dyn std::error::Error>> {
    let started = Instant::now();
    if !args.quiet {
        eprintln!("executing \"{stmt}\"");
    }

    let res = con.execute(stmt)?;
    if !res.is_ok() && res.code() != nowdb::codes::EOF {
        return Err(format!("ERROR {}: {}", res.code(), res.details()).into());
    }

    match res.kind() {
        ResultKind::Status => {
            if !args.quiet {
                eprintln!("OK");
            }
        }
        ResultKind::Report => {
            let report = res.report()?;
            eprintln!("{} rows affected", report.affected);
            eprintln!("{} errors", report.errors);
            eprintln!("{}us running time", report.runtime);
        }
        ResultKind::Cursor | ResultKind::Row => {
            let mut out = BufWriter::new(io::stdout().lock());
            for row in res {
                let row = row.map_err(|e| match e {
                    NowdbError::Server { .. } => format!("ERROR {e}"),
                    _ => format!("cannot fetch: {e}"),
                })?;
                match args.format {
                    Format::Text => writeln!(out, "{row}")?,
                    Format::Json => writeln!(out, "{}", serde_json::to_string(&row)?)?,
                }
            }
            out.flush()?;
        }
        other => return Err(format!("unexpected result: {other}").into()),
    }

    if args.timing {
        eprintln!("processing time: {}us", started.elapsed().as_micros());
    }
    Ok(())
}
