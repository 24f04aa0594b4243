use anyhow::Result;
use clap::Parser;
use common::pretty::{self, TableStyleKind};
use common::Config;
use database::{Database, QueryResult};
use std::io::{self, Write};
use std::path::PathBuf;

const DEFAULT_DATA_DIR: &str = "./db_data";

#[derive(Parser, Debug)]
#[command(name = "asteroiddb", about = "Interactive SQL console for the toy database")]
struct Args {
    /// Directory containing the catalog and table files
    #[arg(long, default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,
    /// Number of pages the buffer pool keeps resident per table file
    #[arg(long, default_value_t = 128)]
    buffer_pool_pages: usize,
    /// Execute the provided SQL and exit instead of starting the REPL
    #[arg(short = 'e', long = "execute")]
    execute: Option<String>,
}

fn main() -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let config = Config::builder()
        .data_dir(args.data_dir)
        .buffer_pool_pages(args.buffer_pool_pages)
        .build();
    let mut db = Database::open(config)?;

    if let Some(sql) = args.execute {
        run_statement(&mut db, &sql);
        db.close()?;
        return Ok(());
    }

    repl(db)
}

fn repl(mut db: Database) -> Result<()> {
    let stdin = io::stdin();
    let mut line = String::new();

    loop {
        print!("AsteroidDB> ");
        io::stdout().flush()?;

        line.clear();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }

        run_statement(&mut db, line);
    }

    db.close()?;
    Ok(())
}

fn run_statement(db: &mut Database, sql: &str) {
    match db.execute(sql) {
        Ok(results) => {
            for result in results {
                print_result(result);
            }
        }
        Err(e) => println!("Error: {e}"),
    }
}

fn print_result(result: QueryResult) {
    match result {
        QueryResult::Created => println!("Table created."),
        QueryResult::Inserted(n) => println!("{n} row(s) inserted."),
        QueryResult::Deleted(n) => println!("{n} row(s) deleted."),
        QueryResult::Rows(batch) => {
            println!("{}", pretty::render_record_batch(&batch, TableStyleKind::Modern));
        }
    }
}
