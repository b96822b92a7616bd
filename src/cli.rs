//! CLI argument parsing and command handlers

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;

use crate::error::SearchError;
use crate::formatter::OutputFormatter;
use crate::indexer::Indexer;
use crate::output;
use crate::query::{QueryOptions, SearchEngine};
use crate::store::IndexStore;

/// fsindex: search .NET and F# APIs by name or by type signature
#[derive(Parser, Debug)]
#[command(
    name = "fsindex",
    version,
    about = "Search a catalog of .NET types by member name or type signature",
    long_about = "fsindex indexes catalog documents describing .NET types and answers \
                  queries like 'Parse' (members named Parse...) or \
                  ': int -> string -> _' (members taking int then string).\n\n\
                  A leading or trailing '_' in a signature matches any sequence of types."
)]
pub struct Cli {
    /// Enable verbose logging (can be repeated for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Directory holding the .fsindex/ index
    #[arg(long, global = true, value_name = "DIR", default_value = ".")]
    pub root: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the index from catalog files
    ///
    /// Each PATH is a catalog file or a directory searched for .json/.jsonl files.
    /// Every run replaces the previous index contents.
    Index {
        /// Catalog files or directories
        #[arg(value_name = "PATH", required = true)]
        paths: Vec<PathBuf>,

        /// Delete the whole index directory first (use after upgrading fsindex)
        #[arg(short, long)]
        force: bool,

        /// Suppress all output (no progress bar, no summary)
        #[arg(short, long)]
        quiet: bool,
    },

    /// Search the index
    ///
    /// Query forms:
    ///   Name                     members and types whose name starts with Name
    ///   : int -> string -> _     signatures starting with int, string
    ///   : _ -> bool              signatures ending with bool
    ///   : int -> str             last type matched as a prefix
    ///   : (int * string) -> bool tuples, nested signatures, postfix generics
    Query {
        /// Query text
        text: String,

        /// Output format as JSON
        #[arg(long)]
        json: bool,

        /// Pretty-print JSON output (only with --json)
        #[arg(long)]
        pretty: bool,

        /// Maximum number of results (at most the limit in config.toml)
        #[arg(short, long)]
        limit: Option<usize>,

        /// Disable colors and formatting
        #[arg(long)]
        plain: bool,
    },

    /// List the types defined in an assembly
    Assembly {
        /// Assembly name, e.g. FSharp.Core
        name: String,

        /// Output format as JSON
        #[arg(long)]
        json: bool,

        /// Pretty-print JSON output (only with --json)
        #[arg(long)]
        pretty: bool,
    },

    /// Show which assemblies define a type
    Type {
        /// Full type name, e.g. System.Int32
        full_name: String,

        /// Output format as JSON
        #[arg(long)]
        json: bool,

        /// Pretty-print JSON output (only with --json)
        #[arg(long)]
        pretty: bool,
    },

    /// Start an HTTP API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "7878")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Show index statistics
    Stats {
        /// Output format as JSON
        #[arg(long)]
        json: bool,

        /// Pretty-print JSON output (only with --json)
        #[arg(long)]
        pretty: bool,
    },

    /// Delete the index
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

impl Cli {
    pub fn execute(self) -> Result<()> {
        let log_level = match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
            .init();

        let store = IndexStore::new(&self.root);

        match self.command {
            Command::Index { paths, force, quiet } => handle_index(store, &paths, force, quiet),
            Command::Query { text, json, pretty, limit, plain } => {
                handle_query(store, &text, json, pretty, limit, plain)
            }
            Command::Assembly { name, json, pretty } => handle_assembly(store, &name, json, pretty),
            Command::Type { full_name, json, pretty } => handle_type(store, &full_name, json, pretty),
            Command::Serve { port, host } => handle_serve(store, port, host),
            Command::Stats { json, pretty } => handle_stats(store, json, pretty),
            Command::Clear { yes } => handle_clear(store, yes),
        }
    }
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let json_output = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", json_output);
    Ok(())
}

/// Warn when the index was written by a build with a different on-disk format
fn check_schema(store: &IndexStore) {
    match store.schema_is_current() {
        Ok(true) => {}
        Ok(false) => output::warn(
            "The index was built by a different version of fsindex and may give wrong results.\n\
             Run 'fsindex index --force <PATH>' to rebuild it.",
        ),
        Err(e) => log::warn!("Failed to check index version: {}", e),
    }
}

/// Open a search engine over an existing index, with the configured row limit
fn open_engine(store: IndexStore) -> Result<SearchEngine<IndexStore>> {
    if !store.exists() {
        anyhow::bail!(
            "No index found in {}.\n\
             \n\
             Run 'fsindex index <PATH>' to build it from catalog files first.\n\
             \n\
             Example:\n\
             $ fsindex index catalog/          # Index every .json file under catalog/\n\
             $ fsindex query ': int -> _'      # Search by signature",
            store.path().display()
        );
    }

    check_schema(&store);
    let config = store.config()?;
    Ok(SearchEngine::new(store).with_limit(config.search.limit))
}

/// Handle the `index` subcommand
fn handle_index(store: IndexStore, paths: &[PathBuf], force: bool, quiet: bool) -> Result<()> {
    log::info!("Starting index build");

    if force {
        log::info!("Force rebuild requested, clearing existing index");
        store.clear()?;
    }

    let settings = store.config()?.index;
    let start = Instant::now();
    let stats = Indexer::new(store, settings).index(paths, !quiet)?;

    if !quiet {
        println!("Indexing complete in {:.2?}!", start.elapsed());
        println!("  Types indexed:     {}", stats.total_types);
        println!("  Members indexed:   {}", stats.total_members);
        if stats.skipped_documents > 0 {
            println!("  Documents skipped: {}", stats.skipped_documents);
        }
        println!("  Index size:        {}", format_bytes(stats.index_size_bytes));
    }

    Ok(())
}

/// Handle the `query` subcommand
fn handle_query(
    store: IndexStore,
    text: &str,
    as_json: bool,
    pretty_json: bool,
    limit: Option<usize>,
    plain: bool,
) -> Result<()> {
    let engine = open_engine(store)?;
    let options = QueryOptions { limit, token: None };

    let start = Instant::now();
    let response = engine.search_with(text, &options)?;
    log::info!("Query took {:?}", start.elapsed());

    if as_json {
        print_json(&response, pretty_json)
    } else {
        OutputFormatter::new(plain).format_response(&response);
        Ok(())
    }
}

/// Handle the `assembly` subcommand
fn handle_assembly(store: IndexStore, name: &str, as_json: bool, pretty_json: bool) -> Result<()> {
    let types = open_engine(store)?.types_in_assembly(name)?;

    if as_json {
        return print_json(&types, pretty_json);
    }

    if types.is_empty() {
        println!("No types found in assembly '{}'.", name);
    }
    for key in types {
        println!("{}", key.full_name());
    }
    Ok(())
}

/// Handle the `type` subcommand
fn handle_type(store: IndexStore, full_name: &str, as_json: bool, pretty_json: bool) -> Result<()> {
    let refs = open_engine(store)?.find_type(full_name)?;

    if as_json {
        return print_json(&refs, pretty_json);
    }

    if refs.is_empty() {
        println!("Type '{}' not found.", full_name);
    }
    for assembly in refs {
        println!(
            "{}  (rev {})",
            assembly.assembly_name.as_deref().unwrap_or("<unknown assembly>"),
            assembly.revision
        );
    }
    Ok(())
}

/// Format bytes into human-readable size (KB, MB, GB)
fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Handle the `serve` subcommand
fn handle_serve(store: IndexStore, port: u16, host: String) -> Result<()> {
    log::info!("Starting HTTP server on {}:{}", host, port);

    let engine = open_engine(store)?;

    println!("Starting fsindex HTTP server...");
    println!("  Address: http://{}:{}", host, port);
    println!("\nEndpoints:");
    println!("  GET  /search?q=<query>&limit=<n>&token=<token>");
    println!("  GET  /stats");
    println!("  GET  /health");
    println!("\nPress Ctrl+C to stop.");

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async { run_server(engine, port, host).await })
}

/// Run the HTTP server
async fn run_server(engine: SearchEngine<IndexStore>, port: u16, host: String) -> Result<()> {
    use axum::{
        extract::{Query as AxumQuery, State},
        http::StatusCode,
        response::{IntoResponse, Json},
        routing::get,
        Router,
    };
    use std::sync::Arc;
    use tower_http::cors::{Any, CorsLayer};

    use crate::models::{IndexStats, SearchResponse};

    type AppState = Arc<SearchEngine<IndexStore>>;

    // Query parameters for GET /search
    #[derive(Debug, serde::Deserialize)]
    struct SearchParams {
        #[serde(default)]
        q: String,
        #[serde(default)]
        limit: Option<usize>,
        #[serde(default)]
        token: Option<String>,
    }

    // GET /search endpoint
    async fn handle_search_endpoint(
        State(engine): State<AppState>,
        AxumQuery(params): AxumQuery<SearchParams>,
    ) -> Result<Json<SearchResponse>, (StatusCode, String)> {
        log::info!("Search request: q={}", params.q);

        let options = QueryOptions {
            limit: params.limit,
            token: params.token,
        };

        let result = tokio::task::spawn_blocking(move || engine.search_with(&params.q, &options))
            .await
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Search task failed: {}", e)))?;

        result.map(Json).map_err(|e| search_error_response(&e))
    }

    // GET /stats endpoint
    async fn handle_stats_endpoint(
        State(engine): State<AppState>,
    ) -> Result<Json<IndexStats>, (StatusCode, String)> {
        log::info!("Stats request");

        let stats = tokio::task::spawn_blocking(move || engine.index().stats())
            .await
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Stats task failed: {}", e)))?;

        stats.map(Json).map_err(|e| {
            log::error!("Stats error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Failed to get stats: {:#}", e))
        })
    }

    async fn handle_health() -> impl IntoResponse {
        (StatusCode::OK, "fsindex is running")
    }

    let state: AppState = Arc::new(engine);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/search", get(handle_search_endpoint))
        .route("/stats", get(handle_stats_endpoint))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", addr, e))?;

    log::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}

/// HTTP status and body for a failed search
///
/// Query errors are the caller's fault (400). Storage errors keep their whole
/// context chain in the body (500).
fn search_error_response(error: &SearchError) -> (axum::http::StatusCode, String) {
    use axum::http::StatusCode;

    if error.is_query_error() {
        return (StatusCode::BAD_REQUEST, error.to_string());
    }

    log::error!("Search error: {:#}", error);
    (StatusCode::INTERNAL_SERVER_ERROR, format!("Search failed: {:#}", error))
}

/// Handle the `stats` subcommand
fn handle_stats(store: IndexStore, as_json: bool, pretty_json: bool) -> Result<()> {
    log::info!("Showing index statistics");

    if !store.exists() {
        anyhow::bail!("No index found in {}. Run 'fsindex index <PATH>' first.", store.path().display());
    }

    check_schema(&store);
    let stats = store.stats()?;

    if as_json {
        return print_json(&stats, pretty_json);
    }

    println!("fsindex Index Statistics");
    println!("========================");
    println!("Types indexed:     {}", stats.total_types);
    println!("Members indexed:   {}", stats.total_members);
    println!("Documents skipped: {}", stats.skipped_documents);
    println!("Index size:        {}", format_bytes(stats.index_size_bytes));
    println!("Last updated:      {}", stats.last_updated);

    if !stats.rows_by_view.is_empty() {
        println!("\nRows by view:");
        let mut views: Vec<_> = stats.rows_by_view.iter().collect();
        views.sort();
        for (view, count) in views {
            println!("  {:<22} {:>8}", view, count);
        }
    }

    Ok(())
}

/// Handle the `clear` subcommand
fn handle_clear(store: IndexStore, skip_confirm: bool) -> Result<()> {
    if !store.exists() {
        println!("No index to clear.");
        return Ok(());
    }

    if !skip_confirm {
        println!("This will delete the fsindex index at: {:?}", store.path());
        print!("Are you sure? [y/N] ");
        use std::io::{self, Write};
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Cancelled.");
            return Ok(());
        }
    }

    store.clear()?;
    output::success("Index cleared successfully.");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 bytes");
        assert_eq!(format_bytes(2048), "2.00 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.00 MB");
    }

    #[test]
    fn test_parse_query_command() {
        let cli = Cli::try_parse_from(["fsindex", "query", ": int -> _", "--limit", "5", "--json"]).unwrap();
        match cli.command {
            Command::Query { text, limit, json, .. } => {
                assert_eq!(text, ": int -> _");
                assert_eq!(limit, Some(5));
                assert!(json);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_search_error_response() {
        use axum::http::StatusCode;

        let (status, body) = search_error_response(&SearchError::QueryConflict);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "can't search by name and prototype yet");

        let storage = anyhow::anyhow!("database disk image is malformed").context("Failed to scan by-name");
        let (status, body) = search_error_response(&SearchError::Storage(storage));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            "Search failed: Failed to scan by-name: database disk image is malformed"
        );
    }

    #[test]
    fn test_index_requires_path() {
        assert!(Cli::try_parse_from(["fsindex", "index"]).is_err());

        let cli = Cli::try_parse_from(["fsindex", "--root", "/tmp/x", "index", "a.json", "dir"]).unwrap();
        assert_eq!(cli.root, PathBuf::from("/tmp/x"));
        assert!(matches!(cli.command, Command::Index { ref paths, .. } if paths.len() == 2));
    }
}
