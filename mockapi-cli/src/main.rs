use actix_web::{middleware, web, HttpServer};
use clap::{Parser, Subcommand, ValueEnum};
use mockapi::watcher::FileWatcher;
use mockapi::{ReloadOutcome, Store};
use mockapi_server::{build_app, AppState, ServerConfig};
use mockapi_typegen::{InferOptions, Language};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// mockapi: instant REST API from a JSON file
#[derive(Parser)]
#[command(name = "mockapi", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Yaml,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum Lang {
    #[value(alias = "typescript")]
    Ts,
    Rust,
}

impl From<Lang> for Language {
    fn from(lang: Lang) -> Self {
        match lang {
            Lang::Ts => Language::TypeScript,
            Lang::Rust => Language::Rust,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Serve a CRUD REST API over every collection in the file
    Serve {
        /// Path to the JSON data file
        path: PathBuf,
        /// Bind host
        #[arg(long, env = "MOCKAPI_HOST", default_value = "0.0.0.0")]
        host: String,
        /// Bind port
        #[arg(long, short, env = "MOCKAPI_PORT", default_value_t = 3000)]
        port: u16,
        /// Delay every collection response by this many milliseconds
        #[arg(long, env = "MOCKAPI_DELAY", default_value_t = 0)]
        delay: u64,
        /// Do not watch the file and hot-reload on change
        #[arg(long)]
        no_reload: bool,
    },

    /// Generate type declarations inferred from the records
    Types {
        /// Path to the JSON data file
        path: PathBuf,
        /// Output language
        #[arg(long, value_enum, default_value = "ts")]
        lang: Lang,
        /// Levels of nested arrays/objects to infer structurally
        #[arg(long, default_value_t = 1)]
        depth: usize,
        /// Write to this file instead of stdout
        #[arg(long, short)]
        out: Option<PathBuf>,
    },

    /// Check the file for duplicate ids, missing ids and mixed field types
    Validate {
        /// Path to the JSON data file
        path: PathBuf,
        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: OutputFormat,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Command::Serve {
            path,
            host,
            port,
            delay,
            no_reload,
        } => serve(&path, &host, port, Duration::from_millis(delay), !no_reload),

        Command::Types {
            path,
            lang,
            depth,
            out,
        } => {
            let options = InferOptions { max_depth: depth };
            let output = mockapi_typegen::generate_from_file(&path, lang.into(), &options)?;
            match out {
                Some(out) => {
                    std::fs::write(&out, output)
                        .map_err(|e| format!("Failed to write '{}': {e}", out.display()))?;
                    log::info!("Wrote types for {} to {}", path.display(), out.display());
                }
                None => print!("{output}"),
            }
            Ok(())
        }

        Command::Validate { path, format } => {
            let content = std::fs::read_to_string(&path)
                .map_err(|e| format!("Failed to read '{}': {e}", path.display()))?;
            let data: serde_json::Value = serde_json::from_str(&content)
                .map_err(|e| format!("Invalid JSON in {}: {e}", path.display()))?;

            let issues = mockapi::validate_value(&data);
            let mut listed = Vec::with_capacity(issues.len());
            for issue in &issues {
                let mut entry = serde_json::to_value(issue)?;
                entry["message"] = serde_json::Value::String(issue.to_string());
                listed.push(entry);
            }
            print_output(
                &serde_json::json!({ "ok": issues.is_empty(), "issues": listed }),
                format,
            )?;

            if issues.is_empty() {
                Ok(())
            } else {
                Err(format!("{} issue(s) found in {}", issues.len(), path.display()).into())
            }
        }
    }
}

fn serve(
    path: &Path,
    host: &str,
    port: u16,
    delay: Duration,
    reload: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let started = Instant::now();
    let store = Store::open(path)?;
    let load_ms = started.elapsed().as_secs_f64() * 1000.0;

    println!("mockapi: loaded in {load_ms:.1} ms");
    print_profile(&store)?;

    let state = web::Data::new(AppState::new(Arc::new(store), ServerConfig { delay }));

    println!("\n  endpoints:");
    for (method, route) in state.routes().endpoints() {
        println!("    {method:<6} {route}");
    }

    if reload {
        start_hot_reload(path, state.clone())?;
        println!("  hot-reload: enabled");
    }

    println!("\n  Listening on http://{host}:{port}\n");
    let addr = (host.to_string(), port);
    actix_web::rt::System::new().block_on(async move {
        HttpServer::new(move || build_app(state.clone()).wrap(middleware::Logger::default()))
            .bind(addr)?
            .run()
            .await
    })?;
    Ok(())
}

/// Watch the backing file and reload the store (and routes) when it changes.
fn start_hot_reload(
    path: &Path,
    state: web::Data<AppState>,
) -> Result<(), Box<dyn std::error::Error>> {
    let watcher = FileWatcher::start(path)?;
    std::thread::spawn(move || {
        for event in watcher.event_rx.iter() {
            let started = Instant::now();
            match state.reload() {
                Ok(ReloadOutcome::Unchanged) => {
                    log::debug!("{} touched, content unchanged", event.path.display());
                }
                Ok(ReloadOutcome::Reloaded {
                    collections,
                    records,
                }) => {
                    log::info!(
                        "[hot-reload] {} reloaded in {:.1} ms ({records} records across {collections} collections)",
                        event.path.display(),
                        started.elapsed().as_secs_f64() * 1000.0
                    );
                }
                Err(e) => log::warn!("[hot-reload] keeping previous data ({:?}): {e}", event.kind),
            }
        }
    });
    Ok(())
}

fn print_profile(store: &Store) -> std::io::Result<()> {
    let size = std::fs::metadata(store.path())?.len();
    let document = store.snapshot();

    println!("  source : {} ({})", store.path().display(), file_size_human(size));
    println!("  collections: {}", document.len());
    for (name, records) in document.collections() {
        println!("    /{name:<20}  {:>6} record(s)", records.len());
    }
    println!("  total records: {}", document.total_records());
    Ok(())
}

fn file_size_human(bytes: u64) -> String {
    let mut size = bytes as f64;
    for unit in ["B", "KB", "MB", "GB"] {
        if size < 1024.0 {
            return format!("{size:.1} {unit}");
        }
        size /= 1024.0;
    }
    format!("{size:.1} TB")
}

fn print_output(
    value: &serde_json::Value,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(value)?),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_db(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("mockapi").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_file_size_human() {
        assert_eq!(file_size_human(8), "8.0 B");
        assert_eq!(file_size_human(2048), "2.0 KB");
        assert_eq!(file_size_human(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(file_size_human(3 * 1024u64.pow(4)), "3.0 TB");
    }

    #[test]
    fn test_serve_defaults() {
        let Command::Serve {
            host,
            port,
            delay,
            no_reload,
            ..
        } = cli(&["serve", "db.json"]).command
        else {
            panic!("expected serve");
        };
        assert_eq!(host, "0.0.0.0");
        assert_eq!(port, 3000);
        assert_eq!(delay, 0);
        assert!(!no_reload);
    }

    #[test]
    fn test_serve_invalid_json_reports_error() {
        let tmp = TempDir::new().unwrap();
        let bad = write_db(&tmp, "bad.json", "{not json}");
        let err = run(cli(&["serve", bad.to_str().unwrap(), "--no-reload"])).unwrap_err();
        assert!(err.to_string().contains("invalid JSON"), "{err}");
    }

    #[test]
    fn test_serve_non_object_json_reports_error() {
        let tmp = TempDir::new().unwrap();
        let arr = write_db(&tmp, "arr.json", "[1, 2, 3]");
        assert!(run(cli(&["serve", arr.to_str().unwrap()])).is_err());
    }

    #[test]
    fn test_serve_missing_file_reports_error() {
        assert!(run(cli(&["serve", "/tmp/does_not_exist_xyz.json"])).is_err());
    }

    #[test]
    fn test_types_writes_file() {
        let tmp = TempDir::new().unwrap();
        let db = write_db(&tmp, "db.json", r#"{"users": [{"id": 1, "name": "Alice"}]}"#);
        let out = tmp.path().join("types.ts");

        run(cli(&["types", db.to_str().unwrap(), "--out", out.to_str().unwrap()])).unwrap();
        let ts = std::fs::read_to_string(&out).unwrap();
        assert!(ts.contains("export interface User {"));
        assert!(ts.contains("  name: string;"));
    }

    #[test]
    fn test_types_rust_lang() {
        let tmp = TempDir::new().unwrap();
        let db = write_db(&tmp, "db.json", r#"{"users": [{"id": 1}]}"#);
        let out = tmp.path().join("types.rs");

        let args = ["types", db.to_str().unwrap(), "--lang", "rust", "-o", out.to_str().unwrap()];
        run(cli(&args)).unwrap();
        assert!(std::fs::read_to_string(&out).unwrap().contains("pub struct User"));
    }

    #[test]
    fn test_validate_reports_issues() {
        let tmp = TempDir::new().unwrap();
        let clean = write_db(&tmp, "ok.json", r#"{"users": [{"id": 1}]}"#);
        let dupes = write_db(&tmp, "dupes.json", r#"{"users": [{"id": 1}, {"id": 1}]}"#);

        assert!(run(cli(&["validate", clean.to_str().unwrap()])).is_ok());
        let err = run(cli(&["validate", dupes.to_str().unwrap(), "--format", "json"])).unwrap_err();
        assert!(err.to_string().contains("1 issue(s)"), "{err}");
    }
}
