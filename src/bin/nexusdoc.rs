use clap::{Parser, Subcommand};
use nexusdoc::document::bson_to_json;
use nexusdoc::query::parse_conditions_json;
use nexusdoc::{Clause, Collection, CollectionConfig, DbError, MemoryStore};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "nexusdoc", version, about = "Compile and run clause queries against a JSON data set", long_about = None)]
struct Cli {
    #[arg(long, help = "Path to a config file (TOML). Falls back to NEXUSDOC_CONFIG, then ./nexusdoc.toml")]
    config: Option<PathBuf>,

    #[arg(long, help = "JSON file mapping collection names to arrays of documents")]
    data: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Print the compiled query without running it")]
    Explain {
        #[arg(long, help = "Collection path")]
        collection: String,
        #[arg(long, default_value = "[]", help = "Condition JSON array (e.g., [[\"age\", \">=\", 21], {\"orderBy\": \"age:desc\"}])")]
        conditions: String,
    },
    #[command(about = "List matching documents")]
    List {
        #[arg(long)]
        collection: String,
        #[arg(long, default_value = "[]")]
        conditions: String,
    },
    #[command(about = "Count matching documents; a trailing options mapping is ignored")]
    Count {
        #[arg(long)]
        collection: String,
        #[arg(long, default_value = "[]")]
        conditions: String,
    },
    #[command(about = "Fetch one page of matching documents with the total count")]
    Page {
        #[arg(long)]
        collection: String,
        #[arg(long, default_value = "[]")]
        conditions: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long = "per-page", default_value_t = 0, help = "Page size; 0 uses the configured default")]
        per_page: u32,
    },
}

fn config_path(cli_cfg: Option<&Path>) -> Option<PathBuf> {
    // CLI > env > working directory
    if let Some(p) = cli_cfg {
        return Some(p.to_path_buf());
    }
    if let Ok(p) = std::env::var("NEXUSDOC_CONFIG") {
        return Some(PathBuf::from(p));
    }
    let local = std::env::current_dir().ok()?.join("nexusdoc.toml");
    local.exists().then_some(local)
}

fn load_config(cli_cfg: Option<&Path>) -> Result<CollectionConfig, DbError> {
    match config_path(cli_cfg) {
        Some(p) => CollectionConfig::load(&p),
        None => {
            let mut cfg = CollectionConfig::default();
            cfg.apply_env();
            Ok(cfg)
        }
    }
}

fn load_store(data: Option<&Path>, config: &CollectionConfig) -> Result<MemoryStore, DbError> {
    let store = MemoryStore::new();
    let Some(path) = data else {
        return Ok(store);
    };
    let text = std::fs::read_to_string(path).map_err(|e| DbError::Io(format!("{}: {e}", path.display())))?;
    let Value::Object(collections) = serde_json::from_str(&text)? else {
        return Err(DbError::Config(format!("{}: expected an object of collections", path.display())));
    };
    for (name, docs) in collections {
        let Value::Array(docs) = docs else {
            return Err(DbError::Config(format!("{name}: expected an array of documents")));
        };
        store.import(&name, &config.id_field, docs)?;
    }
    Ok(store)
}

fn explain(col: &Collection, clauses: &[Clause]) -> Result<Value, DbError> {
    let q = col.make_query(clauses)?;
    let filters: Vec<Value> = q
        .filters
        .iter()
        .map(|f| json!([f.field, f.op.symbol(), bson_to_json(&f.value)]))
        .collect();
    let order_by: Vec<String> = q.order_by.iter().map(|o| format!("{}:{}", o.field, o.direction)).collect();
    let cursor = |c: &Option<bson::Bson>| c.as_ref().map_or(Value::Null, bson_to_json);
    Ok(json!({
        "collection": q.collection,
        "filters": filters,
        "orderBy": order_by,
        "limit": q.limit,
        "offset": q.offset,
        "startAt": cursor(&q.start_at),
        "startAfter": cursor(&q.start_after),
        "endAt": cursor(&q.end_at),
        "endBefore": cursor(&q.end_before),
    }))
}

fn run(cli: Cli) -> Result<Value, DbError> {
    let config = Arc::new(load_config(cli.config.as_deref())?);
    let store = Arc::new(load_store(cli.data.as_deref(), &config)?);
    let open = |collection: &str, conditions: &str| -> Result<(Collection, Vec<Clause>), DbError> {
        let clauses = parse_conditions_json(conditions)?;
        Ok((Collection::new(store.clone(), collection, config.clone()), clauses))
    };
    match cli.command {
        Commands::Explain { collection, conditions } => {
            let (col, clauses) = open(&collection, &conditions)?;
            explain(&col, &clauses)
        }
        Commands::List { collection, conditions } => {
            let (col, clauses) = open(&collection, &conditions)?;
            let docs = col.list_docs(&clauses)?;
            Ok(Value::Array(docs.iter().map(nexusdoc::Record::to_json).collect()))
        }
        Commands::Count { collection, conditions } => {
            let (col, clauses) = open(&collection, &conditions)?;
            Ok(json!({ "count": col.count_docs(&clauses)? }))
        }
        Commands::Page { collection, conditions, page, per_page } => {
            let (col, clauses) = open(&collection, &conditions)?;
            Ok(serde_json::to_value(col.paginate_with_count(&clauses, page, per_page)?)?)
        }
    }
}

fn main() {
    if std::env::var_os("NEXUSDOC_LOG_DIR").is_some()
        && let Err(e) = nexusdoc::init()
    {
        eprintln!("warning: logging disabled: {e}");
    }
    let cli = Cli::parse();
    match run(cli) {
        Ok(out) => println!("{out}"),
        Err(e) => {
            log::error!("nexusdoc: {e}");
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}
