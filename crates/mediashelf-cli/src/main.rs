use std::str::FromStr;
use std::time::Instant;

use anyhow::Result;
use clap::{Parser, Subcommand};

use mediashelf_core::{
    completeness_score, AppConfig, CollectionItem, CollectionType, Database, ExitCode,
    MediaFormat, MergeSession, ShelfError,
};

// ─── CLI Definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "mediashelf",
    about = "Terminal disc collection manager — catalog, dedupe, merge",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Output in JSON format (for scripts).
    /// Also enabled by setting MEDIASHELF_JSON=1.
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a disc to the collection.
    Add {
        title: String,
        /// DVD, Blu-ray, 4K UHD or 3D Blu-ray.
        #[arg(long)]
        format: String,
        #[arg(long)]
        condition: Option<String>,
        #[arg(long)]
        year: Option<i32>,
        /// owned, wishlist, for_sale, loaned_out or missing.
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        price: Option<f64>,
        #[arg(long)]
        location: Option<String>,
        /// Purchase date, YYYY-MM-DD.
        #[arg(long)]
        date: Option<String>,
        /// Personal rating, 1-10.
        #[arg(long)]
        rating: Option<u8>,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long)]
        poster: Option<String>,
        /// Linked technical-spec record id.
        #[arg(long)]
        specs: Option<String>,
    },

    /// List items in the collection.
    List {
        #[arg(long, default_value = "50")]
        limit: usize,
        #[arg(long, default_value = "0")]
        offset: usize,
        #[arg(long)]
        status: Option<String>,
        /// Substring title search.
        #[arg(long)]
        search: Option<String>,
    },

    /// Operations on a single item.
    Item {
        #[command(subcommand)]
        action: ItemAction,
    },

    /// Duplicate detection and merging.
    Dupes {
        #[command(subcommand)]
        action: Option<DupesAction>,
    },

    /// Show collection statistics.
    Stats,

    /// Config management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Show version information.
    Version,
}

#[derive(Subcommand)]
enum ItemAction {
    /// Get an item by ID.
    Get { id: String },

    /// Update fields on an item.
    Update {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        condition: Option<String>,
        #[arg(long)]
        price: Option<f64>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        rating: Option<u8>,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long)]
        poster: Option<String>,
        #[arg(long)]
        specs: Option<String>,
    },

    /// Delete an item.
    Delete {
        id: String,
        #[arg(long)]
        confirm: bool,
    },

    /// Move an item to another status.
    Move { id: String, status: String },
}

#[derive(Subcommand)]
enum DupesAction {
    /// List duplicate groups with per-item scores (default).
    List,

    /// Merge duplicate groups, keeping one item per group.
    Merge {
        /// Keep the highest-scoring item in every group.
        #[arg(long)]
        auto: bool,
        /// Explicit decision, repeatable: <group-index>:<item-id>.
        #[arg(long, action = clap::ArgAction::Append)]
        keep: Vec<String>,
        /// Merging deletes records; require explicit confirmation.
        #[arg(long)]
        confirm: bool,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the active configuration.
    Show,
    /// Print the config file path.
    Path,
    /// Write the default config file if missing.
    Init,
}

// ─── Helpers ────────────────────────────────────────────────────────────────

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

fn open_db(config: &AppConfig) -> Result<Database> {
    Ok(Database::open(&config.database_path())?)
}

fn parse_or_exit<T: FromStr<Err = ShelfError>>(value: &str, what: &str) -> T {
    match T::from_str(value) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Invalid {what}: {e}");
            std::process::exit(ExitCode::InvalidArgs as i32);
        }
    }
}

fn parse_uuid_or_exit(id: &str) -> uuid::Uuid {
    match uuid::Uuid::parse_str(id) {
        Ok(u) => u,
        Err(_) => {
            eprintln!("Invalid item id: {id}");
            std::process::exit(ExitCode::InvalidArgs as i32);
        }
    }
}

fn item_line(item: &CollectionItem) -> String {
    let year = item
        .year
        .map(|y| format!(" ({y})"))
        .unwrap_or_default();
    format!(
        "{} — {}{} [{}] {} · {}",
        &item.id.to_string()[..8],
        item.title,
        year,
        item.format,
        item.condition,
        item.collection_type,
    )
}

/// Parse one `--keep <group-index>:<item-id>` argument.
fn parse_keep(arg: &str) -> Result<(usize, uuid::Uuid), String> {
    let (idx, id) = arg
        .split_once(':')
        .ok_or_else(|| format!("expected <group-index>:<item-id>, got {arg}"))?;
    let idx: usize = idx
        .parse()
        .map_err(|_| format!("bad group index in {arg}"))?;
    let id = uuid::Uuid::parse_str(id).map_err(|_| format!("bad item id in {arg}"))?;
    Ok((idx, id))
}

// ─── Main ───────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    let json_output = cli.json || std::env::var("MEDIASHELF_JSON").as_deref() == Ok("1");
    let config = AppConfig::load()?;
    let start = Instant::now();

    match cli.command {
        Some(Commands::Add {
            title,
            format,
            condition,
            year,
            status,
            price,
            location,
            date,
            rating,
            notes,
            poster,
            specs,
        }) => {
            let format: MediaFormat = parse_or_exit(&format, "format");
            let mut item = CollectionItem::new(title, format);

            if let Some(c) = condition {
                item.condition = parse_or_exit(&c, "condition");
            }
            if let Some(s) = status {
                item.collection_type = parse_or_exit(&s, "status");
            }
            if let Some(d) = date {
                match chrono::NaiveDate::from_str(&d) {
                    Ok(parsed) => item.purchase_date = Some(parsed),
                    Err(_) => {
                        eprintln!("Invalid date (want YYYY-MM-DD): {d}");
                        std::process::exit(ExitCode::InvalidArgs as i32);
                    }
                }
            }
            item.year = year;
            item.purchase_price = price;
            item.purchase_location = location;
            item.personal_rating = rating;
            item.notes = notes;
            item.poster_url = poster;
            item.technical_specs_id = specs;

            if let Err(e) = item.validate() {
                eprintln!("{e}");
                std::process::exit(ExitCode::InvalidArgs as i32);
            }

            let db = open_db(&config)?;
            db.upsert_item(&item)?;
            let dur = start.elapsed().as_millis();

            if json_output {
                print_json(&serde_json::json!({"status":"ok","data":item,"meta":{"duration_ms":dur}}))?;
            } else {
                println!("Added: {} ({})", item.title, item.id);
            }
        }

        Some(Commands::List {
            limit,
            offset,
            status,
            search,
        }) => {
            let db = open_db(&config)?;
            let items = if let Some(s) = status {
                let status: CollectionType = parse_or_exit(&s, "status");
                db.list_by_status(status, limit, offset)?
            } else if let Some(needle) = search {
                db.search_title(&needle, limit, offset)?
            } else {
                db.list_items(limit, offset)?
            };
            let dur = start.elapsed().as_millis();

            if json_output {
                print_json(&serde_json::json!({"status":"ok","data":items,"meta":{"duration_ms":dur}}))?;
            } else if items.is_empty() {
                println!("No items.");
            } else {
                for item in &items {
                    println!("  {}", item_line(item));
                }
                println!("{} item(s).", items.len());
            }
        }

        Some(Commands::Item { action }) => match action {
            ItemAction::Get { id } => {
                let uuid = parse_uuid_or_exit(&id);
                let db = open_db(&config)?;
                let dur = start.elapsed().as_millis();
                match db.get_item(&uuid) {
                    Ok(item) => {
                        if json_output {
                            print_json(&serde_json::json!({"status":"ok","data":item,"meta":{"duration_ms":dur}}))?;
                        } else {
                            println!("{}", serde_json::to_string_pretty(&item)?);
                        }
                    }
                    Err(_) => {
                        if json_output {
                            print_json(&serde_json::json!({"status":"error","error":"not_found","message":format!("Item {id} not found"),"meta":{"duration_ms":dur}}))?;
                        } else {
                            eprintln!("Item not found: {id}");
                        }
                        std::process::exit(ExitCode::NotFound as i32);
                    }
                }
            }

            ItemAction::Update {
                id,
                title,
                year,
                condition,
                price,
                location,
                rating,
                notes,
                poster,
                specs,
            } => {
                let uuid = parse_uuid_or_exit(&id);
                let db = open_db(&config)?;
                let mut item = match db.get_item(&uuid) {
                    Ok(i) => i,
                    Err(_) => {
                        eprintln!("Item not found: {id}");
                        std::process::exit(ExitCode::NotFound as i32);
                    }
                };

                if let Some(t) = title {
                    item.title = t;
                }
                if let Some(y) = year {
                    item.year = Some(y);
                }
                if let Some(c) = condition {
                    item.condition = parse_or_exit(&c, "condition");
                }
                if let Some(p) = price {
                    item.purchase_price = Some(p);
                }
                if let Some(l) = location {
                    item.purchase_location = Some(l);
                }
                if let Some(r) = rating {
                    item.personal_rating = if r == 0 { None } else { Some(r) };
                }
                if let Some(n) = notes {
                    item.notes = Some(n);
                }
                if let Some(p) = poster {
                    item.poster_url = Some(p);
                }
                if let Some(s) = specs {
                    item.technical_specs_id = Some(s);
                }

                item.updated_at = chrono::Utc::now();
                if let Err(e) = item.validate() {
                    eprintln!("{e}");
                    std::process::exit(ExitCode::InvalidArgs as i32);
                }
                db.upsert_item(&item)?;
                let dur = start.elapsed().as_millis();

                if json_output {
                    print_json(&serde_json::json!({"status":"ok","data":item,"meta":{"duration_ms":dur}}))?;
                } else {
                    println!("Updated: {}", item.title);
                }
            }

            ItemAction::Delete { id, confirm } => {
                if !confirm {
                    eprintln!("Add --confirm to delete without prompt.");
                    std::process::exit(ExitCode::ConfirmRequired as i32);
                }
                let uuid = parse_uuid_or_exit(&id);
                let db = open_db(&config)?;
                db.remove_item(&uuid)?;
                let dur = start.elapsed().as_millis();
                if json_output {
                    print_json(&serde_json::json!({"status":"ok","data":{"deleted":id},"meta":{"duration_ms":dur}}))?;
                } else {
                    println!("Deleted item: {id}");
                }
            }

            ItemAction::Move { id, status } => {
                let uuid = parse_uuid_or_exit(&id);
                let status: CollectionType = parse_or_exit(&status, "status");
                let db = open_db(&config)?;
                let item = db.set_status(&uuid, status)?;
                let dur = start.elapsed().as_millis();
                if json_output {
                    print_json(&serde_json::json!({"status":"ok","data":item,"meta":{"duration_ms":dur}}))?;
                } else {
                    println!("Moved {} to {}", item.title, item.collection_type);
                }
            }
        },

        Some(Commands::Dupes { action }) => {
            let db = open_db(&config)?;

            match action.unwrap_or(DupesAction::List) {
                DupesAction::List => {
                    let items = db.list_all_items()?;
                    let groups = mediashelf_core::find_duplicate_groups(&items);
                    let dur = start.elapsed().as_millis();

                    if json_output {
                        let data: Vec<serde_json::Value> = groups
                            .iter()
                            .map(|g| {
                                serde_json::json!({
                                    "key": g.key,
                                    "suggested_keeper": g.suggested_keeper().map(|k| k.id),
                                    "items": g.items.iter().map(|i| serde_json::json!({
                                        "id": i.id,
                                        "score": completeness_score(i),
                                        "condition": i.condition.to_string(),
                                    })).collect::<Vec<_>>(),
                                })
                            })
                            .collect();
                        print_json(&serde_json::json!({"status":"ok","data":data,"meta":{"duration_ms":dur}}))?;
                    } else if groups.is_empty() {
                        println!("No duplicates.");
                    } else {
                        for (idx, group) in groups.iter().enumerate() {
                            println!("[{idx}] {} — {} copies", group.key, group.items.len());
                            let keeper_id = group.suggested_keeper().map(|k| k.id);
                            for item in &group.items {
                                let marker = if Some(item.id) == keeper_id { "*" } else { " " };
                                println!(
                                    "  {marker} {} score={} {}",
                                    item.id,
                                    completeness_score(item),
                                    item.condition,
                                );
                            }
                        }
                        println!("{} duplicate group(s). * = suggested keeper.", groups.len());
                    }
                }

                DupesAction::Merge { auto, keep, confirm } => {
                    if !confirm {
                        eprintln!("Merging deletes records. Add --confirm to proceed.");
                        std::process::exit(ExitCode::ConfirmRequired as i32);
                    }

                    let mut session = MergeSession::new();
                    session.load_groups(&db.list_all_items()?)?;

                    if auto {
                        session.auto_select_best()?;
                    }
                    for arg in &keep {
                        let (idx, id) = match parse_keep(arg) {
                            Ok(pair) => pair,
                            Err(msg) => {
                                eprintln!("{msg}");
                                std::process::exit(ExitCode::InvalidArgs as i32);
                            }
                        };
                        if let Err(e) = session.select_keeper(idx, id) {
                            eprintln!("{e}");
                            std::process::exit(ExitCode::InvalidArgs as i32);
                        }
                    }

                    match session.merge(&db) {
                        Ok(removed) => {
                            // Refresh to confirm convergence.
                            let remaining = db.list_all_items()?;
                            session.load_groups(&remaining)?;
                            let left = session.groups().len();
                            let dur = start.elapsed().as_millis();

                            if json_output {
                                print_json(&serde_json::json!({
                                    "status":"ok",
                                    "data":{"removed":removed,"groups_remaining":left},
                                    "meta":{"duration_ms":dur}
                                }))?;
                            } else {
                                println!("Removed {removed} duplicate(s); {left} group(s) remaining.");
                            }
                        }
                        Err(e) => {
                            let dur = start.elapsed().as_millis();
                            if json_output {
                                print_json(&serde_json::json!({
                                    "status":"error",
                                    "error":"merge_failed",
                                    "message":e.to_string(),
                                    "data":{"removed":e.removed},
                                    "meta":{"duration_ms":dur}
                                }))?;
                            } else {
                                eprintln!("{e}");
                                eprintln!("Re-run `mediashelf dupes` to see the current state, then retry.");
                            }
                            std::process::exit(ExitCode::MergeFailed as i32);
                        }
                    }
                }
            }
        }

        Some(Commands::Stats) => {
            let db = open_db(&config)?;
            let stats = db.stats()?;
            let dur = start.elapsed().as_millis();

            if json_output {
                print_json(&serde_json::json!({"status":"ok","data":stats,"meta":{"duration_ms":dur}}))?;
            } else {
                println!("Items:      {}", stats.total);
                println!(
                    "  owned {} · wishlist {} · for sale {} · loaned {} · missing {}",
                    stats.owned, stats.wishlist, stats.for_sale, stats.loaned_out, stats.missing
                );
                println!(
                    "Formats:    DVD {} · Blu-ray {} · 4K UHD {} · 3D {}",
                    stats.dvd, stats.blu_ray, stats.uhd_4k, stats.blu_ray_3d
                );
                println!("With specs: {}", stats.with_specs);
                println!("Rated:      {}", stats.with_rating);
                println!(
                    "Spent:      {}{:.2}",
                    config.display.currency, stats.total_spent
                );
            }
        }

        Some(Commands::Config { action }) => match action {
            ConfigAction::Show => {
                if json_output {
                    print_json(&serde_json::json!({"status":"ok","data":config}))?;
                } else {
                    println!("{}", toml::to_string_pretty(&config)?);
                }
            }
            ConfigAction::Path => {
                println!("{}", AppConfig::config_path().display());
            }
            ConfigAction::Init => {
                let path = AppConfig::config_path();
                if path.exists() {
                    eprintln!("Config already exists: {}", path.display());
                    std::process::exit(ExitCode::GeneralError as i32);
                }
                config.save()?;
                println!("Wrote {}", path.display());
            }
        },

        Some(Commands::Version) | None => {
            if json_output {
                print_json(&serde_json::json!({"status":"ok","data":{"version":env!("CARGO_PKG_VERSION")}}))?;
            } else {
                println!("mediashelf {}", env!("CARGO_PKG_VERSION"));
            }
        }
    }

    Ok(())
}

// ─── Tests ──────────────────────────────────────────────────────────────────
