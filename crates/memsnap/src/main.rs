use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use memsnap_core::address_map::AddressRangeEntity;
use memsnap_core::crawler::ManagedObjectRecord;
use memsnap_core::progress::progress_channel;
use memsnap_core::types::{Address, ManagedType, SegmentKind};
use memsnap_core::{Snapshot, SnapshotError};
use memsnap_utils::{LogConfig, LogLevel, LoggingGuard, info};

type CliResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Inspect managed-runtime memory snapshots.
#[derive(Parser, Debug)]
#[command(name = "memsnap")]
#[command(version)]
#[command(about = "Inspect managed-runtime memory snapshots: segment lookup, type resolution, and root crawling", long_about = None)]
struct Cli
{
    /// Log level (error, warn, info, debug, trace). Overrides RUST_LOG.
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// Show counts, pointer width, and address coverage of a snapshot
    Summary
    {
        /// Path to the snapshot description (JSON)
        snapshot: PathBuf,
    },
    /// Resolve a single address: owning segment, header word, and type
    Lookup
    {
        /// Path to the snapshot description (JSON)
        snapshot: PathBuf,
        /// Address to resolve (hex format: 0x1000 or decimal)
        address: String,
    },
    /// List managed objects discovered from GC handles and static fields
    Objects
    {
        /// Path to the snapshot description (JSON)
        snapshot: PathBuf,
        /// Maximum number of objects to print
        #[arg(short, long)]
        limit: Option<usize>,
        /// Also print the record for the null address
        #[arg(long, default_value_t = false)]
        include_null: bool,
    },
    /// Print the unified address map with nesting
    Map
    {
        /// Path to the snapshot description (JSON)
        snapshot: PathBuf,
        /// Maximum number of entries to print
        #[arg(short, long)]
        limit: Option<usize>,
    },
}

impl Commands
{
    fn snapshot_path(&self) -> &Path
    {
        match self {
            Commands::Summary { snapshot }
            | Commands::Lookup { snapshot, .. }
            | Commands::Objects { snapshot, .. }
            | Commands::Map { snapshot, .. } => snapshot,
        }
    }
}

fn main()
{
    let cli = Cli::parse();

    let _guard = match init_logging(cli.log_level) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            process::exit(1);
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start runtime: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(run_command(cli)) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn init_logging(level: Option<LogLevel>) -> Result<LoggingGuard, memsnap_utils::LoggingError>
{
    match level {
        Some(level) => LogConfig::from_env().with_level(level).init(),
        None => memsnap_utils::init_logging(),
    }
}

async fn run_command(cli: Cli) -> CliResult<()>
{
    // Validate the address before paying for the load
    let lookup_address = match &cli.command {
        Commands::Lookup { address, .. } => Some(address.parse::<Address>()?),
        _ => None,
    };

    let snapshot = load_snapshot(cli.command.snapshot_path().to_path_buf()).await?;

    match cli.command {
        Commands::Summary { .. } => print_summary(&snapshot),
        Commands::Lookup { .. } => {
            let address = lookup_address.ok_or_else(|| SnapshotError::InvalidArgument("missing address".to_string()))?;
            print_lookup(&snapshot, address);
        }
        Commands::Objects { limit, include_null, .. } => print_objects(&snapshot, limit, include_null),
        Commands::Map { limit, .. } => print_map(&snapshot, limit),
    }
    Ok(())
}

/// Build the snapshot on a blocking worker while another worker logs progress.
async fn load_snapshot(path: PathBuf) -> CliResult<Snapshot>
{
    info!("Loading snapshot description from {}", path.display());
    let (sender, receiver) = progress_channel();

    let watcher = tokio::task::spawn_blocking(move || {
        for progress in receiver {
            info!("{}", progress);
        }
    });
    let snapshot = tokio::task::spawn_blocking(move || Snapshot::load(&path, Some(&sender))).await??;
    watcher.await?;

    Ok(snapshot)
}

fn print_summary(snapshot: &Snapshot)
{
    let vm = snapshot.vm();
    let segments = snapshot.segments();
    let count_kind = |kind: SegmentKind| segments.iter().filter(|(_, s)| s.kind == kind).count();

    println!("Snapshot Summary:");
    println!("  Pointer Width: {}", snapshot.pointer_width());
    println!("  Object Header: {} bytes", vm.object_header_size);
    println!("  Array Header: {} bytes", vm.array_header_size);
    println!("\nNative:");
    println!("  Types: {}", snapshot.native_types().len());
    println!("  Objects: {}", snapshot.native_objects().len());
    println!("  Allocations: {}", snapshot.native_allocations().len());
    println!("  Root References: {}", snapshot.root_reference_count());
    println!("  Memory Regions: {}", snapshot.memory_regions().len());
    println!("\nManaged:");
    println!("  Types: {}", snapshot.types().len());
    println!(
        "  Segments: {} ({} heap, {} stack, {} bytes)",
        segments.len(),
        count_kind(SegmentKind::Heap),
        count_kind(SegmentKind::Stack),
        segments.total_bytes()
    );
    println!("  GC Handles: {}", snapshot.gc_handles().len());
    println!("  Objects: {}", snapshot.objects().len());
    println!("  Crawl: {}", snapshot.objects().stats());

    let coverage = snapshot.address_map().coverage_by_source();
    println!("\nAddress Map: {} entries", snapshot.address_map().len());
    println!("  Regions: {} bytes", coverage.regions);
    println!("  Native Allocations: {} bytes", coverage.native_allocations);
    println!("  Native Objects: {} bytes", coverage.native_objects);
    println!("  Managed Segments: {} bytes", coverage.managed_segments);
}

fn print_lookup(snapshot: &Snapshot, address: Address)
{
    let resolver = snapshot.resolver();
    let deref = resolver.dereference(address);

    println!("Address: {}", snapshot.format_address(address));
    match deref.segment.and_then(|id| snapshot.segments().get(id)) {
        Some(segment) => println!(
            "  Segment: {} at {} (+0x{:x} of {} bytes)",
            segment.kind,
            snapshot.format_address(segment.start),
            deref.offset,
            segment.len()
        ),
        None => println!("  Segment: not in captured memory"),
    }
    println!("  Header Word: {}", snapshot.format_address(deref.value));

    let resolved = resolver.resolve_type(address);
    println!("  Type: {}", resolved.map_or("<unresolved>", |ty| ty.name.as_str()));

    if let Some(record) = snapshot.objects().get(address) {
        println!("  Crawled: {}", format_record(snapshot, record));
    }

    let containing: Vec<&AddressRangeEntity> = snapshot
        .address_map()
        .entries()
        .iter()
        .filter(|entry| entry.start <= address && address < entry.end())
        .collect();
    if !containing.is_empty() {
        println!("  Contained In:");
        for entry in containing {
            println!("    {}", format_range(snapshot, entry));
        }
    }
}

fn print_objects(snapshot: &Snapshot, limit: Option<usize>, include_null: bool)
{
    let records: Vec<&ManagedObjectRecord> = snapshot
        .objects()
        .iter()
        .filter(|record| include_null || !record.address.is_null())
        .take(limit.unwrap_or(usize::MAX))
        .collect();

    println!("Managed Objects ({} of {}):", records.len(), snapshot.objects().len());
    for record in records {
        println!("  {}", format_record(snapshot, record));
    }
}

fn print_map(snapshot: &Snapshot, limit: Option<usize>)
{
    let map = snapshot.address_map();
    let nesting = map.classify_nesting();

    println!("Address Map ({} entries, {} non-empty):", map.len(), nesting.len());
    for entry in nesting.iter().take(limit.unwrap_or(usize::MAX)) {
        let Some(range) = map.get(entry.entry) else {
            continue;
        };
        match entry.parent {
            Some(parent) => println!("  [{:>5}]   {} (in [{}])", entry.index, format_range(snapshot, range), parent),
            None => println!("  [{:>5}] {}", entry.index, format_range(snapshot, range)),
        }
    }
}

fn format_record(snapshot: &Snapshot, record: &ManagedObjectRecord) -> String
{
    let type_name = snapshot.type_of(record).map_or("<unresolved>", |ty| ty.name.as_str());
    let mut line = format!("{} {}", snapshot.format_address(record.address), type_name);
    if record.is_array {
        match snapshot.type_of(record).map_or(1, ManagedType::array_rank) {
            rank if rank > 1 => line.push_str(&format!("[{}; rank {}]", record.array_length, rank)),
            _ => line.push_str(&format!("[{}]", record.array_length)),
        }
    }
    match record.segment {
        Some(id) => line.push_str(&format!(" (segment {} +0x{:x})", id.value(), record.offset)),
        None => line.push_str(" (unmapped)"),
    }
    line
}

fn format_range(snapshot: &Snapshot, entity: &AddressRangeEntity) -> String
{
    format!(
        "{}-{} {:>10} {}",
        snapshot.format_address(entity.start),
        snapshot.format_address(entity.end()),
        entity.size,
        snapshot.range_label(entity)
    )
}
