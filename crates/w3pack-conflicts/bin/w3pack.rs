//! w3pack binary entry point.
//!
//! A thin wrapper around the w3pack-conflicts and w3pack-formats libraries
//! that:
//! 1. Parses command-line arguments
//! 2. Initializes logging
//! 3. Layers flags over the optional JSON configuration
//! 4. Runs one subcommand
//!
//! Command output goes to stdout, logs go to stderr.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use w3pack_conflicts::{
    ConflictResolver, ConflictSummary, MergeConfig, ModScanner, Selections, load_selections,
    merge, save_selections,
};
use w3pack_formats::bundle::{Bundle, LooseFile};
use w3pack_formats::entry::is_buffer_path;
use w3pack_formats::metadata_store::MetadataStore;
use w3pack_formats::texture_cache::TextureCache;
use w3pack_formats::{ArchiveEntry, ArchiveRegistry, CompressionKind};

#[derive(Debug, Parser)]
#[command(
    name = "w3pack",
    about = "Find and merge conflicting files across Witcher 3 mods",
    version
)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "W3PACK_JSON_LOGS")]
    json: bool,

    /// MergeConfig JSON file
    #[arg(short, long, global = true, env = "W3PACK_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List conflicts grouped by category
    Scan {
        /// Directory whose children are mods
        #[arg(long, env = "W3PACK_MODS_DIR")]
        mods_dir: Option<PathBuf>,

        /// Write a selections file picking the first mod of every conflict
        #[arg(long)]
        write_selections: Option<PathBuf>,

        /// Print conflicts as JSON instead of text
        #[arg(long)]
        summary_json: bool,
    },

    /// Apply a selections file and write the merged mod
    Merge {
        /// Directory whose children are mods
        #[arg(long, env = "W3PACK_MODS_DIR")]
        mods_dir: Option<PathBuf>,

        /// Directory the merged mod is created in
        #[arg(long, env = "W3PACK_OUTPUT_DIR")]
        output_dir: Option<PathBuf>,

        /// Selections file (`{"<depot path>": "<mod name>"}`)
        #[arg(long)]
        selections: PathBuf,
    },

    /// Build bundles, and optionally a texture cache, from loose files
    Pack {
        /// Directory of loose files; depot paths are relative to it
        input: PathBuf,

        /// Directory the archives are written to
        #[arg(long)]
        output: PathBuf,

        /// Compression for bundle entries
        #[arg(long, env = "W3PACK_COMPRESSION")]
        compression: Option<CompressionKind>,

        /// Directory of loose textures to pack into a texture cache
        #[arg(long)]
        textures: Option<PathBuf>,

        /// Do not write a metadata store for the bundles
        #[arg(long)]
        skip_metadata: bool,
    },

    /// Print the ToC of a bundle or texture cache
    List {
        /// Archive file
        archive: PathBuf,
    },

    /// Print a metadata store summary
    Inspect {
        /// Metadata store file
        store: PathBuf,

        /// Also list every indexed file
        #[arg(long)]
        files: bool,
    },

    /// Extract one entry of a bundle or texture cache
    Extract {
        /// Archive file
        archive: PathBuf,

        /// Depot path of the entry
        depot_path: String,

        /// Output file; defaults to the entry's file name
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json);

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Scan {
            mods_dir,
            write_selections,
            summary_json,
        } => {
            let config = with_dirs(config, mods_dir, None);
            scan(&config, write_selections.as_deref(), summary_json)
        }
        Command::Merge {
            mods_dir,
            output_dir,
            selections,
        } => {
            let config = with_dirs(config, mods_dir, output_dir);
            merge_mods(&config, &selections)
        }
        Command::Pack {
            input,
            output,
            compression,
            textures,
            skip_metadata,
        } => {
            let mut config = config;
            if let Some(compression) = compression {
                config.pack.compression = compression;
            }
            pack(&config, &input, &output, textures.as_deref(), skip_metadata)
        }
        Command::List { archive } => list(&config, &archive),
        Command::Inspect { store, files } => inspect(&store, files),
        Command::Extract {
            archive,
            depot_path,
            output,
        } => extract(&config, &archive, &depot_path, output),
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn load_config(path: Option<&Path>) -> Result<MergeConfig> {
    match path {
        Some(path) => MergeConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display())),
        None => Ok(MergeConfig::default()),
    }
}

fn with_dirs(
    mut config: MergeConfig,
    mods_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
) -> MergeConfig {
    if let Some(dir) = mods_dir {
        config.mods_dir = dir;
    }
    if let Some(dir) = output_dir {
        config.output_dir = Some(dir);
    }
    config
}

fn scan_resolver(
    config: &MergeConfig,
    registry: &mut ArchiveRegistry,
) -> Result<ConflictResolver> {
    let report = ModScanner::new(config)
        .scan(registry)
        .with_context(|| format!("scanning {}", config.mods_dir.display()))?;
    Ok(ConflictResolver::from_scan(&report))
}

fn scan(config: &MergeConfig, write_selections: Option<&Path>, summary_json: bool) -> Result<()> {
    let mut registry = ArchiveRegistry::new();
    let resolver = scan_resolver(config, &mut registry)?;

    if summary_json {
        let summaries: Vec<ConflictSummary> =
            resolver.conflicts().map(ConflictSummary::from).collect();
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    } else {
        let groups = resolver.by_category();
        if groups.is_empty() {
            println!("No conflicts found");
        }
        for (category, conflicts) in groups {
            println!("{category} ({} conflicts)", conflicts.len());
            for conflict in conflicts {
                let mods: Vec<_> = conflict.mod_names().collect();
                println!("  {}  [{}]", conflict.path, mods.join(", "));
            }
        }
    }

    if let Some(path) = write_selections {
        let selections: Selections = resolver
            .conflicts()
            .filter_map(|c| Some((c.path.clone(), c.candidates.first()?.mod_name.clone())))
            .collect();
        save_selections(path, &selections)
            .with_context(|| format!("writing selections to {}", path.display()))?;
        println!("Wrote {} selections to {}", selections.len(), path.display());
    }
    Ok(())
}

fn merge_mods(config: &MergeConfig, selections: &Path) -> Result<()> {
    let mut registry = ArchiveRegistry::new();
    let mut resolver = scan_resolver(config, &mut registry)?;

    let selections = load_selections(selections)?;
    resolver.apply_selections(&selections)?;

    let outcome = merge(&resolver, config, &mut registry)?;
    for path in outcome
        .bundles
        .iter()
        .chain(&outcome.texture_cache)
        .chain(&outcome.metadata_store)
    {
        println!("wrote {}", path.display());
    }
    if !outcome.unresolved.is_empty() {
        println!("{} conflicts left unresolved:", outcome.unresolved.len());
        for path in &outcome.unresolved {
            println!("  {path}");
        }
    }
    Ok(())
}

fn pack(
    config: &MergeConfig,
    input: &Path,
    output: &Path,
    textures: Option<&Path>,
    skip_metadata: bool,
) -> Result<()> {
    let files = LooseFile::collect_dir(input)
        .with_context(|| format!("reading loose files from {}", input.display()))?;
    let (buffers, regular): (Vec<_>, Vec<_>) =
        files.into_iter().partition(|f| is_buffer_path(&f.depot_path));

    std::fs::create_dir_all(output)?;
    let mut registry = ArchiveRegistry::new();

    let mut bundles = Vec::new();
    for set in [regular, buffers] {
        if set.is_empty() {
            continue;
        }
        let bundle = Bundle::build_from_files(&set, &config.pack, &mut registry)?;
        let path = bundle.write(output, &mut registry)?;
        println!("wrote {} ({} entries)", path.display(), bundle.len());
        bundles.push(bundle);
    }

    if let Some(dir) = textures {
        let files = LooseFile::collect_dir(dir)
            .with_context(|| format!("reading loose textures from {}", dir.display()))?;
        let cache = TextureCache::build_from_files(&files, &config.pack, &mut registry)?;
        let path = cache.write(output, &mut registry)?;
        println!("wrote {} ({} items)", path.display(), cache.len());
    }

    if bundles.is_empty() && textures.is_none() {
        bail!("{} holds no files to pack", input.display());
    }

    if !skip_metadata && !bundles.is_empty() {
        let refs: Vec<&Bundle> = bundles.iter().collect();
        let path = MetadataStore::build(&refs)?.write(output, &config.pack)?;
        println!("wrote {}", path.display());
    }
    Ok(())
}

fn is_texture_cache(config: &MergeConfig, archive: &Path) -> bool {
    archive
        .file_name()
        .is_some_and(|name| name.eq_ignore_ascii_case(&config.pack.texture_cache_name))
        || archive
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("cache"))
}

fn list(config: &MergeConfig, archive: &Path) -> Result<()> {
    let mut registry = ArchiveRegistry::new();

    if is_texture_cache(config, archive) {
        let cache = TextureCache::read(archive, &mut registry)?;
        println!(
            "{} items, {} pages, {} mip records",
            cache.len(),
            cache.footer().used_pages,
            cache.mip_offsets().len()
        );
        for item in cache.items() {
            let format = item
                .pixel_format()
                .map_or_else(|_| format!("type {:#x}", item.texture_type()), |f| f.to_string());
            println!(
                "{:>8} {:>10} {:>5}x{:<5} {:>2} mips  {:<8} {}",
                item.page_offset(),
                item.zsize(),
                item.width(),
                item.height(),
                item.mips_count(),
                format,
                item.depot_path()
            );
        }
    } else {
        let bundle = Bundle::read(archive, &mut registry)?;
        println!(
            "{} entries, data block {} bytes at {}",
            bundle.len(),
            bundle.header().data_block_size(),
            bundle.header().data_block_offset()
        );
        for entry in bundle.entries() {
            let compression = entry
                .compression_kind()
                .map_or_else(|_| format!("tag {}", entry.compression_tag()), |k| k.to_string());
            println!(
                "{:>10} {:>10} {:>10} {:<7} {:08x} {}",
                entry.page_offset(),
                entry.zsize(),
                entry.size(),
                compression,
                entry.crc(),
                entry.depot_path()
            );
        }
    }
    Ok(())
}

fn inspect(store: &Path, files: bool) -> Result<()> {
    let store = MetadataStore::read(store)
        .with_context(|| format!("reading metadata store {}", store.display()))?;

    println!("version              {}", store.version());
    println!("files                {}", store.file_infos().len());
    println!("buffers              {}", store.buffers().len());
    println!("directories          {}", store.dir_inits().len());
    println!("string table         {} bytes", store.string_table().len());
    println!("max size in bundle   {}", store.max_file_size_in_bundle());
    println!("max size in memory   {}", store.max_file_size_in_memory());

    for (bundle_id, info) in (1u32..).zip(store.bundle_infos()) {
        println!(
            "bundle {bundle_id}: {} ({} entries, data block {} bytes at {})",
            store.bundle_name(bundle_id).unwrap_or_default(),
            info.num_entries,
            info.data_block_size,
            info.data_block_offset
        );
    }

    if files {
        let count = u32::try_from(store.file_infos().len())
            .context("file count exceeds the 32-bit id range")?;
        for file_id in 1..=count {
            if let Some(path) = store.file_path(file_id) {
                println!("{file_id:>8} {path}");
            }
        }
    }
    Ok(())
}

fn extract(
    config: &MergeConfig,
    archive: &Path,
    depot_path: &str,
    output: Option<PathBuf>,
) -> Result<()> {
    let mut registry = ArchiveRegistry::new();

    let output = output.unwrap_or_else(|| {
        let name = depot_path.rsplit(['\\', '/']).next().unwrap_or(depot_path);
        PathBuf::from(name)
    });
    let create = |output: &Path| {
        std::fs::File::create(output).with_context(|| format!("creating {}", output.display()))
    };

    if is_texture_cache(config, archive) {
        let cache = TextureCache::read(archive, &mut registry)?;
        let Some(item) = cache.item(depot_path) else {
            bail!("{depot_path} not found in {}", archive.display());
        };
        item.extract(&registry, &mut create(&output)?)?;
    } else {
        let bundle = Bundle::read(archive, &mut registry)?;
        let Some(entry) = bundle.entry(depot_path) else {
            bail!("{depot_path} not found in {}", archive.display());
        };
        entry.extract(&registry, &mut create(&output)?)?;
    }

    println!("extracted {depot_path} to {}", output.display());
    Ok(())
}
