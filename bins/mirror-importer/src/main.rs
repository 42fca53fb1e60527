//! Mirror Importer - stream file and entity id tooling
//!
//! # Usage
//!
//! ```bash
//! # Inspect filenames
//! mirror-importer parse 2020-06-03T16_45_00.1Z.rcd_sig 2020-06-03T16_45_00.1Z_01.rcd.gz
//!
//! # List a node's record files after a given file, including sidecars
//! mirror-importer list --root ./bucket --stream-type record --node 0.0.3 \
//!     --after 2020-06-03T16_45_00.1Z.rcd_sig --sidecars
//!
//! # Resolve references against a JSON entity file
//! mirror-importer resolve --entities entities.json 0.0.1001 alias:1220... 0x00...03e9 1001
//! ```

mod config;
mod entities;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use config::{Command, Config};
use mirror::{
    EntityId, EntityIdResolver, EntityType, FileType, ImporterConfig, InMemoryEntityStore,
    StreamFilename, StreamType,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(true)
        .init();

    match &config.command {
        Command::Parse { names } => parse(names),
        Command::List {
            root,
            stream_type,
            node,
            after,
            sidecars,
        } => list(root, *stream_type, node, after.as_deref(), *sidecars),
        Command::Resolve {
            entities,
            entity_type,
            first,
            ids,
        } => {
            let importer = config.importer_config()?;
            resolve(
                &importer,
                entities.as_deref(),
                (*entity_type).into(),
                *first,
                ids,
            )
            .await
        }
    }
}

fn parse(names: &[String]) -> Result<()> {
    for name in names {
        match StreamFilename::parse(name) {
            Ok(filename) => {
                println!(
                    "{}\tstream={} type={} instant={} extension={} compressed={} sidecar={}",
                    filename,
                    filename.stream_type(),
                    filename.file_type(),
                    filename.instant().to_rfc3339(),
                    filename.full_extension(),
                    filename.is_compressed(),
                    filename.sidecar_index().unwrap_or("-"),
                );
            }
            Err(e) => println!("{name}\t{e}"),
        }
    }
    Ok(())
}

fn list(
    root: &Path,
    stream_type: StreamType,
    node: &str,
    after: Option<&str>,
    sidecars: bool,
) -> Result<()> {
    let node_directory = root.join(stream_type.node_directory(node));
    let mut files = read_stream_directory(&node_directory, stream_type)?;

    if sidecars {
        match stream_type.sidecar_directory() {
            Some(directory) => {
                files.extend(read_stream_directory(
                    &node_directory.join(directory),
                    stream_type,
                )?);
            }
            None => tracing::warn!(
                target: "mirror_importer",
                %stream_type,
                "Stream has no sidecar files"
            ),
        }
    }

    let after = after
        .map(StreamFilename::parse)
        .transpose()
        .context("Invalid --after filename")?;
    let files = files_after(files, after.as_ref());

    for (previous, next) in gaps(&files, stream_type) {
        tracing::warn!(
            target: "mirror_importer",
            previous = %previous,
            next = %next,
            interval = ?stream_type.file_close_interval(),
            "Gap between stream files exceeds the close interval"
        );
    }

    tracing::info!(
        target: "mirror_importer",
        directory = %node_directory.display(),
        count = files.len(),
        "Listed stream files"
    );

    for filename in &files {
        println!(
            "{}\t{}\t{}",
            filename.instant().to_rfc3339(),
            filename.file_type(),
            filename
        );
    }
    Ok(())
}

/// Files strictly later than `after`, in stream order.
///
/// Compares instants rather than names: the fractional digits of a timestamp vary, so
/// byte order and time order disagree.
fn files_after(
    mut files: Vec<StreamFilename>,
    after: Option<&StreamFilename>,
) -> Vec<StreamFilename> {
    if let Some(after) = after {
        files.retain(|filename| filename.instant() > after.instant());
    }
    files.sort();
    files
}

/// Consecutive data files further apart than the stream's close interval.
fn gaps(
    files: &[StreamFilename],
    stream_type: StreamType,
) -> Vec<(&StreamFilename, &StreamFilename)> {
    let interval = stream_type.file_close_interval();
    let data: Vec<_> = files
        .iter()
        .filter(|filename| filename.file_type() == FileType::Data)
        .collect();

    data.windows(2)
        .filter(|pair| {
            (pair[1].instant() - pair[0].instant())
                .to_std()
                .is_ok_and(|elapsed| elapsed > interval)
        })
        .map(|pair| (pair[0], pair[1]))
        .collect()
}

/// Valid filenames of `stream_type` in a directory. Anything else is skipped.
fn read_stream_directory(directory: &Path, stream_type: StreamType) -> Result<Vec<StreamFilename>> {
    let entries = std::fs::read_dir(directory)
        .with_context(|| format!("Failed to read directory: {}", directory.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }

        let name = entry.file_name();
        let name = name.to_string_lossy();
        match StreamFilename::parse(&name) {
            Ok(filename) if filename.stream_type() == stream_type => files.push(filename),
            Ok(filename) => tracing::debug!(
                target: "mirror_importer",
                file = %name,
                stream_type = %filename.stream_type(),
                "Skipping file of another stream"
            ),
            Err(e) => tracing::debug!(
                target: "mirror_importer",
                file = %name,
                error = %e,
                "Skipping invalid stream filename"
            ),
        }
    }
    Ok(files)
}

async fn resolve(
    importer: &ImporterConfig,
    entities_file: Option<&Path>,
    entity_type: EntityType,
    first: bool,
    ids: &[String],
) -> Result<()> {
    let store = match entities_file {
        Some(path) => entities::load_entities(path)?,
        None => InMemoryEntityStore::new(),
    };
    let resolver = EntityIdResolver::new(importer, Arc::new(store));

    let references = ids
        .iter()
        .map(|id| entities::parse_reference(id, &importer.network))
        .collect::<Result<Vec<_>>>()?;

    if first {
        let candidates: Vec<_> = references.into_iter().map(Some).collect();
        let resolved = resolver.resolve_first(entity_type, &candidates).await;
        println!("{resolved}\t{}", encoded(resolved));
        return Ok(());
    }

    for (id, reference) in ids.iter().zip(&references) {
        match resolver.resolve_one(entity_type, Some(reference)).await {
            Some(resolved) => println!("{id}\t{resolved}\t{}", encoded(resolved)),
            None => println!("{id}\tunresolved"),
        }
    }
    Ok(())
}

/// The packed id as stored by the importer, or `-` when it does not fit.
fn encoded(id: EntityId) -> String {
    id.encoded_id()
        .map_or_else(|_| "-".to_string(), |encoded| encoded.to_string())
}
