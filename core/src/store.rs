//! Durable stores publishing committed generations.
//!
//! A store hands out at most one [`WriteLease`] at a time and swaps the current
//! generation pointer on commit. Readers keep the `Arc<Generation>` they opened,
//! so a commit never disturbs a search that is already running.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, create_dir_all, File};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use time::format_description::well_known::Rfc3339;

use crate::error::{Error, Result};
use crate::index::{FieldNorm, Generation, Posting, StoredFields, TermId};
use crate::schema::Schema;

const FORMAT_VERSION: u32 = 1;

/// Exclusive right to build the next generation. Released on drop.
#[derive(Debug)]
pub struct WriteLease {
    busy: Arc<AtomicBool>,
    generation: u64,
}

impl WriteLease {
    /// Number the generation built under this lease will carry.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Drop for WriteLease {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

pub trait Store: Send + Sync {
    /// Start a write session. Fails with [`Error::WriterBusy`] while another lease is alive.
    fn open_for_write(&self) -> Result<WriteLease>;

    /// Durably publish `generation`. All-or-nothing: on error the previous
    /// generation stays current.
    fn commit(&self, lease: &WriteLease, generation: Generation) -> Result<Arc<Generation>>;

    /// The latest committed generation, or an empty one if nothing was committed.
    fn open_for_read(&self) -> Result<Arc<Generation>>;
}

#[derive(Debug)]
struct Published {
    current: RwLock<Arc<Generation>>,
    busy: Arc<AtomicBool>,
}

impl Published {
    fn new(generation: Generation) -> Self {
        Self { current: RwLock::new(Arc::new(generation)), busy: Arc::new(AtomicBool::new(false)) }
    }

    fn lease(&self, next_after: u64) -> Result<WriteLease> {
        if self.busy.swap(true, Ordering::AcqRel) {
            return Err(Error::WriterBusy);
        }
        Ok(WriteLease { busy: self.busy.clone(), generation: next_after + 1 })
    }

    fn check(&self, lease: &WriteLease, generation: &Generation) -> Result<()> {
        if !Arc::ptr_eq(&self.busy, &lease.busy) {
            return Err(Error::ForeignLease);
        }
        if generation.number != lease.generation {
            return Err(Error::GenerationMismatch { expected: lease.generation, found: generation.number });
        }
        Ok(())
    }

    fn current(&self) -> Arc<Generation> {
        self.current.read().clone()
    }

    fn swap(&self, generation: Generation) -> Arc<Generation> {
        let generation = Arc::new(generation);
        *self.current.write() = generation.clone();
        generation
    }

    fn publish(&self, generation: Generation) -> Arc<Generation> {
        let generation = self.swap(generation);
        tracing::info!(
            generation = generation.number,
            num_docs = generation.num_docs,
            num_terms = generation.num_terms(),
            "generation committed"
        );
        generation
    }
}

/// Keeps generations in memory only.
#[derive(Debug)]
pub struct MemoryStore {
    published: Published,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self { published: Published::new(Generation::empty()) }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn open_for_write(&self) -> Result<WriteLease> {
        self.published.lease(self.published.current().number)
    }

    fn commit(&self, lease: &WriteLease, generation: Generation) -> Result<Arc<Generation>> {
        self.published.check(lease, &generation)?;
        Ok(self.published.publish(generation))
    }

    fn open_for_read(&self) -> Result<Arc<Generation>> {
        Ok(self.published.current())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MetaFile {
    pub generation: u64,
    pub num_docs: u32,
    pub num_terms: usize,
    pub created_at: String,
    pub version: u32,
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    fn current(&self) -> PathBuf { self.root.join("CURRENT") }
    fn generations(&self) -> PathBuf { self.root.join("generations") }
    fn generation(&self, number: u64) -> PathBuf { self.generations().join(format!("{number:08}")) }
    fn staging(&self, number: u64) -> PathBuf { self.generations().join(format!("{number:08}.tmp")) }
}

fn dictionary_file(dir: &Path) -> PathBuf { dir.join("dictionary.bin") }
fn postings_file(dir: &Path) -> PathBuf { dir.join("postings.bin") }
fn norms_file(dir: &Path) -> PathBuf { dir.join("norms.bin") }
fn stored_file(dir: &Path) -> PathBuf { dir.join("stored.bin") }
fn meta_file(dir: &Path) -> PathBuf { dir.join("meta.json") }

type DictionaryFile = (Schema, HashMap<String, HashMap<String, TermId>>);

fn write_durable(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut f = File::create(path)?;
    f.write_all(bytes)?;
    f.sync_all()?;
    Ok(())
}

fn read_all(path: &Path) -> Result<Vec<u8>> {
    let mut f = File::open(path)?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    Ok(buf)
}

pub fn save_generation(dir: &Path, generation: &Generation) -> Result<()> {
    create_dir_all(dir)?;
    let dictionary: (&Schema, &HashMap<String, HashMap<String, TermId>>) = (&generation.schema, &generation.dictionary);
    write_durable(&dictionary_file(dir), &bincode::serialize(&dictionary)?)?;
    write_durable(&postings_file(dir), &bincode::serialize(&generation.postings)?)?;
    write_durable(&norms_file(dir), &bincode::serialize(&generation.norms)?)?;
    write_durable(&stored_file(dir), &bincode::serialize(&generation.stored)?)?;
    let meta = MetaFile {
        generation: generation.number,
        num_docs: generation.num_docs,
        num_terms: generation.num_terms(),
        created_at: time::OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default(),
        version: FORMAT_VERSION,
    };
    write_durable(&meta_file(dir), serde_json::to_string_pretty(&meta)?.as_bytes())?;
    Ok(())
}

pub fn load_meta(dir: &Path) -> Result<MetaFile> {
    let buf = read_all(&meta_file(dir))?;
    Ok(serde_json::from_slice(&buf)?)
}

pub fn load_generation(dir: &Path) -> Result<Generation> {
    let meta = load_meta(dir)?;
    let (schema, dictionary): DictionaryFile = bincode::deserialize(&read_all(&dictionary_file(dir))?)?;
    let postings: Vec<Vec<Posting>> = bincode::deserialize(&read_all(&postings_file(dir))?)?;
    let norms: HashMap<String, Vec<FieldNorm>> = bincode::deserialize(&read_all(&norms_file(dir))?)?;
    let stored: Vec<StoredFields> = bincode::deserialize(&read_all(&stored_file(dir))?)?;
    Ok(Generation { number: meta.generation, schema, dictionary, postings, norms, stored, num_docs: meta.num_docs })
}

/// Generations as bincode files under `<root>/generations/<n>/`, published by
/// atomically replacing `<root>/CURRENT`.
pub struct FsStore {
    paths: IndexPaths,
    published: Published,
}

impl FsStore {
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let paths = IndexPaths::new(root);
        create_dir_all(paths.generations())?;
        let generation = match read_current(&paths)? {
            Some(number) => load_generation(&paths.generation(number))?,
            None => Generation::empty(),
        };
        Ok(Self { paths, published: Published::new(generation) })
    }

    fn remove_stale(&self, keep: u64) {
        let entries = match fs::read_dir(self.paths.generations()) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!(error = %err, "cannot list generations");
                return;
            }
        };
        for entry in entries.filter_map(|e| e.ok()) {
            let name = entry.file_name();
            let stale = name.to_str().is_some_and(|n| match n.strip_suffix(".tmp") {
                Some(staged) => staged.parse::<u64>().is_ok(),
                None => n.parse::<u64>().is_ok_and(|n| n != keep),
            });
            if stale {
                if let Err(err) = fs::remove_dir_all(entry.path()) {
                    tracing::warn!(error = %err, path = %entry.path().display(), "cannot remove stale generation");
                }
            }
        }
    }
}

fn read_current(paths: &IndexPaths) -> Result<Option<u64>> {
    match fs::read_to_string(paths.current()) {
        Ok(s) => s
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|e| Error::Io(std::io::Error::new(ErrorKind::InvalidData, e))),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

impl Store for FsStore {
    fn open_for_write(&self) -> Result<WriteLease> {
        let latest = read_current(&self.paths)?.unwrap_or(0).max(self.published.current().number);
        self.published.lease(latest)
    }

    fn commit(&self, lease: &WriteLease, generation: Generation) -> Result<Arc<Generation>> {
        self.published.check(lease, &generation)?;
        let number = generation.number;
        let staging = self.paths.staging(number);
        let target = self.paths.generation(number);

        let written = (|| -> Result<()> {
            if staging.exists() {
                fs::remove_dir_all(&staging)?;
            }
            save_generation(&staging, &generation)?;
            if target.exists() {
                fs::remove_dir_all(&target)?;
            }
            fs::rename(&staging, &target)?;
            let pointer = self.paths.root.join("CURRENT.tmp");
            write_durable(&pointer, number.to_string().as_bytes())?;
            fs::rename(&pointer, self.paths.current())?;
            Ok(())
        })();
        if let Err(err) = written {
            tracing::error!(generation = number, error = %err, "commit failed, keeping previous generation");
            let _ = fs::remove_dir_all(&staging);
            let _ = fs::remove_dir_all(&target);
            return Err(err);
        }

        let published = self.published.publish(generation);
        self.remove_stale(number);
        Ok(published)
    }

    fn open_for_read(&self) -> Result<Arc<Generation>> {
        let current = self.published.current();
        match read_current(&self.paths)? {
            Some(number) if number != current.number => {
                let loaded = load_generation(&self.paths.generation(number))?;
                tracing::info!(generation = number, num_docs = loaded.num_docs, "reloaded generation committed elsewhere");
                Ok(self.published.swap(loaded))
            }
            _ => Ok(current),
        }
    }
}
