use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use blake3::Hasher;
use tracing::{debug, info};

use crate::cache::freshness::{Freshness, FreshnessProvider, Version};
use crate::task::Location;

/// Relative path (from the provider root) to the generation ledger.
///
/// The effective path on disk is `<root>/.provdag/hashes`.
pub const HASH_FILE_PATH: &str = ".provdag/hashes";

/// Compute the hash of a single file.
pub fn compute_file_hash(path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut file =
        File::open(path).with_context(|| format!("opening file for hashing: {:?}", path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Compute a deterministic hash over the contents of the given files.
///
/// Order of `paths` does not matter; they are sorted before hashing. Paths
/// that are not regular files are ignored.
pub fn compute_hash_for_paths<I, P>(paths: I) -> Result<String>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut hasher = Hasher::new();

    let mut paths_vec: Vec<PathBuf> = paths
        .into_iter()
        .map(|p| p.as_ref().to_path_buf())
        .collect();
    paths_vec.sort();

    for path in paths_vec {
        if path.is_file() {
            let file_hash = compute_file_hash(&path)?;
            hasher.update(path.to_string_lossy().as_bytes());
            hasher.update(file_hash.as_bytes());
        }
    }

    Ok(hasher.finalize().to_hex().to_string())
}

fn digest_of(path: &Path) -> Result<String> {
    if path.is_dir() {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path).with_context(|| format!("reading dir {:?}", path))? {
            entries.push(entry?.path());
        }
        compute_hash_for_paths(entries)
    } else {
        compute_file_hash(path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct LedgerEntry {
    generation: u64,
    digest: String,
}

#[derive(Debug, Default)]
struct Ledger {
    entries: BTreeMap<String, LedgerEntry>,
    max_generation: u64,
}

impl Ledger {
    /// Generation the location would have right now, without recording it.
    fn generation_for(&self, key: &str, digest: &str) -> u64 {
        match self.entries.get(key) {
            Some(entry) if entry.digest == digest => entry.generation,
            _ => self.max_generation + 1,
        }
    }
}

/// Freshness from blake3 content hashes.
///
/// Every location gets a logical generation from a ledger. A location whose
/// content still matches its ledger entry keeps the recorded generation; a
/// changed or never-seen location reads as one past the newest generation,
/// i.e. newer than anything recorded. Probing never writes the ledger; only
/// [`FreshnessProvider::mark_fresh`] does.
#[derive(Debug)]
pub struct HashFreshness {
    root: PathBuf,
    ledger: Mutex<Ledger>,
    persist: bool,
}

impl HashFreshness {
    /// Open (or start) the ledger stored under `<root>/.provdag/hashes`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let ledger = load_ledger(&root)?;
        debug!(
            root = ?root,
            entries = ledger.entries.len(),
            max_generation = ledger.max_generation,
            "loaded hash ledger"
        );
        Ok(Self {
            root,
            ledger: Mutex::new(ledger),
            persist: true,
        })
    }

    /// Ledger kept in memory only (lost when the provider is dropped).
    pub fn in_memory(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ledger: Mutex::new(Ledger::default()),
            persist: false,
        }
    }

    fn resolve(&self, location: &Location) -> PathBuf {
        self.root.join(location.as_path())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Ledger>> {
        self.ledger
            .lock()
            .map_err(|_| anyhow!("hash ledger lock poisoned"))
    }
}

impl FreshnessProvider for HashFreshness {
    fn freshness(&self, location: &Location) -> Result<Freshness> {
        let path = self.resolve(location);
        if !path.exists() {
            return Ok(Freshness::Missing);
        }
        let digest = digest_of(&path)?;
        let ledger = self.lock()?;
        let generation = ledger.generation_for(location.as_str(), &digest);
        Ok(Freshness::Present(Version(u128::from(generation))))
    }

    fn mark_fresh(&self, outputs: &[Location], inputs: &[Location]) -> Result<()> {
        let mut ledger = self.lock()?;
        let generation = ledger.max_generation + 1;

        for loc in inputs {
            let path = self.resolve(loc);
            if !path.exists() {
                continue;
            }
            let digest = digest_of(&path)?;
            let unchanged = ledger
                .entries
                .get(loc.as_str())
                .is_some_and(|e| e.digest == digest);
            if !unchanged {
                ledger
                    .entries
                    .insert(loc.as_str().to_string(), LedgerEntry { generation, digest });
            }
        }

        for loc in outputs {
            let path = self.resolve(loc);
            if !path.exists() {
                create_marker(&path)?;
            }
            let digest = digest_of(&path)?;
            ledger
                .entries
                .insert(loc.as_str().to_string(), LedgerEntry { generation, digest });
        }

        ledger.max_generation = generation;

        if self.persist {
            save_ledger(&self.root, &ledger)?;
        }

        info!(generation, outputs = outputs.len(), "recorded output hashes");
        Ok(())
    }
}

fn create_marker(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating marker dir {:?}", parent))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("creating marker {:?}", path))?;
    Ok(())
}

fn load_ledger(root: &Path) -> Result<Ledger> {
    let path = root.join(HASH_FILE_PATH);

    if !path.exists() {
        return Ok(Ledger::default());
    }

    let file = File::open(&path).with_context(|| format!("opening hash file at {:?}", path))?;
    let reader = BufReader::new(file);

    let mut ledger = Ledger::default();

    for line_res in reader.lines() {
        let line = line_res?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let mut parts = trimmed.splitn(3, ' ');
        let (Some(generation), Some(digest), Some(location)) =
            (parts.next(), parts.next(), parts.next())
        else {
            debug!(line = %trimmed, "skipping malformed hash ledger line");
            continue;
        };
        let generation: u64 = generation
            .parse()
            .with_context(|| format!("parsing generation in {:?}", path))?;
        ledger.max_generation = ledger.max_generation.max(generation);
        ledger.entries.insert(
            location.to_string(),
            LedgerEntry {
                generation,
                digest: digest.to_string(),
            },
        );
    }

    Ok(ledger)
}

fn save_ledger(root: &Path, ledger: &Ledger) -> Result<()> {
    let path = root.join(HASH_FILE_PATH);

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating hash directory at {:?}", parent))?;
    }

    let file = File::create(&path).with_context(|| format!("creating hash file at {:?}", path))?;
    let mut writer = BufWriter::new(file);

    for (location, entry) in ledger.entries.iter() {
        writeln!(writer, "{} {} {}", entry.generation, entry.digest, location)?;
    }

    writer.flush()?;
    Ok(())
}
