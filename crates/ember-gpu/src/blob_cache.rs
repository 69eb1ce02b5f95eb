//! Persistent cache for compiled pipeline/shader blobs.
//!
//! Building native shader combinations is the most expensive step in the
//! layer; persisting the compiled bytes lets later sessions skip it. Entries
//! are keyed by (shader-combination content hash, backend name) and carry the
//! list of source files they were compiled from, with modification times: an
//! entry is served only while none of its sources are newer than recorded,
//! otherwise the caller rebuilds and the entry is replaced.
//!
//! All failure paths are best-effort misses: a corrupt or unreadable entry
//! means a rebuild, never an error surfaced to rendering.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Strong key for persisted blobs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobCacheKey {
    content_hash: [u8; 32],
    backend: String,
}

impl BlobCacheKey {
    /// Derive a key from the backend name and the content parts (shader
    /// sources, entry points, defines) that determine the compiled output.
    ///
    /// Parts are length-prefixed so concatenation ambiguity cannot alias two
    /// different inputs.
    pub fn from_content<'a>(backend: &str, parts: impl IntoIterator<Item = &'a [u8]>) -> Self {
        let mut hasher = blake3::Hasher::new();
        for part in parts {
            hasher.update(&(part.len() as u64).to_le_bytes());
            hasher.update(part);
        }
        Self {
            content_hash: *hasher.finalize().as_bytes(),
            backend: backend.to_string(),
        }
    }

    pub fn backend(&self) -> &str {
        &self.backend
    }

    fn file_stem(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.content_hash);
        hasher.update(self.backend.as_bytes());
        let digest = hasher.finalize();
        let bytes = digest.as_bytes();
        let mut stem = String::with_capacity(32);
        for byte in &bytes[..16] {
            stem.push_str(&format!("{byte:02x}"));
        }
        stem
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct FileStamp {
    path: PathBuf,
    mtime_secs: u64,
    mtime_nanos: u32,
}

impl FileStamp {
    fn of(path: &Path) -> io::Result<Self> {
        let modified = fs::metadata(path)?.modified()?;
        let since_epoch = modified
            .duration_since(UNIX_EPOCH)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            mtime_secs: since_epoch.as_secs(),
            mtime_nanos: since_epoch.subsec_nanos(),
        })
    }

    /// True while the file still exists and has not been modified since the
    /// stamp was recorded.
    fn is_current(&self) -> bool {
        let Ok(metadata) = fs::metadata(&self.path) else {
            return false;
        };
        let Ok(modified) = metadata.modified() else {
            return false;
        };
        let recorded = UNIX_EPOCH
            + std::time::Duration::new(self.mtime_secs, self.mtime_nanos);
        modified <= recorded
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    backend: String,
    dependencies: Vec<FileStamp>,
}

/// On-disk blob store: one JSON manifest plus one raw blob file per entry.
#[derive(Debug)]
pub struct PipelineBlobCache {
    root: PathBuf,
}

impl PipelineBlobCache {
    pub fn open(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn manifest_path(&self, key: &BlobCacheKey) -> PathBuf {
        self.root.join(format!("{}.json", key.file_stem()))
    }

    fn blob_path(&self, key: &BlobCacheKey) -> PathBuf {
        self.root.join(format!("{}.bin", key.file_stem()))
    }

    /// Fetch a blob if its entry is still valid. Any failure (missing or
    /// corrupt entry, mismatched backend, source file newer than recorded)
    /// is a miss.
    pub fn load(&self, key: &BlobCacheKey) -> Option<Vec<u8>> {
        let manifest_bytes = fs::read(self.manifest_path(key)).ok()?;
        let manifest: Manifest = match serde_json::from_slice(&manifest_bytes) {
            Ok(manifest) => manifest,
            Err(error) => {
                warn!(%error, "discarding corrupt blob cache manifest");
                self.invalidate(key);
                return None;
            }
        };

        if manifest.backend != key.backend {
            warn!(
                recorded = %manifest.backend,
                requested = %key.backend,
                "blob cache backend mismatch; rebuilding"
            );
            return None;
        }

        for stamp in &manifest.dependencies {
            if !stamp.is_current() {
                debug!(path = %stamp.path.display(), "blob cache source changed; rebuilding");
                return None;
            }
        }

        fs::read(self.blob_path(key)).ok()
    }

    /// Persist a blob together with the modification times of the source
    /// files it was built from. Replaces any previous entry for the key.
    pub fn store(&self, key: &BlobCacheKey, blob: &[u8], sources: &[&Path]) -> io::Result<()> {
        let mut dependencies = Vec::with_capacity(sources.len());
        for source in sources {
            dependencies.push(FileStamp::of(source)?);
        }

        let manifest = Manifest {
            backend: key.backend.clone(),
            dependencies,
        };

        fs::write(self.blob_path(key), blob)?;
        fs::write(
            self.manifest_path(key),
            serde_json::to_vec_pretty(&manifest)?,
        )?;
        Ok(())
    }

    /// Best-effort removal of an entry.
    pub fn invalidate(&self, key: &BlobCacheKey) {
        let _ = fs::remove_file(self.manifest_path(key));
        let _ = fs::remove_file(self.blob_path(key));
    }
}
