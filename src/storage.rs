//! On-disk storage helpers: LZ4-compressed bincode files and index locations.

use std::fs;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::debug;

use crate::error::FixerError;
use crate::{stable_hash, RepoRoot};

// ─── LZ4 compression helpers ────────────────────────────────────────

/// Magic bytes identifying LZ4-compressed index files.
pub const LZ4_MAGIC: &[u8; 4] = b"LZ4S";

/// File extension for saved commit indexes.
pub const INDEX_EXTENSION: &str = "commit-index";

/// Save a serializable value to a file with LZ4 frame compression.
/// Writes magic bytes, then LZ4-compressed bincode data.
pub fn save_compressed<T: serde::Serialize>(path: &Path, data: &T, label: &str) -> Result<(), FixerError> {
    let start = Instant::now();

    let file = fs::File::create(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(LZ4_MAGIC)?;
    let mut encoder = lz4_flex::frame::FrameEncoder::new(writer);
    bincode::serialize_into(&mut encoder, data)?;
    let mut writer = encoder.finish().map_err(std::io::Error::other)?;
    writer.flush()?;

    let compressed_size = fs::metadata(path)?.len();
    debug!(
        label,
        size_kb = format_args!("{:.1}", compressed_size as f64 / 1024.0),
        elapsed_ms = format_args!("{:.1}", start.elapsed().as_secs_f64() * 1000.0),
        path = %path.display(),
        "Saved compressed file"
    );

    Ok(())
}

/// Load a value written by [`save_compressed`].
/// Returns `Err(FixerError::IndexLoad)` with a descriptive message on failure.
pub fn load_compressed<T: serde::de::DeserializeOwned>(path: &Path, label: &str) -> Result<T, FixerError> {
    let path_str = path.display().to_string();
    let start = Instant::now();

    let file = fs::File::open(path).map_err(|e| FixerError::IndexLoad {
        path: path_str.clone(),
        message: format!("cannot open file: {}", e),
    })?;
    let mut reader = BufReader::new(file);

    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic).map_err(|e| FixerError::IndexLoad {
        path: path_str.clone(),
        message: format!("read error (magic bytes): {}", e),
    })?;
    if &magic != LZ4_MAGIC {
        return Err(FixerError::IndexLoad {
            path: path_str,
            message: "not an LZ4 index file (bad magic bytes)".to_string(),
        });
    }

    let decoder = lz4_flex::frame::FrameDecoder::new(reader);
    let result = bincode::deserialize_from(decoder).map_err(|e| FixerError::IndexLoad {
        path: path_str.clone(),
        message: format!("LZ4 deserialization failed: {}", e),
    })?;

    debug!(
        label,
        elapsed_ms = format_args!("{:.1}", start.elapsed().as_secs_f64() * 1000.0),
        path = %path_str,
        "Loaded compressed file"
    );

    Ok(result)
}

// ─── Index locations ────────────────────────────────────────────────

/// Default production index directory: `<local data dir>/parentfix`.
/// Tests should NOT use this — pass a test-local directory instead.
pub fn index_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("parentfix")
}

/// `<root name>_<hash>.commit-index` under `index_base`.
pub fn index_path_for(root: &RepoRoot, index_base: &Path) -> PathBuf {
    let hash = stable_hash(&[
        root.as_path().to_string_lossy().as_bytes(),
        INDEX_EXTENSION.as_bytes(),
    ]);
    index_base.join(format!("{}_{:08x}.{}", root.name(), hash as u32, INDEX_EXTENSION))
}
