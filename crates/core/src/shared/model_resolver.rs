use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("failed to create models directory {path}: {source}")]
    ModelsDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to write model to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not determine models directory")]
    NoModelsDir,
}

/// Progress callback: `(bytes_downloaded, total_bytes)`.
/// `total_bytes` is 0 if the server didn't provide Content-Length.
pub type ProgressFn = Box<dyn Fn(u64, u64) + Send>;

/// Make sure `models_dir/name` exists, downloading it from `url` if absent.
///
/// Idempotent: an existing file is returned as-is without touching the network.
pub fn ensure_available(
    models_dir: &Path,
    name: &str,
    url: &str,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    let model_path = models_dir.join(name);
    if model_path.is_file() {
        log::debug!("Model {name} found at {}", model_path.display());
        return Ok(model_path);
    }

    fs::create_dir_all(models_dir).map_err(|e| ModelResolveError::ModelsDir {
        path: models_dir.to_path_buf(),
        source: e,
    })?;
    log::info!("Downloading {name} to {}", models_dir.display());
    download(url, &model_path, progress)?;
    Ok(model_path)
}

/// `../models` relative to the directory holding the running executable.
pub fn default_models_dir() -> Result<PathBuf, ModelResolveError> {
    let exe = std::env::current_exe().map_err(|_| ModelResolveError::NoModelsDir)?;
    let exe_dir = exe.parent().ok_or(ModelResolveError::NoModelsDir)?;
    Ok(exe_dir.join("..").join("models"))
}

fn download(url: &str, dest: &Path, progress: Option<ProgressFn>) -> Result<(), ModelResolveError> {
    let temp_path = dest.with_extension("part");

    let result = download_inner(url, dest, &temp_path, progress);

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }

    result
}

fn download_inner(
    url: &str,
    dest: &Path,
    temp_path: &Path,
    progress: Option<ProgressFn>,
) -> Result<(), ModelResolveError> {
    let response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|e| ModelResolveError::Download {
            url: url.to_string(),
            source: e,
        })?;

    let total = response.content_length().unwrap_or(0);
    let mut downloaded: u64 = 0;

    let write_err = |e: std::io::Error| ModelResolveError::Write {
        path: temp_path.to_path_buf(),
        source: e,
    };

    let mut file = fs::File::create(temp_path).map_err(write_err)?;

    // The swap model is several hundred MB; stream instead of buffering.
    let mut reader = response;
    let mut buf = vec![0u8; 1024 * 1024];
    loop {
        let n = reader.read(&mut buf).map_err(write_err)?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n]).map_err(write_err)?;
        downloaded += n as u64;
        if let Some(ref cb) = progress {
            cb(downloaded, total);
        }
    }

    file.flush().map_err(write_err)?;
    drop(file);

    fs::rename(temp_path, dest).map_err(|e| ModelResolveError::Write {
        path: dest.to_path_buf(),
        source: e,
    })?;

    Ok(())
}
