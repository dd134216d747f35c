//! Download-if-absent provisioning of the reference ODIM files.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::Error;

pub const DEFAULT_BASE_URL: &str = "https://js2.jetstream-cloud.org:8001/";
pub const DEFAULT_REMOTE_PATH: &str = "pythia/radar/erad2024/baltrad/pyart2baltrad";
pub const DEFAULT_CACHE_DIR: &str = "data";

pub const FIXTURE_FILES: [&str; 2] = ["Example_scan.h5", "Example_pvol.h5"];

/// Where fixtures are fetched from and cached to.
#[derive(Clone, Debug, PartialEq)]
pub struct FixtureSource {
    pub base_url: String,
    pub remote_path: String,
    pub cache_dir: PathBuf,
}

impl Default for FixtureSource {
    fn default() -> Self {
        FixtureSource {
            base_url: DEFAULT_BASE_URL.to_string(),
            remote_path: DEFAULT_REMOTE_PATH.to_string(),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
        }
    }
}

impl FixtureSource {
    pub fn remote_url(&self, name: &str) -> String {
        [
            self.base_url.as_str(),
            self.remote_path.as_str(),
            name,
        ]
        .iter()
        .map(|part| part.trim_matches('/'))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("/")
    }

    pub fn local_path(&self, name: &str) -> PathBuf {
        let base_name = Path::new(name)
            .file_name()
            .map(|file_name| file_name.to_os_string())
            .unwrap_or_else(|| name.into());
        self.cache_dir.join(base_name)
    }

    /// Returns the cached copy of `name`, downloading it first if it is absent.
    pub fn ensure_local(&self, name: &str) -> Result<PathBuf, Error> {
        let path = self.local_path(name);
        if path.exists() {
            log::debug!("{} is already cached", path.display());
            return Ok(path);
        }
        fs::create_dir_all(&self.cache_dir)?;

        let url = self.remote_url(name);
        log::info!("Downloading {} to {}", url, path.display());
        let mut response = reqwest::blocking::get(&url)?.error_for_status()?;

        let mut partial_name = path.clone().into_os_string();
        partial_name.push(".partial");
        let partial_path = PathBuf::from(partial_name);
        let written = match write_partial(&mut response, &partial_path) {
            Ok(written) => written,
            Err(err) => {
                let _ = fs::remove_file(&partial_path);
                return Err(err);
            }
        };
        fs::rename(&partial_path, &path)?;
        log::info!("Downloaded {} bytes to {}", written, path.display());
        Ok(path)
    }

    /// Ensures every named file is cached, in order.
    pub fn provision<'a>(
        &self,
        names: impl IntoIterator<Item = &'a str>,
    ) -> Result<Vec<PathBuf>, Error> {
        names
            .into_iter()
            .map(|name| self.ensure_local(name))
            .collect()
    }
}

/// Streams the response body to `path`. A body cut short of its announced
/// length surfaces as a network error.
fn write_partial(response: &mut reqwest::blocking::Response, path: &Path) -> Result<u64, Error> {
    let mut output = io::BufWriter::new(fs::File::create(path)?);
    let written = response.copy_to(&mut output)?;
    output.flush()?;
    Ok(written)
}
