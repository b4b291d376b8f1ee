/// Byte sources that model files are fetched from
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

use crate::cancel::CancellationToken;
use crate::config::RenderConfig;
use crate::error::LoadError;

/// Callback receiving `(bytes loaded, total bytes if known)`
pub type ByteProgress<'a> = dyn FnMut(u64, Option<u64>) + 'a;

/// Fetches the raw bytes of a model
pub trait ModelSource: Send + Sync {
    fn fetch(
        &self,
        url: &str,
        progress: &mut ByteProgress<'_>,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, LoadError>;
}

/// Read `reader` to the end in `chunk_size` pieces, reporting progress after
/// each piece and stopping early once `cancel` is set.
pub fn read_with_progress<R: Read>(
    mut reader: R,
    total: Option<u64>,
    chunk_size: usize,
    progress: &mut ByteProgress<'_>,
    cancel: &CancellationToken,
) -> Result<Vec<u8>, LoadError> {
    let capacity = total.map_or(0, |t| t.min(256 * 1024 * 1024) as usize);
    let mut data = Vec::with_capacity(capacity);
    let mut chunk = vec![0u8; chunk_size.max(1)];

    loop {
        if cancel.is_cancelled() {
            return Err(LoadError::Cancelled);
        }
        let read = match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        data.extend_from_slice(&chunk[..read]);
        progress(data.len() as u64, total);
    }

    Ok(data)
}

/// Local files, addressed by plain path or `file://` URL
#[derive(Debug, Clone)]
pub struct FileSource {
    chunk_size: usize,
}

impl FileSource {
    pub fn new(config: &RenderConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
        }
    }
}

impl ModelSource for FileSource {
    fn fetch(
        &self,
        url: &str,
        progress: &mut ByteProgress<'_>,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, LoadError> {
        let path = Path::new(url.strip_prefix("file://").unwrap_or(url));
        let file = File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => LoadError::NotFound {
                url: url.to_string(),
            },
            _ => LoadError::Io(e),
        })?;
        let total = file.metadata().map(|m| m.len()).ok();
        log::debug!("reading {} ({:?} bytes)", path.display(), total);
        read_with_progress(file, total, self.chunk_size, progress, cancel)
    }
}

/// Bytes already held in memory, keyed by URL
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    entries: HashMap<String, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(url, bytes);
        self
    }

    pub fn insert(&mut self, url: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.entries.insert(url.into(), bytes.into());
    }
}

impl ModelSource for MemorySource {
    fn fetch(
        &self,
        url: &str,
        progress: &mut ByteProgress<'_>,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, LoadError> {
        if cancel.is_cancelled() {
            return Err(LoadError::Cancelled);
        }
        let bytes = self.entries.get(url).ok_or_else(|| LoadError::NotFound {
            url: url.to_string(),
        })?;
        let len = bytes.len() as u64;
        progress(len, Some(len));
        Ok(bytes.clone())
    }
}

/// HTTP(S) downloads through a blocking `reqwest` client
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::blocking::Client,
    chunk_size: usize,
}

#[cfg(not(target_arch = "wasm32"))]
impl HttpSource {
    pub fn new(config: &RenderConfig) -> Result<Self, LoadError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| LoadError::Network {
                url: String::new(),
                message: e.to_string(),
            })?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: reqwest::blocking::Client, config: &RenderConfig) -> Self {
        Self {
            client,
            chunk_size: config.chunk_size,
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl ModelSource for HttpSource {
    fn fetch(
        &self,
        url: &str,
        progress: &mut ByteProgress<'_>,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, LoadError> {
        let network = |e: reqwest::Error| LoadError::Network {
            url: url.to_string(),
            message: e.to_string(),
        };

        let response = self.client.get(url).send().map_err(network)?;
        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::Http {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let total = response.content_length();
        log::debug!("downloading {url} ({total:?} bytes)");
        read_with_progress(response, total, self.chunk_size, progress, cancel).map_err(|e| match e {
            LoadError::Io(io) => LoadError::Network {
                url: url.to_string(),
                message: io.to_string(),
            },
            other => other,
        })
    }
}

/// Dispatches on the URL scheme: `http(s)://` goes to [`HttpSource`],
/// `file://` and bare paths go to [`FileSource`].
#[derive(Debug, Clone)]
pub struct UrlSource {
    config: RenderConfig,
}

impl UrlSource {
    pub fn new(config: &RenderConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.http_timeout = timeout;
        self
    }
}

impl ModelSource for UrlSource {
    fn fetch(
        &self,
        url: &str,
        progress: &mut ByteProgress<'_>,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, LoadError> {
        match url.split_once("://").map(|(scheme, _)| scheme.to_ascii_lowercase()) {
            None => FileSource::new(&self.config).fetch(url, progress, cancel),
            Some(scheme) if scheme == "file" => FileSource::new(&self.config).fetch(url, progress, cancel),
            #[cfg(not(target_arch = "wasm32"))]
            Some(scheme) if scheme == "http" || scheme == "https" => {
                HttpSource::new(&self.config)?.fetch(url, progress, cancel)
            }
            Some(scheme) => Err(LoadError::UnsupportedScheme(scheme)),
        }
    }
}
