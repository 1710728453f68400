use std::collections::HashMap;

/// Content type for extensions missing from the table.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

const DEFAULTS: &[(&str, &str)] = &[
    (".zip", "application/zip"),
    (".tar", "application/x-tar"),
    (".gz", "application/gzip"),
    (".tgz", "application/gzip"),
    (".xz", "application/x-xz"),
    (".bz2", "application/x-bzip2"),
    (".zst", "application/zstd"),
    (".7z", "application/x-7z-compressed"),
    (".deb", "application/vnd.debian.binary-package"),
    (".rpm", "application/x-rpm"),
    (".exe", "application/vnd.microsoft.portable-executable"),
    (".msi", "application/x-msdownload"),
    (".dmg", "application/x-apple-diskimage"),
    (".apk", "application/vnd.android.package-archive"),
    (".jar", "application/java-archive"),
    (".wasm", "application/wasm"),
    (".bin", "application/octet-stream"),
    (".json", "application/json"),
    (".txt", "text/plain; charset=utf-8"),
];

/// Extension to MIME type lookup table.
///
/// Keys are stored lowercase with a leading dot; lookups are
/// case-insensitive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentTypes {
    table: HashMap<String, String>,
}

fn normalize(ext: &str) -> String {
    let ext = ext.to_ascii_lowercase();
    if ext.starts_with('.') {
        ext
    } else {
        format!(".{ext}")
    }
}

impl ContentTypes {
    /// An empty table: every lookup yields [`DEFAULT_CONTENT_TYPE`].
    pub fn empty() -> Self {
        Self {
            table: HashMap::new(),
        }
    }

    /// Add or replace entries. Extensions may be given with or without the dot.
    pub fn with_overrides<I, K, V>(mut self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (ext, mime) in overrides {
            self.table.insert(normalize(ext.as_ref()), mime.into());
        }
        self
    }

    pub fn lookup(&self, ext: &str) -> &str {
        self.table
            .get(&normalize(ext))
            .map(String::as_str)
            .unwrap_or(DEFAULT_CONTENT_TYPE)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl Default for ContentTypes {
    fn default() -> Self {
        Self::empty().with_overrides(DEFAULTS.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_archives() {
        let ct = ContentTypes::default();
        assert_eq!(ct.lookup(".zip"), "application/zip");
        assert_eq!(ct.lookup(".ZIP"), "application/zip");
        assert_eq!(ct.lookup("tgz"), "application/gzip");
    }

    #[test]
    fn unknown_extension_falls_back() {
        assert_eq!(ContentTypes::default().lookup(".unknownext"), DEFAULT_CONTENT_TYPE);
        assert_eq!(ContentTypes::empty().lookup(".zip"), DEFAULT_CONTENT_TYPE);
    }

    #[test]
    fn overrides_replace_defaults() {
        let ct = ContentTypes::default().with_overrides([
            ("zip", "application/x-zip"),
            (".AppImage", "application/x-appimage"),
        ]);
        assert_eq!(ct.lookup(".zip"), "application/x-zip");
        assert_eq!(ct.lookup(".appimage"), "application/x-appimage");
        assert_eq!(ct.len(), DEFAULTS.len() + 1);
    }
}
