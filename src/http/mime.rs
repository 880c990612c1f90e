//! Extension to MIME type table.
//!
//! The table file has one MIME type per line followed by the extensions (no
//! leading dot) that map to it, all whitespace separated. Loaded once at
//! startup and shared read-only between connections.

use std::path::Path;

pub const DEFAULT_CONTENT_TYPE: &str = "text/plain";

const BUILTIN_TABLE: &str = "\
application/json        json
application/ogg         ogg
application/pdf         pdf
application/wasm        wasm
application/xml         xsl xml
application/zip         zip
audio/mpeg              mp2 mp3 mpga
image/gif               gif
image/jpeg              jpeg jpe jpg
image/png               png
image/svg+xml           svg
image/x-icon            ico
text/css                css
text/html               html htm
text/javascript         js
text/plain              txt asc
video/mp4               mp4
video/mpeg              mpeg mpe mpg
video/quicktime         qt mov
";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    pub mime_type: String,
    pub extensions: Vec<String>,
}

/// Ordered (MIME type, extensions) entries. The first entry listing an
/// extension wins.
#[derive(Debug, Clone, Default)]
pub struct ContentTypeTable {
    entries: Vec<ContentType>,
}

impl ContentTypeTable {
    /// Parses the table format. Blank lines are skipped.
    pub fn parse(text: &str) -> Self {
        let entries = text
            .lines()
            .filter_map(|line| {
                let mut fields = line.split_whitespace();
                let mime_type = fields.next()?;
                Some(ContentType {
                    mime_type: mime_type.to_string(),
                    extensions: fields.map(str::to_string).collect(),
                })
            })
            .collect();

        Self { entries }
    }

    pub fn load(path: &Path) -> std::io::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::parse(&text))
    }

    /// Table used when no file is configured.
    pub fn builtin() -> Self {
        Self::parse(BUILTIN_TABLE)
    }

    pub fn entries(&self) -> &[ContentType] {
        &self.entries
    }

    /// Looks up an extension (case-sensitive). Unknown or absent extensions
    /// map to `text/plain`.
    pub fn lookup(&self, extension: Option<&str>) -> &str {
        let Some(extension) = extension else {
            return DEFAULT_CONTENT_TYPE;
        };

        self.entries
            .iter()
            .find(|entry| entry.extensions.iter().any(|ext| ext == extension))
            .map(|entry| entry.mime_type.as_str())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
    }

    /// MIME type for a file, keyed by the text after the last `.` of its name.
    pub fn for_path(&self, path: &Path) -> &str {
        let extension = path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, ext)| ext);

        self.lookup(extension)
    }
}
