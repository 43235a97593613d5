//! Document producers: turn a file or a directory tree into the finite
//! sequence of documents handed to `Index::fit`.

use crate::{Document, Schema};
use serde_json::Value;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("{}: {source}", path.display())]
    Io { path: PathBuf, source: std::io::Error },
    #[error("{}:{line}: invalid JSON: {source}", path.display())]
    Json { path: PathBuf, line: usize, source: serde_json::Error },
    #[error("{}: expected a JSON object, found {found}", path.display())]
    NotAnObject { path: PathBuf, found: &'static str },
    #[error("{}: file is not valid UTF-8", path.display())]
    NotUtf8 { path: PathBuf },
    #[error("{}: walk failed: {source}", path.display())]
    Walk { path: PathBuf, source: walkdir::Error },
}

#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Receives the file path relative to the walked root.
    pub filename_field: String,
    /// Receives the file contents.
    pub content_field: String,
    /// Extensions (without the dot) loaded as plain-text documents.
    pub extensions: Vec<String>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            filename_field: "filename".into(),
            content_field: "content".into(),
            extensions: vec!["md".into(), "mdx".into()],
        }
    }
}

impl LoadOptions {
    /// Writes file contents into the first text field and file names into
    /// the first keyword field, falling back to the defaults.
    pub fn for_schema(schema: &Schema) -> Self {
        let defaults = Self::default();
        Self {
            filename_field: schema.keyword_fields().first().cloned().unwrap_or(defaults.filename_field),
            content_field: schema.text_fields().first().cloned().unwrap_or(defaults.content_field),
            extensions: defaults.extensions,
        }
    }

    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }
}

/// Load documents from `path`: a directory is walked in file-name order,
/// a single file is loaded on its own.
pub fn load(path: &Path, options: &LoadOptions) -> Result<Vec<Document>, LoadError> {
    let mut docs = Vec::new();
    if path.is_dir() {
        for entry in WalkDir::new(path).sort_by_file_name() {
            let entry = entry.map_err(|source| LoadError::Walk { path: path.to_path_buf(), source })?;
            let p = entry.path();
            if !entry.file_type().is_file() {
                continue;
            }
            match extension(p).as_deref() {
                Some("json") => load_json(p, &mut docs)?,
                Some("jsonl") => load_jsonl(p, &mut docs)?,
                Some(ext) if options.extensions.iter().any(|e| e == ext) => {
                    docs.push(text_document(p, &relative_name(path, p), options)?);
                }
                _ => tracing::debug!(path = %p.display(), "skipping file"),
            }
        }
    } else {
        match extension(path).as_deref() {
            Some("json") => load_json(path, &mut docs)?,
            Some("jsonl") => load_jsonl(path, &mut docs)?,
            _ => {
                let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
                docs.push(text_document(path, &name, options)?);
            }
        }
    }
    tracing::info!(path = %path.display(), num_docs = docs.len(), "loaded documents");
    Ok(docs)
}

fn extension(p: &Path) -> Option<String> {
    p.extension().and_then(|s| s.to_str()).map(str::to_ascii_lowercase)
}

/// `root/docs/welcome.md` -> `docs/welcome.md`
fn relative_name(root: &Path, p: &Path) -> String {
    let rel = p.strip_prefix(root).unwrap_or(p);
    rel.components().map(|c| c.as_os_str().to_string_lossy()).collect::<Vec<_>>().join("/")
}

fn text_document(p: &Path, name: &str, options: &LoadOptions) -> Result<Document, LoadError> {
    let bytes = fs::read(p).map_err(|source| LoadError::Io { path: p.to_path_buf(), source })?;
    let content = String::from_utf8(bytes).map_err(|_| LoadError::NotUtf8 { path: p.to_path_buf() })?;
    Ok(Document::new()
        .with_field(options.filename_field.as_str(), name)
        .with_field(options.content_field.as_str(), content))
}

fn load_jsonl(p: &Path, docs: &mut Vec<Document>) -> Result<(), LoadError> {
    let f = File::open(p).map_err(|source| LoadError::Io { path: p.to_path_buf(), source })?;
    let reader = BufReader::new(f);
    for (i, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| LoadError::Io { path: p.to_path_buf(), source })?;
        if line.trim().is_empty() { continue; }
        let value: Value = serde_json::from_str(&line)
            .map_err(|source| LoadError::Json { path: p.to_path_buf(), line: i + 1, source })?;
        docs.push(document_from_value(p, value)?);
    }
    Ok(())
}

fn load_json(p: &Path, docs: &mut Vec<Document>) -> Result<(), LoadError> {
    let f = File::open(p).map_err(|source| LoadError::Io { path: p.to_path_buf(), source })?;
    let reader = BufReader::new(f);
    let json: Value = serde_json::from_reader(reader)
        .map_err(|source| LoadError::Json { path: p.to_path_buf(), line: source.line(), source })?;
    match json {
        Value::Array(arr) => {
            for v in arr {
                docs.push(document_from_value(p, v)?);
            }
        }
        other => docs.push(document_from_value(p, other)?),
    }
    Ok(())
}

/// Flattens one JSON object into string fields.
pub fn document_from_value(p: &Path, value: Value) -> Result<Document, LoadError> {
    let found = match &value {
        Value::Object(_) => "object",
        Value::Array(_) => "array",
        Value::String(_) => "string",
        Value::Number(_) => "number",
        Value::Bool(_) => "boolean",
        Value::Null => "null",
    };
    let Value::Object(map) = value else {
        return Err(LoadError::NotAnObject { path: p.to_path_buf(), found });
    };
    Ok(map
        .into_iter()
        .map(|(k, v)| {
            let v = match v {
                Value::String(s) => s,
                Value::Null => String::new(),
                other => other.to_string(),
            };
            (k, v)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn walks_markdown_tree_in_order() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("docs/sub")).unwrap();
        fs::write(dir.path().join("docs/welcome.md"), "Welcome demo").unwrap();
        fs::write(dir.path().join("docs/sub/guide.mdx"), "Guide").unwrap();
        fs::write(dir.path().join("README.MD"), "Readme").unwrap();
        fs::write(dir.path().join("main.py"), "print()").unwrap();

        let docs = load(dir.path(), &LoadOptions::default()).unwrap();
        let names: Vec<&str> = docs.iter().map(|d| d.get("filename").unwrap()).collect();
        assert_eq!(names, ["README.MD", "docs/sub/guide.mdx", "docs/welcome.md"]);
        assert_eq!(docs[2].get("content"), Some("Welcome demo"));
    }

    #[test]
    fn options_follow_schema_fields() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("intro.md"), "Hello").unwrap();
        let schema = Schema::new(["body"], ["path"]).unwrap();
        let docs = load(dir.path(), &LoadOptions::for_schema(&schema)).unwrap();
        assert_eq!(docs[0].get("body"), Some("Hello"));
        assert_eq!(docs[0].get("path"), Some("intro.md"));
        assert!(schema.validate(&docs[0]).is_ok());

        let bare = LoadOptions::for_schema(&Schema::new(["body"], Vec::<String>::new()).unwrap());
        assert_eq!(bare.filename_field, "filename");
        let txt = LoadOptions::default().with_extensions(vec!["txt".into()]);
        assert_eq!(txt.extensions, ["txt"]);
    }

    #[test]
    fn json_and_jsonl() {
        let dir = tempdir().unwrap();
        let json = dir.path().join("docs.json");
        fs::write(&json, r#"[{"content": "a", "n": 3, "tag": null}, {"content": "b", "ok": true}]"#).unwrap();
        let docs = load(&json, &LoadOptions::default()).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].get("n"), Some("3"));
        assert_eq!(docs[0].get("tag"), Some(""));
        assert_eq!(docs[1].get("ok"), Some("true"));

        let jsonl = dir.path().join("docs.jsonl");
        fs::write(&jsonl, "{\"content\": \"x\"}\n\n{\"content\": \"y\"}\n").unwrap();
        let docs = load(&jsonl, &LoadOptions::default()).unwrap();
        assert_eq!(docs.iter().map(|d| d.get("content").unwrap()).collect::<Vec<_>>(), ["x", "y"]);
    }

    #[test]
    fn reports_bad_input() {
        let dir = tempdir().unwrap();
        let jsonl = dir.path().join("bad.jsonl");
        fs::write(&jsonl, "{\"content\": \"x\"}\n{oops\n").unwrap();
        assert!(matches!(load(&jsonl, &LoadOptions::default()), Err(LoadError::Json { line: 2, .. })));

        let scalar = dir.path().join("scalar.json");
        fs::write(&scalar, "[1]").unwrap();
        assert!(matches!(load(&scalar, &LoadOptions::default()), Err(LoadError::NotAnObject { found: "number", .. })));

        let binary = dir.path().join("blob.md");
        fs::write(&binary, [0xff, 0xfe, 0x00]).unwrap();
        assert!(matches!(load(&binary, &LoadOptions::default()), Err(LoadError::NotUtf8 { .. })));

        let missing = dir.path().join("missing.txt");
        assert!(matches!(load(&missing, &LoadOptions::default()), Err(LoadError::Io { .. })));
    }
}
