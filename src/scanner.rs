use crate::config::Config;
use crate::error::{Error, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    pub classes: BTreeSet<String>,
    pub files_scanned: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    pub dirs: Vec<PathBuf>,
    pub extensions: Vec<String>,
    pub exclude: Vec<String>,
    pub respect_gitignore: bool,
}

impl ScanOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            dirs: config.watch_dirs.iter().map(PathBuf::from).collect(),
            extensions: config.extensions.clone(),
            exclude: config.exclude.patterns.clone(),
            respect_gitignore: true,
        }
    }
}

pub fn scan(options: &ScanOptions) -> Result<ScanResult> {
    let paths = collect_files(options)?;
    Ok(scan_files(&paths))
}

pub fn scan_files(paths: &[PathBuf]) -> ScanResult {
    let mut classes = BTreeSet::new();
    let mut files_scanned = 0;

    for path in paths {
        match fs::read_to_string(path) {
            Ok(text) => {
                classes.extend(extract_classes(&text));
                files_scanned += 1;
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to read file, skipping");
            }
        }
    }

    ScanResult {
        classes,
        files_scanned,
    }
}

pub fn collect_files(options: &ScanOptions) -> Result<Vec<PathBuf>> {
    let exclude_set = build_globset(&options.exclude)?;
    let mut paths = Vec::new();
    let mut seen = HashSet::new();

    for dir in &options.dirs {
        if !dir.exists() {
            warn!(dir = %dir.display(), "watch dir does not exist");
            continue;
        }

        let mut builder = WalkBuilder::new(dir);
        builder
            .hidden(true)
            .git_ignore(options.respect_gitignore)
            .git_global(options.respect_gitignore)
            .git_exclude(options.respect_gitignore);

        let mut matched = 0usize;
        for entry in builder.build() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(_) => continue,
            };
            if !entry.file_type().map(|ft| ft.is_file()).unwrap_or(false) {
                continue;
            }
            let path = entry.path();
            if !has_extension(path, &options.extensions) {
                continue;
            }
            let relative_path = path.strip_prefix(dir).unwrap_or(path);
            if exclude_set.is_match(relative_path) || exclude_set.is_match(path) {
                continue;
            }
            matched += 1;
            if seen.insert(path.to_path_buf()) {
                paths.push(path.to_path_buf());
            }
        }
        debug!(dir = %dir.display(), files = matched, "collected files");
    }

    Ok(paths)
}

pub fn has_extension(path: &Path, extensions: &[String]) -> bool {
    let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
        return false;
    };
    extensions
        .iter()
        .any(|ext| !ext.is_empty() && file_name.len() > ext.len() && file_name.ends_with(ext.as_str()))
}

pub fn is_hidden(path: &Path) -> bool {
    path.components().any(|component| {
        let name = component.as_os_str().to_string_lossy();
        name.len() > 1 && name.starts_with('.') && name != ".."
    })
}

pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|source| Error::InvalidGlob {
            pattern: pattern.clone(),
            source,
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| Error::InvalidGlob {
        pattern: patterns.join(", "),
        source,
    })
}

/// Extracts the class names listed in `class`/`className` attributes.
///
/// Recognised forms are `class="…"` and `class='…'`, `class={"…"}`,
/// ``class={`…`}``, and the same three for `className`.
pub fn extract_classes(text: &str) -> BTreeSet<String> {
    const ATTRS: [&str; 2] = ["class=", "className="];
    let mut classes = BTreeSet::new();

    for attr in ATTRS {
        for (idx, _) in text.match_indices(attr) {
            if let Some(value) = parse_attribute_value(&text[idx + attr.len()..]) {
                classes.extend(tokenize_class_list(value));
            }
        }
    }

    classes
}

fn parse_attribute_value(rest: &str) -> Option<&str> {
    if let Some(body) = rest.strip_prefix(['"', '\'']) {
        return parse_quoted_value(body, None);
    }
    let braced = rest.strip_prefix('{')?;
    if let Some(body) = braced.strip_prefix(['"', '\'']) {
        return parse_quoted_value(body, Some('}'));
    }
    let body = braced.strip_prefix('`')?;
    let end = body.find('`')?;
    if end == 0 || !body[end + 1..].starts_with('}') {
        return None;
    }
    Some(&body[..end])
}

fn parse_quoted_value(body: &str, closing: Option<char>) -> Option<&str> {
    let end = body.find(['"', '\''])?;
    if end == 0 {
        return None;
    }
    if closing.is_some_and(|closing| !body[end + 1..].starts_with(closing)) {
        return None;
    }
    Some(&body[..end])
}

fn tokenize_class_list(input: &str) -> impl Iterator<Item = String> + '_ {
    input.split_whitespace().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::{ScanOptions, extract_classes, has_extension, is_hidden, scan};
    use std::fs;
    use std::path::Path;

    fn classes(text: &str) -> Vec<String> {
        extract_classes(text).into_iter().collect()
    }

    #[test]
    fn extracts_from_class_attribute() {
        assert_eq!(
            classes(r#"<div class="w-100  mt--5"></div>"#),
            vec!["mt--5".to_string(), "w-100".to_string()]
        );
        assert_eq!(classes("<p class='flex'>"), vec!["flex".to_string()]);
    }

    #[test]
    fn extracts_from_jsx_variants() {
        let source = r#"
            <a className="sm:bg-red" />
            <b className={'p-4'} />
            <i class={"m-2"} />
            <span className={`h-50 ${active ? "x" : ""}`} />
            <em class={`gap-4`} />
        "#;
        let found = extract_classes(source);
        for expected in ["sm:bg-red", "p-4", "m-2", "h-50", "gap-4", "${active"] {
            assert!(found.contains(expected), "missing {expected}");
        }
    }

    #[test]
    fn ignores_unterminated_and_empty_values() {
        assert!(extract_classes(r#"<div class=""></div>"#).is_empty());
        assert!(extract_classes(r#"<div class={"p-4"></div>"#).is_empty());
        assert!(extract_classes("<div class=flex></div>").is_empty());
        assert!(extract_classes("no markup here").is_empty());
    }

    #[test]
    fn deduplicates_tokens() {
        let found = extract_classes(r#"<a class="p-2 p-2"></a><b className="p-2"></b>"#);
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn matches_configured_extensions() {
        let extensions = vec![".vue".to_string(), ".wxml".to_string()];
        assert!(has_extension(Path::new("src/App.vue"), &extensions));
        assert!(has_extension(Path::new("pages/index.wxml"), &extensions));
        assert!(!has_extension(Path::new("src/app.css"), &extensions));
        assert!(!has_extension(Path::new(".vue"), &extensions));
    }

    #[test]
    fn detects_hidden_paths() {
        assert!(is_hidden(Path::new("src/.cache/a.js")));
        assert!(is_hidden(Path::new(".env")));
        assert!(!is_hidden(Path::new("./src/a.js")));
        assert!(!is_hidden(Path::new("../src/a.js")));
    }

    #[test]
    fn scans_watch_dirs() {
        let base = tempfile::tempdir().expect("temp dir");
        let nested = base.path().join("components");
        fs::create_dir_all(&nested).expect("create dir");
        fs::write(nested.join("card.html"), r#"<div class="p-2 w-100"></div>"#).expect("write");
        fs::write(nested.join("card.css"), r#".x { } class="ignored""#).expect("write");
        fs::write(base.path().join(".hidden.html"), r#"<div class="secret"></div>"#)
            .expect("write");
        let skipped = base.path().join("vendor");
        fs::create_dir_all(&skipped).expect("create dir");
        fs::write(skipped.join("lib.html"), r#"<div class="vendor-only"></div>"#).expect("write");

        let options = ScanOptions {
            dirs: vec![base.path().to_path_buf()],
            extensions: vec![".html".to_string()],
            exclude: vec!["vendor/**".to_string()],
            respect_gitignore: false,
        };
        let result = scan(&options).expect("scan should succeed");
        assert_eq!(result.files_scanned, 1);
        assert!(result.classes.contains("p-2"));
        assert!(result.classes.contains("w-100"));
        assert!(!result.classes.contains("ignored"));
        assert!(!result.classes.contains("secret"));
        assert!(!result.classes.contains("vendor-only"));
    }

    #[test]
    fn missing_dirs_yield_empty_result() {
        let base = tempfile::tempdir().expect("temp dir");
        let options = ScanOptions {
            dirs: vec![base.path().join("absent")],
            extensions: vec![".html".to_string()],
            exclude: Vec::new(),
            respect_gitignore: false,
        };
        let result = scan(&options).expect("scan should succeed");
        assert_eq!(result.files_scanned, 0);
        assert!(result.classes.is_empty());
    }

    #[test]
    fn rejects_invalid_exclude_globs() {
        let options = ScanOptions {
            dirs: Vec::new(),
            extensions: Vec::new(),
            exclude: vec!["src/[".to_string()],
            respect_gitignore: false,
        };
        assert!(scan(&options).is_err());
    }
}
