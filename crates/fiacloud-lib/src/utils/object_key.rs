// Object key helpers
// Folders in a flat object store are `/`-delimited key prefixes

/// Zero-byte placeholder that keeps an otherwise empty folder visible
pub const PLACEHOLDER_FILENAME: &str = "new.fiacloud";

/// Parent folder of a key, without trailing slash (`None` at bucket root)
pub fn parent_folder(key: &str) -> Option<&str> {
    let trimmed = key.trim_end_matches('/');
    trimmed.rfind('/').map(|idx| &trimmed[..idx]).filter(|p| !p.is_empty())
}

/// Every folder containing `key`, nearest first (`a/b/c.md` -> `a/b`, `a`)
pub fn ancestors(key: &str) -> impl Iterator<Item = &str> {
    std::iter::successors(parent_folder(key), |&folder| parent_folder(folder))
}

/// Join an optional parent folder with a child name
pub fn join(parent: Option<&str>, name: &str) -> String {
    match parent.map(|p| p.trim_matches('/')).filter(|p| !p.is_empty()) {
        Some(parent) => format!("{}/{}", parent, name),
        None => name.to_string(),
    }
}

/// Normalize a folder path into a listing prefix (`docs` -> `docs/`)
pub fn folder_prefix(folder: &str) -> String {
    let trimmed = folder.trim_matches('/');
    format!("{}/", trimmed)
}

/// Placeholder key for a folder
pub fn placeholder_key(folder: &str) -> String {
    format!("{}/{}", folder.trim_matches('/'), PLACEHOLDER_FILENAME)
}

/// Whether the key names a folder placeholder
pub fn is_placeholder(key: &str) -> bool {
    key == PLACEHOLDER_FILENAME || key.ends_with(&format!("/{}", PLACEHOLDER_FILENAME))
}

/// Last path component of a key
pub fn file_name(key: &str) -> &str {
    key.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(key)
}

/// Lowercase extension of a key, if any
pub fn extension(key: &str) -> Option<String> {
    let name = file_name(key);
    name.rfind('.')
        .map(|idx| name[idx + 1..].to_lowercase())
        .filter(|ext| !ext.is_empty())
}

/// Percent-encode a key for use in a URL path, keeping `/` separators
pub fn encode_key(key: &str) -> String {
    key.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
