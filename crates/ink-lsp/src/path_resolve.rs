//
// path_resolve.rs
//
// Include-name and URI resolution against the workspace root
//

use std::path::{Component, Path, PathBuf};

use url::Url;

/// Resolves include names and client URIs to canonical identities.
///
/// Every identity the server stores or compares (document keys, compilation
/// keys, diagnostic targets) goes through this type, so two spellings of the
/// same file always collapse to one key.
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            root: normalize_path(root).unwrap_or_else(|| root.to_path_buf()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `path` to a normalized absolute path.
    ///
    /// Absolute inputs are normalized as-is. Relative inputs are joined to
    /// `relative_to`, or to the workspace root when no base is given.
    pub fn resolve_path(&self, path: &str, relative_to: Option<&Path>) -> PathBuf {
        let candidate = Path::new(path);
        let joined = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            relative_to.unwrap_or(&self.root).join(candidate)
        };
        normalize_path(&joined).unwrap_or(joined)
    }

    /// Resolve `path` to a `file://` identity.
    pub fn resolve(&self, path: &str, relative_to: Option<&Path>) -> Option<Url> {
        path_to_uri(&self.resolve_path(path, relative_to))
    }

    /// Canonical form of a URI received from the client.
    ///
    /// Non-file URIs are returned unchanged.
    pub fn canonical_uri(&self, uri: &Url) -> Url {
        let uri = decode_drive_letter(uri);
        if uri.scheme() != "file" {
            return uri;
        }
        uri.to_file_path()
            .ok()
            .and_then(|path| normalize_path(&path))
            .and_then(|path| path_to_uri(&path))
            .unwrap_or(uri)
    }

    /// Local path of a file URI, normalized.
    pub fn uri_to_path(&self, uri: &Url) -> Option<PathBuf> {
        let path = decode_drive_letter(uri).to_file_path().ok()?;
        normalize_path(&path)
    }

    /// Whether `uri` names a file inside the workspace root.
    pub fn contains(&self, uri: &Url) -> bool {
        self.uri_to_path(uri)
            .is_some_and(|path| path.starts_with(&self.root))
    }
}

/// Normalize a path by resolving `.` and `..` components
pub fn normalize_path(path: &Path) -> Option<PathBuf> {
    let mut components = Vec::new();

    for component in path.components() {
        match component {
            Component::ParentDir => {
                // Only pop a Normal segment; RootDir and Prefix stay
                if let Some(Component::Normal(_)) = components.last() {
                    components.pop();
                }
            }
            Component::CurDir => {}
            c => components.push(c),
        }
    }

    if components.is_empty() {
        return None;
    }

    let mut result = PathBuf::new();
    for c in components {
        result.push(c);
    }
    Some(result)
}

/// Convert a resolved path to a file URI.
pub fn path_to_uri(path: &Path) -> Option<Url> {
    Url::from_file_path(path).ok()
}

/// Some clients escape the drive-letter colon (`file:///c%3A/story`).
fn decode_drive_letter(uri: &Url) -> Url {
    let Some(rest) = uri.as_str().strip_prefix("file:///") else {
        return uri.clone();
    };
    let is_escaped_drive = rest.as_bytes().first().is_some_and(u8::is_ascii_alphabetic)
        && rest.get(1..4).is_some_and(|s| s.eq_ignore_ascii_case("%3a"));
    if !is_escaped_drive {
        return uri.clone();
    }
    Url::parse(&format!("file:///{}:{}", &rest[..1], &rest[4..])).unwrap_or_else(|_| uri.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> PathResolver {
        PathResolver::new("/stories/tavern")
    }

    #[test]
    fn test_relative_path_joins_root() {
        assert_eq!(
            resolver().resolve_path("act1.ink", None),
            PathBuf::from("/stories/tavern/act1.ink")
        );
    }

    #[test]
    fn test_relative_path_joins_base() {
        let base = PathBuf::from("/stories/tavern/chapters/");
        assert_eq!(
            resolver().resolve_path("../common/vars.ink", Some(&base)),
            PathBuf::from("/stories/tavern/common/vars.ink")
        );
    }

    #[test]
    fn test_absolute_path_is_kept() {
        assert_eq!(
            resolver().resolve_path("/elsewhere/./x.ink", Some(Path::new("/ignored"))),
            PathBuf::from("/elsewhere/x.ink")
        );
    }

    #[test]
    fn test_resolve_produces_file_uri() {
        let uri = resolver().resolve("main.ink", None).unwrap();
        assert_eq!(uri.as_str(), "file:///stories/tavern/main.ink");
    }

    #[test]
    fn test_canonical_uri_collapses_dot_segments() {
        let raw = Url::parse("file:///stories/tavern/./chapters/../main.ink").unwrap();
        assert_eq!(
            resolver().canonical_uri(&raw).as_str(),
            "file:///stories/tavern/main.ink"
        );
    }

    #[test]
    fn test_canonical_uri_keeps_other_schemes() {
        let raw = Url::parse("untitled:Untitled-1").unwrap();
        assert_eq!(resolver().canonical_uri(&raw), raw);
    }

    #[test]
    fn test_decode_escaped_drive_letter() {
        let raw = Url::parse("file:///c%3A/Users/story.ink").unwrap();
        assert_eq!(decode_drive_letter(&raw).as_str(), "file:///c:/Users/story.ink");
        let plain = Url::parse("file:///home/story.ink").unwrap();
        assert_eq!(decode_drive_letter(&plain), plain);
    }

    #[test]
    fn test_contains() {
        let r = resolver();
        assert!(r.contains(&Url::parse("file:///stories/tavern/act1.ink").unwrap()));
        assert!(!r.contains(&Url::parse("file:///stories/tavern/../secret.ink").unwrap()));
        assert!(!r.contains(&Url::parse("file:///etc/passwd").unwrap()));
    }

    #[test]
    fn test_normalize_path_preserves_root_with_parent_dir() {
        assert_eq!(
            normalize_path(Path::new("/../a")),
            Some(PathBuf::from("/a"))
        );
    }

    #[test]
    fn test_normalize_path_empty_is_none() {
        assert_eq!(normalize_path(Path::new("./.")), None);
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    /// Strategy for generating path segments
    fn segment_strategy() -> impl Strategy<Value = String> {
        prop::sample::select(vec!["a", "b", "knots", "act_1", ".", ".."])
            .prop_map(String::from)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_resolve_is_idempotent(
            segments in prop::collection::vec(segment_strategy(), 1..6),
            absolute in any::<bool>(),
        ) {
            let resolver = PathResolver::new("/workspace");
            let joined = segments.join("/");
            let input = if absolute { format!("/{joined}") } else { joined };

            let once = resolver.resolve_path(&input, None);
            let twice = resolver.resolve_path(&once.to_string_lossy(), None);
            prop_assert_eq!(&once, &twice);
            prop_assert!(once.is_absolute());
        }

        #[test]
        fn prop_canonical_uri_is_idempotent(
            segments in prop::collection::vec(segment_strategy(), 1..6),
        ) {
            let resolver = PathResolver::new("/workspace");
            let uri = Url::parse(&format!("file:///workspace/{}", segments.join("/"))).unwrap();
            let once = resolver.canonical_uri(&uri);
            prop_assert_eq!(resolver.canonical_uri(&once), once);
        }
    }
}
