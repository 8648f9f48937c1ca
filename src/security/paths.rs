//! Confinement of local file lookups.
//!
//! # Responsibilities
//! - Turn a request path into a file path below a configured root
//! - Reject anything that could name a file outside that root
//!
//! # Design Decisions
//! - Purely lexical: `..`, backslashes, NUL and percent-encoded variants are
//!   refused outright instead of being normalized away
//! - Symlink escapes are caught separately by canonicalizing at serve time

use std::path::{Path, PathBuf};

/// Why a request path cannot be mapped under the root.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("path traversal segment")]
    Traversal,
    #[error("forbidden character in path")]
    ForbiddenCharacter,
    #[error("malformed percent-encoding")]
    BadEncoding,
    #[error("path names the root directory")]
    Empty,
}

/// Map `request_path` (minus `strip_prefix`) to a file below `root`.
pub fn confine(root: &Path, request_path: &str, strip_prefix: Option<&str>) -> Result<PathBuf, PathError> {
    let relative = strip_prefix
        .and_then(|prefix| request_path.strip_prefix(prefix))
        .unwrap_or(request_path);

    let decoded = percent_decode(relative)?;

    let mut resolved = root.to_path_buf();
    let mut segments = 0;
    for segment in decoded.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return Err(PathError::Traversal),
            s if s.contains(['\\', '\0']) => return Err(PathError::ForbiddenCharacter),
            s if Path::new(s).has_root() => return Err(PathError::ForbiddenCharacter),
            s => {
                resolved.push(s);
                segments += 1;
            }
        }
    }

    if segments == 0 {
        return Err(PathError::Empty);
    }
    Ok(resolved)
}

fn percent_decode(input: &str) -> Result<String, PathError> {
    // `decode_binary` passes malformed escapes through verbatim.
    if has_malformed_escape(input.as_bytes()) {
        return Err(PathError::BadEncoding);
    }
    let decoded = urlencoding::decode_binary(input.as_bytes());
    String::from_utf8(decoded.into_owned()).map_err(|_| PathError::BadEncoding)
}

fn has_malformed_escape(bytes: &[u8]) -> bool {
    bytes.iter().enumerate().any(|(i, &b)| {
        b == b'%'
            && !matches!(
                bytes.get(i + 1..i + 3),
                Some([hi, lo]) if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit()
            )
    })
}
