//! Destination name templates
//!
//! Recognized tokens (case-insensitive):
//!
//! | token | value |
//! |---|---|
//! | `[<algo>:hash:<encoding>:<len>]`, `[contenthash]` | digest of the content; every part but the keyword optional |
//! | `[emoji]`, `[emoji:N]` | N emoji derived from the content |
//! | `[ext]` | source extension without the dot |
//! | `[name]` | source file name without extension |
//! | `[path]` | source directory relative to the context, with a trailing `/` |
//! | `[folder]` | name of the source's parent directory |
//! | `[N]` | capture group N of the pattern's `test` regex |
//!
//! Tokens are replaced in that order.

use regex::{Captures, Regex};
use std::path::Path;
use std::sync::LazyLock;

use crate::digest::{HashAlgorithm, hash_digest};
use crate::{Error, Result};
use copy_fs::{relative_path, to_slash};

static HASH_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\[(?:([^:\]]+):)?(?:hash|contenthash)(?::([a-z]+\d*))?(?::(\d+))?\]")
        .expect("Invalid hash token regex")
});

static TEMPLATE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)\[(?:ext|name|path|folder|emoji(?::\d+)?|\d+|",
        r"(?:[^:\]]+:)?(?:hash|contenthash)(?::[a-z]+\d*)?(?::\d+)?)\]"
    ))
    .expect("Invalid template token regex")
});

static EMOJI_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\[emoji(?::(\d+))?\]").expect("Invalid emoji regex")
});

static EXT_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\[ext\]").unwrap());
static NAME_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\[name\]").unwrap());
static PATH_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\[path\]").unwrap());
static FOLDER_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\[folder\]").unwrap());
static NO_EXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.?\[ext\]").unwrap());
static PARENT_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.\.(/)?").unwrap());

/// Emoji used by `[emoji]` tokens
const EMOJI: &[&str] = &[
    "😀", "😂", "😍", "😎", "🤔", "😴", "🤖", "👻", "👽", "🎃", "🐶", "🐱", "🐭", "🐹", "🐰", "🦊",
    "🐻", "🐼", "🐨", "🐯", "🦁", "🐮", "🐷", "🐸", "🐵", "🐔", "🐧", "🐦", "🐤", "🦆", "🦅", "🦉",
    "🐺", "🐗", "🐴", "🦄", "🐝", "🐛", "🦋", "🐌", "🐞", "🐜", "🐢", "🐍", "🦎", "🐙", "🦑", "🦀",
    "🐡", "🐠", "🐟", "🐬", "🐳", "🐋", "🦈", "🐊", "🐅", "🐆", "🦓", "🦍", "🐘", "🦏", "🐪", "🦒",
];

/// Whether `to` contains any template token.
pub fn is_template_like(to: &str) -> bool {
    TEMPLATE_TOKEN.is_match(to)
}

/// Whether `to` contains a hash token (the name is content-derived).
pub fn has_hash_token(to: &str) -> bool {
    HASH_TOKEN.is_match(to)
}

/// Inputs for interpolating one candidate's destination.
#[derive(Debug)]
pub struct TemplateContext<'a> {
    pub absolute_filename: &'a Path,
    /// Directory `[path]` is relative to
    pub context: &'a Path,
    pub content: &'a [u8],
    pub test: Option<&'a Regex>,
}

/// Distinct emoji chosen by the content's digest.
fn encode_emoji(content: &[u8], count: usize) -> String {
    let digest = HashAlgorithm::Md5.digest(content);
    let mut pool: Vec<&str> = EMOJI.to_vec();
    let mut out = String::new();
    for i in 0..count.clamp(1, EMOJI.len()) {
        let byte = usize::from(digest[i % digest.len()]) + i;
        out.push_str(pool.remove(byte % pool.len()));
    }
    out
}

/// Parts of the source name used by the non-hash tokens.
struct SourceParts {
    ext: String,
    name: String,
    directory: String,
    folder: String,
}

impl SourceParts {
    fn new(absolute_filename: &Path, context: &Path) -> Self {
        let file_name = absolute_filename
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let (name, ext) = match file_name.rfind('.') {
            Some(idx) if idx > 0 && idx + 1 < file_name.len() => (
                file_name[..idx].to_string(),
                file_name[idx + 1..].to_string(),
            ),
            _ => (file_name.clone(), String::new()),
        };

        let parent = absolute_filename.parent().unwrap_or(Path::new(""));
        // Relative to a child placeholder so the result always ends in `/`
        let relative = to_slash(&relative_path(context, &parent.join("_")));
        let relative = PARENT_SEGMENT.replace_all(&relative, "_$1");
        let mut directory = relative[..relative.len().saturating_sub(1)].to_string();
        if directory.len() == 1 {
            directory.clear();
        }

        let folder = directory
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or("")
            .to_string();

        Self {
            ext,
            name,
            directory,
            folder,
        }
    }
}

/// Interpolate every token of `template`.
pub fn interpolate(template: &str, ctx: &TemplateContext<'_>) -> Result<String> {
    let parts = SourceParts::new(ctx.absolute_filename, ctx.context);

    let template = if parts.ext.is_empty() {
        NO_EXT.replace_all(template, "").into_owned()
    } else {
        template.to_string()
    };

    let mut failure = None;
    let url = HASH_TOKEN.replace_all(&template, |caps: &Captures<'_>| {
        let algorithm = caps.get(1).map_or("", |m| m.as_str());
        let encoding = caps.get(2).map_or("", |m| m.as_str());
        let max_length = caps.get(3).and_then(|m| m.as_str().parse().ok());
        match hash_digest(ctx.content, algorithm, encoding, max_length) {
            Ok(digest) => digest,
            Err(e) => {
                failure.get_or_insert(e);
                String::new()
            }
        }
    });
    if let Some(e) = failure {
        return Err(match e {
            Error::Template { message, .. } => Error::Template {
                template: template.clone(),
                message,
            },
            other => other,
        });
    }

    let url = EMOJI_TOKEN.replace_all(&url, |caps: &Captures<'_>| {
        let count = caps.get(1).and_then(|m| m.as_str().parse().ok()).unwrap_or(1);
        encode_emoji(ctx.content, count)
    });
    let url = EXT_TOKEN.replace_all(&url, regex::NoExpand(&parts.ext));
    let url = NAME_TOKEN.replace_all(&url, regex::NoExpand(&parts.name));
    let url = PATH_TOKEN.replace_all(&url, regex::NoExpand(&parts.directory));
    let url = FOLDER_TOKEN.replace_all(&url, regex::NoExpand(&parts.folder));
    let mut url = url.into_owned();

    if let Some(test) = ctx.test {
        let source = ctx.absolute_filename.to_string_lossy();
        if let Some(caps) = test.captures(&source) {
            for (i, group) in caps.iter().enumerate() {
                let value = group.map_or("", |m| m.as_str());
                url = url.replace(&format!("[{i}]"), value);
            }
        }
    }

    Ok(url)
}
