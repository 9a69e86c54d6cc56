//! Module-info text decoding.
//!
//! The embedded text is tab separated, one record per line:
//!
//! ```text
//! path    example.com/cmd/app
//! mod     example.com/cmd/app  v1.2.3  h1:...
//! dep     golang.org/x/sys     v0.20.0 h1:...
//! =>      ../sys               (devel)
//! build   CGO_ENABLED=1
//! build   GOEXPERIMENT=systemcrypto
//! ```
//!
//! Keys or values containing spaces, quotes or `=` are written as quoted
//! string literals.

use super::BuildInfoError;
use serde::{Deserialize, Serialize};

const SENTINEL_LEN: usize = 16;

/// A module path with its version and checksum.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub path: String,
    pub version: String,
    pub sum: String,
    pub replace: Option<Box<Module>>,
}

/// A single `build KEY=VALUE` record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSetting {
    pub key: String,
    pub value: String,
}

/// Decoded module-info records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModInfo {
    pub path: String,
    pub main: Module,
    pub deps: Vec<Module>,
    pub settings: Vec<BuildSetting>,
}

/// Remove the 16-byte sentinels wrapping the embedded text.
///
/// Text that does not carry both sentinels is treated as absent.
pub fn strip_sentinels(raw: &[u8]) -> &[u8] {
    let len = raw.len();
    if len > 2 * SENTINEL_LEN && raw[len - SENTINEL_LEN - 1] == b'\n' {
        &raw[SENTINEL_LEN..len - SENTINEL_LEN]
    } else {
        &[]
    }
}

// Which module a following `=>` line replaces.
enum Last {
    None,
    Main,
    Dep(usize),
}

pub fn parse(text: &str) -> Result<ModInfo, BuildInfoError> {
    let mut info = ModInfo::default();
    let mut last = Last::None;

    for (index, line) in text.split('\n').enumerate() {
        let line_no = index + 1;
        let invalid = |reason: &str| BuildInfoError::InvalidModInfo {
            line: line_no,
            reason: reason.to_string(),
        };

        if let Some(rest) = line.strip_prefix("path\t") {
            info.path = rest.to_string();
        } else if let Some(rest) = line.strip_prefix("mod\t") {
            info.main = parse_module(rest).ok_or_else(|| invalid("expected 2 or 3 columns"))?;
            last = Last::Main;
        } else if let Some(rest) = line.strip_prefix("dep\t") {
            info.deps
                .push(parse_module(rest).ok_or_else(|| invalid("expected 2 or 3 columns"))?);
            last = Last::Dep(info.deps.len() - 1);
        } else if let Some(rest) = line.strip_prefix("=>\t") {
            let columns: Vec<&str> = rest.split('\t').collect();
            if columns.len() != 3 {
                return Err(invalid("expected 3 columns for replacement"));
            }
            let replacement = Box::new(Module {
                path: columns[0].to_string(),
                version: columns[1].to_string(),
                sum: columns[2].to_string(),
                replace: None,
            });
            let target = match last {
                Last::Main => &mut info.main,
                Last::Dep(i) => &mut info.deps[i],
                Last::None => return Err(invalid("replacement with no module on previous line")),
            };
            target.replace = Some(replacement);
            last = Last::None;
        } else if let Some(rest) = line.strip_prefix("build\t") {
            info.settings.push(parse_setting(rest).map_err(|reason| invalid(reason))?);
        }
    }

    Ok(info)
}

fn parse_module(columns: &str) -> Option<Module> {
    let columns: Vec<&str> = columns.split('\t').collect();
    if columns.len() != 2 && columns.len() != 3 {
        return None;
    }
    Some(Module {
        path: columns[0].to_string(),
        version: columns[1].to_string(),
        sum: columns.get(2).map(|s| s.to_string()).unwrap_or_default(),
        replace: None,
    })
}

fn parse_setting(kv: &str) -> Result<BuildSetting, &'static str> {
    let (key, raw_value) = match kv.as_bytes().first() {
        None => return Err("build line missing '='"),
        Some(b'=') => return Err("build line with missing key"),
        Some(b'"') | Some(b'`') => {
            let quoted = quoted_prefix(kv).ok_or("invalid quoted key in build line")?;
            let rest = kv[quoted.len()..]
                .strip_prefix('=')
                .ok_or("build line missing '=' after quoted key")?;
            (unquote(quoted).ok_or("invalid quoted key in build line")?, rest)
        }
        Some(_) => {
            let (key, value) = kv.split_once('=').ok_or("build line missing '='")?;
            (key.to_string(), value)
        }
    };

    let value = if raw_value.starts_with('"') || raw_value.starts_with('`') {
        unquote(raw_value).ok_or("invalid quoted value in build line")?
    } else {
        raw_value.to_string()
    };

    Ok(BuildSetting { key, value })
}

/// The leading quoted literal of `s`, delimiters included.
fn quoted_prefix(s: &str) -> Option<&str> {
    let quote = s.chars().next()?;
    let mut escaped = false;
    for (i, c) in s.char_indices().skip(1) {
        if quote == '"' && escaped {
            escaped = false;
        } else if quote == '"' && c == '\\' {
            escaped = true;
        } else if c == quote {
            return Some(&s[..i + 1]);
        }
    }
    None
}

/// Decode a complete double-quoted or backquoted literal.
fn unquote(literal: &str) -> Option<String> {
    if let Some(raw) = literal.strip_prefix('`') {
        return raw.strip_suffix('`').map(str::to_string);
    }
    let body = literal.strip_prefix('"')?.strip_suffix('"')?;

    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '\\' => out.push('\\'),
            '"' => out.push('"'),
            '\'' => out.push('\''),
            'x' => out.push(hex_char(&mut chars, 2)?),
            'u' => out.push(hex_char(&mut chars, 4)?),
            'U' => out.push(hex_char(&mut chars, 8)?),
            _ => return None,
        }
    }
    Some(out)
}

fn hex_char(chars: &mut std::str::Chars<'_>, digits: usize) -> Option<char> {
    let mut code = 0u32;
    for _ in 0..digits {
        code = code * 16 + chars.next()?.to_digit(16)?;
    }
    char::from_u32(code)
}
