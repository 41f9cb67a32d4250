//! Format patterns for API versions
//!
//! A pattern is a sequence of tokens and literals. Tokens are runs of the
//! same letter:
//!
//! | Token  | Output                                         | `2017-05-01.1.0-beta` |
//! |--------|------------------------------------------------|-----------------------|
//! | `F`    | Full version                                   | `2017-05-01.1.0-beta` |
//! | `G`    | Group version                                  | `2017-05-01`          |
//! | `GG`   | Group version and status                       | `2017-05-01-beta`     |
//! | `V`    | Major version                                  | `1`                   |
//! | `VV`   | Major and minor version                        | `1.0`                 |
//! | `VVV`  | Major and minor version and status             | `1.0-beta`            |
//! | `v`    | Major version, minor only when non-zero        | `1`                   |
//! | `vv`   | Like `v`, plus status                          | `1-beta`              |
//! | `S`    | Status                                         | `beta`                |
//! | `yyyy` | Four digit year (`yy` for two digits)          | `2017`                |
//! | `MM`   | Two digit month (`M` without padding)          | `05`                  |
//! | `dd`   | Two digit day (`d` without padding)            | `01`                  |
//!
//! Text inside single or double quotes is copied verbatim, `\` escapes the
//! next character, and any other character is copied as is. A token whose
//! component is missing from the version produces no output. Formatting
//! never consults locale state.

use crate::version::ApiVersion;
use chrono::Datelike;

pub(crate) fn format_version(version: &ApiVersion, pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 16);
    let mut chars = pattern.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' => {
                for literal in chars.by_ref() {
                    if literal == c {
                        break;
                    }
                    out.push(literal);
                }
            }
            '\\' => {
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            }
            'F' | 'G' | 'V' | 'v' | 'S' | 'y' | 'M' | 'd' => {
                let mut count = 1;
                while chars.peek() == Some(&c) {
                    chars.next();
                    count += 1;
                }
                write_token(&mut out, version, c, count);
            }
            other => out.push(other),
        }
    }

    out
}

/// The canonical text form, as produced by `Display`.
pub(crate) fn full(version: &ApiVersion) -> String {
    let mut out = String::new();
    if let Some(group) = version.group_version() {
        out.push_str(&group.format("%Y-%m-%d").to_string());
    }
    if let Some(major) = version.major_version() {
        if !out.is_empty() {
            out.push('.');
        }
        out.push_str(&format!("{}.{}", major, version.implied_minor()));
    }
    push_status(&mut out, version);
    out
}

fn write_token(out: &mut String, version: &ApiVersion, token: char, count: usize) {
    match token {
        'F' => out.push_str(&full(version)),
        'G' => {
            if let Some(group) = version.group_version() {
                out.push_str(&group.format("%Y-%m-%d").to_string());
                if count > 1 {
                    push_status(out, version);
                }
            }
        }
        'V' => {
            if let Some(major) = version.major_version() {
                if count == 1 {
                    out.push_str(&major.to_string());
                } else {
                    out.push_str(&format!("{}.{}", major, version.implied_minor()));
                    if count > 2 {
                        push_status(out, version);
                    }
                }
            }
        }
        'v' => {
            if let Some(major) = version.major_version() {
                out.push_str(&major.to_string());
                if version.implied_minor() != 0 {
                    out.push_str(&format!(".{}", version.implied_minor()));
                }
                if count > 1 {
                    push_status(out, version);
                }
            }
        }
        'S' => {
            if let Some(status) = version.status() {
                out.push_str(status);
            }
        }
        'y' => {
            if let Some(group) = version.group_version() {
                if count <= 2 {
                    out.push_str(&format!("{:02}", group.year().rem_euclid(100)));
                } else {
                    out.push_str(&format!("{:04}", group.year()));
                }
            }
        }
        'M' => {
            if let Some(group) = version.group_version() {
                push_padded(out, group.month(), count);
            }
        }
        'd' => {
            if let Some(group) = version.group_version() {
                push_padded(out, group.day(), count);
            }
        }
        _ => {}
    }
}

fn push_padded(out: &mut String, value: u32, count: usize) {
    if count == 1 {
        out.push_str(&value.to_string());
    } else {
        out.push_str(&format!("{:02}", value));
    }
}

fn push_status(out: &mut String, version: &ApiVersion) {
    if let Some(status) = version.status() {
        out.push('-');
        out.push_str(status);
    }
}
