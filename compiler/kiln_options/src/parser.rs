//! Option string tokenizer and parser.
//!
//! # Grammar
//!
//! Tokens are separated by spaces outside double quotes. Each token names
//! an option as `-name` or `--name`; family options use `-f`/`-fno-` and
//! `-m`/`-mno-` prefixes. A token is resolved in this order:
//!
//! 1. exact name (`-g`, `--help`)
//! 2. exact name before `=` (`-cl-std=CL2.0`)
//! 3. longest option accepting a glued value (`-O3`, `-DFOO=1`, `-Wf,-x`)
//! 4. the `-f`/`-m` families (`-fno-bin-exe`, `-mcpu=gfx900`)
//!
//! Parsing stops at the first bad token. Tokens before it stay applied.

use tracing::trace;

use crate::error::{OptionError, OptionErrorKind};
use crate::options::{OptionScope, Options};
use crate::table::{
    second_default, table, OptionDescriptor, OptionFlags, OptionId, OptionsTable, ValueType,
};
use crate::variables::{OptionValue, SourceKind, WorkGroupSize};

/// How a value was attached to the option name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attached<'a> {
    /// `-name`
    Absent,
    /// `-name=value`
    Equal(&'a str),
    /// `-namevalue`
    Glued(&'a str),
}

/// A token resolved to its descriptor.
#[derive(Debug)]
struct Resolved<'a> {
    desc: &'static OptionDescriptor,
    negated: bool,
    attached: Attached<'a>,
}

type FamilyLookup = for<'a> fn(&'static OptionsTable, &'a str) -> Option<&'static OptionDescriptor>;

/// Accepted `-cl-std` spellings.
const CL_STD_VERSIONS: &[&str] = &["CL1.0", "CL1.1", "CL1.2", "CL2.0", "CL3.0"];

impl Options {
    /// Parse an option string into a fresh option set.
    pub fn parse(text: &str, scope: OptionScope) -> Result<Self, OptionError> {
        let mut options = Self::default();
        options.parse_into(text, scope)?;
        Ok(options)
    }

    /// Parse an option string into this option set.
    ///
    /// Not transactional: on error, options from earlier tokens remain
    /// applied while the failing token changes nothing.
    pub fn parse_into(&mut self, text: &str, scope: OptionScope) -> Result<(), OptionError> {
        if !self.orig_option_str.is_empty() && !text.is_empty() {
            self.orig_option_str.push(' ');
        }
        self.orig_option_str.push_str(text);

        let tokens = tokenize(text)?;
        let mut index = 0;
        while index < tokens.len() {
            index += self.parse_token(&tokens, index, scope)?;
        }
        Ok(())
    }

    /// Apply the token at `index`; returns how many tokens were consumed.
    fn parse_token(
        &mut self,
        tokens: &[&str],
        index: usize,
        scope: OptionScope,
    ) -> Result<usize, OptionError> {
        let token = tokens[index];
        let resolved = resolve(token)?;
        let desc = resolved.desc;
        let fail = |kind| Err(OptionError::new(token, kind));

        match scope {
            OptionScope::Link if !desc.flags.contains(OptionFlags::LINK) => {
                return fail(OptionErrorKind::NotLinkOption);
            }
            OptionScope::Build | OptionScope::Compile
                if desc.flags.contains(OptionFlags::LINK_ONLY) =>
            {
                return fail(OptionErrorKind::LinkOnly);
            }
            _ => {}
        }

        if resolved.negated && desc.value_type != ValueType::Bool {
            return fail(OptionErrorKind::NegationNotAllowed);
        }

        let mut consumed = 1;
        let value: Option<String> = match resolved.attached {
            Attached::Equal(_) if !desc.flags.contains(OptionFlags::SEP_EQUAL) => {
                let kind = if desc.flags.contains(OptionFlags::VALUE_DISALLOWED) {
                    OptionErrorKind::ValueNotAllowed
                } else {
                    OptionErrorKind::SeparatorNotAllowed("=")
                };
                return fail(kind);
            }
            Attached::Equal(value) | Attached::Glued(value) => {
                if desc.flags.contains(OptionFlags::VALUE_DISALLOWED) || resolved.negated {
                    return fail(OptionErrorKind::ValueNotAllowed);
                }
                Some(unquote(value))
            }
            Attached::Absent if desc.flags.contains(OptionFlags::VALUE_REQUIRED) => {
                if !desc.flags.contains(OptionFlags::SEP_SPACE) {
                    return fail(OptionErrorKind::MissingValue);
                }
                let Some(next) = tokens.get(index + 1) else {
                    return fail(OptionErrorKind::MissingValue);
                };
                consumed = 2;
                Some(unquote(next))
            }
            Attached::Absent if desc.flags.contains(OptionFlags::VALUE_OPTIONAL) => {
                second_default(desc.id).map(str::to_string)
            }
            Attached::Absent => None,
        };

        trace!(option = desc.name, ?value, negated = resolved.negated, "applying option");
        self.apply(desc, value.as_deref(), resolved.negated)
            .map_err(|kind| OptionError::new(token, kind))?;
        Ok(consumed)
    }

    /// Validate and store one option value, then apply its implications.
    fn apply(
        &mut self,
        desc: &'static OptionDescriptor,
        value: Option<&str>,
        negated: bool,
    ) -> Result<(), OptionErrorKind> {
        if desc.is_alias() {
            self.seen.insert(desc.id);
            self.apply_alias(desc.id);
            return Ok(());
        }

        if desc.accumulates() {
            let value = value.ok_or(OptionErrorKind::MissingValue)?;
            self.accumulate(desc.id, value);
            self.seen.insert(desc.id);
            return Ok(());
        }

        let parsed = match desc.value_type {
            ValueType::Bool => OptionValue::Bool(!negated),
            ValueType::Int32 => {
                let n = parse_ranged(desc, value)?;
                OptionValue::Int32(i32::try_from(n).map_err(|_| out_of_range(desc))?)
            }
            ValueType::UInt32 => {
                let n = parse_ranged(desc, value)?;
                OptionValue::UInt32(u32::try_from(n).map_err(|_| out_of_range(desc))?)
            }
            ValueType::Byte => {
                let n = parse_ranged(desc, value)?;
                OptionValue::Byte(u8::try_from(n).map_err(|_| out_of_range(desc))?)
            }
            ValueType::Str => {
                let text = value.ok_or(OptionErrorKind::MissingValue)?;
                self.validate_str(desc.id, text)?;
                OptionValue::Str(text.to_string())
            }
        };

        let enabled = parsed == OptionValue::Bool(true);
        desc.access.set(&mut self.variables, parsed);
        self.seen.insert(desc.id);
        if enabled {
            self.apply_implications(desc.id);
        }
        Ok(())
    }

    /// Check a string value and store any parsed form it carries.
    fn validate_str(&mut self, id: OptionId, text: &str) -> Result<(), OptionErrorKind> {
        match id {
            OptionId::ClStd if !CL_STD_VERSIONS.contains(&text) => {
                Err(OptionErrorKind::InvalidValue {
                    expected: "CL1.0, CL1.1, CL1.2, CL2.0, CL3.0",
                })
            }
            OptionId::SourceKind => {
                let kind = SourceKind::parse(text).ok_or(OptionErrorKind::InvalidValue {
                    expected: SourceKind::SPELLINGS,
                })?;
                self.source_kind = kind;
                Ok(())
            }
            OptionId::WorkGroupSize => {
                let wgs = WorkGroupSize::parse(text).map_err(OptionErrorKind::InvalidWorkGroupSize)?;
                self.work_group_size = Some(wgs);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Expand an alias into the options it stands for.
    ///
    /// Aliases have no storage of their own; only their targets change.
    fn apply_alias(&mut self, id: OptionId) {
        match id {
            OptionId::OptDisable => self.force_int(OptionId::OptLevel, 0),
            OptionId::OptFast => {
                self.force_int(OptionId::OptLevel, 3);
                self.force_flag(OptionId::FastRelaxedMath);
            }
            _ => {}
        }
    }

    /// Turn on the options implied by `id`, recursively.
    ///
    /// Each implied option is marked seen so its provenance is visible.
    fn apply_implications(&mut self, id: OptionId) {
        let implied: &[OptionId] = match id {
            OptionId::FastRelaxedMath => &[
                OptionId::FiniteMathOnly,
                OptionId::UnsafeMathOptimizations,
            ],
            OptionId::UnsafeMathOptimizations => &[OptionId::NoSignedZeros, OptionId::MadEnable],
            _ => &[],
        };
        for &next in implied {
            self.force_flag(next);
        }
    }

    fn force_flag(&mut self, id: OptionId) {
        id.descriptor()
            .access
            .set(&mut self.variables, OptionValue::Bool(true));
        self.seen.insert(id);
        self.apply_implications(id);
    }

    fn force_int(&mut self, id: OptionId, value: i32) {
        id.descriptor()
            .access
            .set(&mut self.variables, OptionValue::Int32(value));
        self.seen.insert(id);
    }
}

/// Split an option string on spaces outside double quotes.
///
/// Inside quotes, `\"` and `\\` are escapes and never end the quoted run.
fn tokenize(text: &str) -> Result<Vec<&str>, OptionError> {
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;
    let mut in_quotes = false;
    let mut chars = text.char_indices().peekable();

    while let Some((pos, ch)) = chars.next() {
        match ch {
            '\\' if in_quotes => {
                if matches!(chars.peek(), Some((_, '"' | '\\'))) {
                    chars.next();
                }
            }
            '"' => {
                in_quotes = !in_quotes;
                start = start.or(Some(pos));
            }
            ' ' if !in_quotes => {
                if let Some(begin) = start.take() {
                    tokens.push(&text[begin..pos]);
                }
            }
            _ => start = start.or(Some(pos)),
        }
    }

    if let Some(begin) = start {
        if in_quotes {
            return Err(OptionError::new(
                &text[begin..],
                OptionErrorKind::UnterminatedQuote,
            ));
        }
        tokens.push(&text[begin..]);
    }
    Ok(tokens)
}

/// Find the descriptor a token names.
fn resolve(token: &str) -> Result<Resolved<'_>, OptionError> {
    let Some(body) = token.strip_prefix('-') else {
        return Err(OptionError::new(token, OptionErrorKind::NotAnOption));
    };
    let table = table();

    if let Some(long) = body.strip_prefix('-') {
        let found = match long.split_once('=') {
            Some((name, value)) => table
                .find_long(name)
                .map(|desc| (desc, Attached::Equal(value))),
            None => table.find_long(long).map(|desc| (desc, Attached::Absent)),
        };
        return found
            .map(|(desc, attached)| Resolved {
                desc,
                negated: false,
                attached,
            })
            .ok_or_else(|| OptionError::new(token, OptionErrorKind::UnknownOption));
    }

    if let Some(desc) = table.find_short(body) {
        return Ok(Resolved {
            desc,
            negated: false,
            attached: Attached::Absent,
        });
    }

    if let Some((name, value)) = body.split_once('=') {
        if let Some(desc) = table.find_short(name) {
            return Ok(Resolved {
                desc,
                negated: false,
                attached: Attached::Equal(value),
            });
        }
    }

    if let Some((desc, value)) = table.find_glued(body) {
        return Ok(Resolved {
            desc,
            negated: false,
            attached: Attached::Glued(value),
        });
    }

    let families: [(&str, &str, FamilyLookup); 2] = [
        ("f", "fno-", OptionsTable::find_f),
        ("m", "mno-", OptionsTable::find_m),
    ];
    for (prefix, negated_prefix, lookup) in families {
        let find = |name: &str| lookup(table, name);
        let (rest, negated) = if let Some(rest) = body.strip_prefix(negated_prefix) {
            (rest, true)
        } else if let Some(rest) = body.strip_prefix(prefix) {
            (rest, false)
        } else {
            continue;
        };

        if let Some(desc) = find(rest) {
            return Ok(Resolved {
                desc,
                negated,
                attached: Attached::Absent,
            });
        }
        if let Some((name, value)) = rest.split_once('=') {
            if let Some(desc) = find(name) {
                return Ok(Resolved {
                    desc,
                    negated,
                    attached: Attached::Equal(value),
                });
            }
        }
    }

    Err(OptionError::new(token, OptionErrorKind::UnknownOption))
}

/// Parse an integer value and check it against the descriptor's range.
fn parse_ranged(desc: &OptionDescriptor, value: Option<&str>) -> Result<i64, OptionErrorKind> {
    let text = value.ok_or(OptionErrorKind::MissingValue)?;
    let n: i64 = text
        .parse()
        .map_err(|_| OptionErrorKind::InvalidInteger(text.to_string()))?;
    if let Some((min, max)) = desc.range {
        if n < min || n > max {
            return Err(OptionErrorKind::OutOfRange { min, max });
        }
    }
    Ok(n)
}

fn out_of_range(desc: &OptionDescriptor) -> OptionErrorKind {
    let (min, max) = desc.range.unwrap_or((i64::MIN, i64::MAX));
    OptionErrorKind::OutOfRange { min, max }
}

/// Strip one pair of surrounding double quotes and resolve the escapes
/// inside them. Unquoted values are taken literally.
fn unquote(value: &str) -> String {
    let Some(inner) = value
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
    else {
        return value.to_string();
    };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(ch) = chars.next() {
        match (ch, chars.peek()) {
            ('\\', Some(&next @ ('"' | '\\'))) => {
                out.push(next);
                chars.next();
            }
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
