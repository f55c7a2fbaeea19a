//! Path template compilation and matching.
//!
//! A template such as `/profiles/user-:id/files/*path` is compiled once into a
//! list of [`Segment`] matchers. Each dynamic token gets a [`BindingSlot`]; at
//! request time the interpreter loop in [`CompiledPath::match_path`] fills one
//! value per slot, and [`CompiledPath::bind`] turns those values into the
//! name -> value mapping handed to the handler.
//!
//! Template syntax:
//!
//! - `pages` - literal segment, matched exactly
//! - `:page` - binds the whole segment to `page`
//! - `user-:id` - requires the literal prefix `user-` and binds the rest to `id`
//! - `*path` - final segment only; binds all remaining segments joined by `/`
//!
//! Empty segments are ignored on both sides, so `pages/:page`, `/pages/:page`
//! and `/pages//:page/` compile to the same matcher.

use std::borrow::Cow;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use smallvec::SmallVec;

use crate::error::{CompileErrorReason, PathHelperError, RouteCompileError};

/// Maximum number of path parameters before heap allocation.
/// Most routes bind ≤4 values (e.g. `/users/:id/posts/:post_id`).
pub const MAX_INLINE_PARAMS: usize = 8;

/// Bound path parameters in left-to-right template order.
///
/// Names are `Arc<str>` shared with the compiled route; values are per-request.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Raw values captured by a successful match, indexed by [`BindingSlot`].
pub type SlotValues = SmallVec<[String; MAX_INLINE_PARAMS]>;

static PARAM_NAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("parameter name regex should be valid")
});

/// Position of a bound value in the per-request value buffer.
///
/// Slots are handed out in appearance order and never change after
/// compilation, so the dispatcher can refer to them by identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingSlot(usize);

impl BindingSlot {
    /// Index into [`SlotValues`]
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// One compiled segment matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Must equal the request segment exactly
    Literal(String),
    /// Binds one request segment, after stripping `prefix`
    Param {
        /// Literal text required before the value (may be empty)
        prefix: String,
        /// Parameter name
        name: Arc<str>,
        /// Slot receiving the value
        slot: BindingSlot,
    },
    /// Binds every remaining request segment; always the last matcher
    Splat {
        /// Literal text required at the start of the first captured segment
        prefix: String,
        /// Parameter name
        name: Arc<str>,
        /// Slot receiving the joined value
        slot: BindingSlot,
    },
}

/// A path template compiled into segment matchers plus its binding order.
#[derive(Debug, Clone)]
pub struct CompiledPath {
    template: String,
    segments: Vec<Segment>,
    bindings: Vec<(Arc<str>, BindingSlot)>,
}

/// Split a path into its non-empty `/`-delimited segments.
#[inline]
pub fn split_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Compile a path template.
///
/// # Errors
///
/// Returns [`RouteCompileError`] when the template is empty, a splat is not the
/// final segment, a parameter name is empty, invalid or repeated, or a segment
/// holds more than one dynamic token.
pub fn compile_path(template: &str) -> Result<CompiledPath, RouteCompileError> {
    if template.trim().is_empty() {
        return Err(RouteCompileError::new(
            template,
            CompileErrorReason::EmptyTemplate,
        ));
    }

    let parts: Vec<&str> = split_segments(template).collect();
    let mut segments = Vec::with_capacity(parts.len());
    let mut bindings: Vec<(Arc<str>, BindingSlot)> = Vec::new();

    for (idx, part) in parts.iter().enumerate() {
        let is_last = idx + 1 == parts.len();

        let mut tokens = part.match_indices(|c: char| c == ':' || c == '*');
        let Some((pos, token)) = tokens.next() else {
            segments.push(Segment::Literal((*part).to_string()));
            continue;
        };
        if tokens.next().is_some() {
            return Err(RouteCompileError::new(
                template,
                CompileErrorReason::MultipleDynamicTokens {
                    segment: (*part).to_string(),
                },
            ));
        }

        let prefix = part[..pos].to_string();
        let name = &part[pos + 1..];
        if name.is_empty() {
            return Err(RouteCompileError::new(
                template,
                CompileErrorReason::EmptyParamName,
            ));
        }
        if !PARAM_NAME_REGEX.is_match(name) {
            return Err(RouteCompileError::new(
                template,
                CompileErrorReason::InvalidParamName {
                    name: name.to_string(),
                },
            ));
        }
        if bindings.iter().any(|(existing, _)| existing.as_ref() == name) {
            return Err(RouteCompileError::new(
                template,
                CompileErrorReason::DuplicateParam {
                    name: name.to_string(),
                },
            ));
        }

        let name: Arc<str> = Arc::from(name);
        let slot = BindingSlot(bindings.len());
        bindings.push((Arc::clone(&name), slot));

        if token == "*" {
            if !is_last {
                return Err(RouteCompileError::new(
                    template,
                    CompileErrorReason::SplatNotLast {
                        name: name.to_string(),
                    },
                ));
            }
            segments.push(Segment::Splat { prefix, name, slot });
        } else {
            segments.push(Segment::Param { prefix, name, slot });
        }
    }

    let template = if parts.is_empty() {
        "/".to_string()
    } else {
        let mut normalized = String::with_capacity(template.len() + 1);
        for part in &parts {
            normalized.push('/');
            normalized.push_str(part);
        }
        normalized
    };

    Ok(CompiledPath {
        template,
        segments,
        bindings,
    })
}

/// Percent-decode a bound value.
///
/// Matching binds raw segment text; handlers that want the decoded form ask
/// for it explicitly. Invalid escapes or non-UTF-8 results leave the value
/// unchanged.
#[must_use]
pub fn decode_param(raw: &str) -> Cow<'_, str> {
    urlencoding::decode(raw).unwrap_or(Cow::Borrowed(raw))
}

impl CompiledPath {
    /// Normalized template (leading `/`, no empty segments)
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Compiled segment matchers in template order
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Parameter names with their slots, in appearance order
    #[must_use]
    pub fn bindings(&self) -> &[(Arc<str>, BindingSlot)] {
        &self.bindings
    }

    /// Parameter names in appearance order
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.bindings.iter().map(|(name, _)| name.as_ref())
    }

    /// True when the template binds nothing
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Match a request path, returning one value per binding slot.
    ///
    /// Bound values are the raw request text, exactly as it appears in the
    /// path; see [`decode_param`].
    /// `None` means this template does not match.
    #[must_use]
    pub fn match_path(&self, path: &str) -> Option<SlotValues> {
        let mut request = split_segments(path);
        let mut values = SlotValues::new();

        for segment in &self.segments {
            match segment {
                Segment::Literal(lit) => {
                    if request.next()? != lit.as_str() {
                        return None;
                    }
                }
                Segment::Param { prefix, .. } => {
                    let rest = request.next()?.strip_prefix(prefix.as_str())?;
                    if rest.is_empty() {
                        return None;
                    }
                    values.push(rest.to_string());
                }
                Segment::Splat { prefix, .. } => {
                    let mut joined = String::new();
                    if !prefix.is_empty() {
                        let first = request.next()?.strip_prefix(prefix.as_str())?;
                        joined.push_str(first);
                    }
                    for (i, part) in request.by_ref().enumerate() {
                        if i > 0 || !prefix.is_empty() {
                            joined.push('/');
                        }
                        joined.push_str(part);
                    }
                    values.push(joined);
                }
            }
        }

        if request.next().is_some() {
            return None;
        }
        Some(values)
    }

    /// Pair captured values with their parameter names.
    #[must_use]
    pub fn bind(&self, mut values: SlotValues) -> ParamVec {
        let mut params = ParamVec::new();
        for (name, slot) in &self.bindings {
            if let Some(value) = values.get_mut(slot.index()) {
                params.push((Arc::clone(name), std::mem::take(value)));
            }
        }
        params
    }

    /// Match and bind in one step.
    #[must_use]
    pub fn extract(&self, path: &str) -> Option<ParamVec> {
        self.match_path(path).map(|values| self.bind(values))
    }

    /// Rebuild a concrete path from parameter values.
    ///
    /// Values are written as given, mirroring [`CompiledPath::match_path`], so
    /// matching the result binds the same values again. Empty segments in a
    /// splat value are dropped. Parameters not bound by the template are
    /// ignored here.
    ///
    /// # Errors
    ///
    /// [`PathHelperError::MissingParam`] when a bound name has no value,
    /// [`PathHelperError::InvalidParamValue`] when a single-segment value is
    /// empty or contains `/`.
    pub fn build(&self, params: &[(&str, &str)]) -> Result<String, PathHelperError> {
        let lookup = |name: &str| {
            params
                .iter()
                .rfind(|(k, _)| *k == name)
                .map(|(_, v)| *v)
                .ok_or_else(|| PathHelperError::MissingParam {
                    template: self.template.clone(),
                    name: name.to_string(),
                })
        };

        if self.segments.is_empty() {
            return Ok("/".to_string());
        }

        let mut out = String::with_capacity(self.template.len());
        for segment in &self.segments {
            out.push('/');
            match segment {
                Segment::Literal(lit) => out.push_str(lit),
                Segment::Param { prefix, name, .. } => {
                    let value = lookup(name.as_ref())?;
                    if value.is_empty() || value.contains('/') {
                        return Err(PathHelperError::InvalidParamValue {
                            template: self.template.clone(),
                            name: name.to_string(),
                            value: value.to_string(),
                        });
                    }
                    out.push_str(prefix);
                    out.push_str(value);
                }
                Segment::Splat { prefix, name, .. } => {
                    let value = lookup(name.as_ref())?;
                    out.push_str(prefix);
                    let parts: Vec<&str> = split_segments(value).collect();
                    out.push_str(&parts.join("/"));
                }
            }
        }

        // An empty splat leaves a dangling separator behind it.
        if out.len() > 1 && out.ends_with('/') {
            out.pop();
        }
        Ok(out)
    }
}
