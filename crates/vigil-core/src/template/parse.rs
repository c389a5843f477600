//! Minimal `{{.var}}` template parsing.

use std::collections::BTreeMap;

use crate::RunnerError;
use crate::Result;
use crate::config::is_valid_identifier;

/// Expands `{{.IDENT}}` placeholders in a template string.
///
/// The only recognized construct is `{{.IDENT[ | …]}}`; anything after the
/// identifier up to `}}` is ignored as long as it starts with a space or a
/// pipe. Strings without `{{` return unchanged without allocation beyond
/// the clone.
///
/// # Errors
///
/// - `RunnerError::InvalidTemplate` for unclosed `{{`, a body not starting
///   with `.`, or a malformed identifier
/// - `RunnerError::UndefinedVariable` when the identifier has no value in
///   `vars`
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
/// use vigil_core::template::expand_template_string;
///
/// let mut vars = BTreeMap::new();
/// vars.insert("target".to_string(), "staging".to_string());
///
/// let out = expand_template_string("deploy to {{.target}}", &vars)?;
/// assert_eq!(out, "deploy to staging");
/// # Ok::<(), vigil_core::RunnerError>(())
/// ```
pub fn expand_template_string(input: &str, vars: &BTreeMap<String, String>) -> Result<String> {
    // Fast path: nothing to substitute.
    if !input.contains("{{") {
        return Ok(input.to_string());
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        let Some(end) = after_open.find("}}") else {
            return Err(RunnerError::InvalidTemplate {
                reason: format!("unclosed {{{{ in {input:?}"),
            });
        };
        let name = parse_placeholder(&after_open[..end], input)?;
        let value = vars
            .get(&name)
            .ok_or(RunnerError::UndefinedVariable { name })?;
        out.push_str(value);
        rest = &after_open[end + 2..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Parses a placeholder body into its identifier.
fn parse_placeholder(body: &str, input: &str) -> Result<String> {
    let body = body.trim_start();
    let Some(after_dot) = body.strip_prefix('.') else {
        return Err(RunnerError::InvalidTemplate {
            reason: format!("placeholder must start with '.' in {input:?}"),
        });
    };

    let ident_len = after_dot
        .find(|c: char| !c.is_ascii_alphanumeric() && c != '_')
        .unwrap_or(after_dot.len());
    let ident = &after_dot[..ident_len];
    let trailer = after_dot[ident_len..].trim_start();

    if !is_valid_identifier(ident) {
        return Err(RunnerError::InvalidTemplate {
            reason: format!("invalid placeholder identifier in {input:?}"),
        });
    }
    // Trailing pipes (and the text behind them) are accepted and ignored.
    if !trailer.is_empty() && !trailer.starts_with('|') {
        return Err(RunnerError::InvalidTemplate {
            reason: format!("unexpected {trailer:?} after placeholder identifier in {input:?}"),
        });
    }
    Ok(ident.to_string())
}

/// Collects the identifiers referenced by a template string.
///
/// Malformed placeholders are skipped; the dry-run expansion in the
/// engine's `validate` reports those as `InvalidTemplate`.
#[must_use]
pub(crate) fn template_refs(input: &str) -> Vec<String> {
    let mut refs = Vec::new();
    let mut rest = input;
    while let Some(start) = rest.find("{{") {
        let after_open = &rest[start + 2..];
        let Some(end) = after_open.find("}}") else {
            break;
        };
        if let Ok(name) = parse_placeholder(&after_open[..end], input) {
            refs.push(name);
        }
        rest = &after_open[end + 2..];
    }
    refs
}
