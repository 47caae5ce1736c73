//! Script variable declaration protocol
//!
//! Widget scripts declare their configuration variables in a comment header,
//! one declaration per line:
//!
//! ```text
//! // <NAME>::<label>::<TYPE>::<default value>
//! ```
//!
//! Comment lines that do not contain the `::` separator are ignored.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Field separator inside a declaration line
const FIELD_SEPARATOR: &str = "::";

/// Number of `::`-separated fields in a declaration line
const DECLARATION_FIELDS: usize = 4;

/// Declared type of a script variable.
///
/// `Password` and `Secret` are masked when rendered by configuration UIs,
/// but resolve to the real value at execution time. `Secret` additionally
/// participates in the global configuration layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VariableType {
    String,
    Text,
    Integer,
    Password,
    Secret,
}

impl VariableType {
    /// Whether resolved values of this type must never reach logs or traces
    pub fn is_sensitive(&self) -> bool {
        matches!(self, VariableType::Password | VariableType::Secret)
    }

    /// Whether this type falls back to the global configuration layer
    pub fn is_global(&self) -> bool {
        matches!(self, VariableType::Secret)
    }

    /// The header tag for this type
    pub fn as_str(&self) -> &'static str {
        match self {
            VariableType::String => "STRING",
            VariableType::Text => "TEXT",
            VariableType::Integer => "INTEGER",
            VariableType::Password => "PASSWORD",
            VariableType::Secret => "SECRET",
        }
    }
}

impl fmt::Display for VariableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when a type tag does not name a known variable type
#[derive(Debug, Clone, Error)]
#[error("unknown variable type tag: {0}")]
pub struct UnknownTypeTag(pub String);

impl FromStr for VariableType {
    type Err = UnknownTypeTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STRING" => Ok(VariableType::String),
            "TEXT" => Ok(VariableType::Text),
            "INTEGER" => Ok(VariableType::Integer),
            "PASSWORD" => Ok(VariableType::Password),
            "SECRET" => Ok(VariableType::Secret),
            _ => Err(UnknownTypeTag(s.to_string())),
        }
    }
}

/// One parsed header declaration. Immutable once parsed; the engine
/// re-parses only when the script body changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDeclaration {
    /// Variable name, also the binding name inside the script
    pub name: String,

    /// Human-readable label shown by configuration UIs
    pub label: String,

    /// Declared type
    pub value_type: VariableType,

    /// Declared default value (may be empty)
    pub default_value: String,
}

/// Errors raised while parsing a script header.
///
/// A declaration error is fatal to the instance's scheduling until the
/// script is corrected; it is not a per-tick failure.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DeclarationError {
    #[error("malformed declaration '{line}': expected 4 '::'-separated fields, found {found}")]
    MalformedDeclaration { line: String, found: usize },

    #[error("duplicate variable declaration: {0}")]
    DuplicateName(String),

    #[error("unknown type '{tag}' declared for variable {name}")]
    UnknownType { name: String, tag: String },
}

/// Result type alias for resolved variables
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedVariable {
    /// Binding name inside the script
    pub name: String,

    /// The value the script receives
    pub value: String,

    /// Declared type of the variable
    pub value_type: VariableType,

    /// Sensitive values are redacted from every diagnostic surface
    pub sensitive: bool,
}

/// Parse the declaration header of a script body.
///
/// Declarations are order-significant; the returned vector preserves header
/// order. Comment lines without the field separator are ignored, as is any
/// line that is not a comment.
pub fn parse_declarations(script: &str) -> Result<Vec<VariableDeclaration>, DeclarationError> {
    let mut declarations = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for line in script.lines() {
        let trimmed = line.trim();
        let Some(rest) = trimmed.strip_prefix("//") else {
            continue;
        };
        let rest = rest.trim();
        if !rest.contains(FIELD_SEPARATOR) {
            // Plain comment
            continue;
        }

        let fields: Vec<&str> = rest.splitn(DECLARATION_FIELDS, FIELD_SEPARATOR).collect();
        if fields.len() != DECLARATION_FIELDS {
            return Err(DeclarationError::MalformedDeclaration {
                line: trimmed.to_string(),
                found: fields.len(),
            });
        }

        let name = fields[0].trim();
        if name.is_empty() {
            return Err(DeclarationError::MalformedDeclaration {
                line: trimmed.to_string(),
                found: fields.len(),
            });
        }

        let tag = fields[2].trim();
        let value_type = tag
            .parse::<VariableType>()
            .map_err(|UnknownTypeTag(tag)| DeclarationError::UnknownType {
                name: name.to_string(),
                tag,
            })?;

        if !seen.insert(name.to_string()) {
            return Err(DeclarationError::DuplicateName(name.to_string()));
        }

        declarations.push(VariableDeclaration {
            name: name.to_string(),
            label: fields[1].trim().to_string(),
            value_type,
            default_value: fields[3].trim().to_string(),
        });
    }

    Ok(declarations)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_declaration() {
        let script = "// COUNT::Count::INTEGER::0\nfunction run() { return null; }";
        let declarations = parse_declarations(script).unwrap();

        assert_eq!(declarations.len(), 1);
        assert_eq!(declarations[0].name, "COUNT");
        assert_eq!(declarations[0].label, "Count");
        assert_eq!(declarations[0].value_type, VariableType::Integer);
        assert_eq!(declarations[0].default_value, "0");
    }

    #[test]
    fn test_parse_preserves_header_order() {
        let script = "\
// API_URL::Endpoint::STRING::https://api.example.com
// API_KEY::Api key::SECRET::
// QUERY::Query body::TEXT::{}
function run() { return null; }";
        let declarations = parse_declarations(script).unwrap();

        let names: Vec<&str> = declarations.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["API_URL", "API_KEY", "QUERY"]);
        assert!(declarations[1].value_type.is_sensitive());
        assert!(declarations[1].default_value.is_empty());
    }

    #[test]
    fn test_plain_comments_are_ignored() {
        let script = "\
// Fetches the current build status.
// See the team wiki for details.
// STATUS_URL::Status URL::STRING::http://ci.local/status
function run() { return call(STATUS_URL, null, null, null); }";
        let declarations = parse_declarations(script).unwrap();
        assert_eq!(declarations.len(), 1);
        assert_eq!(declarations[0].name, "STATUS_URL");
    }

    #[test]
    fn test_malformed_field_count() {
        let script = "// BROKEN::only three fields::STRING\nfunction run() {}";
        let err = parse_declarations(script).unwrap_err();
        assert!(matches!(err, DeclarationError::MalformedDeclaration { found: 3, .. }));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let script = "\
// HOST::Host::STRING::localhost
// HOST::Host again::STRING::remote
";
        let err = parse_declarations(script).unwrap_err();
        assert_eq!(err, DeclarationError::DuplicateName("HOST".to_string()));
    }

    #[test]
    fn test_unknown_type_tag_rejected() {
        let script = "// PORT::Port::NUMBER::8080\n";
        let err = parse_declarations(script).unwrap_err();
        assert!(matches!(err, DeclarationError::UnknownType { ref tag, .. } if tag == "NUMBER"));
    }

    #[test]
    fn test_default_value_may_contain_separator() {
        let script = "// TARGET::Target::STRING::host::9090\n";
        let declarations = parse_declarations(script).unwrap();
        assert_eq!(declarations[0].default_value, "host::9090");
    }

    #[test]
    fn test_type_tag_round_trip() {
        for tag in ["STRING", "TEXT", "INTEGER", "PASSWORD", "SECRET"] {
            let value_type: VariableType = tag.parse().unwrap();
            assert_eq!(value_type.as_str(), tag);
        }
        assert!("number".parse::<VariableType>().is_err());
    }
}
