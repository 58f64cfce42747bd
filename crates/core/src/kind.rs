//! Tagged kinds shared by every stage of a run.
//!
//! [`ItemType`] says what an extracted item is, [`ContentKind`] says how its
//! text should be counted and compressed, and [`Category`] says which
//! sub-budget pays for it. Every stage matches on these exhaustively, so a new
//! item type has to be handled everywhere before the workspace compiles.

use serde::{Deserialize, Serialize};

/// The kind of text being counted or compressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    /// Source code: signatures, declarations, bodies.
    Code,
    /// Explanatory prose attached to code (docstrings, module docs).
    Documentation,
    /// Structured data: config files, JSON, key/value listings.
    Structured,
    /// Anything else.
    Text,
}

impl ContentKind {
    /// Stable tag used in cache keys.
    pub const fn tag(self) -> u8 {
        match self {
            Self::Code => 0,
            Self::Documentation => 1,
            Self::Structured => 2,
            Self::Text => 3,
        }
    }
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Code => write!(f, "code"),
            Self::Documentation => write!(f, "documentation"),
            Self::Structured => write!(f, "structured"),
            Self::Text => write!(f, "text"),
        }
    }
}

impl std::str::FromStr for ContentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "code" => Ok(Self::Code),
            "documentation" | "docs" | "docstring" => Ok(Self::Documentation),
            "structured" | "json" | "config" => Ok(Self::Structured),
            "text" => Ok(Self::Text),
            other => Err(format!("unknown content kind: {other}")),
        }
    }
}

/// What an extracted item is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Metadata,
    Dependencies,
    Module,
    Class,
    Method,
    Function,
    Example,
    TestUsage,
    Configuration,
    ConfigurationExample,
}

impl ItemType {
    /// The sub-budget this item type draws from.
    pub const fn category(self) -> Category {
        match self {
            Self::Metadata => Category::Metadata,
            Self::Dependencies => Category::Dependencies,
            Self::Module => Category::Structure,
            Self::Class | Self::Method | Self::Function => Category::ApiDocumentation,
            Self::Example | Self::TestUsage => Category::Examples,
            Self::Configuration | Self::ConfigurationExample => Category::Configuration,
        }
    }

    /// How the item's rendered content is counted and compressed.
    pub const fn content_kind(self) -> ContentKind {
        match self {
            Self::Metadata | Self::Dependencies | Self::Configuration => ContentKind::Structured,
            Self::Module => ContentKind::Documentation,
            Self::Class
            | Self::Method
            | Self::Function
            | Self::Example
            | Self::TestUsage
            | Self::ConfigurationExample => ContentKind::Code,
        }
    }
}

impl std::fmt::Display for ItemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Metadata => "metadata",
            Self::Dependencies => "dependencies",
            Self::Module => "module",
            Self::Class => "class",
            Self::Method => "method",
            Self::Function => "function",
            Self::Example => "example",
            Self::TestUsage => "test_usage",
            Self::Configuration => "configuration",
            Self::ConfigurationExample => "configuration_example",
        };
        f.write_str(s)
    }
}

/// A named sub-budget. Declaration order is the processing and output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Metadata,
    Dependencies,
    Structure,
    ApiDocumentation,
    Examples,
    Configuration,
}

impl Category {
    /// All categories in processing order.
    pub const ALL: [Category; 6] = [
        Self::Metadata,
        Self::Dependencies,
        Self::Structure,
        Self::ApiDocumentation,
        Self::Examples,
        Self::Configuration,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Metadata => "metadata",
            Self::Dependencies => "dependencies",
            Self::Structure => "structure",
            Self::ApiDocumentation => "api_documentation",
            Self::Examples => "examples",
            Self::Configuration => "configuration",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_items_share_one_category() {
        assert_eq!(ItemType::Class.category(), Category::ApiDocumentation);
        assert_eq!(ItemType::Method.category(), Category::ApiDocumentation);
        assert_eq!(ItemType::Function.category(), Category::ApiDocumentation);
    }

    #[test]
    fn test_usage_counts_as_example() {
        assert_eq!(ItemType::TestUsage.category(), Category::Examples);
        assert_eq!(ItemType::TestUsage.content_kind(), ContentKind::Code);
    }

    #[test]
    fn category_order_is_declaration_order() {
        let mut sorted = Category::ALL;
        sorted.sort();
        assert_eq!(sorted, Category::ALL);
    }

    #[test]
    fn content_kind_parses_aliases() {
        assert_eq!("json".parse::<ContentKind>(), Ok(ContentKind::Structured));
        assert_eq!("docs".parse::<ContentKind>(), Ok(ContentKind::Documentation));
        assert!("binary".parse::<ContentKind>().is_err());
    }

    #[test]
    fn item_type_serializes_snake_case() {
        let json = serde_json::to_string(&ItemType::ConfigurationExample).unwrap();
        assert_eq!(json, "\"configuration_example\"");
        assert_eq!(ItemType::TestUsage.to_string(), "test_usage");
    }
}
