use super::types::Extraction;
use crate::error::Result;
use std::path::Path;

/// Parse a persisted raw-schema document into an `Extraction`
pub fn parse_extraction(path: &Path) -> Result<Extraction> {
    let content = std::fs::read_to_string(path)?;
    parse_extraction_str(&content)
}

/// Parse a raw-schema JSON string into an `Extraction`
pub fn parse_extraction_str(content: &str) -> Result<Extraction> {
    let extraction: Extraction = serde_json::from_str(content)?;
    Ok(extraction)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_extraction_preserves_order() {
        let doc = r#"{
            "schema": {
                "zoo": { "Zebra": { "stripes": { "Type": "integer" } } },
                "accounts": {
                    "User": { "name": { "Type": "string" }, "age": { "Type": "integer" } }
                }
            },
            "partials": {}
        }"#;

        let extraction = parse_extraction_str(doc).unwrap();
        let packages: Vec<_> = extraction.schema.packages.keys().cloned().collect();
        assert_eq!(packages, vec!["zoo", "accounts"]);

        let fields: Vec<_> = extraction.schema.packages["accounts"]["User"]
            .keys()
            .cloned()
            .collect();
        assert_eq!(fields, vec!["name", "age"]);
    }

    #[test]
    fn test_parse_extraction_without_partials() {
        let extraction = parse_extraction_str(r#"{ "schema": {} }"#).unwrap();
        assert!(extraction.partials.partials.is_empty());
    }

    #[test]
    fn test_parse_extraction_rejects_garbage() {
        assert!(parse_extraction_str("[1, 2, 3]").is_err());
    }
}
