//! JSON Schema for the configuration file.

use super::ThemedConfig;

/// Generates a JSON Schema for the Themed configuration.
#[must_use]
pub fn generate_schema() -> schemars::Schema {
    let mut schema = schemars::schema_for!(ThemedConfig);

    if let Some(obj) = schema.as_object_mut() {
        obj.insert(
            "$id".to_string(),
            serde_json::json!("https://raw.githubusercontent.com/themed-mac/themed/main/themed.schema.json"),
        );
    }

    schema
}

/// Generates the schema as pretty-printed JSON.
#[must_use]
pub fn generate_schema_json() -> String {
    serde_json::to_string_pretty(&generate_schema()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_schema_produces_valid_json() {
        let parsed: serde_json::Value = serde_json::from_str(&generate_schema_json()).unwrap();

        assert!(parsed["$id"].as_str().unwrap().contains("themed.schema.json"));
        assert_eq!(parsed["$schema"], "https://json-schema.org/draft/2020-12/schema");
        assert_eq!(parsed["title"], "ThemedConfig");
        assert!(parsed["properties"]["wallpaper"].is_object());
        assert!(parsed["properties"]["appearance"].is_object());
    }
}
