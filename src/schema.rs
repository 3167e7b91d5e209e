// promptvc schema - version history tables for Diesel ORM

diesel::table! {
    schema_versions (id) {
        id -> Integer,
        version -> Text,
        name -> Text,
        features -> Text,
        introduced_at -> Text,
    }
}

// ============================================================================
// Version History
// ============================================================================

diesel::table! {
    version_records (id) {
        id -> Text,
        config_group_id -> Text,
        version -> Integer,
        parent_id -> Nullable<Text>,
        branch -> Text,
        merge_from -> Nullable<Text>,
        message -> Text,
        created_at -> Text,
        prompt_content -> Text,
        config_json -> Text,
    }
}
