use super::*;
use std::collections::HashMap;

fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect();
    move |key: &str| map.get(key).cloned()
}

#[test]
fn defaults_apply_when_only_database_url_is_set() {
    let config = ServerConfig::from_lookup(lookup_from(&[("DATABASE_URL", "postgres://x")])).expect("config");
    assert_eq!(config.port, DEFAULT_PORT);
    assert_eq!(config.db_max_connections, DEFAULT_DB_MAX_CONNECTIONS);
    assert_eq!(config.client_channel_capacity, DEFAULT_CLIENT_CHANNEL_CAPACITY);
}

#[test]
fn database_url_is_required() {
    let err = ServerConfig::from_lookup(lookup_from(&[])).expect_err("should fail");
    assert!(matches!(err, ConfigError::Missing("DATABASE_URL")));
}

#[test]
fn invalid_port_is_an_error() {
    let err = ServerConfig::from_lookup(lookup_from(&[("DATABASE_URL", "postgres://x"), ("PORT", "http")]))
        .expect_err("should fail");
    assert!(matches!(err, ConfigError::Invalid { var: "PORT", .. }));
}

#[test]
fn unparsable_optional_values_fall_back_to_defaults() {
    let config = ServerConfig::from_lookup(lookup_from(&[
        ("DATABASE_URL", "postgres://x"),
        ("PORT", "4000"),
        ("DB_MAX_CONNECTIONS", "many"),
        ("CLIENT_CHANNEL_CAPACITY", "0"),
    ]))
    .expect("config");
    assert_eq!(config.port, 4000);
    assert_eq!(config.db_max_connections, DEFAULT_DB_MAX_CONNECTIONS);
    assert_eq!(config.client_channel_capacity, 1);
}

#[test]
fn debug_output_redacts_database_url() {
    let config =
        ServerConfig::from_lookup(lookup_from(&[("DATABASE_URL", "postgres://secret@db")])).expect("config");
    let rendered = format!("{config:?}");
    assert!(!rendered.contains("secret"));
}
