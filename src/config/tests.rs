use std::ffi::OsString;
use std::io::Write;

use serial_test::serial;
use tempfile::NamedTempFile;

use super::*;

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp config file");
    file.write_all(contents.as_bytes()).expect("write config");
    file
}

#[test]
fn defaults_apply_without_sources() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.logging.level, LevelFilter::INFO);
    assert_eq!(settings.logging.format, LogFormat::Compact);
    assert!(settings.database.url.is_none());
    assert_eq!(settings.database.max_connections.get(), 8);
    assert_eq!(settings.cache, CacheConfig::default());
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("info".to_string());
    raw.cache.ttl_minutes = Some(30);

    let overrides = Overrides {
        log_level: Some("debug".to_string()),
        cache_ttl_minutes: Some(5),
        cache_invalidate_on_write: Some(true),
        admin: true,
        ..Default::default()
    };

    raw.apply_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert_eq!(settings.cache.ttl_minutes, 5);
    assert!(settings.cache.invalidate_on_write);
    assert!(settings.cache.admin);
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = Overrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.logging.format, LogFormat::Json);
}

#[test]
fn blank_database_url_means_no_database() {
    let mut raw = RawSettings::default();
    raw.database.url = Some("   ".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.database.url.is_none());
}

#[test]
fn invalid_values_name_their_key() {
    let cases: [(&str, fn(&mut RawSettings)); 4] = [
        ("logging.level", |raw: &mut RawSettings| {
            raw.logging.level = Some("loud".into())
        }),
        ("database.max_connections", |raw: &mut RawSettings| {
            raw.database.max_connections = Some(0)
        }),
        ("cache.namespace", |raw: &mut RawSettings| {
            raw.cache.namespace = Some(" ".into())
        }),
        ("cache.ttl_minutes", |raw: &mut RawSettings| {
            raw.cache.ttl_minutes = Some(0)
        }),
    ];

    for (expected, mutate) in cases {
        let mut raw = RawSettings::default();
        mutate(&mut raw);
        match Settings::from_raw(raw) {
            Err(LoadError::Invalid { key, .. }) => assert_eq!(key, expected),
            other => panic!("expected invalid `{expected}`, got {other:?}"),
        }
    }
}

#[test]
fn parse_list_arguments() {
    let args = CliArgs::parse_from(["penna", "list", "--page", "3", "--limit", "5", "--all"]);

    match args.command {
        Command::List(list) => {
            assert_eq!(list.page.page, 3);
            assert_eq!(list.page.limit, 5);
            assert!(list.all);
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn list_limit_is_bounded_on_the_command_line() {
    for limit in ["0", "101"] {
        let result = CliArgs::try_parse_from(["penna", "list", "--limit", limit]);
        assert!(result.is_err(), "limit {limit} should be rejected");
    }

    let args = CliArgs::parse_from(["penna", "tag", "rust", "--limit", "100"]);
    match args.command {
        Command::Tag(tag) => assert_eq!(i64::from(tag.page.limit), MAX_CLI_PAGE_LIMIT),
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_create_arguments() {
    let args = CliArgs::parse_from([
        "penna",
        "create",
        "--title",
        "Hello",
        "--excerpt",
        "Short",
        "--body",
        "Long",
        "--tags",
        "rust, web",
        "--status-id",
        "2",
    ]);

    match args.command {
        Command::Create(create) => {
            assert_eq!(create.title, "Hello");
            assert_eq!(create.tags, "rust, web");
            assert_eq!(create.status_id, 2);
            assert_eq!(create.author_id, 1);
            assert!(create.slug.is_none());
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn global_overrides_follow_the_subcommand() {
    let args = CliArgs::parse_from([
        "penna",
        "get",
        "42",
        "--admin",
        "--cache-enabled=false",
        "--database-url",
        "postgres://override",
    ]);

    assert!(matches!(args.command, Command::Get(GetArgs { id: 42 })));
    assert!(args.overrides.admin);
    assert_eq!(args.overrides.cache_enabled, Some(false));
    assert_eq!(
        args.overrides.database_url.as_deref(),
        Some("postgres://override")
    );
}

#[test]
#[serial]
fn load_reads_the_config_file() {
    let file = config_file(
        r#"
        [logging]
        level = "warn"

        [cache]
        namespace = "posts"
        capacity = 50
        "#,
    );
    let args = CliArgs::parse_from([
        OsString::from("penna"),
        OsString::from("--config-file"),
        file.path().into(),
        OsString::from("migrate"),
    ]);

    let settings = load(&args).expect("settings");
    assert_eq!(settings.logging.level, LevelFilter::WARN);
    assert_eq!(settings.cache.namespace, "posts");
    assert_eq!(settings.cache.capacity, 50);
    assert_eq!(settings.cache.ttl_minutes, DEFAULT_TTL_MINUTES);
}

#[test]
#[serial]
fn environment_overrides_file_and_cli_overrides_environment() {
    let file = config_file(
        r#"
        [cache]
        ttl_minutes = 30
        capacity = 50
        "#,
    );
    // SAFETY: `#[serial]` keeps other tests from touching the environment concurrently.
    unsafe {
        std::env::set_var("PENNA__CACHE__TTL_MINUTES", "20");
        std::env::set_var("PENNA__CACHE__CAPACITY", "70");
    }

    let args = CliArgs::parse_from([
        OsString::from("penna"),
        OsString::from("--config-file"),
        file.path().into(),
        OsString::from("--cache-capacity"),
        OsString::from("90"),
        OsString::from("migrate"),
    ]);
    let result = load(&args);

    unsafe {
        std::env::remove_var("PENNA__CACHE__TTL_MINUTES");
        std::env::remove_var("PENNA__CACHE__CAPACITY");
    }

    let settings = result.expect("settings");
    assert_eq!(settings.cache.ttl_minutes, 20);
    assert_eq!(settings.cache.capacity, 90);
}

#[test]
#[serial]
fn missing_explicit_config_file_is_an_error() {
    let args = CliArgs::parse_from([
        "penna",
        "--config-file",
        "/nonexistent/penna-config.toml",
        "migrate",
    ]);
    assert!(matches!(load(&args), Err(LoadError::Build(_))));
}
