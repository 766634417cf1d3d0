use std::path::PathBuf;

use clap::Parser;
use folio_cli::cli::{Cli, Commands, DEFAULT_DB_PATH};

#[test]
fn db_path_defaults_for_every_command() {
    for args in [
        vec!["folio-cli", "init"],
        vec!["folio-cli", "ensure-indexes"],
        vec!["folio-cli", "stats"],
    ] {
        let cli = Cli::try_parse_from(args).expect("parse command");
        let db_path = match cli.command {
            Commands::Init { db_path }
            | Commands::EnsureIndexes { db_path }
            | Commands::Stats { db_path } => db_path,
            Commands::Settings { .. } => unreachable!("not a settings command"),
        };
        assert_eq!(db_path, PathBuf::from(DEFAULT_DB_PATH));
    }
}

#[test]
fn settings_accepts_category_and_db_path() {
    let cli = Cli::try_parse_from([
        "folio-cli",
        "settings",
        "--db-path",
        "/tmp/site.db",
        "--category",
        "social",
    ])
    .expect("parse settings");
    match cli.command {
        Commands::Settings { db_path, category } => {
            assert_eq!(db_path, PathBuf::from("/tmp/site.db"));
            assert_eq!(category.as_deref(), Some("social"));
        },
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn unknown_command_is_rejected() {
    assert!(Cli::try_parse_from(["folio-cli", "write-article"]).is_err());
}
