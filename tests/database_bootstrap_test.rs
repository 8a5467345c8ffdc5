// ABOUTME: Tests for opening file-backed databases in directories that do not exist yet
// ABOUTME: Covers the default database URL from a fresh working directory
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use herald_server::config::environment::DatabaseUrl;
use herald_server::database::Database;
use serial_test::serial;
use std::env;

#[tokio::test]
#[serial]
async fn test_default_url_opens_in_empty_directory() {
    let dir = tempfile::tempdir().unwrap();
    let previous = env::current_dir().unwrap();
    env::set_current_dir(dir.path()).unwrap();

    let url = DatabaseUrl::default();
    let opened = Database::new(&url.to_connection_string()).await;
    let created = dir.path().join("data").join("herald.db").exists();

    env::set_current_dir(previous).unwrap();

    assert!(opened.is_ok(), "{:?}", opened.err());
    assert!(created);
}

#[tokio::test]
#[serial]
async fn test_nested_directories_are_created() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a").join("b").join("notifications.db");

    let db = Database::new(&format!("sqlite:{}", path.display()))
        .await
        .unwrap();
    drop(db);

    assert!(path.exists());
    Database::new(&format!("sqlite:{}", path.display()))
        .await
        .unwrap();
}
