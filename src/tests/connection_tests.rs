//! Tests for connection.rs - session configuration, the autocommit contract
//! and the schema-update queue.

use std::sync::Arc;
use std::time::Duration;

use crate::client::{BackendError, DatabaseClient};
use crate::connection::{
    connect, AutocommitDmlMode, ColumnSchema, Connection, Staleness, TransactionMode,
};
use crate::error::Error;
use crate::params::Params;
use crate::tests::test_client::{Call, TestClient};
use crate::value::{TypeCode, Value};

fn connection(client: &Arc<TestClient>) -> Connection {
    connect(Arc::clone(client) as Arc<dyn DatabaseClient>)
}

/// Tests for the autocommit contract
mod autocommit {
    use super::*;

    #[test]
    fn test_autocommit_is_always_on() {
        let client = TestClient::new();
        let conn = connection(&client);
        assert!(conn.autocommit());
    }

    #[test]
    fn test_commit_and_rollback_always_warn() {
        let client = TestClient::new();
        let conn = connection(&client);
        assert!(matches!(conn.commit(), Err(Error::Warning(_))));
        assert!(matches!(conn.rollback(), Err(Error::Warning(_))));
        // Repeatedly: there is no state that a first call could flush.
        assert!(matches!(conn.commit(), Err(Error::Warning(_))));
    }

    #[test]
    fn test_closed_connection_reports_interface_error_before_warning() {
        let client = TestClient::new();
        let conn = connection(&client);
        conn.close();
        assert!(matches!(conn.commit(), Err(Error::Interface(_))));
        assert!(matches!(conn.rollback(), Err(Error::Interface(_))));
    }
}

/// Tests for session configuration
mod configuration {
    use super::*;

    #[test]
    fn test_read_only_drives_transaction_mode() {
        let client = TestClient::new();
        let conn = connection(&client);
        assert!(!conn.read_only().unwrap());
        assert_eq!(conn.transaction_mode().unwrap(), TransactionMode::ReadWrite);

        conn.set_read_only(true).unwrap();
        assert!(conn.read_only().unwrap());
        assert_eq!(conn.transaction_mode().unwrap(), TransactionMode::ReadOnly);
    }

    #[test]
    fn test_autocommit_dml_mode_round_trips() {
        let client = TestClient::new();
        let conn = connection(&client);
        assert_eq!(
            conn.autocommit_dml_mode().unwrap(),
            AutocommitDmlMode::Transactional
        );
        conn.set_autocommit_dml_mode(AutocommitDmlMode::PartitionedNonAtomic)
            .unwrap();
        assert_eq!(
            conn.autocommit_dml_mode().unwrap(),
            AutocommitDmlMode::PartitionedNonAtomic
        );
    }

    #[test]
    fn test_staleness_reaches_snapshot_options() {
        let client = TestClient::new();
        client.push_results(&[("a", TypeCode::Int64)], Vec::new());
        let conn = connection(&client);
        conn.set_staleness(Staleness::MaxStaleness(Duration::from_secs(10)))
            .unwrap();
        conn.set_timeout(Some(Duration::from_secs(30))).unwrap();

        let mut cursor = conn.cursor().unwrap();
        cursor.execute("SELECT a FROM t", Params::None).unwrap();

        let options = client.snapshot_options().unwrap();
        assert_eq!(
            options.staleness,
            Staleness::MaxStaleness(Duration::from_secs(10))
        );
        assert_eq!(options.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_setters_reject_closed_connection() {
        let client = TestClient::new();
        let conn = connection(&client);
        conn.close();
        assert!(matches!(conn.set_read_only(true), Err(Error::Interface(_))));
        assert!(matches!(
            conn.set_timeout(Some(Duration::from_secs(1))),
            Err(Error::Interface(_))
        ));
        assert!(matches!(
            conn.set_staleness(Staleness::Strong),
            Err(Error::Interface(_))
        ));
    }
}

/// Tests for the connection lifecycle
mod lifecycle {
    use super::*;

    #[test]
    fn test_close_is_idempotent() {
        let client = TestClient::new();
        let conn = connection(&client);
        conn.close();
        conn.close();
        assert!(conn.is_closed());
    }

    #[test]
    fn test_cursor_on_closed_connection() {
        let client = TestClient::new();
        let conn = connection(&client);
        conn.close();
        assert!(matches!(conn.cursor(), Err(Error::Interface(_))));
    }
}

/// Tests for the INFORMATION_SCHEMA introspection helpers
mod introspection {
    use super::*;

    #[test]
    fn test_list_tables_reads_information_schema() {
        let client = TestClient::new();
        client.push_results(
            &[("table_name", TypeCode::String)],
            vec![
                vec![Value::String("users".into())],
                vec![Value::String("orders".into())],
            ],
        );
        let conn = connection(&client);
        assert_eq!(
            conn.list_tables().unwrap(),
            vec!["users".to_string(), "orders".to_string()]
        );
        // Runs as a snapshot read, not inside a transaction.
        assert!(client.calls().contains(&Call::Snapshot));
    }

    #[test]
    fn test_table_column_schema_binds_table_name() {
        let client = TestClient::new();
        client.push_results(
            &[
                ("column_name", TypeCode::String),
                ("is_nullable", TypeCode::String),
                ("spanner_type", TypeCode::String),
            ],
            vec![
                vec![
                    Value::String("id".into()),
                    Value::String("NO".into()),
                    Value::String("INT64".into()),
                ],
                vec![
                    Value::String("name".into()),
                    Value::String("YES".into()),
                    Value::String("STRING(MAX)".into()),
                ],
            ],
        );
        let conn = connection(&client);
        let schema = conn.table_column_schema("users").unwrap();
        assert_eq!(
            schema.get("id"),
            Some(&ColumnSchema {
                sql_type: "INT64".into(),
                null_ok: false,
            })
        );
        assert_eq!(
            schema.get("name"),
            Some(&ColumnSchema {
                sql_type: "STRING(MAX)".into(),
                null_ok: true,
            })
        );

        let statement = client.last_statement().unwrap();
        assert!(statement.sql.ends_with("c.table_name = @a0"));
        assert_eq!(statement.params.get("a0"), Some(&Value::String("users".into())));
    }

    #[test]
    fn test_introspection_rejects_closed_connection() {
        let client = TestClient::new();
        let conn = connection(&client);
        conn.close();
        assert!(matches!(conn.list_tables(), Err(Error::Interface(_))));
        assert!(matches!(
            conn.table_column_schema("users"),
            Err(Error::Interface(_))
        ));
    }
}

/// Tests for the schema-update queue
mod ddl {
    use super::*;

    #[test]
    fn test_ddl_flushes_through_schema_update() {
        let client = TestClient::new();
        let conn = connection(&client);
        let mut cursor = conn.cursor().unwrap();

        cursor
            .execute("CREATE TABLE users (id INT64);", Params::None)
            .unwrap();
        // Flushed as one batch, trailing semicolon stripped.
        assert_eq!(
            client.calls(),
            vec![Call::UpdateDdl(vec!["CREATE TABLE users (id INT64)".into()])]
        );
        assert_eq!(cursor.rowcount(), -1);
        assert!(cursor.description().is_none());
    }

    #[test]
    fn test_ddl_failure_maps_to_operational_error() {
        let client = TestClient::new();
        client.fail_next_ddl(BackendError::Internal("backend down".into()));
        let conn = connection(&client);
        let mut cursor = conn.cursor().unwrap();

        let result = cursor.execute("DROP TABLE users", Params::None);
        assert!(matches!(result, Err(Error::Operational(_))));
    }
}
