//! Tests for the DB-API layer against the scripted server.

use std::sync::Arc;

use super::*;
use crate::codes;
use crate::config::ClientConfig;
use crate::mock::{MockServer, Reply};
use crate::types::{Report, Value};

fn server() -> Arc<MockServer> {
    let server = Arc::new(MockServer::new());
    server.on("use retail", Reply::Status);
    server
}

fn open(server: &Arc<MockServer>) -> DbConnection {
    let config = ClientConfig::default().database("retail");
    connect_with(Arc::clone(server), &config).unwrap()
}

fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}

fn products() -> Reply {
    Reply::Cursor(vec![
        vec![
            vec![Value::UInt(1), text("apple")],
            vec![Value::UInt(2), text("pear")],
        ],
        vec![vec![Value::UInt(3), text("plum")]],
    ])
}

// ============================================================================
// Module and connection
// ============================================================================

mod connection {
    use super::*;

    #[test]
    fn test_module_constants() {
        assert_eq!(APILEVEL, "2.0");
        assert_eq!(THREADSAFETY, 2);
        assert_eq!(PARAMSTYLE, "format");
    }

    #[test]
    fn test_connect_selects_database() {
        let server = server();
        let con = open(&server);
        assert!(!con.is_closed());
        assert_eq!(server.executed(), vec!["use retail"]);
        con.commit().unwrap();
        con.rollback().unwrap();
        con.close().unwrap();
        assert!(con.is_closed());
        assert_eq!(server.open_connections(), 0);
    }

    #[test]
    fn test_cannot_use_database() {
        let server = Arc::new(MockServer::new());
        let config = ClientConfig::default().database("nosuchdb");
        let err = connect_with(Arc::clone(&server), &config).unwrap_err();
        assert_eq!(err, DbApiError::Internal("cannot use nosuchdb".to_string()));
        assert_eq!(server.open_connections(), 0);
        assert_eq!(server.live(), 0);
    }

    #[test]
    fn test_connect_failure_is_interface_error() {
        let server = Arc::new(MockServer::new());
        server.fail_connect(codes::client::NOCON);
        let err = connect_with(server, &ClientConfig::default()).unwrap_err();
        assert_eq!(err.kind(), "InterfaceError");
    }

    #[test]
    fn test_cursor_on_closed_connection() {
        let server = server();
        let con = open(&server);
        con.close().unwrap();
        assert!(matches!(con.cursor(), Err(DbApiError::Interface(_))));
    }
}

// ============================================================================
// Cursor
// ============================================================================

mod cursor {
    use super::*;

    #[test]
    fn test_fetch_dict_rows() {
        let server = server();
        server.on("select prod_key, desc from product", products());
        let con = open(&server);
        let mut cur = con.cursor().unwrap();
        assert_eq!(cur.rowcount(), -1);
        assert_eq!(cur.arraysize, 1);

        cur.execute("select prod_key, desc from product", &[]).unwrap();
        let names: Vec<&str> = cur
            .description()
            .unwrap()
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["prod_key", "desc"]);

        let row = cur.fetchone().unwrap().unwrap();
        assert_eq!(row.get("prod_key"), Some(&Value::UInt(1)));
        assert_eq!(row.get("desc"), Some(&text("apple")));
        assert_eq!(cur.rowcount(), 1);

        let rest = cur.fetchall().unwrap();
        assert_eq!(rest.len(), 2);
        assert_eq!(rest[1].get("desc"), Some(&text("plum")));
        assert_eq!(cur.rowcount(), 3);
        assert!(cur.fetchone().unwrap().is_none());

        cur.close();
        assert_eq!(cur.rowcount(), -1);
        assert!(cur.description().is_none());
        assert_eq!(server.live(), 0);
        assert!(server.misuse().is_empty());
    }

    #[test]
    fn test_fetchmany() {
        let server = server();
        server.on("select prod_key, desc from product", products());
        let con = open(&server);
        let mut cur = con.cursor().unwrap();
        cur.execute("select prod_key, desc from product", &[]).unwrap();
        assert_eq!(cur.fetchmany(None).unwrap().len(), 1);
        assert_eq!(cur.fetchmany(Some(5)).unwrap().len(), 2);
        assert!(cur.fetchmany(Some(5)).unwrap().is_empty());
    }

    #[test]
    fn test_list_and_tuple_formats() {
        let server = server();
        server.on("select prod_key, desc from product", products());
        let con = open(&server);

        let rows: Vec<DbRow> = con
            .execute("select prod_key, desc from product", &[], RowFormat::List)
            .unwrap()
            .collect::<DbResult<_>>()
            .unwrap();
        assert_eq!(rows[0], DbRow::List(vec![Value::UInt(1), text("apple")]));
        assert_eq!(rows[2].at(1), Some(&text("plum")));
        assert_eq!(rows[0].get("desc"), None);

        let mut cur = con.cursor().unwrap();
        cur.set_row_format(RowFormat::Tuple);
        cur.execute("select prod_key, desc from product", &[]).unwrap();
        assert_eq!(
            cur.next().unwrap().unwrap(),
            DbRow::Tuple(vec![Value::UInt(1), text("apple")])
        );
    }

    #[test]
    fn test_select_star_describes_table() {
        let server = server();
        server.on(
            "describe product",
            Reply::Cursor(vec![vec![
                vec![text("prod_key"), text("UINT")],
                vec![text("desc"), text("TEXT")],
            ]]),
        );
        server.on("select * from product", products());
        let con = open(&server);
        let mut cur = con.cursor().unwrap();
        cur.execute("select * from product", &[]).unwrap();
        let row = cur.fetchone().unwrap().unwrap();
        assert_eq!(row.get("desc"), Some(&text("apple")));
        assert_eq!(
            server.executed(),
            vec!["use retail", "describe product", "select * from product"]
        );
    }

    #[test]
    fn test_extra_columns_are_numbered() {
        let server = server();
        server.on(
            "select count(*) from buys",
            Reply::Row(vec![Value::UInt(1000), Value::Int(-1)]),
        );
        let con = open(&server);
        let mut cur = con.cursor().unwrap();
        cur.execute("select count(*) from buys", &[]).unwrap();
        let row = cur.fetchone().unwrap().unwrap();
        assert_eq!(row.get("count(*)"), Some(&Value::UInt(1000)));
        assert_eq!(row.get("col1"), Some(&Value::Int(-1)));
        assert_eq!(
            serde_json::to_string(&row).unwrap(),
            r#"{"count(*)":1000,"col1":-1}"#
        );
    }

    #[test]
    fn test_parameters_are_substituted() {
        let server = server();
        server.on(
            "select desc from product where prod_key = 2",
            Reply::Cursor(vec![vec![vec![text("pear")]]]),
        );
        let con = open(&server);
        let mut cur = con.cursor().unwrap();
        cur.execute(
            "select desc from product where prod_key = %d",
            &[Value::UInt(2)],
        )
        .unwrap();
        assert_eq!(cur.fetchone().unwrap().unwrap().get("desc"), Some(&text("pear")));

        let err = cur
            .execute("select desc from product where prod_key = %d", &[])
            .unwrap_err();
        // without parameters the statement is sent as it is
        assert!(matches!(err, DbApiError::Programming(_)));
    }

    #[test]
    fn test_parameter_mismatch() {
        let server = server();
        let con = open(&server);
        let mut cur = con.cursor().unwrap();
        let err = cur
            .execute("select %s from product", &[Value::Int(1), Value::Int(2)])
            .unwrap_err();
        assert!(matches!(err, DbApiError::Programming(_)));
        assert_eq!(server.executed(), vec!["use retail"]);
    }

    #[test]
    fn test_eof_means_no_rows() {
        let server = server();
        server.on(
            "select desc from product where prod_key = 99",
            Reply::Error {
                code: codes::EOF,
                details: "end of file".to_string(),
            },
        );
        let con = open(&server);
        let mut cur = con.cursor().unwrap();
        cur.execute("select desc from product where prod_key = 99", &[])
            .unwrap();
        assert_eq!(cur.rowcount(), 0);
        assert!(cur.fetchone().unwrap().is_none());
        assert!(cur.fetchall().unwrap().is_empty());
    }

    #[test]
    fn test_server_error_is_classified() {
        let server = server();
        server.on(
            "insert into product (1, 'apple')",
            Reply::Error {
                code: codes::DUP_KEY,
                details: "duplicated key".to_string(),
            },
        );
        let con = open(&server);
        let mut cur = con.cursor().unwrap();
        let err = cur.execute("insert into product (1, 'apple')", &[]).unwrap_err();
        assert_eq!(err, DbApiError::Integrity("duplicated key".to_string()));
        assert_eq!(server.live(), 0);
    }

    #[test]
    fn test_fetch_before_execute() {
        let server = server();
        let con = open(&server);
        let mut cur = con.cursor().unwrap();
        assert!(matches!(cur.fetchone(), Err(DbApiError::Interface(_))));
    }

    #[test]
    fn test_status_and_report() {
        let server = server();
        server.on("create table product", Reply::Status);
        server.on(
            "load 'product.csv' into product",
            Reply::Report(Report {
                affected: 3,
                errors: 0,
                runtime: 10,
            }),
        );
        let con = open(&server);
        let mut cur = con.cursor().unwrap();

        cur.execute("create table product", &[]).unwrap();
        assert!(cur.description().is_none());
        assert_eq!(cur.rowcount(), -1);
        assert!(cur.fetchone().unwrap().is_none());

        cur.execute("load 'product.csv' into product", &[]).unwrap();
        assert_eq!(cur.rowcount(), 3);
    }

    #[test]
    fn test_executemany_adds_up_reports() {
        let server = server();
        for key in 1..=3 {
            server.on(
                &format!("insert into product ({key}, 'x')"),
                Reply::Report(Report {
                    affected: 1,
                    errors: 0,
                    runtime: 1,
                }),
            );
        }
        let con = open(&server);
        let mut cur = con.cursor().unwrap();
        let seq: Vec<Vec<Value>> = (1..=3).map(|k| vec![Value::Int(k)]).collect();
        cur.executemany("insert into product (%d, 'x')", &seq).unwrap();
        assert_eq!(cur.rowcount(), 3);
        assert_eq!(server.executed().len(), 4);
    }

    #[test]
    fn test_fetch_error_surfaces() {
        let server = server();
        server.on(
            "select prod_key from product",
            Reply::FailingCursor {
                batches: vec![vec![vec![Value::UInt(1)]], vec![vec![Value::UInt(2)]]],
                at: 0,
                code: codes::SOCKET,
            },
        );
        let con = open(&server);
        let mut cur = con.cursor().unwrap();
        cur.execute("select prod_key from product", &[]).unwrap();
        assert!(cur.fetchone().unwrap().is_some());
        assert!(matches!(cur.fetchone(), Err(DbApiError::Operational(_))));
        assert!(cur.fetchone().unwrap().is_none());
    }

    #[test]
    fn test_callproc_not_supported() {
        let server = server();
        let con = open(&server);
        let mut cur = con.cursor().unwrap();
        assert!(matches!(
            cur.callproc("count_sales", &[]),
            Err(DbApiError::NotSupported(_))
        ));
    }
}

// ============================================================================
// Type constructors
// ============================================================================

mod constructors {
    use super::*;

    #[test]
    fn test_date_and_timestamp() {
        assert_eq!(date(2019, 2, 28).unwrap().to_string(), "2019-02-28");
        assert!(matches!(date(2019, 2, 30), Err(DbApiError::Data(_))));
        assert_eq!(
            timestamp(2018, 6, 1, 12, 30, 0).unwrap(),
            Value::Time(1_527_856_200_000_000_000)
        );
    }

    #[test]
    fn test_from_ticks() {
        assert_eq!(
            timestamp_from_ticks(1_527_856_200.5).unwrap(),
            Value::Time(1_527_856_200_500_000_000)
        );
        assert_eq!(
            date_from_ticks(1_527_856_200.0).unwrap().to_string(),
            "2018-06-01"
        );
    }

    #[test]
    fn test_from_ticks_rejects_non_finite() {
        assert!(matches!(timestamp_from_ticks(f64::NAN), Err(DbApiError::Data(_))));
        assert!(matches!(date_from_ticks(f64::INFINITY), Err(DbApiError::Data(_))));
        assert!(matches!(
            timestamp_from_ticks(f64::NEG_INFINITY),
            Err(DbApiError::Data(_))
        ));
        assert!(matches!(date_from_ticks(1e300), Err(DbApiError::Data(_))));
    }
}
