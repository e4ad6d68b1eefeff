//! DB-API connections.

use std::sync::Arc;

use crate::config::ClientConfig;
use crate::connection::Connection;
use crate::native::{ClientApi, NativeClient};
use crate::types::Value;

use super::cursor::{DbCursor, RowFormat};
use super::error::{DbApiError, DbResult};

/// Connect to `host:port` and select `database`.
pub fn connect(
    host: &str,
    port: u16,
    database: &str,
    user: Option<&str>,
    password: Option<&str>,
) -> DbResult<DbConnection> {
    let mut config = ClientConfig::new(host, port).database(database);
    config.user = user.map(str::to_string);
    config.password = password.map(str::to_string);
    connect_with_config(&config)
}

pub fn connect_with_config(config: &ClientConfig) -> DbResult<DbConnection> {
    let api = NativeClient::shared(&config.library)
        .map_err(|e| DbApiError::Interface(e.to_string()))?;
    connect_with(api, config)
}

/// Connect through an explicit library implementation.
pub fn connect_with<A: ClientApi + 'static>(
    api: Arc<A>,
    config: &ClientConfig,
) -> DbResult<DbConnection> {
    let database = config.database.clone();
    let config = ClientConfig {
        database: None,
        ..config.clone()
    };
    let con = Connection::connect_with(api, &config)
        .map_err(|e| DbApiError::Interface(e.to_string()))?;

    if let Some(db) = database {
        let res = con
            .execute(&format!("use {db}"))
            .map_err(|e| DbApiError::Database(e.to_string()))?;
        if !res.is_ok() {
            drop(res);
            if let Err(e) = con.close() {
                tracing::warn!(error = %e, "failed to close connection");
            }
            return Err(DbApiError::Internal(format!("cannot use {db}")));
        }
    }

    Ok(DbConnection { con })
}

/// A DB-API connection.
#[derive(Debug, Clone)]
pub struct DbConnection {
    con: Connection,
}

impl DbConnection {
    /// Close the connection. Cursors created from it stop working.
    pub fn close(&self) -> DbResult<()> {
        self.con.close().map_err(DbApiError::from)
    }

    /// The server has no transactions; there is nothing to commit.
    pub fn commit(&self) -> DbResult<()> {
        Ok(())
    }

    pub fn rollback(&self) -> DbResult<()> {
        Ok(())
    }

    pub fn cursor(&self) -> DbResult<DbCursor> {
        if self.con.is_closed() {
            return Err(DbApiError::Interface("no connection".to_string()));
        }
        Ok(DbCursor::new(self.con.clone()))
    }

    /// Create a cursor and execute `op` on it.
    pub fn execute(&self, op: &str, params: &[Value], format: RowFormat) -> DbResult<DbCursor> {
        let mut cur = self.cursor()?;
        cur.set_row_format(format);
        cur.execute(op, params)?;
        Ok(cur)
    }

    pub fn is_closed(&self) -> bool {
        self.con.is_closed()
    }

    /// The underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.con
    }
}
