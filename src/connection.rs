//! Connections to a NoWDB server.

use std::ffi::CString;
use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::codes;
use crate::config::ClientConfig;
use crate::error::{NowdbError, Result};
use crate::native::{ClientApi, NativeClient, RawHandle, ResultApi};
use crate::result::QueryResult;

/// State shared by a connection, its clones and the results it produced.
pub(crate) struct Session {
    api: Arc<dyn ClientApi>,
    results: Arc<dyn ResultApi>,
    /// `None` once closed.
    handle: Mutex<Option<RawHandle>>,
    peer: String,
}

impl Session {
    /// Lock the connection. Holding the guard serializes native calls.
    pub(crate) fn lock(&self) -> MutexGuard<'_, Option<RawHandle>> {
        self.handle.lock()
    }

    fn client_error(&self, code: i32) -> NowdbError {
        NowdbError::Client {
            code,
            message: self.api.explain(code),
        }
    }

    fn close_handle(&self, con: RawHandle) -> Result<()> {
        let rc = self.api.close(con);
        if rc != codes::client::OK {
            // the handle is not freed by a failed close
            self.api.destroy(con);
            return Err(self.client_error(rc));
        }
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(con) = self.handle.get_mut().take() {
            tracing::debug!(peer = %self.peer, "closing connection on drop");
            if let Err(e) = self.close_handle(con) {
                tracing::warn!(peer = %self.peer, error = %e, "failed to close connection");
            }
        }
    }
}

/// A connection to a NoWDB server.
///
/// Clones share the connection. It is closed by [`Connection::close`] or
/// when the last clone and the last result created through it are dropped.
#[derive(Clone)]
pub struct Connection {
    session: Arc<Session>,
}

impl Connection {
    /// Connect using the client library named in the configuration.
    pub fn connect(config: &ClientConfig) -> Result<Self> {
        let api = NativeClient::shared(&config.library)?;
        Self::connect_with(api, config)
    }

    /// Connect through an explicit library implementation.
    pub fn connect_with<A: ClientApi + 'static>(api: Arc<A>, config: &ClientConfig) -> Result<Self> {
        let host = CString::new(config.host.as_str())?;
        let user = config.user.as_deref().map(CString::new).transpose()?;
        let password = config.password.as_deref().map(CString::new).transpose()?;
        let peer = format!("{}:{}", config.host, config.port);

        let con = api
            .connect(
                &host,
                config.port,
                user.as_deref(),
                password.as_deref(),
                config.encoding.flags(),
            )
            .map_err(|code| NowdbError::Client {
                code,
                message: api.explain(code),
            })?;
        tracing::debug!(%peer, "connected");

        let results: Arc<dyn ResultApi> = api.clone();
        let connection = Self {
            session: Arc::new(Session {
                api,
                results,
                handle: Mutex::new(Some(con)),
                peer,
            }),
        };

        if let Some(db) = &config.database {
            connection.use_database(db)?;
        }
        Ok(connection)
    }

    /// Send one statement and return its result.
    ///
    /// Fails if the statement could not be sent or no result came back. A
    /// result carrying a server error is still returned; see
    /// [`QueryResult::check`].
    pub fn execute(&self, statement: &str) -> Result<QueryResult> {
        let stmt = CString::new(statement)?;
        let con = self.session.lock();
        let Some(handle) = *con else {
            return Err(NowdbError::ConnectionClosed);
        };
        tracing::debug!(peer = %self.session.peer, statement, "execute");
        let res = self
            .session
            .api
            .execute(handle, &stmt)
            .map_err(|code| self.session.client_error(code))?;
        drop(con);

        Ok(QueryResult::new(
            Arc::clone(&self.session.results),
            res,
            Some(Arc::clone(&self.session)),
        ))
    }

    /// Select the database subsequent statements run against.
    pub fn use_database(&self, name: &str) -> Result<()> {
        let res = self.execute(&format!("use {name}"))?;
        if !res.is_ok() {
            return Err(res.error());
        }
        Ok(())
    }

    /// Close the connection. Closing twice is a no-op.
    pub fn close(&self) -> Result<()> {
        let Some(con) = self.session.lock().take() else {
            return Ok(());
        };
        tracing::debug!(peer = %self.session.peer, "closing connection");
        self.session.close_handle(con)
    }

    pub fn is_closed(&self) -> bool {
        self.session.lock().is_none()
    }

    /// `host:port` this connection was opened to.
    pub fn peer(&self) -> &str {
        &self.session.peer
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("peer", &self.session.peer)
            .field("closed", &self.is_closed())
            .finish()
    }
}
