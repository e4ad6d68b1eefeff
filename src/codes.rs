//! Status codes observed at the library boundary.
//!
//! The top-level constants are the server-side codes carried by results
//! (`nowdb_result_errcode`). The codes returned directly by the client
//! library calls live in [`client`].

pub const OK: i32 = 0;
pub const NO_MEM: i32 = 1;
pub const INVALID: i32 = 2;
pub const NO_RSC: i32 = 3;
pub const BUSY: i32 = 4;
pub const TOO_BIG: i32 = 5;
pub const LOCK: i32 = 6;
pub const ULOCK: i32 = 7;
/// End of data. Terminal for a cursor, never an error.
pub const EOF: i32 = 8;
pub const NOT_SUPP: i32 = 9;
pub const BAD_PATH: i32 = 10;
pub const BAD_NAME: i32 = 11;
pub const READ: i32 = 14;
pub const WRITE: i32 = 15;
pub const OPEN: i32 = 16;
pub const CLOSE: i32 = 17;
pub const PANIC: i32 = 20;
pub const CATALOG: i32 = 21;
pub const TIME: i32 = 22;
pub const NOSUCH_SCOPE: i32 = 23;
pub const NOSUCH_CONTEXT: i32 = 24;
pub const NOSUCH_INDEX: i32 = 25;
pub const KEY_NOT_FOUND: i32 = 26;
pub const DUP_KEY: i32 = 27;
pub const DUP_NAME: i32 = 28;
pub const COLLISION: i32 = 29;
pub const THREAD: i32 = 31;
pub const QUEUE: i32 = 33;
pub const WORKER: i32 = 35;
pub const TIMEOUT: i32 = 36;
pub const VERSION: i32 = 43;
pub const STORE: i32 = 47;
pub const CONTEXT: i32 = 48;
pub const SCOPE: i32 = 49;
pub const CREATE: i32 = 51;
pub const DROP: i32 = 52;
pub const LOADER: i32 = 54;
pub const FUN: i32 = 58;
pub const NOT_FOUND: i32 = 59;
pub const PARSER: i32 = 60;
pub const PROTOCOL: i32 = 64;
pub const SOCKET: i32 = 65;
pub const SERVER: i32 = 69;
pub const ADDR: i32 = 70;
pub const PYTHON: i32 = 71;
pub const LUA: i32 = 72;
pub const UNK_SYMBOL: i32 = 73;
pub const USRERR: i32 = 74;
pub const UNKNOWN: i32 = 9999;

/// Short name of a server code, for log lines and error messages when the
/// server sent no details.
pub fn name(code: i32) -> &'static str {
    match code {
        OK => "ok",
        NO_MEM => "out of memory",
        INVALID => "invalid",
        NO_RSC => "no resource",
        BUSY => "busy",
        TOO_BIG => "too big",
        LOCK | ULOCK => "lock",
        EOF => "end of file",
        NOT_SUPP => "not supported",
        BAD_PATH => "bad path",
        BAD_NAME => "bad name",
        READ => "read",
        WRITE => "write",
        OPEN => "open",
        CLOSE => "close",
        PANIC => "panic",
        CATALOG => "catalog",
        TIME => "time",
        NOSUCH_SCOPE => "no such scope",
        NOSUCH_CONTEXT => "no such context",
        NOSUCH_INDEX => "no such index",
        KEY_NOT_FOUND => "key not found",
        DUP_KEY => "duplicated key",
        DUP_NAME => "duplicated name",
        COLLISION => "collision",
        TIMEOUT => "timeout",
        NOT_FOUND => "not found",
        PARSER => "parser",
        PROTOCOL => "protocol",
        SOCKET => "socket",
        SERVER => "server",
        UNK_SYMBOL => "unknown symbol",
        USRERR => "user error",
        _ => "unknown",
    }
}

/// Return codes of the client library calls (`nowclient.h`).
pub mod client {
    pub const OK: i32 = 0;
    pub const NOMEM: i32 = 1;
    pub const NOCON: i32 = 2;
    pub const NORES: i32 = 3;
    pub const EOF: i32 = 4;
    pub const INVALID: i32 = 5;
    pub const NOREAD: i32 = 6;
    pub const NOWRITE: i32 = 7;
    pub const NOOPEN: i32 = 8;
    pub const NOCLOSE: i32 = 9;
    pub const NOUSE: i32 = 10;
    pub const PROTO: i32 = 11;
    pub const TOOBIG: i32 = 12;
    pub const OSERR: i32 = 13;
    pub const FORMAT: i32 = 14;
}
