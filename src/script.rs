//! Splitting scripts into statements.
//!
//! Statements end at `;` outside single quotes. `--` starts a comment that
//! runs to the end of the line.

use crate::error::{NowdbError, Result};

/// Split `input` into trimmed, non-empty statements without their `;`.
pub fn split_statements(input: &str) -> Result<Vec<String>> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                quoted = !quoted;
                current.push(c);
            }
            '-' if !quoted && chars.peek() == Some(&'-') => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        current.push('\n');
                        break;
                    }
                }
            }
            ';' if !quoted => {
                let stmt = current.trim();
                if !stmt.is_empty() {
                    statements.push(stmt.to_string());
                }
                current.clear();
            }
            _ => current.push(c),
        }
    }

    if quoted {
        return Err(NowdbError::InvalidArgument(
            "unterminated string in statement".to_string(),
        ));
    }
    let rest = current.trim();
    if !rest.is_empty() {
        return Err(NowdbError::InvalidArgument(format!(
            "statement not terminated by ';': {rest}"
        )));
    }
    Ok(statements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_split_simple() {
        let stmts = split_statements("use retail;\nselect * from product;").unwrap();
        assert_eq!(stmts, vec!["use retail", "select * from product"]);
    }

    #[test]
    fn test_semicolon_in_quotes() {
        let stmts = split_statements("insert into product (1, 'a;b');").unwrap();
        assert_eq!(stmts, vec!["insert into product (1, 'a;b')"]);
    }

    #[test]
    fn test_comments_and_blanks() {
        let script = "-- create the schema\ncreate table product;\n;;\n  -- done\n";
        let stmts = split_statements(script).unwrap();
        assert_eq!(stmts, vec!["create table product"]);
    }

    #[test]
    fn test_dashes_in_quotes() {
        let stmts = split_statements("insert into product (1, '--');").unwrap();
        assert_eq!(stmts, vec!["insert into product (1, '--')"]);
    }

    #[test]
    fn test_unterminated() {
        assert!(matches!(
            split_statements("use retail; select * from product"),
            Err(NowdbError::InvalidArgument(_))
        ));
        assert!(split_statements("insert into product (1, 'abc);").is_err());
    }

    #[test]
    fn test_empty_input() {
        assert!(split_statements("").unwrap().is_empty());
        assert!(split_statements(" \n\t").unwrap().is_empty());
    }

    proptest! {
        /// Property: statements joined with ';' split back into themselves
        #[test]
        fn join_then_split(stmts in prop::collection::vec("[a-z0-9 ,()*=]*[a-z0-9()*=]", 0..10)) {
            let stmts: Vec<String> = stmts.iter().map(|s| s.trim().to_string()).collect();
            let script: String = stmts.iter().map(|s| format!("{s};\n")).collect();
            prop_assert_eq!(split_statements(&script).unwrap(), stmts);
        }

        /// Property: the splitter never panics
        #[test]
        fn split_never_panics(script in ".*") {
            let _ = split_statements(&script);
        }
    }
}
