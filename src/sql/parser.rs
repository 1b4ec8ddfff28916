//! Parses the two statement shapes this front-end recognizes. Unlike a
//! general SQL tokenizer, there's no quoting or parenthesis grammar here:
//! tokens are plain whitespace-delimited fields, exactly as the original's
//! `sscanf("INSERT %d %s %s", ...)` read them.
use crate::errors::Error;
use crate::storage::Row;

use super::statement::Statement;

/// Parses one line of input into a `Statement`.
///
/// Returns `Error::Syntax("Syntax error in statement '<line>'.")` for
/// malformed arity, an out-of-range/non-numeric id, or a username/email
/// token that doesn't fit its fixed slot (the latter rejected by
/// `Row::new`, whose own message is replaced with the statement-level one).
pub fn parse(line: &str) -> Result<Statement, Error> {
    let mut tokens = line.split_whitespace();
    let keyword = tokens
        .next()
        .ok_or_else(|| Error::Syntax(format!("Unrecognized keyword at start of '{}'.", line)))?;

    match keyword.to_uppercase().as_str() {
        "SELECT" => Ok(Statement::Select),
        "INSERT" => {
            let rest: Vec<&str> = tokens.collect();
            if rest.len() != 3 {
                return Err(Error::Syntax(format!("Syntax error in statement '{}'.", line)));
            }
            let id: u32 = rest[0]
                .parse()
                .map_err(|_| Error::Syntax(format!("Syntax error in statement '{}'.", line)))?;
            let row = Row::new(id, rest[1], rest[2])
                .map_err(|_| Error::Syntax(format!("Syntax error in statement '{}'.", line)))?;
            Ok(Statement::Insert(row))
        }
        _ => Err(Error::Syntax(format!(
            "Unrecognized keyword at start of '{}'.",
            line
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_select() {
        assert!(matches!(parse("select"), Ok(Statement::Select)));
        assert!(matches!(parse("SELECT"), Ok(Statement::Select)));
    }

    #[test]
    fn parses_insert() {
        match parse("insert 1 alice alice@example.com").unwrap() {
            Statement::Insert(row) => {
                assert_eq!(row.id, 1);
                assert_eq!(row.username_str(), "alice");
                assert_eq!(row.email_str(), "alice@example.com");
            }
            _ => panic!("expected Insert"),
        }
    }

    #[test]
    fn rejects_wrong_arity() {
        let line = "insert 1 alice";
        match parse(line) {
            Err(Error::Syntax(msg)) => assert_eq!(msg, format!("Syntax error in statement '{}'.", line)),
            other => panic!("expected Syntax error, got {:?}", other),
        }
        assert!(parse("insert 1 alice a@x extra").is_err());
    }

    #[test]
    fn rejects_non_numeric_id() {
        let line = "insert abc alice alice@x";
        match parse(line) {
            Err(Error::Syntax(msg)) => assert_eq!(msg, format!("Syntax error in statement '{}'.", line)),
            other => panic!("expected Syntax error, got {:?}", other),
        }
    }

    #[test]
    fn rejects_oversized_field() {
        let long_username = "x".repeat(40);
        let line = format!("insert 1 {} alice@x", long_username);
        match parse(&line) {
            Err(Error::Syntax(msg)) => assert_eq!(msg, format!("Syntax error in statement '{}'.", line)),
            other => panic!("expected Syntax error, got {:?}", other),
        }
    }

    #[test]
    fn rejects_unknown_keyword() {
        let line = "update foo";
        match parse(line) {
            Err(Error::Syntax(msg)) => assert_eq!(msg, format!("Unrecognized keyword at start of '{}'.", line)),
            other => panic!("expected Syntax error, got {:?}", other),
        }
        assert!(parse("").is_err());
    }
}
