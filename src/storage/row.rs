//! # Row layout
//!
//! A row is a fixed-schema record `{id: u32, username: bytes[32], email:
//! bytes[255]}`, serialized in that field order as 291 little-endian bytes.
//! Strings are NUL-padded in their fixed slot; the trailing NUL acts as the
//! terminator when printing or comparing.
use crate::err;
use crate::errors::Error;

pub const USERNAME_SIZE: usize = 32;
pub const EMAIL_SIZE: usize = 255;

const ID_SIZE: usize = std::mem::size_of::<u32>();
const ID_OFFSET: usize = 0;
const USERNAME_OFFSET: usize = ID_OFFSET + ID_SIZE;
const EMAIL_OFFSET: usize = USERNAME_OFFSET + USERNAME_SIZE;

/// Total size of a serialized row, in bytes.
pub const ROW_SIZE: usize = ID_SIZE + USERNAME_SIZE + EMAIL_SIZE;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub id: u32,
    pub username: [u8; USERNAME_SIZE],
    pub email: [u8; EMAIL_SIZE],
}

impl Row {
    /// Builds a row from string slices, NUL-padding into the fixed slots.
    ///
    /// Returns `Error::Syntax` if either string (including its terminator)
    /// doesn't fit its slot, rather than silently truncating it.
    pub fn new(id: u32, username: &str, email: &str) -> Result<Self, Error> {
        Ok(Row {
            id,
            username: to_fixed_bytes(username, "username")?,
            email: to_fixed_bytes(email, "email")?,
        })
    }

    pub fn username_str(&self) -> &str {
        trimmed_str(&self.username)
    }

    pub fn email_str(&self) -> &str {
        trimmed_str(&self.email)
    }

    /// Copies this row's fields into `dst`, which must be exactly `ROW_SIZE`
    /// bytes. This is the only place row bytes are produced.
    pub fn serialize(&self, dst: &mut [u8]) {
        debug_assert_eq!(dst.len(), ROW_SIZE);
        dst[ID_OFFSET..ID_OFFSET + ID_SIZE].copy_from_slice(&self.id.to_le_bytes());
        dst[USERNAME_OFFSET..USERNAME_OFFSET + USERNAME_SIZE].copy_from_slice(&self.username);
        dst[EMAIL_OFFSET..EMAIL_OFFSET + EMAIL_SIZE].copy_from_slice(&self.email);
    }

    /// Reconstructs a row from `src`, which must be exactly `ROW_SIZE` bytes.
    pub fn deserialize(src: &[u8]) -> Self {
        debug_assert_eq!(src.len(), ROW_SIZE);
        let mut id_bytes = [0u8; ID_SIZE];
        id_bytes.copy_from_slice(&src[ID_OFFSET..ID_OFFSET + ID_SIZE]);
        let mut username = [0u8; USERNAME_SIZE];
        username.copy_from_slice(&src[USERNAME_OFFSET..USERNAME_OFFSET + USERNAME_SIZE]);
        let mut email = [0u8; EMAIL_SIZE];
        email.copy_from_slice(&src[EMAIL_OFFSET..EMAIL_OFFSET + EMAIL_SIZE]);
        Row {
            id: u32::from_le_bytes(id_bytes),
            username,
            email,
        }
    }
}

impl std::fmt::Display for Row {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.id, self.username_str(), self.email_str())
    }
}

fn to_fixed_bytes<const N: usize>(input: &str, field: &str) -> Result<[u8; N], Error> {
    let bytes = input.as_bytes();
    // Reserve room for the NUL terminator, matching the fixed-slot semantics
    // the original's scanf-based parser relied on without enforcing.
    if bytes.len() >= N {
        return Err(err!(
            Syntax,
            "{} too long: {} bytes (max {})",
            field,
            bytes.len(),
            N - 1
        ));
    }
    let mut buf = [0u8; N];
    buf[..bytes.len()].copy_from_slice(bytes);
    Ok(buf)
}

fn trimmed_str(buf: &[u8]) -> &str {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    std::str::from_utf8(&buf[..end]).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_bytes() {
        let row = Row::new(7, "alice", "alice@example.com").unwrap();
        let mut buf = [0u8; ROW_SIZE];
        row.serialize(&mut buf);
        let back = Row::deserialize(&buf);
        assert_eq!(row, back);
        assert_eq!(back.username_str(), "alice");
        assert_eq!(back.email_str(), "alice@example.com");
    }

    #[test]
    fn rejects_oversized_username() {
        let long = "x".repeat(USERNAME_SIZE);
        match Row::new(1, &long, "a@b.com") {
            Err(Error::Syntax(msg)) => assert_eq!(
                msg,
                format!("username too long: {} bytes (max {})", USERNAME_SIZE, USERNAME_SIZE - 1)
            ),
            other => panic!("expected Syntax error, got {:?}", other),
        }
    }

    #[test]
    fn rejects_oversized_email() {
        let long = "x".repeat(EMAIL_SIZE);
        match Row::new(1, "bob", &long) {
            Err(Error::Syntax(msg)) => assert_eq!(
                msg,
                format!("email too long: {} bytes (max {})", EMAIL_SIZE, EMAIL_SIZE - 1)
            ),
            other => panic!("expected Syntax error, got {:?}", other),
        }
    }

    #[test]
    fn accepts_max_length_fields() {
        let username = "x".repeat(USERNAME_SIZE - 1);
        let email = "y".repeat(EMAIL_SIZE - 1);
        let row = Row::new(1, &username, &email).unwrap();
        assert_eq!(row.username_str(), username);
        assert_eq!(row.email_str(), email);
    }
}
