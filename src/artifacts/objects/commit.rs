//! Commit object
//!
//! A commit records a snapshot (root tree digest), ancestry (parent commit
//! digests), authorship, and a message.
//!
//! ## Format
//!
//! On disk:
//! ```text
//! commit <size>\0
//! tree <tree-sha>
//! parent <parent-sha>
//! author <name> <email> <unix-seconds> <±HHMM>
//! committer <name> <email> <unix-seconds> <±HHMM>
//!
//! <commit message>
//! ```
//!
//! The message after the blank line is verbatim bytes, never reformatted.

use crate::artifacts::objects::object::Unpackable;
use crate::artifacts::objects::object::{Object, Packable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use anyhow::Context;
use bytes::Bytes;
use std::io::{BufRead, Write};

/// Author or committer identity with timestamp and timezone.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Author {
    name: String,
    email: String,
    timestamp: chrono::DateTime<chrono::FixedOffset>,
}

impl Author {
    /// Identity stamped with the current wall-clock time.
    pub fn new(name: String, email: String) -> Self {
        Author {
            name,
            email,
            timestamp: chrono::Local::now().fixed_offset(),
        }
    }

    pub fn new_with_timestamp(
        name: String,
        email: String,
        timestamp: chrono::DateTime<chrono::FixedOffset>,
    ) -> Self {
        Author {
            name,
            email,
            timestamp,
        }
    }

    /// `Name <email@example.com>`
    pub fn display_name(&self) -> String {
        format!("{} <{}>", self.name, self.email)
    }

    /// The header-line rendering: `Name <email> <unix-seconds> <±HHMM>`.
    pub fn display(&self) -> String {
        format!(
            "{} <{}> {} {}",
            self.name,
            self.email,
            self.timestamp.timestamp(),
            self.timestamp.format("%z")
        )
    }

    /// Identity from `GRIT_AUTHOR_NAME`/`GRIT_AUTHOR_EMAIL`, optionally
    /// stamped from `GRIT_AUTHOR_DATE`.
    pub fn load_from_env() -> anyhow::Result<Self> {
        let name = std::env::var("GRIT_AUTHOR_NAME").context("GRIT_AUTHOR_NAME not set")?;
        let email = std::env::var("GRIT_AUTHOR_EMAIL").context("GRIT_AUTHOR_EMAIL not set")?;
        let timestamp = std::env::var("GRIT_AUTHOR_DATE").ok().and_then(|date_str| {
            chrono::DateTime::parse_from_rfc2822(&date_str)
                .or_else(|_| chrono::DateTime::parse_from_str(&date_str, "%Y-%m-%d %H:%M:%S %z"))
                .ok()
        });

        match timestamp {
            Some(ts) => Ok(Author::new_with_timestamp(name, email, ts)),
            None => Ok(Author::new(name, email)),
        }
    }

    /// `Mon Jan 1 12:34:56 2024 +0000`
    pub fn readable_timestamp(&self) -> String {
        self.timestamp
            .format("%a %b %-d %H:%M:%S %Y %z")
            .to_string()
    }

    pub fn timestamp(&self) -> chrono::DateTime<chrono::FixedOffset> {
        self.timestamp
    }
}

impl TryFrom<&str> for Author {
    type Error = anyhow::Error;

    /// Parse `name <email> timestamp timezone` by stripping the trailing two
    /// whitespace-separated tokens.
    ///
    /// Known limitation: the line format is ambiguous when the identity text
    /// itself ends in two numeric tokens; such an identity would be
    /// mis-split. This is preserved as-is rather than guessed around.
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let parts: Vec<&str> = value.rsplitn(3, ' ').collect();
        if parts.len() < 3 {
            return Err(anyhow::anyhow!("invalid author format: {value:?}"));
        }

        let timezone = parts[0];
        let timestamp = parts[1]
            .parse::<i64>()
            .map_err(|_| anyhow::anyhow!("invalid author timestamp: {:?}", parts[1]))?;
        let name_email_part = parts[2]; // "name <email>"

        let email_start = name_email_part
            .find('<')
            .ok_or_else(|| anyhow::anyhow!("invalid author format: missing '<'"))?;
        let email_end = name_email_part
            .find('>')
            .ok_or_else(|| anyhow::anyhow!("invalid author format: missing '>'"))?;

        let name = name_email_part[..email_start].trim().to_string();
        let email = name_email_part[email_start + 1..email_end].to_string();

        let offset = chrono::FixedOffset::east_opt(parse_timezone_offset(timezone)?)
            .ok_or_else(|| anyhow::anyhow!("invalid timezone offset: {timezone}"))?;
        let timestamp = chrono::DateTime::from_timestamp(timestamp, 0)
            .ok_or_else(|| anyhow::anyhow!("invalid timestamp: {timestamp}"))?
            .with_timezone(&offset);

        Ok(Author {
            name,
            email,
            timestamp,
        })
    }
}

/// Parse `±HHMM` into seconds east of UTC.
fn parse_timezone_offset(timezone: &str) -> anyhow::Result<i32> {
    if timezone.len() != 5 || !timezone.is_ascii() {
        return Err(anyhow::anyhow!("invalid timezone: {timezone:?}"));
    }
    let sign = match &timezone[..1] {
        "+" => 1,
        "-" => -1,
        _ => return Err(anyhow::anyhow!("invalid timezone sign: {timezone:?}")),
    };
    let hours: i32 = timezone[1..3].parse()?;
    let minutes: i32 = timezone[3..5].parse()?;

    Ok(sign * (hours * 3600 + minutes * 60))
}

/// A snapshot pointer: tree, ancestry, identity, message.
///
/// Immutable once created; `parents` makes commits a DAG.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Commit {
    /// Parent commit digests (empty for a root commit)
    parents: Vec<ObjectId>,
    /// Root tree digest
    tree_oid: ObjectId,
    author: Author,
    committer: Author,
    message: String,
}

impl Commit {
    /// Create a commit; the author identity doubles as committer.
    pub fn new(
        parents: Vec<ObjectId>,
        tree_oid: ObjectId,
        author: Author,
        message: String,
    ) -> Self {
        Commit {
            parents,
            tree_oid,
            author: author.clone(),
            committer: author,
            message,
        }
    }

    /// First line of the message, for short-form display.
    pub fn short_message(&self) -> String {
        self.message.lines().next().unwrap_or("").to_string()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn tree_oid(&self) -> &ObjectId {
        &self.tree_oid
    }

    pub fn parent(&self) -> Option<&ObjectId> {
        self.parents.first()
    }

    pub fn parents(&self) -> &[ObjectId] {
        &self.parents
    }

    pub fn author(&self) -> &Author {
        &self.author
    }

    pub fn timestamp(&self) -> chrono::DateTime<chrono::FixedOffset> {
        self.author.timestamp()
    }
}

impl Packable for Commit {
    fn serialize(&self) -> anyhow::Result<Bytes> {
        let mut object_content = vec![];

        object_content.push(format!("tree {}", self.tree_oid));
        for parent in &self.parents {
            object_content.push(format!("parent {parent}"));
        }
        object_content.push(format!("author {}", self.author.display()));
        object_content.push(format!("committer {}", self.committer.display()));
        object_content.push(String::new());
        object_content.push(self.message.to_string());

        let content_bytes = object_content.join("\n").into_bytes();

        let mut commit_bytes = Vec::new();
        let header = format!("{} {}\0", self.object_type().as_str(), content_bytes.len());
        commit_bytes.write_all(header.as_bytes())?;
        commit_bytes.write_all(&content_bytes)?;

        Ok(Bytes::from(commit_bytes))
    }
}

impl Unpackable for Commit {
    fn deserialize(reader: impl BufRead) -> anyhow::Result<Self> {
        let content = reader
            .bytes()
            .collect::<Result<Vec<u8>, std::io::Error>>()?;
        let content = String::from_utf8(content)?;

        let (headers, message) = match content.split_once("\n\n") {
            Some((headers, message)) => (headers, message.to_string()),
            None => (content.as_str(), String::new()),
        };

        let mut tree_oid = None;
        let mut parents = Vec::new();
        let mut author = None;
        let mut committer = None;

        for line in headers.lines() {
            let (token, rest) = line
                .split_once(' ')
                .with_context(|| format!("invalid commit header line: {line:?}"))?;

            match token {
                "tree" => tree_oid = Some(ObjectId::try_parse(rest.to_string())?),
                "parent" => parents.push(ObjectId::try_parse(rest.to_string())?),
                "author" => author = Some(Author::try_from(rest)?),
                "committer" => committer = Some(Author::try_from(rest)?),
                _ => anyhow::bail!("unknown commit header: {token:?}"),
            }
        }

        let tree_oid = tree_oid.context("commit object is missing its tree line")?;
        let author = author.context("commit object is missing its author line")?;
        let committer = committer.context("commit object is missing its committer line")?;

        Ok(Commit {
            parents,
            tree_oid,
            author,
            committer,
            message,
        })
    }
}

impl Object for Commit {
    fn object_type(&self) -> ObjectType {
        ObjectType::Commit
    }

    fn display(&self) -> String {
        let mut lines = vec![];

        lines.push(format!("tree {}", self.tree_oid));
        for parent in &self.parents {
            lines.push(format!("parent {parent}"));
        }
        lines.push(format!("author {}", self.author.display()));
        lines.push(format!("committer {}", self.committer.display()));
        lines.push(String::new());
        lines.push(self.message.to_string());

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::objects::object_type::ObjectType;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn oid(fill: char) -> ObjectId {
        ObjectId::try_parse(fill.to_string().repeat(40)).unwrap()
    }

    fn author() -> Author {
        Author::new_with_timestamp(
            "Ada Lovelace".to_string(),
            "ada@example.com".to_string(),
            chrono::DateTime::parse_from_rfc3339("2024-03-01T12:00:00+02:00").unwrap(),
        )
    }

    fn round_trip(commit: &Commit) -> Commit {
        let serialized = commit.serialize().unwrap();
        let mut reader = Cursor::new(serialized);
        ObjectType::parse_object_type(&mut reader).unwrap();
        Commit::deserialize(reader).unwrap()
    }

    #[test]
    fn serialize_parse_round_trip_preserves_everything() {
        let commit = Commit::new(
            vec![oid('a'), oid('b')],
            oid('c'),
            author(),
            "subject line\n\nbody with\nembedded newlines".to_string(),
        );

        let parsed = round_trip(&commit);
        assert_eq!(parsed.tree_oid(), commit.tree_oid());
        assert_eq!(parsed.parents(), commit.parents());
        assert_eq!(parsed.message(), commit.message());
        assert_eq!(parsed.author(), commit.author());
    }

    #[test]
    fn root_commit_has_no_parent_lines() {
        let commit = Commit::new(vec![], oid('c'), author(), "root".to_string());

        let serialized = commit.serialize().unwrap();
        let text = String::from_utf8(serialized.to_vec()).unwrap();
        assert!(!text.contains("parent"));

        let parsed = round_trip(&commit);
        assert!(parsed.parents().is_empty());
        assert!(parsed.parent().is_none());
    }

    #[test]
    fn author_line_renders_unix_seconds_and_offset() {
        let rendered = author().display();
        assert_eq!(rendered, "Ada Lovelace <ada@example.com> 1709287200 +0200");
    }

    #[test]
    fn author_parse_strips_trailing_timestamp_tokens() {
        let parsed = Author::try_from("Ada Lovelace <ada@example.com> 1709287200 +0200").unwrap();
        assert_eq!(parsed, author());
        assert_eq!(parsed.display_name(), "Ada Lovelace <ada@example.com>");
    }

    #[test]
    fn author_parse_handles_negative_offsets() {
        let parsed = Author::try_from("Bob <bob@example.com> 1709287200 -0730").unwrap();
        assert_eq!(parsed.display(), "Bob <bob@example.com> 1709287200 -0730");
    }

    #[test]
    fn malformed_author_lines_are_rejected() {
        assert!(Author::try_from("nonsense").is_err());
        assert!(Author::try_from("No Email 1709287200 +0200").is_err());
        assert!(Author::try_from("A <a@x> notanumber +0200").is_err());
        assert!(Author::try_from("A <a@x> 1709287200 \u{e9}030").is_err());
        assert!(Author::try_from("A <a@x> 1709287200 +02:0").is_err());
    }

    #[test]
    fn message_with_blank_lines_survives_byte_exact() {
        let message = "first\n\nsecond\n\n\nthird trailing\n".to_string();
        let commit = Commit::new(vec![oid('a')], oid('c'), author(), message.clone());
        assert_eq!(round_trip(&commit).message(), message);
    }
}
