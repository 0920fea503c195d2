//! Group membership query templates
//!
//! Group filters reference the `{{.Username}}` and `{{.UserDN}}` context
//! variables. The filter is parsed at configuration-write time so a bad
//! template fails the write instead of every subsequent login.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unterminated action starting at byte {0}")]
    Unterminated(usize),
    #[error("empty action at byte {0}")]
    EmptyAction(usize),
    #[error("unknown template variable {0:?}")]
    UnknownVariable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Literal(String),
    Username,
    UserDn,
}

/// A parsed group filter template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupFilterTemplate {
    parts: Vec<Part>,
}

impl GroupFilterTemplate {
    /// Parse `input`, accepting literal text interleaved with
    /// `{{.Username}}` and `{{.UserDN}}` actions.
    pub fn parse(input: &str) -> Result<Self, TemplateError> {
        let mut parts = Vec::new();
        let mut rest = input;
        let mut offset = 0;

        while let Some(start) = rest.find("{{") {
            if start > 0 {
                parts.push(Part::Literal(rest[..start].to_string()));
            }

            let after = &rest[start + 2..];
            let Some(end) = after.find("}}") else {
                return Err(TemplateError::Unterminated(offset + start));
            };

            let action = after[..end].trim();
            let part = match action {
                "" => return Err(TemplateError::EmptyAction(offset + start)),
                ".Username" => Part::Username,
                ".UserDN" => Part::UserDn,
                other => return Err(TemplateError::UnknownVariable(other.to_string())),
            };
            parts.push(part);

            let consumed = start + 2 + end + 2;
            offset += consumed;
            rest = &rest[consumed..];
        }

        if !rest.is_empty() {
            parts.push(Part::Literal(rest.to_string()));
        }

        Ok(Self { parts })
    }

    /// Substitute the context variables into the filter.
    pub fn render(&self, username: &str, user_dn: &str) -> String {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                Part::Literal(text) => out.push_str(text),
                Part::Username => out.push_str(username),
                Part::UserDn => out.push_str(user_dn),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_only_filter_parses() {
        let template = GroupFilterTemplate::parse("(objectClass=group)").unwrap();
        assert_eq!(template.render("alice", "cn=alice"), "(objectClass=group)");
    }

    #[test]
    fn default_filter_parses_and_renders() {
        let input = "(|(memberUid={{.Username}})(member={{.UserDN}})(uniqueMember={{.UserDN}}))";
        let template = GroupFilterTemplate::parse(input).unwrap();
        assert_eq!(
            template.render("alice", "cn=alice,ou=People,dc=example,dc=org"),
            "(|(memberUid=alice)(member=cn=alice,ou=People,dc=example,dc=org)\
             (uniqueMember=cn=alice,ou=People,dc=example,dc=org))"
        );
    }

    #[test]
    fn whitespace_inside_actions_is_tolerated() {
        let template = GroupFilterTemplate::parse("(member={{ .UserDN }})").unwrap();
        assert_eq!(template.render("x", "cn=x"), "(member=cn=x)");
    }

    #[test]
    fn unterminated_action_fails() {
        let err = GroupFilterTemplate::parse("(member={{.UserDN)").unwrap_err();
        assert_eq!(err, TemplateError::Unterminated(8));
    }

    #[test]
    fn empty_action_fails() {
        let err = GroupFilterTemplate::parse("(member={{}})").unwrap_err();
        assert_eq!(err, TemplateError::EmptyAction(8));
    }

    #[test]
    fn unknown_variable_fails() {
        let err = GroupFilterTemplate::parse("(member={{.Group}})").unwrap_err();
        assert_eq!(err, TemplateError::UnknownVariable(".Group".to_string()));
    }

    #[test]
    fn second_action_error_reports_absolute_offset() {
        let err = GroupFilterTemplate::parse("{{.Username}}x{{.UserDN").unwrap_err();
        assert_eq!(err, TemplateError::Unterminated(14));
    }
}
