use serde::{Deserialize, Serialize};

use crate::{PostboardError, PostboardResult};

/// A registered user. Users are read-only from the API's point of view;
/// they are created by seeding the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub username: String,
    pub email: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zipcode: Option<String>,
}

impl User {
    /// Single line address, skipping the parts that are not known.
    pub fn address(&self) -> String {
        [&self.street, &self.city, &self.state, &self.zipcode]
            .into_iter()
            .filter_map(|part| part.as_deref())
            .filter(|part| !part.is_empty())
            .collect::<Vec<&str>>()
            .join(", ")
    }

    pub(crate) fn parse_sqlite_row(record: &sqlite::Statement) -> PostboardResult<Self> {
        let user = User {
            id: record.read::<i64, _>("id").map_err(PostboardError::from)?,
            name: record.read::<String, _>("name").map_err(PostboardError::from)?,
            username: record
                .read::<String, _>("username")
                .map_err(PostboardError::from)?,
            email: record.read::<String, _>("email").map_err(PostboardError::from)?,
            phone: record.read::<String, _>("phone").map_err(PostboardError::from)?,
            street: record
                .read::<Option<String>, _>("street")
                .map_err(PostboardError::from)?,
            city: record
                .read::<Option<String>, _>("city")
                .map_err(PostboardError::from)?,
            state: record
                .read::<Option<String>, _>("state")
                .map_err(PostboardError::from)?,
            zipcode: record
                .read::<Option<String>, _>("zipcode")
                .map_err(PostboardError::from)?,
        };
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_skips_missing_parts() {
        let user = User {
            id: 1,
            name: "Leanne Graham".into(),
            username: "Bret".into(),
            email: "leanne@example.com".into(),
            phone: "555-0100".into(),
            street: Some("Kulas Light".into()),
            city: None,
            state: Some("".into()),
            zipcode: Some("92998".into()),
        };
        assert_eq!(user.address(), "Kulas Light, 92998");
    }

    #[test]
    fn optional_fields_are_omitted_from_json() {
        let user = User {
            id: 2,
            name: "Ervin Howell".into(),
            username: "Antonette".into(),
            email: "ervin@example.com".into(),
            phone: "555-0101".into(),
            street: None,
            city: None,
            state: None,
            zipcode: None,
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("street").is_none());
        let back: User = serde_json::from_value(json).unwrap();
        assert_eq!(back, user);
    }
}
