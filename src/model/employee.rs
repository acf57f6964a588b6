use serde::{Deserialize, Serialize};

pub type Id = i32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passport {
    pub id: Id,
    #[serde(rename = "type")]
    pub passport_type: String,
    pub number: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub id: Id,
    pub name: String,
    pub phone: Option<String>,
}

/// Composite read model: an employee row joined with its passport and department.
///
/// Both joins are outer joins, so either side may be missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: Id,
    pub name: String,
    pub surname: Option<String>,
    pub phone: Option<String>,
    pub company_id: Id,
    pub passport: Option<Passport>,
    pub department: Option<Department>,
}

/// Natural key of a passport is (type, number).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPassport {
    #[serde(rename = "type")]
    pub passport_type: String,
    pub number: String,
}

impl NewPassport {
    pub fn new(passport_type: impl Into<String>, number: impl Into<String>) -> Self {
        Self {
            passport_type: passport_type.into(),
            number: number.into(),
        }
    }

    pub fn matches(&self, passport: &Passport) -> bool {
        self.passport_type == passport.passport_type && self.number == passport.number
    }
}

/// Natural key of a department is its name; `phone` is only used on first insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDepartment {
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl NewDepartment {
    pub fn new(name: impl Into<String>, phone: Option<String>) -> Self {
        Self {
            name: name.into(),
            phone,
        }
    }
}

/// Request body for creating an employee. Ids supplied by the client are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEmployee {
    pub name: String,
    #[serde(default)]
    pub surname: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub company_id: Id,
    pub passport: NewPassport,
    pub department: NewDepartment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedEmployee {
    pub id: Id,
}
