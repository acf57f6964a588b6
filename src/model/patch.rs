use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};

use crate::model::Employee;

/// Sparse update of an employee. A present field replaces the stored value,
/// an absent (or null) field keeps it.
///
/// Fields of the read model that are never written (`id`, `companyId`,
/// `department`, `passport.id`) are accepted and dropped; any other key is
/// rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "EmployeeUpdateBody")]
pub struct EmployeeUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passport: Option<PassportUpdate>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PassportUpdateBody")]
pub struct PassportUpdate {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub passport_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct EmployeeUpdateBody {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    surname: Option<String>,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    passport: Option<PassportUpdate>,
    #[serde(default)]
    #[allow(dead_code)]
    id: Option<IgnoredAny>,
    #[serde(default)]
    #[allow(dead_code)]
    company_id: Option<IgnoredAny>,
    #[serde(default)]
    #[allow(dead_code)]
    department: Option<IgnoredAny>,
}

impl From<EmployeeUpdateBody> for EmployeeUpdate {
    fn from(body: EmployeeUpdateBody) -> Self {
        Self {
            name: body.name,
            surname: body.surname,
            phone: body.phone,
            passport: body.passport,
        }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct PassportUpdateBody {
    #[serde(rename = "type", default)]
    passport_type: Option<String>,
    #[serde(default)]
    number: Option<String>,
    #[serde(default)]
    #[allow(dead_code)]
    id: Option<IgnoredAny>,
}

impl From<PassportUpdateBody> for PassportUpdate {
    fn from(body: PassportUpdateBody) -> Self {
        Self {
            passport_type: body.passport_type,
            number: body.number,
        }
    }
}

impl PassportUpdate {
    pub fn is_empty(&self) -> bool {
        self.passport_type.is_none() && self.number.is_none()
    }
}

impl EmployeeUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.surname.is_none()
            && self.phone.is_none()
            && self.passport.as_ref().map_or(true, PassportUpdate::is_empty)
    }

    pub fn passport_type(&self) -> Option<&str> {
        self.passport
            .as_ref()
            .and_then(|p| p.passport_type.as_deref())
    }

    pub fn passport_number(&self) -> Option<&str> {
        self.passport.as_ref().and_then(|p| p.number.as_deref())
    }

    /// Merge into a fetched record. Department is never touched.
    pub fn apply_to(&self, employee: &mut Employee) {
        if let Some(name) = &self.name {
            employee.name = name.clone();
        }
        if let Some(surname) = &self.surname {
            employee.surname = Some(surname.clone());
        }
        if let Some(phone) = &self.phone {
            employee.phone = Some(phone.clone());
        }
        if let Some(passport) = employee.passport.as_mut() {
            if let Some(passport_type) = self.passport_type() {
                passport.passport_type = passport_type.to_string();
            }
            if let Some(number) = self.passport_number() {
                passport.number = number.to_string();
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    Add,
    Remove,
    Replace,
    Move,
    Copy,
    Test,
}

/// One entry of a JSON Patch style document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOperation {
    pub op: PatchOp,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
}

/// Body of a PATCH request.
///
/// An array is read as a list of operations applied in order, an object as a
/// typed `EmployeeUpdate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PatchDocument {
    Operations(Vec<PatchOperation>),
    Merge(EmployeeUpdate),
}

impl From<EmployeeUpdate> for PatchDocument {
    fn from(update: EmployeeUpdate) -> Self {
        PatchDocument::Merge(update)
    }
}
