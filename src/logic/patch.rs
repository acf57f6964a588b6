use serde_json::Value;
use thiserror::Error;

use crate::model::{
    Employee, EmployeeUpdate, PassportUpdate, PatchDocument, PatchOp, PatchOperation,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchError {
    #[error("The target location '{0}' was not found on Employee")]
    UnknownPath(String),
    #[error("Operation '{op:?}' is not supported for path '{path}'")]
    UnsupportedOperation { op: PatchOp, path: String },
    #[error("Operation '{op:?}' on path '{path}' requires a value")]
    MissingValue { op: PatchOp, path: String },
    #[error("Invalid value for path '{path}': {reason}")]
    InvalidValue { path: String, reason: String },
    #[error("Test operation failed for path '{0}'")]
    TestFailed(String),
}

/// Locations of the Employee shape that a patch may address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PatchTarget {
    Name,
    Surname,
    Phone,
    Passport,
    PassportType,
    PassportNumber,
    /// Exists on the read model but is never written back.
    ReadOnly,
}

impl PatchTarget {
    fn parse(path: &str) -> Result<Self, PatchError> {
        let Some(pointer) = path.strip_prefix('/') else {
            return Err(PatchError::UnknownPath(path.to_string()));
        };
        let segments: Vec<String> = pointer
            .split('/')
            .map(|s| s.replace("~1", "/").replace("~0", "~").to_ascii_lowercase())
            .collect();
        let segments: Vec<&str> = segments.iter().map(String::as_str).collect();

        let target = match segments.as_slice() {
            ["name"] => PatchTarget::Name,
            ["surname"] => PatchTarget::Surname,
            ["phone"] => PatchTarget::Phone,
            ["passport"] => PatchTarget::Passport,
            ["passport", "type"] => PatchTarget::PassportType,
            ["passport", "number"] => PatchTarget::PassportNumber,
            ["id"] | ["companyid"] | ["passport", "id"] | ["department"] => PatchTarget::ReadOnly,
            ["department", "id" | "name" | "phone"] => PatchTarget::ReadOnly,
            _ => return Err(PatchError::UnknownPath(path.to_string())),
        };
        Ok(target)
    }
}

/// Resolve a patch document against the fetched record into a typed update.
///
/// Operations are applied in order. `remove` clears a pending value, which
/// leaves the stored value unchanged once persisted; a later `test` on the
/// same path sees null.
pub fn resolve(
    document: &PatchDocument,
    current: &Employee,
) -> Result<EmployeeUpdate, PatchError> {
    match document {
        PatchDocument::Merge(update) => Ok(update.clone()),
        PatchDocument::Operations(operations) => {
            let mut staged = Staged::new(current);
            for operation in operations {
                staged.apply(operation)?;
            }
            Ok(staged.update)
        }
    }
}

/// Working copy of an operations document.
struct Staged<'a> {
    current: &'a Employee,
    update: EmployeeUpdate,
    /// String targets explicitly set to null so far.
    cleared: Vec<PatchTarget>,
}

impl<'a> Staged<'a> {
    fn new(current: &'a Employee) -> Self {
        Self {
            current,
            update: EmployeeUpdate::default(),
            cleared: Vec::new(),
        }
    }

    fn apply(&mut self, operation: &PatchOperation) -> Result<(), PatchError> {
        let target = PatchTarget::parse(&operation.path)?;

        match operation.op {
            PatchOp::Add | PatchOp::Replace => {
                let value = operation.value.as_ref().ok_or_else(|| PatchError::MissingValue {
                    op: operation.op,
                    path: operation.path.clone(),
                })?;
                self.set(target, value, &operation.path)
            }
            PatchOp::Remove => self.set(target, &Value::Null, &operation.path),
            PatchOp::Test => {
                let value = operation.value.as_ref().unwrap_or(&Value::Null);
                let expected = string_value(value, &operation.path)?;
                let actual = self.effective_value(target).ok_or_else(|| {
                    PatchError::UnsupportedOperation {
                        op: operation.op,
                        path: operation.path.clone(),
                    }
                })?;
                if actual != expected {
                    return Err(PatchError::TestFailed(operation.path.clone()));
                }
                Ok(())
            }
            PatchOp::Move | PatchOp::Copy => Err(PatchError::UnsupportedOperation {
                op: operation.op,
                path: operation.path.clone(),
            }),
        }
    }

    fn set(&mut self, target: PatchTarget, value: &Value, path: &str) -> Result<(), PatchError> {
        match target {
            PatchTarget::Name => {
                self.update.name = string_value(value, path)?;
                self.track(target, self.update.name.is_none());
            }
            PatchTarget::Surname => {
                self.update.surname = string_value(value, path)?;
                self.track(target, self.update.surname.is_none());
            }
            PatchTarget::Phone => {
                self.update.phone = string_value(value, path)?;
                self.track(target, self.update.phone.is_none());
            }
            PatchTarget::PassportType => {
                let passport_type = string_value(value, path)?;
                self.track(target, passport_type.is_none());
                self.update
                    .passport
                    .get_or_insert_with(PassportUpdate::default)
                    .passport_type = passport_type;
            }
            PatchTarget::PassportNumber => {
                let number = string_value(value, path)?;
                self.track(target, number.is_none());
                self.update
                    .passport
                    .get_or_insert_with(PassportUpdate::default)
                    .number = number;
            }
            PatchTarget::Passport => {
                let passport = if value.is_null() {
                    None
                } else {
                    let passport: PassportUpdate = serde_json::from_value(value.clone())
                        .map_err(|e| PatchError::InvalidValue {
                            path: path.to_string(),
                            reason: e.to_string(),
                        })?;
                    Some(passport)
                };
                let (type_cleared, number_cleared) = match &passport {
                    Some(p) => (p.passport_type.is_none(), p.number.is_none()),
                    None => (true, true),
                };
                self.track(PatchTarget::PassportType, type_cleared);
                self.track(PatchTarget::PassportNumber, number_cleared);
                self.update.passport = passport;
            }
            PatchTarget::ReadOnly => {}
        }
        Ok(())
    }

    fn track(&mut self, target: PatchTarget, cleared: bool) {
        self.cleared.retain(|t| *t != target);
        if cleared {
            self.cleared.push(target);
        }
    }

    /// Value of a string field as seen after the operations applied so far.
    /// Returns `None` for targets that cannot be compared.
    fn effective_value(&self, target: PatchTarget) -> Option<Option<String>> {
        if self.cleared.contains(&target) {
            return Some(None);
        }

        let update = &self.update;
        let current = self.current;
        let value = match target {
            PatchTarget::Name => Some(update.name.clone().unwrap_or_else(|| current.name.clone())),
            PatchTarget::Surname => update.surname.clone().or_else(|| current.surname.clone()),
            PatchTarget::Phone => update.phone.clone().or_else(|| current.phone.clone()),
            PatchTarget::PassportType => update
                .passport_type()
                .map(str::to_string)
                .or_else(|| current.passport.as_ref().map(|p| p.passport_type.clone())),
            PatchTarget::PassportNumber => update
                .passport_number()
                .map(str::to_string)
                .or_else(|| current.passport.as_ref().map(|p| p.number.clone())),
            PatchTarget::Passport | PatchTarget::ReadOnly => return None,
        };
        Some(value)
    }
}

fn string_value(value: &Value, path: &str) -> Result<Option<String>, PatchError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        other => Err(PatchError::InvalidValue {
            path: path.to_string(),
            reason: format!("expected a string, got {}", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Department, Passport};
    use serde_json::json;

    fn alice() -> Employee {
        Employee {
            id: 1,
            name: "Alice".to_string(),
            surname: Some("Jones".to_string()),
            phone: None,
            company_id: 10,
            passport: Some(Passport {
                id: 2,
                passport_type: "P".to_string(),
                number: "123".to_string(),
            }),
            department: Some(Department {
                id: 3,
                name: "Eng".to_string(),
                phone: Some("555".to_string()),
            }),
        }
    }

    fn ops(value: serde_json::Value) -> PatchDocument {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_replace_single_field() {
        let document = ops(json!([{"op": "replace", "path": "/surname", "value": "Smith"}]));
        let update = resolve(&document, &alice()).unwrap();
        assert_eq!(
            update,
            EmployeeUpdate {
                surname: Some("Smith".to_string()),
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_paths_are_case_insensitive() {
        let document = ops(json!([
            {"op": "replace", "path": "/Name", "value": "Alicia"},
            {"op": "add", "path": "/Passport/Number", "value": "999"}
        ]));
        let update = resolve(&document, &alice()).unwrap();
        assert_eq!(update.name.as_deref(), Some("Alicia"));
        assert_eq!(update.passport_number(), Some("999"));
        assert_eq!(update.passport_type(), None);
    }

    #[test]
    fn test_operations_apply_in_order() {
        let document = ops(json!([
            {"op": "replace", "path": "/phone", "value": "1"},
            {"op": "replace", "path": "/phone", "value": "2"},
            {"op": "replace", "path": "/name", "value": "Bob"},
            {"op": "remove", "path": "/name"}
        ]));
        let update = resolve(&document, &alice()).unwrap();
        assert_eq!(update.phone.as_deref(), Some("2"));
        assert_eq!(update.name, None);
    }

    #[test]
    fn test_department_and_ids_are_read_only() {
        let document = ops(json!([
            {"op": "replace", "path": "/department/name", "value": "Sales"},
            {"op": "replace", "path": "/companyId", "value": 42},
            {"op": "replace", "path": "/id", "value": 7}
        ]));
        let update = resolve(&document, &alice()).unwrap();
        assert!(update.is_empty());
    }

    #[test]
    fn test_whole_passport_replace() {
        let document = ops(json!([
            {"op": "replace", "path": "/passport", "value": {"type": "ID", "number": "42"}}
        ]));
        let update = resolve(&document, &alice()).unwrap();
        assert_eq!(update.passport_type(), Some("ID"));
        assert_eq!(update.passport_number(), Some("42"));
    }

    #[test]
    fn test_unknown_path_is_rejected() {
        let document = ops(json!([{"op": "replace", "path": "/salary", "value": "1"}]));
        assert_eq!(
            resolve(&document, &alice()),
            Err(PatchError::UnknownPath("/salary".to_string()))
        );

        let document = ops(json!([{"op": "replace", "path": "name", "value": "x"}]));
        assert!(matches!(
            resolve(&document, &alice()),
            Err(PatchError::UnknownPath(_))
        ));
    }

    #[test]
    fn test_non_string_value_is_rejected() {
        let document = ops(json!([{"op": "replace", "path": "/name", "value": 5}]));
        assert!(matches!(
            resolve(&document, &alice()),
            Err(PatchError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_missing_value_and_unsupported_ops() {
        let document = ops(json!([{"op": "replace", "path": "/name"}]));
        assert!(matches!(
            resolve(&document, &alice()),
            Err(PatchError::MissingValue { .. })
        ));

        let document = ops(json!([{"op": "move", "from": "/name", "path": "/surname"}]));
        assert!(matches!(
            resolve(&document, &alice()),
            Err(PatchError::UnsupportedOperation { .. })
        ));
    }

    #[test]
    fn test_test_operation_sees_pending_and_stored_values() {
        let document = ops(json!([
            {"op": "test", "path": "/name", "value": "Alice"},
            {"op": "replace", "path": "/name", "value": "Bob"},
            {"op": "test", "path": "/name", "value": "Bob"},
            {"op": "test", "path": "/phone", "value": null},
            {"op": "test", "path": "/passport/number", "value": "123"}
        ]));
        let update = resolve(&document, &alice()).unwrap();
        assert_eq!(update.name.as_deref(), Some("Bob"));

        let document = ops(json!([{"op": "test", "path": "/surname", "value": "Smith"}]));
        assert_eq!(
            resolve(&document, &alice()),
            Err(PatchError::TestFailed("/surname".to_string()))
        );
    }

    #[test]
    fn test_test_after_remove_sees_null() {
        let document = ops(json!([
            {"op": "remove", "path": "/surname"},
            {"op": "test", "path": "/surname", "value": null},
            {"op": "replace", "path": "/passport/number", "value": null},
            {"op": "test", "path": "/passport/number", "value": null}
        ]));
        let update = resolve(&document, &alice()).unwrap();
        assert!(update.is_empty());

        let document = ops(json!([
            {"op": "remove", "path": "/surname"},
            {"op": "test", "path": "/surname", "value": "Jones"}
        ]));
        assert_eq!(
            resolve(&document, &alice()),
            Err(PatchError::TestFailed("/surname".to_string()))
        );

        let document = ops(json!([
            {"op": "remove", "path": "/phone"},
            {"op": "replace", "path": "/phone", "value": "9"},
            {"op": "test", "path": "/phone", "value": "9"}
        ]));
        assert_eq!(resolve(&document, &alice()).unwrap().phone.as_deref(), Some("9"));
    }

    #[test]
    fn test_merge_form_passes_through() {
        let update = EmployeeUpdate {
            phone: Some("777".to_string()),
            ..Default::default()
        };
        let resolved = resolve(&PatchDocument::from(update.clone()), &alice()).unwrap();
        assert_eq!(resolved, update);
    }
}
