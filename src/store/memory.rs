use parking_lot::Mutex;

use crate::logic::patch;
use crate::model::{
    Department, Employee, Id, NewDepartment, NewEmployee, NewPassport, Passport, PatchDocument,
};
use crate::store::traits::{DepartmentStore, EmployeeStore, PassportStore};
use crate::store::{StoreError, StoreResult};

/// Stored employee row; references sub-entities by id like the SQL schema.
#[derive(Debug, Clone)]
struct EmployeeRecord {
    id: Id,
    name: String,
    surname: Option<String>,
    phone: Option<String>,
    company_id: Id,
    passport_id: Option<Id>,
    department_id: Option<Id>,
}

#[derive(Debug)]
struct Tables {
    passports: Vec<Passport>,
    departments: Vec<Department>,
    employees: Vec<EmployeeRecord>,
    next_passport_id: Id,
    next_department_id: Id,
    next_employee_id: Id,
}

impl Default for Tables {
    fn default() -> Self {
        Self {
            passports: Vec::new(),
            departments: Vec::new(),
            employees: Vec::new(),
            next_passport_id: 1,
            next_department_id: 1,
            next_employee_id: 1,
        }
    }
}

impl Tables {
    fn upsert_passport(&mut self, passport: &NewPassport) -> Id {
        if let Some(existing) = self.passports.iter().find(|p| passport.matches(p)) {
            return existing.id;
        }

        let id = self.next_passport_id;
        self.next_passport_id += 1;
        self.passports.push(Passport {
            id,
            passport_type: passport.passport_type.clone(),
            number: passport.number.clone(),
        });
        log::info!(
            "Created passport {} ({} {})",
            id,
            passport.passport_type,
            passport.number
        );
        id
    }

    fn upsert_department(&mut self, department: &NewDepartment) -> Id {
        if let Some(existing) = self.departments.iter().find(|d| d.name == department.name) {
            return existing.id;
        }

        let id = self.next_department_id;
        self.next_department_id += 1;
        self.departments.push(Department {
            id,
            name: department.name.clone(),
            phone: department.phone.clone(),
        });
        log::info!("Created department {} ({})", id, department.name);
        id
    }

    fn compose(&self, record: &EmployeeRecord) -> Employee {
        let passport = record
            .passport_id
            .and_then(|id| self.passports.iter().find(|p| p.id == id))
            .cloned();
        let department = record
            .department_id
            .and_then(|id| self.departments.iter().find(|d| d.id == id))
            .cloned();

        Employee {
            id: record.id,
            name: record.name.clone(),
            surname: record.surname.clone(),
            phone: record.phone.clone(),
            company_id: record.company_id,
            passport,
            department,
        }
    }

    fn select(&self, predicate: impl Fn(&EmployeeRecord) -> bool) -> Vec<Employee> {
        self.employees
            .iter()
            .filter(|record| predicate(*record))
            .map(|record| self.compose(record))
            .collect()
    }
}

/// In-process store. Every operation runs under one lock, so multi-step
/// writes are atomic with respect to other callers.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl PassportStore for MemoryStore {
    async fn upsert_passport(&self, passport: &NewPassport) -> StoreResult<Id> {
        Ok(self.tables.lock().upsert_passport(passport))
    }

    async fn count_passports(&self) -> StoreResult<i64> {
        Ok(self.tables.lock().passports.len() as i64)
    }
}

#[async_trait::async_trait]
impl DepartmentStore for MemoryStore {
    async fn upsert_department(&self, department: &NewDepartment) -> StoreResult<Id> {
        Ok(self.tables.lock().upsert_department(department))
    }

    async fn count_departments(&self) -> StoreResult<i64> {
        Ok(self.tables.lock().departments.len() as i64)
    }
}

#[async_trait::async_trait]
impl EmployeeStore for MemoryStore {
    async fn create_employee(&self, employee: &NewEmployee) -> StoreResult<Id> {
        let mut tables = self.tables.lock();

        let passport_id = tables.upsert_passport(&employee.passport);
        let department_id = tables.upsert_department(&employee.department);

        let id = tables.next_employee_id;
        tables.next_employee_id += 1;
        tables.employees.push(EmployeeRecord {
            id,
            name: employee.name.clone(),
            surname: employee.surname.clone(),
            phone: employee.phone.clone(),
            company_id: employee.company_id,
            passport_id: Some(passport_id),
            department_id: Some(department_id),
        });

        log::info!(
            "Created employee {} (company {}, passport {}, department {})",
            id,
            employee.company_id,
            passport_id,
            department_id
        );
        Ok(id)
    }

    async fn get_employee(&self, id: Id) -> StoreResult<Option<Employee>> {
        let tables = self.tables.lock();
        Ok(tables
            .employees
            .iter()
            .find(|record| record.id == id)
            .map(|record| tables.compose(record)))
    }

    async fn delete_employee(&self, id: Id) -> StoreResult<bool> {
        let mut tables = self.tables.lock();
        let before = tables.employees.len();
        tables.employees.retain(|record| record.id != id);
        Ok(tables.employees.len() < before)
    }

    async fn find_by_company(&self, company_id: Id) -> StoreResult<Vec<Employee>> {
        Ok(self
            .tables
            .lock()
            .select(|record| record.company_id == company_id))
    }

    async fn find_by_department(&self, department_id: Id) -> StoreResult<Vec<Employee>> {
        Ok(self
            .tables
            .lock()
            .select(|record| record.department_id == Some(department_id)))
    }

    async fn patch_employee(&self, id: Id, document: &PatchDocument) -> StoreResult<bool> {
        let mut tables = self.tables.lock();

        let Some(index) = tables.employees.iter().position(|record| record.id == id) else {
            return Ok(false);
        };
        let mut employee = tables.compose(&tables.employees[index]);

        let update = patch::resolve(document, &employee)?;
        if update.is_empty() {
            return Ok(true);
        }
        update.apply_to(&mut employee);

        if let Some(patched) = &employee.passport {
            let collides = tables.passports.iter().any(|p| {
                p.id != patched.id
                    && p.passport_type == patched.passport_type
                    && p.number == patched.number
            });
            if collides {
                return Err(StoreError::Conflict(
                    "A passport with this type and number already exists".to_string(),
                ));
            }
        }

        let record = &mut tables.employees[index];
        record.name = employee.name;
        record.surname = employee.surname;
        record.phone = employee.phone;

        if let Some(patched) = employee.passport {
            if let Some(stored) = tables.passports.iter_mut().find(|p| p.id == patched.id) {
                *stored = patched;
            }
        }
        Ok(true)
    }

    async fn count_employees(&self) -> StoreResult<i64> {
        Ok(self.tables.lock().employees.len() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EmployeeUpdate, PassportUpdate};

    fn new_employee(
        name: &str,
        company_id: Id,
        passport: (&str, &str),
        department: &str,
    ) -> NewEmployee {
        NewEmployee {
            name: name.to_string(),
            surname: None,
            phone: None,
            company_id,
            passport: NewPassport::new(passport.0, passport.1),
            department: NewDepartment::new(department, Some("555".to_string())),
        }
    }

    #[tokio::test]
    async fn test_upsert_passport_is_idempotent() {
        let store = MemoryStore::new();
        let key = NewPassport::new("P", "123");

        let first = store.upsert_passport(&key).await.unwrap();
        let second = store.upsert_passport(&key).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.count_passports().await.unwrap(), 1);

        let other = store.upsert_passport(&NewPassport::new("P", "124")).await.unwrap();
        assert_ne!(first, other);
        assert_eq!(store.count_passports().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_upsert_department_keeps_stored_phone() {
        let store = MemoryStore::new();
        let first = store
            .upsert_department(&NewDepartment::new("Eng", Some("555".to_string())))
            .await
            .unwrap();
        let second = store
            .upsert_department(&NewDepartment::new("Eng", Some("999".to_string())))
            .await
            .unwrap();
        assert_eq!(first, second);

        let mut carl = new_employee("Carl", 1, ("P", "1"), "Eng");
        carl.department.phone = Some("999".to_string());
        let id = store.create_employee(&carl).await.unwrap();
        let stored = store.get_employee(id).await.unwrap().unwrap().department;
        assert_eq!(stored.map(|d| (d.id, d.phone)), Some((first, Some("555".to_string()))));
    }

    #[tokio::test]
    async fn test_create_reuses_sub_entities() {
        let store = MemoryStore::new();

        let bob = store
            .create_employee(&new_employee("Bob", 1, ("P", "123"), "Eng"))
            .await
            .unwrap();
        let carl = store
            .create_employee(&new_employee("Carl", 1, ("P", "123"), "Eng"))
            .await
            .unwrap();

        assert_eq!(bob, 1);
        assert_eq!(carl, 2);
        assert_eq!(store.count_passports().await.unwrap(), 1);
        assert_eq!(store.count_departments().await.unwrap(), 1);

        let bob = store.get_employee(bob).await.unwrap().unwrap();
        let carl = store.get_employee(carl).await.unwrap().unwrap();
        assert_eq!(bob.passport, carl.passport);
        assert_eq!(bob.department, carl.department);
    }

    #[tokio::test]
    async fn test_delete_leaves_sub_entities() {
        let store = MemoryStore::new();
        let id = store
            .create_employee(&new_employee("Bob", 1, ("P", "123"), "Eng"))
            .await
            .unwrap();

        assert!(store.delete_employee(id).await.unwrap());
        assert!(!store.delete_employee(id).await.unwrap());
        assert_eq!(store.count_employees().await.unwrap(), 0);
        assert_eq!(store.count_passports().await.unwrap(), 1);
        assert_eq!(store.count_departments().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_find_by_company_and_department() {
        let store = MemoryStore::new();
        store
            .create_employee(&new_employee("Bob", 1, ("P", "1"), "Eng"))
            .await
            .unwrap();
        store
            .create_employee(&new_employee("Carl", 2, ("P", "2"), "Eng"))
            .await
            .unwrap();
        store
            .create_employee(&new_employee("Dana", 1, ("P", "3"), "Ops"))
            .await
            .unwrap();

        let company = store.find_by_company(1).await.unwrap();
        let names: Vec<&str> = company.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Bob", "Dana"]);

        let eng = company[0].department.as_ref().unwrap().id;
        let department = store.find_by_department(eng).await.unwrap();
        assert_eq!(department.len(), 2);
        assert!(department
            .iter()
            .all(|e| e.department.as_ref().map(|d| d.name.as_str()) == Some("Eng")));

        assert!(store.find_by_company(99).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_patch_merges_and_skips_department() {
        let store = MemoryStore::new();
        let id = store
            .create_employee(&new_employee("Alice", 1, ("P", "123"), "Eng"))
            .await
            .unwrap();
        let before = store.get_employee(id).await.unwrap().unwrap();

        let update = EmployeeUpdate {
            surname: Some("Smith".to_string()),
            passport: Some(PassportUpdate {
                passport_type: None,
                number: Some("456".to_string()),
            }),
            ..Default::default()
        };
        assert!(store.patch_employee(id, &update.into()).await.unwrap());

        let after = store.get_employee(id).await.unwrap().unwrap();
        assert_eq!(after.name, "Alice");
        assert_eq!(after.surname.as_deref(), Some("Smith"));
        assert_eq!(after.passport.as_ref().unwrap().passport_type, "P");
        assert_eq!(after.passport.as_ref().unwrap().number, "456");
        assert_eq!(after.department, before.department);
    }

    #[tokio::test]
    async fn test_patch_missing_employee() {
        let store = MemoryStore::new();
        let patched = store
            .patch_employee(7, &EmployeeUpdate::default().into())
            .await
            .unwrap();
        assert!(!patched);
    }
}
