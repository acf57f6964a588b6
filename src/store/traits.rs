use crate::model::{Employee, Id, NewDepartment, NewEmployee, NewPassport, PatchDocument};
use crate::store::StoreResult;

#[async_trait::async_trait]
pub trait PassportStore: Send + Sync {
    /// Find-or-create by (type, number). An existing row is returned untouched.
    async fn upsert_passport(&self, passport: &NewPassport) -> StoreResult<Id>;
    async fn count_passports(&self) -> StoreResult<i64>;
}

#[async_trait::async_trait]
pub trait DepartmentStore: Send + Sync {
    /// Find-or-create by name. The phone of an existing department is not updated.
    async fn upsert_department(&self, department: &NewDepartment) -> StoreResult<Id>;
    async fn count_departments(&self) -> StoreResult<i64>;
}

#[async_trait::async_trait]
pub trait EmployeeStore: Send + Sync {
    /// Upsert passport and department, then insert the employee, atomically
    async fn create_employee(&self, employee: &NewEmployee) -> StoreResult<Id>;
    /// Composite read of a single employee
    async fn get_employee(&self, id: Id) -> StoreResult<Option<Employee>>;
    /// Delete the employee row only; returns false when it did not exist
    async fn delete_employee(&self, id: Id) -> StoreResult<bool>;
    async fn find_by_company(&self, company_id: Id) -> StoreResult<Vec<Employee>>;
    async fn find_by_department(&self, department_id: Id) -> StoreResult<Vec<Employee>>;
    /// Resolve the document against the stored record and persist the merge.
    /// Returns false when the employee does not exist.
    async fn patch_employee(&self, id: Id, document: &PatchDocument) -> StoreResult<bool>;
    async fn count_employees(&self) -> StoreResult<i64>;
}

pub trait Store: PassportStore + DepartmentStore + EmployeeStore + Send + Sync {}
impl<T: PassportStore + DepartmentStore + EmployeeStore + Send + Sync> Store for T {}
