use sqlx::{postgres::PgPoolOptions, PgConnection, PgPool};

use crate::logic::patch;
use crate::model::{
    Department, Employee, Id, NewDepartment, NewEmployee, NewPassport, Passport, PatchDocument,
};
use crate::store::traits::{DepartmentStore, EmployeeStore, PassportStore};
use crate::store::{StoreError, StoreResult};

const COMPOSITE_SELECT: &str = r#"
    SELECT
        e.id, e.name, e.surname, e.phone, e.company_id,
        p.id AS passport_id, p."type" AS passport_type, p.number AS passport_number,
        d.id AS department_id, d.name AS department_name, d.phone AS department_phone
    FROM employees e
    LEFT JOIN passports p ON e.passport_id = p.id
    LEFT JOIN departments d ON e.department_id = d.id
"#;

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

/// Flat row of the composite employee query.
#[derive(Debug, sqlx::FromRow)]
struct EmployeeRow {
    id: Id,
    name: String,
    surname: Option<String>,
    phone: Option<String>,
    company_id: Id,
    passport_id: Option<Id>,
    passport_type: Option<String>,
    passport_number: Option<String>,
    department_id: Option<Id>,
    department_name: Option<String>,
    department_phone: Option<String>,
}

impl From<EmployeeRow> for Employee {
    fn from(row: EmployeeRow) -> Self {
        let passport = match (row.passport_id, row.passport_type, row.passport_number) {
            (Some(id), Some(passport_type), Some(number)) => Some(Passport {
                id,
                passport_type,
                number,
            }),
            _ => None,
        };
        let department = match (row.department_id, row.department_name) {
            (Some(id), Some(name)) => Some(Department {
                id,
                name,
                phone: row.department_phone,
            }),
            _ => None,
        };

        Employee {
            id: row.id,
            name: row.name,
            surname: row.surname,
            phone: row.phone,
            company_id: row.company_id,
            passport,
            department,
        }
    }
}

impl PostgresStore {
    /// Create a new PostgreSQL store with the given database URL
    pub async fn new(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Run the embedded migrations in `./migrations`
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn find_where(&self, column: &str, value: Id) -> StoreResult<Vec<Employee>> {
        let sql = format!("{} WHERE e.{} = $1 ORDER BY e.id", COMPOSITE_SELECT, column);
        let rows: Vec<EmployeeRow> = sqlx::query_as(&sql)
            .bind(value)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Employee::from).collect())
    }
}

// The insert races are settled by the unique constraints: a loser of
// ON CONFLICT DO NOTHING gets no row back and re-reads the winner's id.
async fn upsert_passport_in(conn: &mut PgConnection, passport: &NewPassport) -> StoreResult<Id> {
    let select = r#"SELECT id FROM passports WHERE "type" = $1 AND number = $2"#;

    let existing: Option<Id> = sqlx::query_scalar(select)
        .bind(&passport.passport_type)
        .bind(&passport.number)
        .fetch_optional(&mut *conn)
        .await?;
    if let Some(id) = existing {
        return Ok(id);
    }

    let inserted: Option<Id> = sqlx::query_scalar(
        r#"
        INSERT INTO passports ("type", number)
        VALUES ($1, $2)
        ON CONFLICT ("type", number) DO NOTHING
        RETURNING id
        "#,
    )
    .bind(&passport.passport_type)
    .bind(&passport.number)
    .fetch_optional(&mut *conn)
    .await?;
    if let Some(id) = inserted {
        log::info!(
            "Created passport {} ({} {})",
            id,
            passport.passport_type,
            passport.number
        );
        return Ok(id);
    }

    let id = sqlx::query_scalar(select)
        .bind(&passport.passport_type)
        .bind(&passport.number)
        .fetch_one(&mut *conn)
        .await?;
    Ok(id)
}

async fn upsert_department_in(
    conn: &mut PgConnection,
    department: &NewDepartment,
) -> StoreResult<Id> {
    let select = "SELECT id FROM departments WHERE name = $1";

    let existing: Option<Id> = sqlx::query_scalar(select)
        .bind(&department.name)
        .fetch_optional(&mut *conn)
        .await?;
    if let Some(id) = existing {
        return Ok(id);
    }

    let inserted: Option<Id> = sqlx::query_scalar(
        r#"
        INSERT INTO departments (name, phone)
        VALUES ($1, $2)
        ON CONFLICT (name) DO NOTHING
        RETURNING id
        "#,
    )
    .bind(&department.name)
    .bind(&department.phone)
    .fetch_optional(&mut *conn)
    .await?;
    if let Some(id) = inserted {
        log::info!("Created department {} ({})", id, department.name);
        return Ok(id);
    }

    let id = sqlx::query_scalar(select)
        .bind(&department.name)
        .fetch_one(&mut *conn)
        .await?;
    Ok(id)
}

fn map_passport_conflict(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict("A passport with this type and number already exists".to_string())
        }
        _ => StoreError::Database(err),
    }
}

#[async_trait::async_trait]
impl PassportStore for PostgresStore {
    async fn upsert_passport(&self, passport: &NewPassport) -> StoreResult<Id> {
        let mut conn = self.pool.acquire().await?;
        upsert_passport_in(&mut conn, passport).await
    }

    async fn count_passports(&self) -> StoreResult<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM passports")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait::async_trait]
impl DepartmentStore for PostgresStore {
    async fn upsert_department(&self, department: &NewDepartment) -> StoreResult<Id> {
        let mut conn = self.pool.acquire().await?;
        upsert_department_in(&mut conn, department).await
    }

    async fn count_departments(&self) -> StoreResult<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM departments")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait::async_trait]
impl EmployeeStore for PostgresStore {
    async fn create_employee(&self, employee: &NewEmployee) -> StoreResult<Id> {
        let mut tx = self.pool.begin().await?;

        let passport_id = upsert_passport_in(&mut tx, &employee.passport).await?;
        let department_id = upsert_department_in(&mut tx, &employee.department).await?;

        let id: Id = sqlx::query_scalar(
            r#"
            INSERT INTO employees (name, surname, phone, company_id, passport_id, department_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(&employee.name)
        .bind(&employee.surname)
        .bind(&employee.phone)
        .bind(employee.company_id)
        .bind(passport_id)
        .bind(department_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

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
        let sql = format!("{} WHERE e.id = $1", COMPOSITE_SELECT);
        let row: Option<EmployeeRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Employee::from))
    }

    async fn delete_employee(&self, id: Id) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM employees WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_by_company(&self, company_id: Id) -> StoreResult<Vec<Employee>> {
        self.find_where("company_id", company_id).await
    }

    async fn find_by_department(&self, department_id: Id) -> StoreResult<Vec<Employee>> {
        self.find_where("department_id", department_id).await
    }

    async fn patch_employee(&self, id: Id, document: &PatchDocument) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;

        let sql = format!("{} WHERE e.id = $1 FOR UPDATE OF e", COMPOSITE_SELECT);
        let row: Option<EmployeeRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row else {
            return Ok(false);
        };
        let current = Employee::from(row);

        let update = patch::resolve(document, &current)?;
        if update.is_empty() {
            return Ok(true);
        }

        sqlx::query(
            r#"
            UPDATE employees SET
                name = COALESCE($1, name),
                surname = COALESCE($2, surname),
                phone = COALESCE($3, phone)
            WHERE id = $4
            "#,
        )
        .bind(&update.name)
        .bind(&update.surname)
        .bind(&update.phone)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let passport_update = update.passport.as_ref().filter(|p| !p.is_empty());
        if let (Some(passport), Some(passport_update)) = (&current.passport, passport_update) {
            sqlx::query(
                r#"
                UPDATE passports SET
                    "type" = COALESCE($1, "type"),
                    number = COALESCE($2, number)
                WHERE id = $3
                "#,
            )
            .bind(&passport_update.passport_type)
            .bind(&passport_update.number)
            .bind(passport.id)
            .execute(&mut *tx)
            .await
            .map_err(map_passport_conflict)?;
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn count_employees(&self) -> StoreResult<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM employees")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
