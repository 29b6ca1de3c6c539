use crate::models::Student;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// RepositoryError
///
/// Everything the store layer can signal. Only `NotFound` is a normal outcome;
/// the other variants are fatal to the request that hit them.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("siswa {id} is not found")]
    NotFound { id: i64 },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type RepoResult<T> = Result<T, RepositoryError>;

/// StudentRepository Trait
///
/// Entry point to the persistence layer. The only thing it hands out is a fresh
/// transaction; every read and write happens through that handle.
///
/// **Send + Sync + async_trait** are required so that `Arc<dyn StudentRepository>`
/// can live in the shared application state.
#[async_trait]
pub trait StudentRepository: Send + Sync {
    async fn begin(&self) -> RepoResult<Box<dyn StudentTransaction>>;
}

/// StudentTransaction Trait
///
/// An open, request-scoped transaction. Implementations must roll back when the
/// handle is dropped without `commit` or `rollback` having been called, which is
/// what happens when a request future is cancelled.
#[async_trait]
pub trait StudentTransaction: Send {
    /// Inserts a new row and returns the student with its assigned id.
    async fn save(&mut self, student: Student) -> RepoResult<Student>;

    /// Unconditional update keyed by `student.id`. A missing row is a silent no-op.
    async fn update(&mut self, student: Student) -> RepoResult<Student>;

    /// Deletes by `student.id`. A missing row is a silent no-op.
    async fn delete(&mut self, student: &Student) -> RepoResult<()>;

    async fn find_by_id(&mut self, id: i64) -> RepoResult<Student>;

    /// All rows in whatever order the backend yields them.
    async fn find_all(&mut self) -> RepoResult<Vec<Student>>;

    async fn commit(self: Box<Self>) -> RepoResult<()>;

    async fn rollback(self: Box<Self>) -> RepoResult<()>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer access across the application state.
pub type RepositoryState = Arc<dyn StudentRepository>;

const SELECT_COLUMNS: &str = "id, nama, alamat, tanggal_lahir, tempat_lahir, jenis_kelamin, agama, golongan_darah, no_telepon";

/// PostgresRepository
///
/// The concrete implementation of `StudentRepository`, backed by the `siswa` table.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StudentRepository for PostgresRepository {
    async fn begin(&self) -> RepoResult<Box<dyn StudentTransaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PostgresTransaction { tx }))
    }
}

/// PostgresTransaction
///
/// Wraps a pooled `sqlx::Transaction`. sqlx issues the ROLLBACK itself when the
/// inner transaction is dropped uncommitted, so no Drop impl is needed here.
pub struct PostgresTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait]
impl StudentTransaction for PostgresTransaction {
    async fn save(&mut self, mut student: Student) -> RepoResult<Student> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"INSERT INTO siswa (nama, alamat, tanggal_lahir, tempat_lahir, jenis_kelamin, agama, golongan_darah, no_telepon)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
               RETURNING id"#,
        )
        .bind(&student.name)
        .bind(&student.address)
        .bind(&student.birth_date)
        .bind(&student.birth_place)
        .bind(&student.sex)
        .bind(&student.religion)
        .bind(&student.blood_type)
        .bind(&student.phone_number)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| {
            tracing::error!("save error: {:?}", e);
            e
        })?;

        student.id = id;
        Ok(student)
    }

    async fn update(&mut self, student: Student) -> RepoResult<Student> {
        sqlx::query(
            r#"UPDATE siswa
               SET nama = $1, alamat = $2, tanggal_lahir = $3, tempat_lahir = $4,
                   jenis_kelamin = $5, agama = $6, golongan_darah = $7, no_telepon = $8
               WHERE id = $9"#,
        )
        .bind(&student.name)
        .bind(&student.address)
        .bind(&student.birth_date)
        .bind(&student.birth_place)
        .bind(&student.sex)
        .bind(&student.religion)
        .bind(&student.blood_type)
        .bind(&student.phone_number)
        .bind(student.id)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| {
            tracing::error!("update error: {:?}", e);
            e
        })?;

        Ok(student)
    }

    async fn delete(&mut self, student: &Student) -> RepoResult<()> {
        sqlx::query("DELETE FROM siswa WHERE id = $1")
            .bind(student.id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| {
                tracing::error!("delete error: {:?}", e);
                e
            })?;
        Ok(())
    }

    async fn find_by_id(&mut self, id: i64) -> RepoResult<Student> {
        let query = format!("SELECT {SELECT_COLUMNS} FROM siswa WHERE id = $1");
        sqlx::query_as::<_, Student>(&query)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| {
                tracing::error!("find_by_id error: {:?}", e);
                e
            })?
            .ok_or(RepositoryError::NotFound { id })
    }

    async fn find_all(&mut self) -> RepoResult<Vec<Student>> {
        // No ORDER BY: callers must not rely on row order.
        let query = format!("SELECT {SELECT_COLUMNS} FROM siswa");
        let students = sqlx::query_as::<_, Student>(&query)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| {
                tracing::error!("find_all error: {:?}", e);
                e
            })?;
        Ok(students)
    }

    async fn commit(self: Box<Self>) -> RepoResult<()> {
        let this = *self;
        this.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> RepoResult<()> {
        let this = *self;
        this.tx.rollback().await?;
        Ok(())
    }
}

// --- In-Memory Implementation (Test Double) ---

/// TransactionStats
///
/// Counters kept by `MemoryRepository` so tests can assert on transaction boundaries.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TransactionStats {
    pub begun: usize,
    pub committed: usize,
    pub rolled_back: usize,
}

#[derive(Default)]
struct MemoryShared {
    rows: Mutex<BTreeMap<i64, Student>>,
    // Like a database sequence, ids are never reused, even after a rollback.
    next_id: AtomicI64,
    begun: AtomicUsize,
    committed: AtomicUsize,
    rolled_back: AtomicUsize,
}

impl MemoryShared {
    fn lock_rows(&self) -> std::sync::MutexGuard<'_, BTreeMap<i64, Student>> {
        // A poisoned lock only means another test thread panicked mid-write.
        self.rows.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// MemoryRepository
///
/// An in-process implementation of `StudentRepository` for unit and integration tests.
///
/// Each transaction reads from a private snapshot of the table taken at `begin`
/// and records its own writes. `commit` replays only those writes against the
/// shared table, so transactions touching different ids never clobber each
/// other; anything other than `commit` discards them. Rows come back in
/// ascending id order.
#[derive(Clone, Default)]
pub struct MemoryRepository {
    shared: Arc<MemoryShared>,
    /// When true, `begin` still succeeds but every statement inside the
    /// transaction fails with `RepositoryError::Unavailable`.
    pub should_fail: bool,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Committed rows, in id order.
    pub fn rows(&self) -> Vec<Student> {
        self.shared.lock_rows().values().cloned().collect()
    }

    pub fn stats(&self) -> TransactionStats {
        TransactionStats {
            begun: self.shared.begun.load(Ordering::SeqCst),
            committed: self.shared.committed.load(Ordering::SeqCst),
            rolled_back: self.shared.rolled_back.load(Ordering::SeqCst),
        }
    }
}

#[async_trait]
impl StudentRepository for MemoryRepository {
    async fn begin(&self) -> RepoResult<Box<dyn StudentTransaction>> {
        self.shared.begun.fetch_add(1, Ordering::SeqCst);
        let snapshot = self.shared.lock_rows().clone();
        Ok(Box::new(MemoryTransaction {
            shared: Arc::clone(&self.shared),
            working: snapshot,
            changes: Vec::new(),
            should_fail: self.should_fail,
            finished: false,
        }))
    }
}

/// A write made inside a `MemoryTransaction`, replayed in order on commit.
enum Change {
    Insert(Student),
    // Applied only if the row still exists, like `UPDATE ... WHERE id = $1`.
    Update(Student),
    Delete(i64),
}

struct MemoryTransaction {
    shared: Arc<MemoryShared>,
    /// Snapshot at `begin` with this transaction's own writes applied.
    working: BTreeMap<i64, Student>,
    changes: Vec<Change>,
    should_fail: bool,
    finished: bool,
}

impl MemoryTransaction {
    fn check(&self) -> RepoResult<()> {
        if self.should_fail {
            return Err(RepositoryError::Unavailable(
                "mock store error: simulation requested".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl StudentTransaction for MemoryTransaction {
    async fn save(&mut self, mut student: Student) -> RepoResult<Student> {
        self.check()?;
        student.id = self.shared.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.working.insert(student.id, student.clone());
        self.changes.push(Change::Insert(student.clone()));
        Ok(student)
    }

    async fn update(&mut self, student: Student) -> RepoResult<Student> {
        self.check()?;
        if let Some(row) = self.working.get_mut(&student.id) {
            *row = student.clone();
            self.changes.push(Change::Update(student.clone()));
        }
        Ok(student)
    }

    async fn delete(&mut self, student: &Student) -> RepoResult<()> {
        self.check()?;
        if self.working.remove(&student.id).is_some() {
            self.changes.push(Change::Delete(student.id));
        }
        Ok(())
    }

    async fn find_by_id(&mut self, id: i64) -> RepoResult<Student> {
        self.check()?;
        self.working
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound { id })
    }

    async fn find_all(&mut self) -> RepoResult<Vec<Student>> {
        self.check()?;
        Ok(self.working.values().cloned().collect())
    }

    async fn commit(self: Box<Self>) -> RepoResult<()> {
        let mut this = self;
        this.finished = true;
        let changes = std::mem::take(&mut this.changes);
        {
            let mut rows = this.shared.lock_rows();
            for change in changes {
                match change {
                    Change::Insert(student) => {
                        rows.insert(student.id, student);
                    }
                    Change::Update(student) => {
                        if let Some(row) = rows.get_mut(&student.id) {
                            *row = student;
                        }
                    }
                    Change::Delete(id) => {
                        rows.remove(&id);
                    }
                }
            }
        }
        this.shared.committed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> RepoResult<()> {
        let mut this = self;
        this.finished = true;
        this.shared.rolled_back.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        if !self.finished {
            self.shared.rolled_back.fetch_add(1, Ordering::SeqCst);
        }
    }
}
