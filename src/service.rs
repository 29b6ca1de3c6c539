use async_trait::async_trait;
use std::sync::Arc;

use crate::{
    error::AppResult,
    models::{CreateStudentRequest, Student, StudentResponse, UpdateStudentRequest},
    repository::{RepoResult, RepositoryState, StudentTransaction},
    validation::Validate,
};

/// StudentService Trait
///
/// The orchestration layer. Each operation validates its input, runs its store
/// calls inside one request-scoped transaction, settles that transaction exactly
/// once, and converts the result into the response shape.
///
/// Handlers only see this trait, so the whole persistence stack can be swapped
/// out in tests.
#[async_trait]
pub trait StudentService: Send + Sync {
    async fn create(&self, req: CreateStudentRequest) -> AppResult<StudentResponse>;
    async fn update(&self, id: i64, req: UpdateStudentRequest) -> AppResult<StudentResponse>;
    async fn delete(&self, id: i64) -> AppResult<()>;
    async fn find_by_id(&self, id: i64) -> AppResult<StudentResponse>;
    async fn find_all(&self) -> AppResult<Vec<StudentResponse>>;
}

/// ServiceState
///
/// The concrete type used to share the service across the application state.
pub type ServiceState = Arc<dyn StudentService>;

/// StudentServiceImpl
///
/// The production `StudentService`, parameterised only by the repository it runs against.
pub struct StudentServiceImpl {
    repo: RepositoryState,
}

impl StudentServiceImpl {
    pub fn new(repo: RepositoryState) -> Self {
        Self { repo }
    }
}

/// commit_or_rollback
///
/// Settles a transaction according to the outcome of the work done inside it.
/// A rollback failure is logged and the original error is returned; a commit
/// failure replaces the successful outcome.
///
/// If the caller never gets here (an early `?`, a panic, a dropped future) the
/// transaction handle is dropped instead, and the store rolls it back.
async fn commit_or_rollback<T>(
    tx: Box<dyn StudentTransaction>,
    outcome: RepoResult<T>,
) -> RepoResult<T> {
    match outcome {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::error!("rollback error: {:?}", rollback_err);
            }
            Err(err)
        }
    }
}

#[async_trait]
impl StudentService for StudentServiceImpl {
    async fn create(&self, req: CreateStudentRequest) -> AppResult<StudentResponse> {
        req.validate()?;

        let mut tx = self.repo.begin().await?;
        let outcome = tx.save(Student::from(req)).await;
        let student = commit_or_rollback(tx, outcome).await?;

        tracing::info!(id = student.id, "siswa created");
        Ok(student.into())
    }

    async fn update(&self, id: i64, mut req: UpdateStudentRequest) -> AppResult<StudentResponse> {
        // Whatever id the client put in the body, the path wins.
        req.id = id;
        req.validate()?;

        let mut tx = self.repo.begin().await?;
        let outcome: RepoResult<Student> = async {
            let mut student = tx.find_by_id(req.id).await?;
            student.apply(req);
            tx.update(student).await
        }
        .await;
        let student = commit_or_rollback(tx, outcome).await?;

        tracing::info!(id = student.id, "siswa updated");
        Ok(student.into())
    }

    async fn delete(&self, id: i64) -> AppResult<()> {
        let mut tx = self.repo.begin().await?;
        let outcome: RepoResult<()> = async {
            let student = tx.find_by_id(id).await?;
            tx.delete(&student).await
        }
        .await;
        commit_or_rollback(tx, outcome).await?;

        tracing::info!(id, "siswa deleted");
        Ok(())
    }

    async fn find_by_id(&self, id: i64) -> AppResult<StudentResponse> {
        let mut tx = self.repo.begin().await?;
        let outcome = tx.find_by_id(id).await;
        let student = commit_or_rollback(tx, outcome).await?;
        Ok(student.into())
    }

    async fn find_all(&self) -> AppResult<Vec<StudentResponse>> {
        let mut tx = self.repo.begin().await?;
        let outcome = tx.find_all().await;
        let students = commit_or_rollback(tx, outcome).await?;
        Ok(students.into_iter().map(StudentResponse::from).collect())
    }
}
