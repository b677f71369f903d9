use async_trait::async_trait;
use mixer_base::db::{DbResult, RelayerRocksDB};
use mixer_core::{Job, JobId};
use tracing::debug;

const JOB_BY_ID_STORAGE_PREFIX: &str = "job_by_id_";
const JOB_INDEX_BY_ID_STORAGE_PREFIX: &str = "job_index_by_id_";
const JOB_ID_BY_INDEX_STORAGE_PREFIX: &str = "job_id_by_index_";
const HIGHEST_JOB_INDEX_STORAGE_PREFIX: &str = "highest_job_index_";

/// Durable FIFO storage of jobs that have not completed yet
#[async_trait]
pub trait JobDb: Send + Sync {
    /// Retrieve a job by its unique ID
    async fn retrieve_job_by_id(&self, id: &JobId) -> DbResult<Option<Job>>;

    /// Store a job. A job stored for the first time is assigned the next
    /// queue index; storing it again only updates its content. First stores
    /// must not run concurrently with each other.
    async fn store_job(&self, job: &Job) -> DbResult<()>;

    /// Retrieve a job's queue index by its unique ID
    async fn retrieve_job_index_by_id(&self, id: &JobId) -> DbResult<Option<u32>>;

    /// Retrieve the highest queue index handed out so far
    async fn retrieve_highest_job_index(&self) -> DbResult<u32>;

    /// Forget a completed job
    async fn remove_job(&self, id: &JobId) -> DbResult<()>;

    /// All stored jobs in queue order
    async fn retrieve_pending_jobs(&self) -> DbResult<Vec<Job>>;
}

#[async_trait]
impl JobDb for RelayerRocksDB {
    async fn retrieve_job_by_id(&self, id: &JobId) -> DbResult<Option<Job>> {
        self.retrieve_value_by_key(JOB_BY_ID_STORAGE_PREFIX, id)
    }

    async fn store_job(&self, job: &Job) -> DbResult<()> {
        if self.retrieve_job_index_by_id(&job.id).await?.is_none() {
            let job_index = self.retrieve_highest_job_index().await? + 1;
            self.store_value_by_key(HIGHEST_JOB_INDEX_STORAGE_PREFIX, "", &job_index)?;
            self.store_value_by_key(JOB_INDEX_BY_ID_STORAGE_PREFIX, job.id, &job_index)?;
            // big endian so that prefix iteration yields queue order
            self.store_value_by_key(
                JOB_ID_BY_INDEX_STORAGE_PREFIX,
                job_index.to_be_bytes(),
                &job.id,
            )?;
            debug!(job_id = %job.id, index = job_index, "Assigned queue index to job");
        }
        self.store_value_by_key(JOB_BY_ID_STORAGE_PREFIX, job.id, job)
    }

    async fn retrieve_job_index_by_id(&self, id: &JobId) -> DbResult<Option<u32>> {
        self.retrieve_value_by_key(JOB_INDEX_BY_ID_STORAGE_PREFIX, id)
    }

    async fn retrieve_highest_job_index(&self) -> DbResult<u32> {
        Ok(self
            .retrieve_value_by_key(HIGHEST_JOB_INDEX_STORAGE_PREFIX, "")?
            .unwrap_or_default())
    }

    async fn remove_job(&self, id: &JobId) -> DbResult<()> {
        if let Some(index) = self.retrieve_job_index_by_id(id).await? {
            self.delete_value_by_key(JOB_ID_BY_INDEX_STORAGE_PREFIX, index.to_be_bytes())?;
            self.delete_value_by_key(JOB_INDEX_BY_ID_STORAGE_PREFIX, id)?;
        }
        self.delete_value_by_key(JOB_BY_ID_STORAGE_PREFIX, id)
    }

    async fn retrieve_pending_jobs(&self) -> DbResult<Vec<Job>> {
        let ids: Vec<JobId> = self.retrieve_values_by_prefix_ordered(JOB_ID_BY_INDEX_STORAGE_PREFIX)?;
        let mut jobs = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(job) = self.retrieve_job_by_id(&id).await? {
                jobs.push(job);
            }
        }
        Ok(jobs)
    }
}

#[cfg(test)]
mod tests {
    use mixer_base::db::test_utils::tmp_db;
    use mixer_core::JobStatus;

    use super::*;
    use crate::tests::test_utils::dummy_request;

    #[tokio::test]
    async fn test_jobs_are_returned_in_store_order() {
        let (_dir, db) = tmp_db();
        let job_db = RelayerRocksDB::new(1, db);

        let jobs: Vec<Job> = (0..300).map(|_| Job::new(dummy_request())).collect();
        for job in &jobs {
            job_db.store_job(job).await.unwrap();
        }

        assert_eq!(job_db.retrieve_highest_job_index().await.unwrap(), 300);
        assert_eq!(job_db.retrieve_pending_jobs().await.unwrap(), jobs);
    }

    #[tokio::test]
    async fn test_restoring_keeps_the_index() {
        let (_dir, db) = tmp_db();
        let job_db = RelayerRocksDB::new(1, db);

        let first = Job::new(dummy_request());
        let second = Job::new(dummy_request());
        job_db.store_job(&first).await.unwrap();
        job_db.store_job(&second).await.unwrap();

        let mut active = first.clone();
        active.status = JobStatus::Active;
        job_db.store_job(&active).await.unwrap();

        assert_eq!(job_db.retrieve_job_index_by_id(&first.id).await.unwrap(), Some(1));
        assert_eq!(job_db.retrieve_highest_job_index().await.unwrap(), 2);
        assert_eq!(
            job_db.retrieve_pending_jobs().await.unwrap(),
            vec![active, second]
        );
    }

    #[tokio::test]
    async fn test_removed_jobs_are_gone() {
        let (_dir, db) = tmp_db();
        let job_db = RelayerRocksDB::new(1, db);

        let first = Job::new(dummy_request());
        let second = Job::new(dummy_request());
        job_db.store_job(&first).await.unwrap();
        job_db.store_job(&second).await.unwrap();
        job_db.remove_job(&first.id).await.unwrap();

        assert_eq!(job_db.retrieve_job_by_id(&first.id).await.unwrap(), None);
        assert_eq!(job_db.retrieve_job_index_by_id(&first.id).await.unwrap(), None);
        assert_eq!(job_db.retrieve_pending_jobs().await.unwrap(), vec![second]);

        // removing twice is harmless
        job_db.remove_job(&first.id).await.unwrap();
    }
}
